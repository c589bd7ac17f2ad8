//! Agent metadata command handler.

use anyhow::{Context, Result};
use chatlet_core::client::ChatClient;

pub async fn run(api_base: &str, agent_id: &str) -> Result<()> {
    let client = ChatClient::new(api_base);
    let agent = client
        .fetch_agent(agent_id)
        .await
        .context("fetch agent metadata")?;

    println!("name: {}", agent.name);
    if let Some(welcome) = &agent.welcome_message {
        println!("welcome: {welcome}");
    }
    Ok(())
}
