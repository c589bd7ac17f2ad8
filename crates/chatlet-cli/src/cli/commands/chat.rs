//! Chat command handler.

use anyhow::Result;
use chatlet_core::client::ChatClient;
use chatlet_core::session::WidgetSession;

use crate::chat::run_chat;

pub async fn run(api_base: &str, agent_id: &str) -> Result<()> {
    let client = ChatClient::new(api_base);
    let session = WidgetSession::new();

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout();
    run_chat(stdin, &mut stdout, &client, session, agent_id).await
}
