//! Interactive chat loop for chatlet.
//!
//! A REPL over one widget session: reads user input from `input`, streams
//! assistant tokens to `output` as they arrive. Exits on `:q` or EOF.
//! Generic over reader/writer so the loop is testable end to end against a
//! mock server.

use std::io::{BufRead, Write};

use anyhow::Result;
use chatlet_core::client::{ChatClient, StreamFrame};
use chatlet_core::session::{Role, SessionEffect, WidgetSession};
use futures_util::StreamExt;

const QUIT_COMMAND: &str = ":q";
const PROMPT_PREFIX: &str = "you> ";
const ASSISTANT_PREFIX: &str = "assistant> ";

/// Runs the chat loop with a provided client and session.
pub async fn run_chat<R, W>(
    input: R,
    output: &mut W,
    client: &ChatClient,
    mut session: WidgetSession,
    agent_id: &str,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    // Opening the widget triggers the one-time metadata fetch; a failure is
    // swallowed and the default header stays.
    for effect in session.toggle() {
        if effect == SessionEffect::FetchAgentMeta {
            match client.fetch_agent(agent_id).await {
                Ok(info) => session.apply_agent_meta(info),
                Err(err) => tracing::warn!("agent metadata fetch failed: {err}"),
            }
        }
    }

    writeln!(output, "{} (type {QUIT_COMMAND} to quit)", session.header_title())?;
    for message in session.messages() {
        // Welcome message, if the agent has one.
        writeln!(output, "{ASSISTANT_PREFIX}{}", message.content)?;
    }

    write!(output, "{PROMPT_PREFIX}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == QUIT_COMMAND {
            break;
        }

        if let Some(SessionEffect::SendMessage {
            text,
            conversation_id,
        }) = session.submit(trimmed)
        {
            run_turn(output, client, &mut session, agent_id, &text, conversation_id).await?;
        }

        write!(output, "{PROMPT_PREFIX}")?;
        output.flush()?;
    }

    Ok(())
}

/// Drives one send through the frame stream, printing tokens as they arrive.
async fn run_turn<W: Write>(
    output: &mut W,
    client: &ChatClient,
    session: &mut WidgetSession,
    agent_id: &str,
    text: &str,
    conversation_id: Option<String>,
) -> Result<()> {
    let before = session.messages().len();
    let mut streamed = String::new();
    let mut prefixed = false;

    match client
        .send_message(agent_id, text, conversation_id.as_deref())
        .await
    {
        Ok(mut frames) => {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(StreamFrame::Token { text }) => {
                        if !prefixed {
                            write!(output, "{ASSISTANT_PREFIX}")?;
                            prefixed = true;
                        }
                        write!(output, "{text}")?;
                        output.flush()?;
                        streamed.push_str(&text);
                        session.apply_frame(StreamFrame::Token { text });
                    }
                    Ok(frame) => session.apply_frame(frame),
                    Err(err) => {
                        session.fail_turn(&err);
                        break;
                    }
                }
            }
            // Natural stream end; a no-op if the turn already failed.
            session.apply_frame(StreamFrame::Done);
        }
        Err(err) => session.fail_turn(&err),
    }

    if prefixed {
        writeln!(output)?;
    }

    // Messages the session appended beyond the streamed text (fallbacks).
    for message in &session.messages()[before..] {
        if message.role == Role::Assistant && message.content != streamed {
            writeln!(output, "{ASSISTANT_PREFIX}{}", message.content)?;
        }
    }

    Ok(())
}
