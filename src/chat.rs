// Line-oriented chat against the backend's Bedrock chat route.

use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::models::ChatMessage;

const PROMPT: &str = "you> ";

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit")
}

/// Runs a chat session until EOF or `exit`, returning the conversation.
///
/// Each message is sent with the history so far. A failed request is reported
/// on `output` and leaves the history untouched so the user can retry.
pub async fn run_chat_session<R, W>(
    client: &ApiClient,
    mut input: R,
    mut output: W,
) -> Result<Vec<ChatMessage>>
where
    R: BufRead,
    W: Write,
{
    info!("Starting chat session against {}", client.api_base());
    writeln!(output, "Chatting with {}. Type 'exit' to leave.", client.api_base())?;

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut line = String::new();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_exit(message) {
            break;
        }

        match client.chat(message, &history).await {
            Ok(reply) => {
                writeln!(output, "ai> {}", reply)?;
                history.push(ChatMessage::user(message));
                history.push(ChatMessage::assistant(reply));
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                writeln!(output, "error: {}", e)?;
            }
        }
    }

    writeln!(output)?;
    info!(turns = history.len() / 2, "Chat session finished");
    Ok(history)
}
