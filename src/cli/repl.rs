//! Interactive terminal chat
//!
//! Reads questions line by line, answers them with the [`StudyAssistant`] and
//! keeps going after model errors so one failed request never ends a session.

use super::output::Output;
use crate::StudyAssistant;
use crate::llm::ApiKeyStatus;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Words that end a chat session, matched case-insensitively
pub const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "bye"];

/// What to do with one line of user input
#[derive(Debug, PartialEq, Eq)]
pub enum ReplAction {
    /// Leave the session
    Exit,
    /// Blank line, prompt again
    Skip,
    /// Send the question to the assistant
    Ask(String),
}

/// Whether `input` asks to end the session
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_COMMANDS
        .iter()
        .any(|cmd| cmd.eq_ignore_ascii_case(input))
}

/// Classify one input line
pub fn parse_input(line: &str) -> ReplAction {
    let line = line.trim();
    if line.is_empty() {
        ReplAction::Skip
    } else if is_exit_command(line) {
        ReplAction::Exit
    } else {
        ReplAction::Ask(line.to_string())
    }
}

/// Run a chat session on stdin
pub async fn run(
    assistant: StudyAssistant,
    user: Option<String>,
    api_key: ApiKeyStatus,
    output: &Output,
) -> anyhow::Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    run_with_input(assistant, user, api_key, &mut lines, output).await
}

/// Run a chat session over any line source
pub async fn run_with_input<R>(
    assistant: StudyAssistant,
    user: Option<String>,
    api_key: ApiKeyStatus,
    lines: &mut Lines<R>,
    output: &Output,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    output.banner();

    let user_id = match user.filter(|u| !u.trim().is_empty()) {
        Some(user) => user.trim().to_string(),
        None => loop {
            output.prompt("Enter your name");
            match lines.next_line().await? {
                Some(name) if !name.trim().is_empty() => break name.trim().to_string(),
                Some(_) => continue,
                None => return Ok(()),
            }
        },
    };

    let status = assistant.status(api_key).await;
    if !assistant.settings().use_memory {
        output.info("Memory is off: this conversation will not be remembered");
    } else if status.database_connected {
        output.success(&format!(
            "Connected to {} history store",
            status.database_backend
        ));
    } else {
        output.warning("History store unreachable: answers will not use or save memory");
    }
    if status.api_key == ApiKeyStatus::Missing {
        output.warning("No API key configured: questions will fail until one is set");
    }

    match assistant.history(&user_id, None).await {
        Ok(turns) if !turns.is_empty() && assistant.settings().use_memory => {
            output.info(&format!(
                "Welcome back, {}! I remember our last {} exchange(s).",
                user_id,
                turns.len()
            ));
        }
        _ => output.info(&format!("Hello, {}!", user_id)),
    }
    output.info(&format!(
        "Ask me anything. Type {} to leave.",
        EXIT_COMMANDS.join(", ")
    ));
    output.newline();

    loop {
        output.prompt("You");
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            ReplAction::Skip => continue,
            ReplAction::Exit => break,
            ReplAction::Ask(question) => match assistant.ask(&user_id, &question).await {
                Ok(answer) => {
                    output.speaker("Bot", &answer.response);
                    if assistant.settings().use_memory && !answer.memory_saved {
                        output.warning("This exchange could not be saved");
                    }
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Chat request failed");
                    output.error(&format!("Sorry, I couldn't answer that: {}", e));
                }
            },
        }
        output.newline();
    }

    output.newline();
    output.info("Goodbye! Happy studying! 👋");
    Ok(())
}
