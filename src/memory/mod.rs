//! Conversation memory for the study assistant.
//!
//! This module provides utilities for:
//! - Formatting stored turns into a readable transcript
//! - Building the prompt sent to the model, with or without earlier turns
//! - Keeping injected history inside a token budget
//!
//! Turns themselves are stored by a [`ChatStore`](crate::db::ChatStore); this
//! module only decides how they are presented to the model.

use crate::types::{ChatTurn, Message, MessageRole};
use serde::{Deserialize, Serialize};

/// System prompt that keeps answers study-focused.
pub const STUDY_SYSTEM_PROMPT: &str = "You are a helpful study assistant. Help students with their academic questions. Give clear, educational responses.";

/// Default number of earlier turns given to the model and returned by history lookups.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Largest history window a caller may request.
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Reported in place of a transcript when a user has no stored turns.
pub const NO_HISTORY_MESSAGE: &str = "No chat history found";

/// How earlier turns are handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// History is rendered as text in front of the question
    #[default]
    Inline,
    /// History is sent as alternating user/assistant messages
    Turns,
}

/// Formats turns as a transcript of `User: ...` / `Assistant: ...` lines.
///
/// Turns are expected oldest first. Returns an empty string for no turns.
pub fn format_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .flat_map(|turn| {
            [
                format!("User: {}", turn.user_message),
                format!("Assistant: {}", turn.bot_response),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the single-prompt form of a question with its conversation context.
///
/// # Example
/// ```ignore
/// let prompt = build_inline_prompt("User: hi\nAssistant: hello", "What is DNA?");
/// // "Previous conversation:\nUser: hi\nAssistant: hello\n\nCurrent question: What is DNA?"
/// ```
pub fn build_inline_prompt(history: &str, question: &str) -> String {
    if history.trim().is_empty() {
        question.to_string()
    } else {
        format!(
            "Previous conversation:\n{}\n\nCurrent question: {}",
            history, question
        )
    }
}

/// Builds a message list: system prompt, earlier turns, then the new question.
pub fn build_turn_messages(system_prompt: &str, turns: &[ChatTurn], question: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() * 2 + 2);
    messages.push(Message {
        role: MessageRole::System,
        content: system_prompt.to_string(),
    });

    for turn in turns {
        messages.push(Message {
            role: MessageRole::User,
            content: turn.user_message.clone(),
        });
        messages.push(Message {
            role: MessageRole::Assistant,
            content: turn.bot_response.clone(),
        });
    }

    messages.push(Message {
        role: MessageRole::User,
        content: question.to_string(),
    });
    messages
}

/// Converts messages into the `(role, content)` pairs taken by
/// [`LLMClient::generate_with_history`](crate::llm::LLMClient::generate_with_history).
pub fn to_role_pairs(messages: &[Message]) -> Vec<(String, String)> {
    messages
        .iter()
        .map(|m| (m.role.as_str().to_string(), m.content.clone()))
        .collect()
}

/// Estimates token count for a piece of text (rough approximation).
///
/// Uses a simple heuristic of ~4 characters per token for English text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimated token cost of a whole turn.
pub fn turn_tokens(turn: &ChatTurn) -> usize {
    estimate_tokens(&turn.user_message) + estimate_tokens(&turn.bot_response)
}

/// Truncates turns to fit within a token budget.
///
/// Drops the oldest turns first and keeps chronological order. A turn is
/// never split: if the newest turn alone exceeds the budget, nothing is kept.
pub fn truncate_turns_to_tokens(turns: &[ChatTurn], token_budget: usize) -> Vec<ChatTurn> {
    let mut result = Vec::new();
    let mut total_tokens = 0;

    // Work backwards from the most recent turn
    for turn in turns.iter().rev() {
        let tokens = turn_tokens(turn);
        if total_tokens + tokens > token_budget {
            break;
        }
        result.push(turn.clone());
        total_tokens += tokens;
    }

    result.reverse();
    result
}
