//! Conversation context gathered around a triggering message.
//!
//! LLM-backed commands see two windows: the most recent channel
//! messages before the trigger (oldest first) and the reply chain the
//! trigger sits in (nearest parent first). Every fetch is best-effort;
//! a failed hop yields a shorter window, never an error.

use serenity::builder::GetMessages;
use serenity::http::Http;
use serenity::model::channel::Message;
use tracing::warn;

pub const HISTORY_DEPTH: u8 = 6;
pub const REPLY_DEPTH: usize = 6;

#[derive(Debug, Default)]
pub struct ConversationContext {
    /// Channel messages before the trigger, oldest first.
    pub previous_messages: Vec<Message>,
    /// Ancestors of the trigger, nearest parent first.
    pub reply_chain: Vec<Message>,
}

pub async fn build_message_context(
    http: &Http,
    msg: &Message,
    history_depth: u8,
    reply_depth: usize,
) -> ConversationContext {
    let mut previous_messages = Vec::new();
    let request = GetMessages::new().before(msg.id).limit(history_depth);
    match msg.channel_id.messages(http, request).await {
        Ok(mut fetched) => {
            // Discord returns newest first.
            fetched.reverse();
            previous_messages = fetched;
        }
        Err(err) => {
            warn!("Failed to fetch channel history: {}", err);
        }
    }

    let mut reply_chain = Vec::new();
    let mut next = msg
        .message_reference
        .as_ref()
        .and_then(|reference| reference.message_id);
    while let Some(id) = next {
        if reply_chain.len() >= reply_depth {
            break;
        }
        match msg.channel_id.message(http, id).await {
            Ok(parent) => {
                next = parent
                    .message_reference
                    .as_ref()
                    .and_then(|reference| reference.message_id);
                reply_chain.push(parent);
            }
            Err(err) => {
                warn!("Failed to fetch reply parent {}: {}", id, err);
                break;
            }
        }
    }

    ConversationContext {
        previous_messages,
        reply_chain,
    }
}

/// Render a labelled window of messages as prompt bullet lines.
pub fn render_labeled(messages: &[Message], label: &str) -> String {
    if messages.is_empty() {
        return format!("{label}: (none)");
    }
    let lines: Vec<String> = messages
        .iter()
        .map(|message| {
            let content = message.content.trim();
            if content.is_empty() {
                format!("- {}: (no text)", message.author.name)
            } else {
                format!("- {}: {}", message.author.name, content)
            }
        })
        .collect();
    format!("{label}:\n{}", lines.join("\n"))
}
