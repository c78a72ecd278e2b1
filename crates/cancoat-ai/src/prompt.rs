//! Chat prompt rendering for coating classification.
//!
//! Rendering is deterministic: the same record always produces byte-identical
//! messages. Long free-text fields are cut to a fixed number of characters.

use cancoat_core::{COATING_CHOICES, PatentRecord};
use serde::{Deserialize, Serialize};

/// Character cap applied to the description excerpt.
pub const DESCRIPTION_CHAR_LIMIT: usize = 1200;

/// Character cap applied to the first claim excerpt.
pub const FIRST_CLAIM_CHAR_LIMIT: usize = 800;

const SYSTEM_PROMPT: &str =
    "You are a materials scientist specialised in can coating chemistries.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Render a record into a system framing message followed by one user message.
pub fn build_messages(record: &PatentRecord) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: build_user_prompt(record),
        },
    ]
}

fn build_user_prompt(record: &PatentRecord) -> String {
    let description = truncate_chars(record.description.as_deref(), DESCRIPTION_CHAR_LIMIT);
    let first_claim = truncate_chars(record.first_claim.as_deref(), FIRST_CLAIM_CHAR_LIMIT);

    format!(
        "Classify the coating chemistry for the following patent. \
         Respond with a compact JSON object containing only the key \
         'coating_type' using one of the allowed categories, and an optional \
         'confidence' number between 0 and 1.\n\
         \n\
         Allowed categories: {choices}\n\
         \n\
         Publication number: {number}\n\
         Publication date: {date}\n\
         Title: {title}\n\
         Abstract: {abstract_text}\n\
         Assignee: {assignee}\n\
         CPC Codes: {cpc}\n\
         Description excerpt: {description}\n\
         First claim excerpt: {first_claim}\n",
        choices = COATING_CHOICES.join(", "),
        number = record.publication_number,
        date = or_empty(&record.publication_date),
        title = or_empty(&record.title),
        abstract_text = or_empty(&record.abstract_text),
        assignee = or_empty(&record.assignee),
        cpc = record.cpc_codes.join(", "),
    )
}

fn or_empty(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

/// First `max_chars` characters of `text`; empty when absent.
fn truncate_chars(text: Option<&str>, max_chars: usize) -> &str {
    let Some(text) = text else {
        return "";
    };
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
