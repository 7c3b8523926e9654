//! Per-beneficiary chat summaries as pushed by the real-time chat backend.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A beneficiary of the counselor's portfolio, as passed to the chat feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRef {
    pub id: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
}

impl BeneficiaryRef {
    /// "Last First", the way portfolio lists show beneficiaries.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Who sent a chat message. Wire names follow the chat backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageAuthor {
    #[serde(rename = "conseiller")]
    Conseiller,
    #[serde(rename = "jeune")]
    Beneficiary,
}

/// Conversation metadata for one beneficiary.
///
/// Replaced wholesale on every push from the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    #[serde(rename = "id")]
    pub beneficiary_id: String,
    pub chat_id: String,
    #[serde(rename = "prenom", default)]
    pub first_name: String,
    #[serde(rename = "nom", default)]
    pub last_name: String,
    #[serde(default)]
    pub seen_by_conseiller: bool,
    #[serde(default)]
    pub new_conseiller_message_count: u32,
    #[serde(default)]
    pub last_message_content: Option<String>,
    #[serde(default)]
    pub last_message_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message_sent_by: Option<MessageAuthor>,
    #[serde(default)]
    pub last_conseiller_reading: Option<DateTime<Utc>>,
    #[serde(rename = "lastJeuneReading", default)]
    pub last_beneficiary_reading: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flagged_by_conseiller: bool,
}

impl ChatSummary {
    /// There is a message the counselor has not seen yet.
    pub fn has_unread(&self) -> bool {
        !self.seen_by_conseiller && self.last_message_content.is_some()
    }

    /// The beneficiary has read the conversation up to its last message.
    pub fn is_read_by_beneficiary(&self) -> bool {
        match (self.last_beneficiary_reading, self.last_message_sent_at) {
            (_, None) => true,
            (Some(read), Some(sent)) => read >= sent,
            (None, Some(_)) => false,
        }
    }

    /// "Last First", same as [`BeneficiaryRef::display_name`].
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn last_message_from_beneficiary(&self) -> bool {
        self.last_message_sent_by == Some(MessageAuthor::Beneficiary)
    }
}

/// Messaging list order: flagged first, then unread, then most recent message.
pub fn sort_chats(chats: &mut [ChatSummary]) {
    chats.sort_by(compare_chats);
}

fn compare_chats(a: &ChatSummary, b: &ChatSummary) -> Ordering {
    b.flagged_by_conseiller
        .cmp(&a.flagged_by_conseiller)
        .then_with(|| b.has_unread().cmp(&a.has_unread()))
        .then_with(|| b.last_message_sent_at.cmp(&a.last_message_sent_at))
}
