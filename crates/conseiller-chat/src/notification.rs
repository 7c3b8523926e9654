//! Transition detection over successive chat snapshots.
//!
//! Pure functions and a two-state machine; the service feeds them and
//! performs the side effects.

use std::collections::HashMap;

use conseiller_core::ChatSummary;

/// Chats in `next` whose last message changed since `previous` and was sent
/// by the beneficiary.
///
/// Chats with no counterpart in `previous` are never reported, so the first
/// snapshot after subscribing is silent.
pub fn new_beneficiary_messages<'a>(
    previous: &[ChatSummary],
    next: &'a [ChatSummary],
) -> Vec<&'a ChatSummary> {
    let before: HashMap<&str, &ChatSummary> = previous
        .iter()
        .map(|c| (c.beneficiary_id.as_str(), c))
        .collect();

    next.iter()
        .filter(|chat| {
            before.get(chat.beneficiary_id.as_str()).is_some_and(|prev| {
                prev.last_message_content != chat.last_message_content
                    && chat.last_message_from_beneficiary()
            })
        })
        .collect()
}

/// At least one chat has a message the counselor has not seen.
pub fn has_unread(chats: &[ChatSummary]) -> bool {
    chats.iter().any(ChatSummary::has_unread)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadTransition {
    /// No unread before, some now.
    Raised,
    /// Unread before, none now.
    Cleared,
}

/// Edge detector for the unread flag.
#[derive(Debug, Default)]
pub struct UnreadIndicator {
    raised: bool,
}

impl UnreadIndicator {
    pub fn is_raised(&self) -> bool {
        self.raised
    }

    /// Feed the latest flag; returns a transition only on an edge.
    pub fn update(&mut self, has_unread: bool) -> Option<UnreadTransition> {
        match (self.raised, has_unread) {
            (false, true) => {
                self.raised = true;
                Some(UnreadTransition::Raised)
            }
            (true, false) => {
                self.raised = false;
                Some(UnreadTransition::Cleared)
            }
            _ => None,
        }
    }
}
