//! Shared types for the counselor portfolio: agenda bucketing, chat summaries, preferences.

pub mod agenda;
pub mod chat;
pub mod conseiller;

pub use agenda::{
    AFTERNOON_START_HOUR, AgendaData, AgendaDay, AgendaError, DayBucket, Identified, Period,
    build_agenda_data, build_agenda_data_strict,
};
pub use chat::{BeneficiaryRef, ChatSummary, MessageAuthor, sort_chats};
pub use conseiller::ConseillerPreferences;
