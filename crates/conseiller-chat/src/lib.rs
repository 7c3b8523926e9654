//! Chat notifications: live chat summaries, new-message detection, unread tab indicator.

mod error;
pub use error::ChatError;

pub mod context;
pub mod notification;
pub mod tab;

pub use context::{
    ChatAuth, ChatCredentials, ChatDeps, ChatFeed, ChatNotificationService, CredentialsSource,
    FeedSubscription, ServiceState, SnapshotOutcome, SnapshotSink,
};
pub use notification::{UnreadIndicator, UnreadTransition, has_unread, new_beneficiary_messages};
pub use tab::{SoundPlayer, TabNotifier, TabState};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::ApiClient;
