//! Chat notification service: live chat summaries for a counselor's portfolio.
//!
//! Acquires chat credentials, signs in, subscribes to the per-beneficiary
//! summary feed, and on every push detects new beneficiary messages (sound)
//! and unread edges (tab indicator). Views read the live list through
//! [`ChatNotificationService::subscribe_chats`].
//!
//! The service is owned by a single task. All state changes go through
//! `&mut self`, so no locking is involved.

use std::sync::Arc;

use async_trait::async_trait;
use conseiller_core::{BeneficiaryRef, ChatSummary, ConseillerPreferences};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::ChatError;
use crate::notification::{UnreadIndicator, UnreadTransition, has_unread, new_beneficiary_messages};
use crate::tab::{SoundPlayer, TabNotifier};

/// Credentials for the real-time chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCredentials {
    pub token: String,
    pub encryption_key: String,
}

#[async_trait]
pub trait CredentialsSource: Send + Sync {
    async fn chat_credentials(&self) -> Result<ChatCredentials, ChatError>;
}

#[async_trait]
pub trait ChatAuth: Send + Sync {
    async fn sign_in(&self, token: &str) -> Result<(), ChatError>;
}

/// Where a feed pushes full snapshots of the counselor's chats.
pub type SnapshotSink = mpsc::UnboundedSender<Vec<ChatSummary>>;

#[async_trait]
pub trait ChatFeed: Send + Sync {
    /// Start observing the chats of `roster`. Snapshots go to `sink` until
    /// the returned subscription is disposed.
    async fn observe_conseiller_chats(
        &self,
        encryption_key: &str,
        roster: &[BeneficiaryRef],
        sink: SnapshotSink,
    ) -> Result<FeedSubscription, ChatError>;
}

/// Disposer returned by [`ChatFeed::observe_conseiller_chats`].
///
/// Runs at most once: on [`unsubscribe`](Self::unsubscribe) or on drop.
pub struct FeedSubscription {
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl FeedSubscription {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("active", &self.disposer.is_some())
            .finish()
    }
}

/// Collaborators injected into the service.
pub struct ChatDeps {
    pub credentials: Arc<dyn CredentialsSource>,
    pub auth: Arc<dyn ChatAuth>,
    pub feed: Arc<dyn ChatFeed>,
    pub sound: Box<dyn SoundPlayer>,
    pub tab: Box<dyn TabNotifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No subscription yet.
    Uninitialized,
    Subscribed,
    Closed,
}

/// What one push changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotOutcome {
    /// Beneficiary ids with a new message from the beneficiary.
    pub new_messages: Vec<String>,
    pub sound_played: bool,
    pub transition: Option<UnreadTransition>,
}

pub struct ChatNotificationService {
    deps: ChatDeps,
    preferences: ConseillerPreferences,
    credentials: Option<ChatCredentials>,
    state: ServiceState,
    chats: Vec<ChatSummary>,
    indicator: UnreadIndicator,
    subscription: Option<FeedSubscription>,
    pushes: Option<mpsc::UnboundedReceiver<Vec<ChatSummary>>>,
    published: watch::Sender<Vec<ChatSummary>>,
}

impl ChatNotificationService {
    pub fn new(deps: ChatDeps, preferences: ConseillerPreferences) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            deps,
            preferences,
            credentials: None,
            state: ServiceState::Uninitialized,
            chats: Vec::new(),
            indicator: UnreadIndicator::default(),
            subscription: None,
            pushes: None,
            published,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn has_unread(&self) -> bool {
        self.indicator.is_raised()
    }

    /// Live view of the chat list for consumers.
    pub fn subscribe_chats(&self) -> watch::Receiver<Vec<ChatSummary>> {
        self.published.subscribe()
    }

    pub fn preferences(&self) -> ConseillerPreferences {
        self.preferences
    }

    pub fn set_preferences(&mut self, preferences: ConseillerPreferences) {
        self.preferences = preferences;
    }

    /// Sign in if needed, then subscribe to the chats of `roster`.
    ///
    /// Credentials are fetched once per service. Any current subscription is
    /// disposed first: an empty roster, or a feed that fails to open, leaves
    /// the service `Uninitialized`.
    pub async fn connect(&mut self, roster: &[BeneficiaryRef]) -> Result<(), ChatError> {
        if self.state == ServiceState::Closed {
            return Err(ChatError::Closed);
        }

        let encryption_key = match &self.credentials {
            Some(credentials) => credentials.encryption_key.clone(),
            None => {
                let credentials = self.deps.credentials.chat_credentials().await?;
                self.deps.auth.sign_in(&credentials.token).await?;
                info!("signed in to chat backend");
                let key = credentials.encryption_key.clone();
                self.credentials = Some(credentials);
                key
            }
        };

        self.drop_subscription();
        if roster.is_empty() {
            debug!("empty roster, not subscribing to chats");
            return Ok(());
        }

        let (sink, pushes) = mpsc::unbounded_channel();
        let subscription = self
            .deps
            .feed
            .observe_conseiller_chats(&encryption_key, roster, sink)
            .await?;

        info!(beneficiaries = roster.len(), "subscribed to chat feed");
        self.subscription = Some(subscription);
        self.pushes = Some(pushes);
        self.state = ServiceState::Subscribed;
        Ok(())
    }

    /// Dispose of the current subscription, if any, and go back to
    /// `Uninitialized`.
    fn drop_subscription(&mut self) {
        if let Some(previous) = self.subscription.take() {
            debug!("disposing chat subscription");
            previous.unsubscribe();
        }
        self.pushes = None;
        self.state = ServiceState::Uninitialized;
    }

    /// Apply one snapshot from the feed.
    pub fn handle_snapshot(&mut self, snapshot: Vec<ChatSummary>) -> SnapshotOutcome {
        let new_messages: Vec<String> = new_beneficiary_messages(&self.chats, &snapshot)
            .into_iter()
            .map(|chat| chat.beneficiary_id.clone())
            .collect();

        let sound_played = !new_messages.is_empty() && self.preferences.notifications_sonores;
        if sound_played {
            self.deps.sound.play();
        }
        if !new_messages.is_empty() {
            info!(count = new_messages.len(), sound = sound_played, "new beneficiary messages");
        }

        let transition = self.indicator.update(has_unread(&snapshot));
        match transition {
            Some(UnreadTransition::Raised) => {
                debug!("unread messages, showing tab indicator");
                self.deps.tab.show_unread();
            }
            Some(UnreadTransition::Cleared) => {
                debug!("all messages read, clearing tab indicator");
                self.deps.tab.clear();
            }
            None => {}
        }

        self.chats = snapshot;
        self.published.send_replace(self.chats.clone());

        SnapshotOutcome {
            new_messages,
            sound_played,
            transition,
        }
    }

    /// Wait for the next push and apply it. `None` once the feed is closed
    /// or when not subscribed. Cancel-safe.
    pub async fn next_push(&mut self) -> Option<SnapshotOutcome> {
        let snapshot = self.pushes.as_mut()?.recv().await?;
        Some(self.handle_snapshot(snapshot))
    }

    /// Apply pushes until the feed closes.
    pub async fn run(&mut self) -> Result<(), ChatError> {
        if self.state == ServiceState::Closed {
            return Err(ChatError::Closed);
        }
        let mut handled = 0usize;
        while self.next_push().await.is_some() {
            handled += 1;
        }
        info!(snapshots = handled, "chat feed closed");
        Ok(())
    }

    /// Dispose of the feed subscription. Further calls are no-ops.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("unsubscribed from chat feed");
        }
        self.pushes = None;
        self.state = ServiceState::Closed;
    }
}
