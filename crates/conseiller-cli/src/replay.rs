//! `conseiller replay`: drive the chat notification service from a file of
//! recorded snapshots, one JSON array of chat summaries per line.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Args;
use conseiller_chat::{
    ApiClient, ChatAuth, ChatCredentials, ChatDeps, ChatError, ChatFeed, ChatNotificationService,
    CredentialsSource, FeedSubscription, SnapshotSink, SoundPlayer, TabNotifier, TabState,
};
use conseiller_core::{BeneficiaryRef, ChatSummary, ConseillerPreferences, sort_chats};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file, one snapshot (array of chat summaries) per line.
    #[arg(long)]
    snapshots: PathBuf,

    /// Delay between snapshots, in milliseconds.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// REST API base URL. When set, credentials and preferences come from the API.
    #[arg(long, env = "CONSEILLER_API_URL")]
    api_url: Option<String>,

    /// Access token for the REST API.
    #[arg(long, env = "CONSEILLER_ACCESS_TOKEN", default_value = "")]
    access_token: String,

    /// Counselor whose preferences to load from the API.
    #[arg(long, env = "CONSEILLER_ID")]
    conseiller_id: Option<String>,

    /// Chat token to use without an API.
    #[arg(long, env = "CONSEILLER_CHAT_TOKEN", default_value = "replay")]
    token: String,

    /// Encryption key to use without an API.
    #[arg(long, env = "CONSEILLER_CHAT_KEY", default_value = "replay")]
    key: String,

    /// Disable the notification sound.
    #[arg(long)]
    no_sound: bool,

    /// Title of the tab before any notification.
    #[arg(long, default_value = "Portefeuille")]
    title: String,
}

pub async fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let snapshots = load_snapshots(&args.snapshots)?;
    let roster = roster_of(&snapshots);
    info!(
        snapshots = snapshots.len(),
        beneficiaries = roster.len(),
        "loaded chat snapshots"
    );

    let mut preferences = ConseillerPreferences::default();
    let credentials: Arc<dyn CredentialsSource> = match &args.api_url {
        Some(url) => {
            let api = ApiClient::new(url.clone(), args.access_token.clone());
            if let Some(id) = &args.conseiller_id {
                preferences = api.conseiller_preferences(id).await?;
            }
            Arc::new(api)
        }
        None => Arc::new(StaticCredentials(ChatCredentials {
            token: args.token.clone(),
            encryption_key: args.key.clone(),
        })),
    };
    if args.no_sound {
        preferences.notifications_sonores = false;
    }

    let feed = Arc::new(ReplayFeed {
        snapshots,
        interval: Duration::from_millis(args.interval_ms),
    });
    let deps = ChatDeps {
        credentials,
        auth: feed.clone(),
        feed,
        sound: Box::new(TerminalBell),
        tab: Box::new(LoggingTab(TabState::new(args.title))),
    };

    let mut service = ChatNotificationService::new(deps, preferences);
    service.connect(&roster).await?;

    tokio::select! {
        result = service.run() => result?,
        _ = tokio::signal::ctrl_c() => warn!("interrupted"),
    }
    service.shutdown();

    let mut chats = service.chats().to_vec();
    sort_chats(&mut chats);
    for chat in &chats {
        println!(
            "{}{} {:<24} {}",
            if chat.flagged_by_conseiller { "!" } else { " " },
            if chat.has_unread() { "*" } else { " " },
            chat.display_name(),
            chat.last_message_content.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn load_snapshots(path: &Path) -> anyhow::Result<Vec<Vec<ChatSummary>>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parsing {} line {}", path.display(), n + 1))
        })
        .collect()
}

/// Every beneficiary appearing in any snapshot, ordered by id.
fn roster_of(snapshots: &[Vec<ChatSummary>]) -> Vec<BeneficiaryRef> {
    let mut roster = BTreeMap::new();
    for chat in snapshots.iter().flatten() {
        roster
            .entry(chat.beneficiary_id.clone())
            .or_insert_with(|| BeneficiaryRef {
                id: chat.beneficiary_id.clone(),
                first_name: chat.first_name.clone(),
                last_name: chat.last_name.clone(),
            });
    }
    roster.into_values().collect()
}

struct StaticCredentials(ChatCredentials);

#[async_trait]
impl CredentialsSource for StaticCredentials {
    async fn chat_credentials(&self) -> Result<ChatCredentials, ChatError> {
        Ok(self.0.clone())
    }
}

/// Pushes recorded snapshots, restricted to the observed roster.
struct ReplayFeed {
    snapshots: Vec<Vec<ChatSummary>>,
    interval: Duration,
}

#[async_trait]
impl ChatAuth for ReplayFeed {
    async fn sign_in(&self, token: &str) -> Result<(), ChatError> {
        if token.is_empty() {
            return Err(ChatError::SignIn("empty chat token".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatFeed for ReplayFeed {
    async fn observe_conseiller_chats(
        &self,
        _encryption_key: &str,
        roster: &[BeneficiaryRef],
        sink: SnapshotSink,
    ) -> Result<FeedSubscription, ChatError> {
        let ids: Vec<String> = roster.iter().map(|b| b.id.clone()).collect();
        let snapshots: Vec<Vec<ChatSummary>> = self
            .snapshots
            .iter()
            .map(|snapshot| {
                snapshot
                    .iter()
                    .filter(|chat| ids.contains(&chat.beneficiary_id))
                    .cloned()
                    .collect()
            })
            .collect();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            for snapshot in snapshots {
                if sink.send(snapshot).is_err() {
                    break;
                }
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
        });
        Ok(FeedSubscription::new(move || task.abort()))
    }
}

struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&mut self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

/// Tab state that logs every title change.
struct LoggingTab(TabState);

impl TabNotifier for LoggingTab {
    fn show_unread(&mut self) {
        self.0.show_unread();
        info!(title = self.0.title(), favicon = self.0.favicon(), "tab shows unread");
    }

    fn clear(&mut self) {
        self.0.clear();
        info!(title = self.0.title(), favicon = self.0.favicon(), "tab restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, nom: &str) -> ChatSummary {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "chatId": format!("chat-{id}"),
            "prenom": "Kenji",
            "nom": nom,
        }))
        .unwrap()
    }

    #[test]
    fn roster_is_deduplicated_and_ordered() {
        let snapshots = vec![
            vec![summary("b", "Bernard"), summary("a", "Aubert")],
            vec![summary("a", "Aubert"), summary("c", "Collin")],
        ];
        let ids: Vec<String> = roster_of(&snapshots).into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn replay_feed_filters_to_roster() {
        let feed = ReplayFeed {
            snapshots: vec![vec![summary("a", "Aubert"), summary("z", "Zidane")]],
            interval: Duration::ZERO,
        };
        let roster = vec![BeneficiaryRef {
            id: "a".into(),
            first_name: "Kenji".into(),
            last_name: "Aubert".into(),
        }];
        let (sink, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = feed.observe_conseiller_chats("key", &roster, sink).await.unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].beneficiary_id, "a");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_token_fails_sign_in() {
        let feed = ReplayFeed {
            snapshots: Vec::new(),
            interval: Duration::ZERO,
        };
        assert!(matches!(feed.sign_in("").await, Err(ChatError::SignIn(_))));
        assert!(feed.sign_in("token").await.is_ok());
    }
}
