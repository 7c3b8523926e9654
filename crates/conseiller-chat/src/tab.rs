//! Side channels for unread notifications: the browser tab and the sound.

use std::mem;

pub const UNREAD_TITLE: &str = "Nouveau(x) message(s)";
pub const DEFAULT_FAVICON: &str = "/favicon.png";
pub const UNREAD_FAVICON: &str = "/favicon_notif.png";

/// Replaces direct mutation of the document title and favicon link.
pub trait TabNotifier: Send {
    fn show_unread(&mut self);
    fn clear(&mut self);
}

pub trait SoundPlayer: Send {
    fn play(&mut self);
}

/// Title and favicon of a tab, with the pre-notification values stashed
/// while the unread indicator is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabState {
    title: String,
    favicon: String,
    stashed: Option<(String, String)>,
}

impl TabState {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            favicon: DEFAULT_FAVICON.to_string(),
            stashed: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn favicon(&self) -> &str {
        &self.favicon
    }

    pub fn is_showing_unread(&self) -> bool {
        self.stashed.is_some()
    }

    /// Page navigation sets a new title. While unread is shown, the new
    /// title is what gets restored on clear.
    pub fn set_title(&mut self, title: impl Into<String>) {
        match &mut self.stashed {
            Some((stashed_title, _)) => *stashed_title = title.into(),
            None => self.title = title.into(),
        }
    }
}

impl TabNotifier for TabState {
    fn show_unread(&mut self) {
        if self.stashed.is_some() {
            return;
        }
        let title = mem::replace(&mut self.title, UNREAD_TITLE.to_string());
        let favicon = mem::replace(&mut self.favicon, UNREAD_FAVICON.to_string());
        self.stashed = Some((title, favicon));
    }

    fn clear(&mut self) {
        if let Some((title, favicon)) = self.stashed.take() {
            self.title = title;
            self.favicon = favicon;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_then_clear_restores() {
        let mut tab = TabState::new("Portefeuille");
        tab.show_unread();
        assert_eq!(tab.title(), UNREAD_TITLE);
        assert_eq!(tab.favicon(), UNREAD_FAVICON);
        tab.clear();
        assert_eq!(tab.title(), "Portefeuille");
        assert_eq!(tab.favicon(), DEFAULT_FAVICON);
        assert!(!tab.is_showing_unread());
    }

    #[test]
    fn repeated_show_does_not_restash() {
        let mut tab = TabState::new("Agenda");
        tab.show_unread();
        tab.show_unread();
        tab.clear();
        assert_eq!(tab.title(), "Agenda");
    }

    #[test]
    fn clear_without_show_is_noop() {
        let mut tab = TabState::new("Agenda");
        tab.clear();
        assert_eq!(tab.title(), "Agenda");
        assert_eq!(tab.favicon(), DEFAULT_FAVICON);
    }

    #[test]
    fn navigation_while_unread_updates_restored_title() {
        let mut tab = TabState::new("Agenda");
        tab.show_unread();
        tab.set_title("Messagerie");
        assert_eq!(tab.title(), UNREAD_TITLE);
        tab.clear();
        assert_eq!(tab.title(), "Messagerie");
    }
}
