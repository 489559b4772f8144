// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Boundary between the guard and the page it protects.
//!
//! [`AuthUi`] covers what the visitor sees, [`Navigator`] covers where the
//! page goes. A browser binding implements both against the DOM and the
//! window; [`crate::console::ConsolePage`] implements them for a terminal;
//! [`RecordingPage`] just records every call.

use std::time::Duration;

/// The two blocking notices that replace the page's main content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Shown on load or recheck failure, before the delayed redirect
    Redirecting,
    /// Shown when a protected link is clicked after the session lapsed
    AccessBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNotice {
    pub kind: NoticeKind,
    pub login_url: String,
}

impl BlockNotice {
    pub fn redirecting(login_url: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Redirecting,
            login_url: login_url.into(),
        }
    }

    pub fn access_blocked(login_url: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::AccessBlocked,
            login_url: login_url.into(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            NoticeKind::Redirecting => "Authentication Required",
            NoticeKind::AccessBlocked => "Access Blocked",
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            NoticeKind::Redirecting => "You need to be logged in to access this page.",
            NoticeKind::AccessBlocked => "Your session has expired. Please login again to continue.",
        }
    }

    /// Secondary line under the message, if any.
    pub fn detail(&self) -> Option<&'static str> {
        match self.kind {
            NoticeKind::Redirecting => Some("Redirecting to login page..."),
            NoticeKind::AccessBlocked => None,
        }
    }

    /// Label of the manual link to the login page.
    pub fn action_label(&self) -> &'static str {
        match self.kind {
            NoticeKind::Redirecting => "Click here if not redirected",
            NoticeKind::AccessBlocked => "Go to Login Page",
        }
    }
}

/// What the visitor sees.
pub trait AuthUi {
    /// Show the "Logout (role)" affordance.
    fn render_logged_in(&mut self, role: &str);

    /// Show the "Login" affordance pointing at `login_url`.
    fn render_logged_out(&mut self, login_url: &str);

    /// Replace the main content with a blocking notice.
    fn render_blocked(&mut self, notice: &BlockNotice);
}

/// Where the page goes.
pub trait Navigator {
    /// Full URL of the page being guarded.
    fn current_url(&self) -> String;

    /// Leave the page now.
    fn navigate(&mut self, url: &str);

    /// Leave the page after `delay`. Cannot be cancelled.
    fn schedule_navigation(&mut self, url: &str, delay: Duration);

    /// Ask the visitor a yes/no question.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Push a history entry for `url` so the back button lands on this page.
    fn push_history_entry(&mut self, url: &str);
}

/// One recorded call on a [`RecordingPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEffect {
    LoggedIn { role: String },
    LoggedOut { login_url: String },
    Blocked(BlockNotice),
    Navigated { url: String },
    Scheduled { url: String, delay: Duration },
    Confirmed { prompt: String, answer: bool },
    HistoryPushed { url: String },
}

/// Headless page that records everything the guard asks of it.
#[derive(Debug, Clone)]
pub struct RecordingPage {
    url: String,
    confirm_answer: bool,
    effects: Vec<PageEffect>,
}

impl RecordingPage {
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            confirm_answer: true,
            effects: Vec::new(),
        }
    }

    /// Answer every confirmation with `answer`.
    pub fn answering(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    pub fn effects(&self) -> &[PageEffect] {
        &self.effects
    }

    pub fn take_effects(&mut self) -> Vec<PageEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Last notice rendered, if any.
    pub fn last_notice(&self) -> Option<&BlockNotice> {
        self.effects.iter().rev().find_map(|e| match e {
            PageEffect::Blocked(notice) => Some(notice),
            _ => None,
        })
    }

    /// Every scheduled navigation, in order.
    pub fn scheduled(&self) -> Vec<(&str, Duration)> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                PageEffect::Scheduled { url, delay } => Some((url.as_str(), *delay)),
                _ => None,
            })
            .collect()
    }
}

impl AuthUi for RecordingPage {
    fn render_logged_in(&mut self, role: &str) {
        self.effects.push(PageEffect::LoggedIn { role: role.to_string() });
    }

    fn render_logged_out(&mut self, login_url: &str) {
        self.effects.push(PageEffect::LoggedOut {
            login_url: login_url.to_string(),
        });
    }

    fn render_blocked(&mut self, notice: &BlockNotice) {
        self.effects.push(PageEffect::Blocked(notice.clone()));
    }
}

impl Navigator for RecordingPage {
    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn navigate(&mut self, url: &str) {
        self.effects.push(PageEffect::Navigated { url: url.to_string() });
        self.url = url.to_string();
    }

    fn schedule_navigation(&mut self, url: &str, delay: Duration) {
        self.effects.push(PageEffect::Scheduled {
            url: url.to_string(),
            delay,
        });
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.effects.push(PageEffect::Confirmed {
            prompt: prompt.to_string(),
            answer: self.confirm_answer,
        });
        self.confirm_answer
    }

    fn push_history_entry(&mut self, url: &str) {
        self.effects.push(PageEffect::HistoryPushed { url: url.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_texts() {
        let notice = BlockNotice::redirecting("https://example.org/login.html");
        assert_eq!(notice.title(), "Authentication Required");
        assert_eq!(notice.detail(), Some("Redirecting to login page..."));

        let notice = BlockNotice::access_blocked("https://example.org/login.html");
        assert_eq!(notice.title(), "Access Blocked");
        assert!(notice.message().contains("expired"));
        assert_eq!(notice.detail(), None);
    }

    #[test]
    fn test_recording_page_navigation_updates_url() {
        let mut page = RecordingPage::at("https://example.org/a.html");
        page.navigate("https://example.org/b.html");
        assert_eq!(page.current_url(), "https://example.org/b.html");
        assert_eq!(
            page.effects(),
            &[PageEffect::Navigated { url: "https://example.org/b.html".into() }]
        );
    }

    #[test]
    fn test_recording_page_confirm_answer() {
        let mut page = RecordingPage::at("https://example.org/").answering(false);
        assert!(!page.confirm("Are you sure?"));
        assert_eq!(page.take_effects().len(), 1);
        assert!(page.effects().is_empty());
    }
}
