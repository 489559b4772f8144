// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Terminal rendition of a guarded page, used by the `pagegate` binary.

use colored::Colorize;
use inquire::Confirm;
use std::time::Duration;

use crate::page::{AuthUi, BlockNotice, Navigator, NoticeKind};

pub struct ConsolePage {
    url: String,
    assume_yes: bool,
    pending: Option<(String, Duration)>,
}

impl ConsolePage {
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            assume_yes: false,
            pending: None,
        }
    }

    /// Answer every confirmation with yes instead of prompting.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Navigation scheduled by the guard and not yet carried out.
    pub fn pending_navigation(&self) -> Option<(&str, Duration)> {
        self.pending.as_ref().map(|(url, delay)| (url.as_str(), *delay))
    }

    /// Carry out the scheduled navigation, if any.
    pub fn follow_pending(&mut self) -> Option<String> {
        let (url, _) = self.pending.take()?;
        self.navigate(&url);
        Some(url)
    }
}

impl AuthUi for ConsolePage {
    fn render_logged_in(&mut self, role: &str) {
        println!("{} {}", "[auth]".dimmed(), format!("Logout ({})", role).green());
    }

    fn render_logged_out(&mut self, login_url: &str) {
        println!("{} {} {}", "[auth]".dimmed(), "Login".yellow(), login_url.dimmed());
    }

    fn render_blocked(&mut self, notice: &BlockNotice) {
        let title = match notice.kind {
            NoticeKind::Redirecting => notice.title().yellow().bold(),
            NoticeKind::AccessBlocked => notice.title().red().bold(),
        };
        println!();
        println!("  {}", title);
        println!("  {}", notice.message());
        if let Some(detail) = notice.detail() {
            println!("  {}", detail.dimmed());
        }
        println!("  {}: {}", notice.action_label(), notice.login_url.cyan());
        println!();
    }
}

impl Navigator for ConsolePage {
    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn navigate(&mut self, url: &str) {
        println!("{} {}", "->".cyan(), url);
        self.url = url.to_string();
    }

    fn schedule_navigation(&mut self, url: &str, delay: Duration) {
        println!(
            "{} {} in {:.1}s",
            "->".cyan(),
            url,
            delay.as_secs_f64()
        );
        self.pending = Some((url.to_string(), delay));
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        match Confirm::new(prompt).with_default(false).prompt() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Confirmation prompt unavailable: {}", e);
                false
            }
        }
    }

    fn push_history_entry(&mut self, url: &str) {
        tracing::trace!("HISTORY_PUSH | url={}", url);
    }
}
