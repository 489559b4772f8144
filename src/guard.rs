// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! The auth guard: one instance per page.
//!
//! ## State Machine
//!
//! ```text
//! Unchecked ──check ok──▶ Authenticated ──recheck ok──┐
//!     │                        │  ▲                   │
//!     │                        │  └───────────────────┘
//!     └──check failed──▶ Redirecting ◀──recheck failed
//! ```
//!
//! `Redirecting` is terminal for the page instance: once the redirect is
//! scheduled every further recheck is ignored, so a timer tick racing a
//! focus event cannot schedule a second navigation.
//!
//! ## Sliding Expiry
//!
//! Every successful [`AuthGuard::is_authenticated`] rewrites `loginTime` to
//! now. A session only lapses after `SESSION_TIMEOUT` without any check.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::links::{Anchor, LinkPolicy};
use crate::page::{AuthUi, BlockNotice, Navigator};
use crate::session::{
    evaluate, SessionEvent, SessionRecord, SessionSnapshot, SessionVerdict, LOGIN_TIME_KEY,
    REDIRECT_TARGET_KEY, SESSION_KEYS, USER_DATA_KEY, USER_ROLE_KEY,
};
use crate::store::KeyValueStore;

pub const LOGOUT_PROMPT: &str = "Are you sure you want to logout?";

/// Lifecycle of one page instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Unchecked,
    Authenticated,
    Redirecting,
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PageState::Redirecting)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Unchecked => write!(f, "UNCHECKED"),
            PageState::Authenticated => write!(f, "AUTHENTICATED"),
            PageState::Redirecting => write!(f, "REDIRECTING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Notice shown, navigation to the login page scheduled
    Scheduled,
    /// The current page is the login page; nothing done
    AlreadyOnLoginPage,
    /// A redirect was already scheduled by this page
    AlreadyRedirecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Allowed,
    /// Navigation cancelled, access-blocked notice shown
    Blocked,
}

/// Session gate for a single page.
///
/// `D` is the durable store holding the session record, `T` the transient
/// store holding the redirect target, `P` the page (UI and navigation).
pub struct AuthGuard<D, T, P, C = SystemClock> {
    config: GateConfig,
    durable: D,
    transient: T,
    page: P,
    clock: C,
    links: LinkPolicy,
    protected_links: HashSet<String>,
    state: PageState,
}

impl<D, T, P> AuthGuard<D, T, P, SystemClock>
where
    D: KeyValueStore,
    T: KeyValueStore,
    P: AuthUi + Navigator,
{
    pub fn new(config: GateConfig, durable: D, transient: T, page: P) -> Result<Self> {
        config.validate().context("Invalid gate configuration")?;
        let links = LinkPolicy::from_config(&config)?;
        Ok(Self {
            config,
            durable,
            transient,
            page,
            clock: SystemClock,
            links,
            protected_links: HashSet::new(),
            state: PageState::Unchecked,
        })
    }
}

impl<D, T, P, C> AuthGuard<D, T, P, C>
where
    D: KeyValueStore,
    T: KeyValueStore,
    P: AuthUi + Navigator,
    C: Clock,
{
    /// Swap the time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> AuthGuard<D, T, P, C2> {
        AuthGuard {
            config: self.config,
            durable: self.durable,
            transient: self.transient,
            page: self.page,
            clock,
            links: self.links,
            protected_links: self.protected_links,
            state: self.state,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn transient(&self) -> &T {
        &self.transient
    }

    // =========================================================================
    // Session checks
    // =========================================================================

    /// Check the stored session, renewing or clearing it as a side effect.
    pub fn is_authenticated(&self) -> bool {
        let snapshot = match SessionSnapshot::read(&self.durable) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("SESSION_READ_FAILED | error={:#}", e);
                return false;
            }
        };

        let now = self.clock.now_ms();
        match evaluate(&snapshot, now, self.config.session_timeout()) {
            SessionVerdict::Valid { age_ms } => {
                if let Err(e) = self.durable.set(LOGIN_TIME_KEY, &now.to_string()) {
                    tracing::warn!("SESSION_RENEW_FAILED | error={:#}", e);
                }
                let event = SessionEvent::Renewed {
                    role: snapshot.user_role.unwrap_or_default(),
                    age_ms,
                };
                tracing::debug!("{}", event.to_audit_string());
                true
            }
            SessionVerdict::Absent { missing } => {
                let event = SessionEvent::Absent {
                    missing: missing.to_string(),
                };
                tracing::debug!("{}", event.to_audit_string());
                false
            }
            SessionVerdict::Expired { age_ms } => {
                tracing::info!("{}", SessionEvent::Expired { age_ms }.to_audit_string());
                self.clear_quietly("expired");
                false
            }
            SessionVerdict::Malformed { login_time } => {
                tracing::warn!("{}", SessionEvent::Malformed { login_time }.to_audit_string());
                self.clear_quietly("malformed");
                false
            }
        }
    }

    /// Page-load routine.
    ///
    /// On success: logged-in UI, link protection, one history entry pushed
    /// so the back button stays on this page. On failure: the redirect flow.
    pub fn check_and_handle(&mut self, anchors: &[Anchor]) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        if !self.is_authenticated() {
            self.enforce_or_redirect();
            return false;
        }

        self.state = PageState::Authenticated;
        self.update_auth_ui();
        self.protect_all_links(anchors);
        let here = self.page.current_url();
        self.page.push_history_entry(&here);
        true
    }

    /// Periodic, focus and visibility re-check.
    pub fn recheck(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if self.is_authenticated() {
            self.state = PageState::Authenticated;
            true
        } else {
            self.enforce_or_redirect();
            false
        }
    }

    /// Back-button interception. Best effort: a history entry is pushed
    /// again either way, the redirect runs if the session is gone.
    pub fn on_history_back(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let authenticated = self.is_authenticated();
        let here = self.page.current_url();
        self.page.push_history_entry(&here);
        if !authenticated {
            self.enforce_or_redirect();
        }
        authenticated
    }

    /// Show the redirect notice and schedule navigation to the login page.
    pub fn enforce_or_redirect(&mut self) -> RedirectOutcome {
        if self.state.is_terminal() {
            return RedirectOutcome::AlreadyRedirecting;
        }

        let here = self.page.current_url();
        if self.config.is_login_page(&here) {
            tracing::debug!("Already on the login page, not redirecting");
            return RedirectOutcome::AlreadyOnLoginPage;
        }

        if let Err(e) = self.transient.set(REDIRECT_TARGET_KEY, &here) {
            tracing::warn!("REDIRECT_STASH_FAILED | url={} error={:#}", here, e);
        }

        let login = self.config.login_page_url.clone();
        let delay = self.config.redirect_delay();
        self.page.render_blocked(&BlockNotice::redirecting(&login));
        self.page.schedule_navigation(&login, delay);
        self.state = PageState::Redirecting;

        let event = SessionEvent::RedirectScheduled {
            from: here,
            to: login,
            delay_ms: self.config.redirect_delay_ms,
        };
        tracing::info!("{}", event.to_audit_string());

        RedirectOutcome::Scheduled
    }

    // =========================================================================
    // UI
    // =========================================================================

    /// Show "Logout (role)" or "Login" depending on session presence.
    /// Presence only: neither renews nor expires the session.
    pub fn update_auth_ui(&mut self) {
        let snapshot = SessionSnapshot::read(&self.durable).unwrap_or_default();
        match snapshot.display_role() {
            Some(role) => self.page.render_logged_in(role),
            None => self.page.render_logged_out(&self.config.login_page_url),
        }
    }

    /// Register click-time checks for every same-site anchor.
    ///
    /// Returns how many anchors were protected.
    pub fn protect_all_links(&mut self, anchors: &[Anchor]) -> usize {
        let here = self.page.current_url();
        let mut protected = 0;
        for anchor in anchors {
            if !self.links.classify(anchor, &here).is_protected() {
                continue;
            }
            if let Some(href) = &anchor.href {
                self.protected_links.insert(href.trim().to_string());
                protected += 1;
            }
        }
        tracing::debug!("Protected {} of {} links", protected, anchors.len());
        protected
    }

    pub fn is_link_protected(&self, href: &str) -> bool {
        self.protected_links.contains(href.trim())
    }

    /// Click on an anchor. Protected links re-run the session check.
    pub fn on_link_click(&mut self, href: &str) -> ClickOutcome {
        if !self.is_link_protected(href) {
            return ClickOutcome::Allowed;
        }
        if self.is_authenticated() {
            return ClickOutcome::Allowed;
        }

        self.page
            .render_blocked(&BlockNotice::access_blocked(&self.config.login_page_url));
        let event = SessionEvent::LinkBlocked {
            href: href.to_string(),
        };
        tracing::info!("{}", event.to_audit_string());
        ClickOutcome::Blocked
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Start a fresh session. Called by the login page after a successful
    /// credential check.
    pub fn login(&mut self, role: &str, user_data: Value) -> Result<()> {
        let record = SessionRecord::new(role, user_data, self.clock.now_ms());
        record
            .write_to(&self.durable)
            .context("Failed to write session record")?;

        tracing::info!(
            "{}",
            SessionEvent::Created {
                role: record.role
            }
            .to_audit_string()
        );
        Ok(())
    }

    /// Ask for confirmation, then clear the session and go to the login page.
    ///
    /// Returns whether the visitor confirmed.
    pub fn logout(&mut self) -> Result<bool> {
        if !self.page.confirm(LOGOUT_PROMPT) {
            return Ok(false);
        }
        self.clear_session("logout")?;
        let login = self.config.login_page_url.clone();
        self.page.navigate(&login);
        self.state = PageState::Redirecting;
        Ok(true)
    }

    /// Remove all four session keys.
    pub fn clear_session(&self, reason: &str) -> Result<()> {
        self.durable
            .remove_all(&SESSION_KEYS)
            .context("Failed to clear session record")?;
        let event = SessionEvent::Cleared {
            reason: reason.to_string(),
        };
        tracing::info!("{}", event.to_audit_string());
        Ok(())
    }

    fn clear_quietly(&self, reason: &str) {
        if let Err(e) = self.clear_session(reason) {
            tracing::warn!("SESSION_CLEAR_FAILED | reason={} error={:#}", reason, e);
        }
    }

    /// Stored role, without any expiry check.
    pub fn role(&self) -> Option<String> {
        self.durable
            .get(USER_ROLE_KEY)
            .ok()
            .flatten()
            .filter(|r| !r.is_empty())
    }

    /// Stored user data, `None` when absent or not valid JSON.
    pub fn user_data(&self) -> Option<Value> {
        let raw = self.durable.get(USER_DATA_KEY).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Stored user data is not valid JSON: {}", e);
                None
            }
        }
    }

    // =========================================================================
    // Redirect target
    // =========================================================================

    /// Take the stashed redirect target, falling back to the home page.
    ///
    /// The slot is always emptied. A stash that does not resolve to a URL,
    /// or resolves to the login page, is discarded so login never redirects
    /// back to itself.
    pub fn consume_redirect_target(&mut self) -> String {
        let stashed = match self.transient.get(REDIRECT_TARGET_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("REDIRECT_READ_FAILED | error={:#}", e);
                None
            }
        };
        if stashed.is_some() {
            if let Err(e) = self.transient.remove(REDIRECT_TARGET_KEY) {
                tracing::warn!("REDIRECT_CLEAR_FAILED | error={:#}", e);
            }
        }

        let target = match stashed {
            Some(url)
                if !url.trim().is_empty()
                    && self.config.resolve_page(&url).is_some()
                    && !self.config.is_login_page(&url) =>
            {
                url
            }
            _ => self.config.home_page_url.clone(),
        };

        tracing::info!(
            "{}",
            SessionEvent::RedirectConsumed {
                target: target.clone()
            }
            .to_audit_string()
        );
        target
    }

    /// Consume the redirect target and navigate there.
    pub fn redirect_to_original_page(&mut self) -> String {
        let target = self.consume_redirect_target();
        self.page.navigate(&target);
        target
    }
}
