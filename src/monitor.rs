// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Re-check scheduling for a loaded page.
//!
//! The guard itself only knows how to check. [`PageMonitor`] owns it for the
//! life of the page and turns events into checks:
//!
//! - the recurring `AUTH_CHECK_INTERVAL` timer
//! - window focus
//! - visibility changes (only when the page becomes visible)
//! - back-button navigation
//! - clicks on protected links
//!
//! Events arrive either one at a time through [`PageMonitor::handle`] or as
//! a channel consumed by [`PageMonitor::watch`], which also runs the timer.

use std::fmt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::guard::{AuthGuard, ClickOutcome, PageState};
use crate::links::Anchor;
use crate::page::{AuthUi, Navigator};
use crate::store::KeyValueStore;

/// Something that makes the page re-check its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Interval,
    Focus,
    VisibilityChange { hidden: bool },
    HistoryBack,
    LinkClick { href: String },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval => write!(f, "interval"),
            Trigger::Focus => write!(f, "focus"),
            Trigger::VisibilityChange { hidden } => write!(f, "visibility(hidden={})", hidden),
            Trigger::HistoryBack => write!(f, "history-back"),
            Trigger::LinkClick { href } => write!(f, "link-click({})", href),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Session still valid (and renewed)
    Authenticated,
    /// Check failed, redirect scheduled
    Redirecting,
    /// Nothing checked: page already redirecting, or page hidden
    Ignored,
    Click(ClickOutcome),
}

pub struct PageMonitor<D, T, P, C = SystemClock> {
    guard: AuthGuard<D, T, P, C>,
    checks: u64,
}

impl<D, T, P, C> PageMonitor<D, T, P, C>
where
    D: KeyValueStore,
    T: KeyValueStore,
    P: AuthUi + Navigator,
    C: Clock,
{
    pub fn new(guard: AuthGuard<D, T, P, C>) -> Self {
        Self { guard, checks: 0 }
    }

    pub fn guard(&self) -> &AuthGuard<D, T, P, C> {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut AuthGuard<D, T, P, C> {
        &mut self.guard
    }

    pub fn into_guard(self) -> AuthGuard<D, T, P, C> {
        self.guard
    }

    pub fn state(&self) -> PageState {
        self.guard.state()
    }

    /// Number of session checks run by triggers (page load excluded).
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Page load.
    pub fn load(&mut self, anchors: &[Anchor]) -> bool {
        tracing::debug!("PAGE_LOAD | url={}", self.guard.page().current_url());
        self.guard.check_and_handle(anchors)
    }

    pub fn handle(&mut self, trigger: Trigger) -> TriggerOutcome {
        if self.guard.state().is_terminal() {
            return TriggerOutcome::Ignored;
        }
        if let Trigger::VisibilityChange { hidden: true } = trigger {
            return TriggerOutcome::Ignored;
        }

        let label = trigger.to_string();
        tracing::debug!("CHECK_TRIGGERED | trigger={}", label);
        self.checks += 1;

        let authenticated = match trigger {
            Trigger::LinkClick { href } => {
                return TriggerOutcome::Click(self.guard.on_link_click(&href));
            }
            Trigger::HistoryBack => self.guard.on_history_back(),
            Trigger::Interval | Trigger::Focus | Trigger::VisibilityChange { .. } => {
                self.guard.recheck()
            }
        };

        if authenticated {
            TriggerOutcome::Authenticated
        } else {
            tracing::info!("Session check failed on {}, redirecting", label);
            TriggerOutcome::Redirecting
        }
    }

    /// Run the interval timer and consume `events` until the page starts
    /// redirecting or the event source closes (page unloaded).
    ///
    /// The first timer check happens one full interval after the call.
    pub async fn watch(&mut self, mut events: mpsc::Receiver<Trigger>) -> PageState {
        let period = self.guard.config().auth_check_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.guard.state().is_terminal() {
            tokio::select! {
                _ = ticker.tick() => {
                    self.handle(Trigger::Interval);
                }
                event = events.recv() => match event {
                    Some(trigger) => {
                        self.handle(trigger);
                    }
                    None => {
                        tracing::debug!("Trigger source closed, stopping monitor");
                        break;
                    }
                },
            }
        }

        self.guard.state()
    }
}
