// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Session events for the audit trail.

use chrono::Utc;

/// Something the guard did to, or found in, the session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login wrote a fresh record
    Created { role: String },
    /// A successful check slid the expiry window forward
    Renewed { role: String, age_ms: i64 },
    /// The record was older than the timeout
    Expired { age_ms: i64 },
    /// `loginTime` could not be parsed
    Malformed { login_time: String },
    /// A key was missing
    Absent { missing: String },
    /// The record was removed
    Cleared { reason: String },
    /// Navigation to the login page was scheduled
    RedirectScheduled { from: String, to: String, delay_ms: u64 },
    /// The post-login redirect target was used
    RedirectConsumed { target: String },
    /// A click on a protected link was cancelled
    LinkBlocked { href: String },
}

impl SessionEvent {
    /// Format event for audit log
    pub fn to_audit_string(&self) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        match self {
            SessionEvent::Created { role } => {
                format!("{} | SESSION_CREATED | role={}", timestamp, role)
            }
            SessionEvent::Renewed { role, age_ms } => {
                format!("{} | SESSION_RENEWED | role={} age_ms={}", timestamp, role, age_ms)
            }
            SessionEvent::Expired { age_ms } => {
                format!("{} | SESSION_EXPIRED | age_ms={}", timestamp, age_ms)
            }
            SessionEvent::Malformed { login_time } => {
                format!("{} | SESSION_MALFORMED | login_time={:?}", timestamp, login_time)
            }
            SessionEvent::Absent { missing } => {
                format!("{} | SESSION_ABSENT | missing={}", timestamp, missing)
            }
            SessionEvent::Cleared { reason } => {
                format!("{} | SESSION_CLEARED | reason={}", timestamp, reason)
            }
            SessionEvent::RedirectScheduled { from, to, delay_ms } => {
                format!(
                    "{} | REDIRECT_SCHEDULED | from={} to={} delay_ms={}",
                    timestamp, from, to, delay_ms
                )
            }
            SessionEvent::RedirectConsumed { target } => {
                format!("{} | REDIRECT_CONSUMED | target={}", timestamp, target)
            }
            SessionEvent::LinkBlocked { href } => {
                format!("{} | LINK_BLOCKED | href={}", timestamp, href)
            }
        }
    }
}
