//! End-to-end session flows across several guarded pages.
//!
//! Each test wires pages together through shared stores, the way the pages
//! of one site share the browser's storage.

use pagegate::session::{LOGIN_TIME_KEY, REDIRECT_TARGET_KEY, SESSION_KEYS};
use pagegate::{
    AuthGuard, FileStore, GateConfig, KeyValueStore, ManualClock, MemoryStore, NoticeKind,
    PageState, RecordingPage,
};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 3_600_000;

const SITE: &str = "https://example.org/site/";
const COURSES: &str = "https://example.org/site/courses.html";
const LOGIN: &str = "https://example.org/site/login.html";
const HOME: &str = "https://example.org/site/index.html";

fn config() -> GateConfig {
    GateConfig::for_site(SITE).unwrap()
}

fn page<D, T>(
    url: &str,
    durable: D,
    transient: T,
    clock: &ManualClock,
) -> AuthGuard<D, T, RecordingPage, ManualClock>
where
    D: KeyValueStore,
    T: KeyValueStore,
{
    AuthGuard::new(config(), durable, transient, RecordingPage::at(url))
        .unwrap()
        .with_clock(clock.clone())
}

fn seed_session(store: &MemoryStore, login_time: i64) {
    store.set("isLoggedIn", "true").unwrap();
    store.set("loginTime", &login_time.to_string()).unwrap();
    store.set("userRole", "student").unwrap();
    store.set("userData", r#"{"name":"Ravi"}"#).unwrap();
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn test_session_older_than_timeout_is_cleared() {
    let local = MemoryStore::new();
    let clock = ManualClock::at(NOW);
    seed_session(&local, NOW - 121 * HOUR_MS);

    let guard = page(COURSES, local.clone(), MemoryStore::new(), &clock);

    assert!(!guard.is_authenticated());
    for key in SESSION_KEYS {
        assert_eq!(local.get(key).unwrap(), None, "{} should be cleared", key);
    }
}

#[test]
fn test_recent_session_is_renewed_to_now() {
    let local = MemoryStore::new();
    let clock = ManualClock::at(NOW);
    seed_session(&local, NOW - HOUR_MS);

    let guard = page(COURSES, local.clone(), MemoryStore::new(), &clock);

    assert!(guard.is_authenticated());
    assert_eq!(local.get(LOGIN_TIME_KEY).unwrap(), Some(NOW.to_string()));
}

#[test]
fn test_missing_any_key_means_logged_out() {
    for missing in SESSION_KEYS {
        let local = MemoryStore::new();
        seed_session(&local, NOW - HOUR_MS);
        local.remove(missing).unwrap();

        let guard = page(COURSES, local, MemoryStore::new(), &ManualClock::at(NOW));
        assert!(!guard.is_authenticated(), "missing {} still authenticated", missing);
    }
}

#[test]
fn test_activity_keeps_session_alive_past_timeout() {
    let local = MemoryStore::new();
    let clock = ManualClock::at(NOW);
    let mut login = page(LOGIN, local.clone(), MemoryStore::new(), &clock);
    login.login("student", json!({})).unwrap();

    // A check every four days: never 120h idle, so the session lives on
    for _ in 0..5 {
        clock.advance(Duration::from_secs(96 * 3600));
        let guard = page(COURSES, local.clone(), MemoryStore::new(), &clock);
        assert!(guard.is_authenticated());
    }

    clock.advance(Duration::from_secs(121 * 3600));
    let guard = page(COURSES, local.clone(), MemoryStore::new(), &clock);
    assert!(!guard.is_authenticated());
}

// =============================================================================
// Login and redirect target
// =============================================================================

#[test]
fn test_login_then_check_has_zero_age() {
    let local = MemoryStore::new();
    let clock = ManualClock::at(NOW);

    let mut login = page(LOGIN, local.clone(), MemoryStore::new(), &clock);
    login.login("admin", json!({ "name": "Asha" })).unwrap();

    let guard = page(COURSES, local.clone(), MemoryStore::new(), &clock);
    assert!(guard.is_authenticated());
    assert_eq!(local.get(LOGIN_TIME_KEY).unwrap(), Some(NOW.to_string()));
    assert_eq!(guard.role().as_deref(), Some("admin"));
    assert_eq!(guard.user_data(), Some(json!({ "name": "Asha" })));
}

#[test]
fn test_unauthenticated_visit_stashes_target_and_schedules_login() {
    let session = MemoryStore::new();
    let mut guard = page(COURSES, MemoryStore::new(), session.clone(), &ManualClock::at(NOW));

    assert!(!guard.check_and_handle(&[]));
    assert_eq!(guard.state(), PageState::Redirecting);
    assert_eq!(session.get(REDIRECT_TARGET_KEY).unwrap().as_deref(), Some(COURSES));
    assert_eq!(guard.page().scheduled(), vec![(LOGIN, Duration::from_millis(3000))]);
    assert_eq!(
        guard.page().last_notice().map(|n| n.kind),
        Some(NoticeKind::Redirecting)
    );
}

#[test]
fn test_redirect_target_consumed_once() {
    let session = MemoryStore::new();
    session.set(REDIRECT_TARGET_KEY, COURSES).unwrap();

    let mut login = page(LOGIN, MemoryStore::new(), session, &ManualClock::at(NOW));
    assert_eq!(login.consume_redirect_target(), COURSES);
    assert_eq!(login.consume_redirect_target(), HOME);
}

#[test]
fn test_redirect_target_never_points_at_login() {
    let session = MemoryStore::new();
    session
        .set(REDIRECT_TARGET_KEY, "https://example.org/site/login.html#again")
        .unwrap();

    let mut login = page(LOGIN, MemoryStore::new(), session.clone(), &ManualClock::at(NOW));
    assert_eq!(login.consume_redirect_target(), HOME);
    assert_eq!(session.get(REDIRECT_TARGET_KEY).unwrap(), None);
}

// =============================================================================
// File-backed stores
// =============================================================================

#[test]
fn test_round_trip_through_login_page_with_file_stores() {
    let dir = TempDir::new().unwrap();
    let local_path = dir.path().join("local_storage.json");
    let session_path = dir.path().join("session_storage.json");
    let clock = ManualClock::at(NOW);

    // Visitor lands on a protected page without a session
    let mut courses = page(
        COURSES,
        FileStore::new(&local_path),
        FileStore::new(&session_path),
        &clock,
    );
    assert!(!courses.check_and_handle(&[]));

    // Login page accepts the credentials and sends them back
    let mut login = page(
        LOGIN,
        FileStore::new(&local_path),
        FileStore::new(&session_path),
        &clock,
    );
    login.login("student", json!({ "name": "Ravi" })).unwrap();
    assert_eq!(login.redirect_to_original_page(), COURSES);

    // The protected page now loads, and nothing is left stashed
    clock.advance(Duration::from_secs(60));
    let mut courses = page(
        COURSES,
        FileStore::new(&local_path),
        FileStore::new(&session_path),
        &clock,
    );
    assert!(courses.check_and_handle(&[]));
    assert_eq!(courses.state(), PageState::Authenticated);
    assert_eq!(
        FileStore::new(&session_path).get(REDIRECT_TARGET_KEY).unwrap(),
        None
    );
    assert_eq!(
        FileStore::new(&local_path).get(LOGIN_TIME_KEY).unwrap(),
        Some((NOW + 60_000).to_string())
    );
}

#[test]
fn test_logout_on_one_page_blocks_links_on_another() {
    let dir = TempDir::new().unwrap();
    let local_path = dir.path().join("local_storage.json");
    let clock = ManualClock::at(NOW);

    let mut login = page(LOGIN, FileStore::new(&local_path), MemoryStore::new(), &clock);
    login.login("student", json!({})).unwrap();

    let mut courses = page(COURSES, FileStore::new(&local_path), MemoryStore::new(), &clock);
    assert!(courses.check_and_handle(&[pagegate::Anchor::new("lesson.html")]));

    let mut home = page(HOME, FileStore::new(&local_path), MemoryStore::new(), &clock);
    assert!(home.logout().unwrap());

    assert_eq!(
        courses.on_link_click("lesson.html"),
        pagegate::ClickOutcome::Blocked
    );
    assert_eq!(
        courses.page().last_notice().map(|n| n.kind),
        Some(NoticeKind::AccessBlocked)
    );
}
