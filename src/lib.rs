// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! pagegate - client-side session gate for static multi-page sites
//!
//! Every protected page runs an [`AuthGuard`]. The guard reads a session
//! record from a durable key-value store, slides its expiry forward on
//! every successful check, and sends visitors without a live session to
//! the login page, remembering where they were headed.
//!
//! There is no server and no token: whoever can write the store can log
//! in. The gate keeps honest visitors on the happy path and nothing more.
//!
//! # Core Modules
//!
//! - [`guard`] - the per-page guard and its state machine
//! - [`session`] - storage schema and the pure expiry decision
//! - [`monitor`] - interval, focus, visibility, history and click triggers
//! - [`links`] - same-origin link classification
//! - [`page`] - UI and navigation boundary, plus a recording test double
//! - [`store`] - durable/transient key-value stores (memory, file)
//! - [`config`] - gate options and the JSON config file
//! - [`console`] - terminal page used by the CLI
//!
//! # Example
//!
//! ```
//! use pagegate::{AuthGuard, GateConfig, MemoryStore, RecordingPage};
//!
//! let config = GateConfig::for_site("https://example.org/site/").unwrap();
//! let local = MemoryStore::new();
//!
//! // Login page: credentials were accepted
//! let mut login = AuthGuard::new(
//!     config.clone(),
//!     local.clone(),
//!     MemoryStore::new(),
//!     RecordingPage::at("https://example.org/site/login.html"),
//! ).unwrap();
//! login.login("student", serde_json::json!({ "name": "Ravi" })).unwrap();
//!
//! // Any other page of the site
//! let mut page = AuthGuard::new(
//!     config,
//!     local,
//!     MemoryStore::new(),
//!     RecordingPage::at("https://example.org/site/courses.html"),
//! ).unwrap();
//! assert!(page.check_and_handle(&[]));
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod guard;
pub mod links;
pub mod logging;
pub mod monitor;
pub mod page;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config_from, save_config_to, GateConfig};
pub use guard::{AuthGuard, ClickOutcome, PageState, RedirectOutcome};
pub use links::{Anchor, LinkKind, LinkPolicy};
pub use monitor::{PageMonitor, Trigger, TriggerOutcome};
pub use page::{AuthUi, BlockNotice, Navigator, NoticeKind, PageEffect, RecordingPage};
pub use session::{evaluate, SessionEvent, SessionRecord, SessionSnapshot, SessionVerdict};
pub use store::{FileStore, KeyValueStore, MemoryStore};
