// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Tracing setup for the `pagegate` binary.
//!
//! Logs go to stderr so command output on stdout stays scriptable. The level
//! comes from `RUST_LOG` when set, otherwise `pagegate=warn`, or
//! `pagegate=debug` with `--verbose`:
//!
//! ```text
//! RUST_LOG=pagegate=info pagegate visit https://example.org/site/a.html
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pagegate=debug"
    } else {
        "pagegate=warn"
    }
}

pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to initialize tracing subscriber")
}
