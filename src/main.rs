// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use pagegate::config::{self, GateConfig};
use pagegate::console::ConsolePage;
use pagegate::error::ErrorBuilder;
use pagegate::{
    Anchor, AuthGuard, ClickOutcome, FileStore, Navigator, PageMonitor, PageState, Trigger,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// No live session (status), or the page redirected (visit)
    pub const NOT_AUTHENTICATED: i32 = 1;
    /// Internal software error - unexpected condition
    pub const SOFTWARE: i32 = 70;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

type ConsoleGuard = AuthGuard<FileStore, FileStore, ConsolePage>;

/// pagegate - session gate for static multi-page sites.
#[derive(Parser)]
#[command(name = "pagegate")]
#[command(version = VERSION)]
#[command(about = "Session gate for static multi-page sites, driven from the terminal.")]
#[command(long_about = "pagegate - session gate for static multi-page sites\n\n\
    Log in:              pagegate login student\n\
    Check the session:   pagegate status\n\
    Open a page:         pagegate visit https://example.org/site/courses.html\n\
    Back after login:    pagegate return\n\
    Log out:             pagegate logout\n\n\
    The session lives in ~/.pagegate/local_storage.json and slides forward on every check.")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.pagegate/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the session stores (defaults to ~/.pagegate)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Verbose mode: debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session, as the login page does after accepting credentials
    ///
    /// Examples:
    ///   pagegate login student
    ///   pagegate login admin --data '{"name":"Asha"}' --return
    Login {
        /// Role to store with the session
        role: String,
        /// User data as a JSON object
        #[arg(short, long)]
        data: Option<String>,
        /// Go back to the page that sent you to the login page
        #[arg(long = "return")]
        return_to_origin: bool,
    },

    /// Clear the session and go to the login page
    Logout {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Check (and renew) the session. Exit code 1 when logged out.
    Status,

    /// Show the stored role and user data without renewing the session
    Whoami,

    /// Load a protected page and run its checks
    ///
    /// Examples:
    ///   pagegate visit https://example.org/site/courses.html
    ///   pagegate visit https://example.org/site/a.html --link b.html --click b.html
    ///   pagegate visit https://example.org/site/a.html --watch 120
    Visit {
        /// Page URL
        url: String,
        /// Anchor hrefs present on the page
        #[arg(long = "link")]
        links: Vec<String>,
        /// Click one of the anchors after loading
        #[arg(long)]
        click: Option<String>,
        /// Keep the page open for this many seconds, re-checking on the interval
        #[arg(long)]
        watch: Option<u64>,
    },

    /// Consume the post-login redirect target
    Return,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the active configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a config file for a site
    ///
    /// Example:
    ///   pagegate config init https://example.org/site/
    Init {
        /// Site base URL; login.html and index.html are resolved against it
        site: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = pagegate::logging::init(cli.verbose) {
        eprintln!("{} {}", "[!]".yellow(), e);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", ErrorBuilder::new("pagegate failed").causes_from(&e));
            SOFTWARE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };

    let command = match cli.command {
        Commands::Config { command } => return handle_config(command.as_ref(), &config_path),
        other => other,
    };

    let config = match config::load_config_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            let message = ErrorBuilder::new("Could not load configuration")
                .causes_from(&e)
                .fix(format!("Fix or remove {}", config_path.display()))
                .fix("Write a fresh one: pagegate config init <SITE_URL> --force");
            eprintln!("{}", message);
            return Ok(CONFIG);
        }
    };
    let stores = StorePaths::resolve(cli.store_dir)?;

    match command {
        Commands::Login {
            role,
            data,
            return_to_origin,
        } => handle_login(&config, &stores, &role, data.as_deref(), return_to_origin),
        Commands::Logout { yes } => handle_logout(&config, &stores, yes),
        Commands::Status => handle_status(&config, &stores),
        Commands::Whoami => handle_whoami(&config, &stores),
        Commands::Visit {
            url,
            links,
            click,
            watch,
        } => handle_visit(&config, &stores, &url, &links, click.as_deref(), watch),
        Commands::Return => handle_return(&config, &stores),
        Commands::Config { command } => handle_config(command.as_ref(), &config_path),
    }
}

/// Where the two session stores live.
///
/// The durable store survives restarts, like the browser's local storage.
/// The transient store sits in the temp directory so a reboot forgets it,
/// unless `--store-dir` puts both side by side.
struct StorePaths {
    durable: PathBuf,
    transient: PathBuf,
}

impl StorePaths {
    fn resolve(store_dir: Option<PathBuf>) -> Result<Self> {
        Ok(match store_dir {
            Some(dir) => Self {
                durable: dir.join("local_storage.json"),
                transient: dir.join("session_storage.json"),
            },
            None => Self {
                durable: config::config_dir()?.join("local_storage.json"),
                transient: std::env::temp_dir()
                    .join("pagegate")
                    .join("session_storage.json"),
            },
        })
    }

    fn open_guard(&self, config: &GateConfig, page: ConsolePage) -> Result<ConsoleGuard> {
        AuthGuard::new(
            config.clone(),
            FileStore::new(&self.durable),
            FileStore::new(&self.transient),
            page,
        )
    }
}

fn handle_login(
    config: &GateConfig,
    stores: &StorePaths,
    role: &str,
    data: Option<&str>,
    return_to_origin: bool,
) -> Result<i32> {
    let user_data = match data {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
        None => serde_json::json!({}),
    };

    let mut guard = stores.open_guard(config, ConsolePage::at(&config.login_page_url))?;
    guard.login(role, user_data)?;
    println!("{} Logged in as {}", "[OK]".green(), role.bold());

    if return_to_origin {
        guard.redirect_to_original_page();
    }
    Ok(SUCCESS)
}

fn handle_logout(config: &GateConfig, stores: &StorePaths, yes: bool) -> Result<i32> {
    let page = ConsolePage::at(&config.home_page_url).assume_yes(yes);
    let mut guard = stores.open_guard(config, page)?;

    if guard.logout()? {
        println!("{} Logged out", "[OK]".green());
    } else {
        println!("{} Logout cancelled", "[!]".yellow());
    }
    Ok(SUCCESS)
}

fn handle_status(config: &GateConfig, stores: &StorePaths) -> Result<i32> {
    let guard = stores.open_guard(config, ConsolePage::at(&config.home_page_url))?;

    if guard.is_authenticated() {
        let role = guard.role().unwrap_or_default();
        let hours = config.session_timeout().as_secs() / 3600;
        println!("{} Logged in as {}", "[OK]".green(), role.bold());
        println!("    Session renewed; expires after {}h without a check", hours);
        Ok(SUCCESS)
    } else {
        println!("{} Not logged in", "[X]".red());
        Ok(NOT_AUTHENTICATED)
    }
}

fn handle_whoami(config: &GateConfig, stores: &StorePaths) -> Result<i32> {
    let guard = stores.open_guard(config, ConsolePage::at(&config.home_page_url))?;

    match guard.role() {
        Some(role) => {
            println!("Role: {}", role.bold());
            if let Some(data) = guard.user_data() {
                println!("Data: {}", serde_json::to_string_pretty(&data)?);
            }
            Ok(SUCCESS)
        }
        None => {
            println!("{} No session stored", "[X]".red());
            Ok(NOT_AUTHENTICATED)
        }
    }
}

fn handle_visit(
    config: &GateConfig,
    stores: &StorePaths,
    url: &str,
    links: &[String],
    click: Option<&str>,
    watch: Option<u64>,
) -> Result<i32> {
    let guard = stores.open_guard(config, ConsolePage::at(url))?;
    let anchors: Vec<Anchor> = links.iter().map(Anchor::new).collect();

    let mut monitor = PageMonitor::new(guard);
    println!("{} {}", "Loading".bold(), url);
    monitor.load(&anchors);

    if let Some(href) = click {
        if monitor.state() == PageState::Authenticated {
            match monitor.guard_mut().on_link_click(href) {
                ClickOutcome::Allowed => monitor.guard_mut().page_mut().navigate(href),
                ClickOutcome::Blocked => {}
            }
        }
    }

    if let Some(secs) = watch {
        if monitor.state() != PageState::Redirecting {
            let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            runtime.block_on(watch_page(&mut monitor, Duration::from_secs(secs)));
        }
    }

    if monitor.state() == PageState::Redirecting {
        let page = monitor.guard_mut().page_mut();
        if let Some((_, delay)) = page.pending_navigation() {
            std::thread::sleep(delay);
        }
        page.follow_pending();
        return Ok(NOT_AUTHENTICATED);
    }
    Ok(SUCCESS)
}

/// Keep the page open for `duration`, or until Ctrl+C or a redirect.
async fn watch_page(
    monitor: &mut PageMonitor<FileStore, FileStore, ConsolePage>,
    duration: Duration,
) {
    let (tx, rx) = mpsc::channel::<Trigger>(16);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        drop(tx);
    });

    let state = monitor.watch(rx).await;
    tracing::debug!("Watch finished in state {} after {} checks", state, monitor.checks());
}

fn handle_return(config: &GateConfig, stores: &StorePaths) -> Result<i32> {
    let mut guard = stores.open_guard(config, ConsolePage::at(&config.login_page_url))?;
    let target = guard.consume_redirect_target();
    println!("{}", target);
    Ok(SUCCESS)
}

fn handle_config(command: Option<&ConfigCommands>, path: &Path) -> Result<i32> {
    match command.unwrap_or(&ConfigCommands::Show) {
        ConfigCommands::Show => {
            let config = match config::load_config_from(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "{}",
                        ErrorBuilder::new("Could not load configuration").causes_from(&e)
                    );
                    return Ok(CONFIG);
                }
            };
            println!("{}", format!("# {}", path.display()).dimmed());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Init { site, force } => {
            if path.exists() && !force {
                eprintln!(
                    "{} {} already exists (use --force to overwrite)",
                    "[!]".yellow(),
                    path.display()
                );
                return Ok(CONFIG);
            }
            let config = GateConfig::for_site(site)?;
            config.validate()?;
            config::save_config_to(path, &config)?;
            println!("{} Wrote {}", "[OK]".green(), path.display());
        }
    }
    Ok(SUCCESS)
}
