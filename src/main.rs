//! HydraReminder - a background stand-up / drink-water reminder
//!
//! Counts down a configurable interval, then alerts until reset:
//! - from the menu (stdin in the terminal front end)
//! - with the global reset hotkey
//! - by opening the menu while alerting

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;

use hydra_reminder::cli::{
    AutostartAction, Cli, Commands, ConfigAction, Display, InputLine, TerminalIndicator,
};
use hydra_reminder::{
    AppOptions, AutostartEntry, ConfigStore, Flow, PlatformBackend, ReminderApp, ReminderConfig,
};

type App = ReminderApp<TerminalIndicator, PlatformBackend>;

/// Main entry point
#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let store = ConfigStore::resolve(cli.config).context("設定ファイルの場所を決定できません")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(store).await?,
        Commands::Config { action } => config_command(&store, action)?,
        Commands::Autostart { action } => autostart_command(&store, action)?,
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

// ============================================================================
// run
// ============================================================================

async fn run(store: ConfigStore) -> Result<()> {
    let config = store.load_or_default();
    let mut options = AppOptions::new(config).with_store(store);
    match AutostartEntry::for_current_host() {
        Ok(entry) => options = options.with_autostart(entry),
        Err(err) => tracing::warn!(error = %err, "自動起動を利用できません"),
    }

    let app: Arc<App> = Arc::new(ReminderApp::new(
        Handle::current(),
        PlatformBackend::new(),
        TerminalIndicator::new,
        options,
    )?);
    blocking(&app, |app| app.start()).await??;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if dispatch(&app, &line).await? == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!("標準入力が閉じられました。Ctrl-C で終了します");
                    stdin_open = false;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "標準入力を読み取れません");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl-C を受信しました");
                break;
            }
        }
    }

    blocking(&app, |app| app.shutdown()).await?;
    Ok(())
}

/// Handles one stdin line. Action errors are reported and do not end the run.
async fn dispatch(app: &Arc<App>, line: &str) -> Result<Flow> {
    match line.parse::<InputLine>() {
        Ok(InputLine::Blank) => {}
        Ok(InputLine::Help) => Display::show_help(),
        Ok(InputLine::Status) => Display::show_status(&app.status()),
        Ok(InputLine::Action(action)) => match blocking(app, move |app| app.handle(action)).await? {
            Ok(flow) => return Ok(flow),
            Err(err) => Display::show_error(&format!("{err:#}")),
        },
        Err(err) => Display::show_error(&err.to_string()),
    }
    Ok(Flow::Continue)
}

/// Runs an app call that may block (hotkey handshake, queue backpressure)
/// off the async worker.
async fn blocking<T, F>(app: &Arc<App>, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&App) -> T + Send + 'static,
{
    let app = Arc::clone(app);
    tokio::task::spawn_blocking(move || call(&app))
        .await
        .context("バックグラウンド処理が異常終了しました")
}

// ============================================================================
// config / autostart
// ============================================================================

fn config_command(store: &ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = store.load()?;
            println!("{}", Display::render_config(&config, store.path()));
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Reset => {
            store.save(&ReminderConfig::default())?;
            println!("* 設定を初期値に戻しました");
            println!("  {}", store.path().display());
        }
    }
    Ok(())
}

fn autostart_command(store: &ConfigStore, action: AutostartAction) -> Result<()> {
    let entry = AutostartEntry::for_current_host()?;
    let enabled = match action {
        AutostartAction::Enable => {
            entry.enable()?;
            true
        }
        AutostartAction::Disable => {
            entry.disable()?;
            false
        }
        AutostartAction::Status => entry.is_enabled()?,
    };

    if action != AutostartAction::Status {
        let mut config = store.load_or_default();
        config.autostart = enabled;
        store.save(&config)?;
    }
    Display::show_autostart(enabled, entry.path());
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
