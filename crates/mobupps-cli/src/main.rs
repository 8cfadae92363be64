//! MobUpps dashboard CLI
//!
//! Terminal front end for the MobUpps similarity and prediction API. Provides:
//! - Similar-app search with a remembered history of recent searches
//! - Performance predictions from pasted or searched neighbor lists
//! - Live service metrics with snapshot export, and a health probe

mod render;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use mobupps_client::HttpClient;
use mobupps_core::config::{Config, Directories};
use mobupps_core::history::{self, FileHistory, HistoryStore};
use mobupps_core::poll::{self, PollUpdate};
use mobupps_core::predict::{PredictForm, PredictOrchestrator};
use mobupps_core::search::{SearchForm, SearchOrchestrator, TopK};
use mobupps_core::{BackendMetrics, Notice, health};
use mobupps_types::{AbArm, AppDescriptor, RefreshInterval};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// MobUpps dashboard CLI
#[derive(Parser)]
#[command(name = "mobupps")]
#[command(about = "MobUpps dashboard - similar apps, predictions and service metrics")]
#[command(version)]
#[command(after_help = "\
Examples:
  mobupps search --name \"Fitness Tracker Pro\" --category Health --top-k 10
  mobupps search --name \"Fitness Tracker Pro\" --predict
  mobupps predict --app-id app_123 --neighbors '[{\"app_id\": \"a\", \"similarity_score\": 0.9}]'
  mobupps predict --app-id app_123 --neighbors @neighbors.json --arm v2
  mobupps metrics                   Fetch one metrics snapshot
  mobupps metrics --interval 5s     Refresh every 5 seconds until Ctrl-C
  mobupps metrics --export          Save the snapshot as JSON
  mobupps health --watch            Probe backend health periodically
  mobupps history --clear           Forget recent searches

Environment:
  MOBUPPS_API_BASE_URL   Backend base URL (overridden by --api-url)
  RUST_LOG               Log filter, e.g. mobupps=debug
")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find apps similar to the one described
    Search(SearchArgs),

    /// Predict performance from a list of neighbor apps
    Predict(PredictArgs),

    /// Show service metrics
    Metrics {
        /// Refresh cadence: manual, 5s, 10s or 30s
        #[arg(long)]
        interval: Option<RefreshInterval>,

        /// Write the latest snapshot to the export directory on exit
        #[arg(long)]
        export: bool,
    },

    /// Check backend health
    Health {
        /// Keep probing every `healthPollSecs` until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// Show recent searches
    History {
        /// Forget all recent searches
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// App name
    #[arg(long)]
    name: String,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    pricing: Option<String>,

    /// Feature tag (repeatable)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Number of similar apps: 5 to 50 in steps of 5
    #[arg(long)]
    top_k: Option<u32>,

    #[arg(long)]
    partner_id: Option<String>,

    #[arg(long)]
    app_id: Option<String>,

    /// Also predict performance from the results
    #[arg(long)]
    predict: bool,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    app_id: String,

    #[arg(long)]
    app_name: Option<String>,

    /// Neighbor JSON array, or @path to read it from a file
    #[arg(long)]
    neighbors: String,

    /// A/B arm: v1 or v2
    #[arg(long, default_value_t = AbArm::V1)]
    arm: AbArm,

    /// Comma-separated features, e.g. "sharing, tracking"
    #[arg(long)]
    features: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    pricing: Option<String>,
}

/// Resolved settings shared by every command
struct AppContext {
    config: Config,
    dirs: Directories,
    client: HttpClient,
}

impl AppContext {
    fn load(cli: &Cli) -> Result<Self> {
        let dirs = Directories::new().context("Failed to resolve MobUpps directories")?;
        Self::with_dirs(cli, dirs)
    }

    fn with_dirs(cli: &Cli, dirs: Directories) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| dirs.config_file.clone());

        let mut config = Config::load(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        if let Some(url) = &cli.api_url {
            config.api_base_url.clone_from(url);
        }
        config.validate()?;

        let client = HttpClient::new(&config.api_base_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        debug!("Using MobUpps API at {}", client.base_url());

        Ok(Self {
            config,
            dirs,
            client,
        })
    }

    fn history(&self) -> FileHistory {
        FileHistory::new(&self.dirs.history_file)
    }
}

fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mobupps={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("mobupps-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        #[cfg(unix)]
        {
            let symlink_path = temp_dir.join("mobupps.log");
            let _ = std::fs::remove_file(&symlink_path);
            let _ = std::os::unix::fs::symlink(&log_path, &symlink_path);
        }

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();
    } else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let ctx = AppContext::load(&cli)?;

    match cli.command {
        Commands::Search(args) => run_search(&ctx, args).await,
        Commands::Predict(args) => run_predict(&ctx, args).await,
        Commands::Metrics { interval, export } => run_metrics(&ctx, interval, export).await,
        Commands::Health { watch } => run_health(&ctx, watch).await,
        Commands::History { clear } => run_history(&ctx, clear),
    }
}

/// Print a success notice and pass the value on, or fail with the notice.
fn announce<T>(notice: &Notice, outcome: mobupps_core::Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            eprintln!("{notice}");
            Ok(value)
        }
        Err(_) => bail!("{notice}"),
    }
}

async fn run_search(ctx: &AppContext, args: SearchArgs) -> Result<()> {
    let app = AppDescriptor {
        category: args.category,
        region: args.region,
        pricing: args.pricing,
        ..AppDescriptor::named(args.name)
    }
    .with_features(args.features);

    let top_k = match args.top_k {
        Some(k) => TopK::new(k)?,
        None => ctx.config.top_k(),
    };

    let form = SearchForm {
        partner_id: args.partner_id,
        app_id: args.app_id,
        ..SearchForm::new(app.clone()).with_top_k(top_k)
    };

    let orchestrator = SearchOrchestrator::new(&ctx.client, ctx.history());
    let outcome = orchestrator.submit(&form).await.value;
    let result = announce(&Notice::search(&outcome), outcome)?;
    render::search_result(&result);

    if args.predict {
        let predictor = PredictOrchestrator::new(&ctx.client);
        let outcome = predictor.predict_from_search(&result, Some(app)).await.value;
        let prediction = announce(&Notice::prediction(&outcome), outcome)?;
        println!();
        render::prediction(&prediction);
    }

    Ok(())
}

async fn run_predict(ctx: &AppContext, args: PredictArgs) -> Result<()> {
    let neighbors_json = match args.neighbors.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read neighbors from {path}"))?,
        None => args.neighbors,
    };

    let form = PredictForm {
        app_name: args.app_name,
        category: args.category,
        region: args.region,
        pricing: args.pricing,
        features: args.features,
        ..PredictForm::new(args.app_id, neighbors_json)
    }
    .with_arm(args.arm);

    let orchestrator = PredictOrchestrator::new(&ctx.client);
    let outcome = orchestrator.submit(&form).await.value;
    let prediction = announce(&Notice::prediction(&outcome), outcome)?;
    render::prediction(&prediction);

    Ok(())
}

async fn run_metrics(
    ctx: &AppContext,
    interval: Option<RefreshInterval>,
    export: bool,
) -> Result<()> {
    let interval = interval.unwrap_or(ctx.config.refresh_interval);
    let one_shot = interval.period().is_none();

    let (mut handle, task) = poll::spawn(BackendMetrics::new(ctx.client.clone()), interval);
    if !one_shot {
        eprintln!("Refreshing every {interval}, Ctrl-C to stop");
    }

    loop {
        tokio::select! {
            update = handle.next_update() => match update {
                Some(PollUpdate::Committed { token, snapshot }) => {
                    render::metrics(&snapshot, token);
                    if one_shot {
                        break;
                    }
                }
                Some(PollUpdate::Failed { error, .. }) => {
                    let notice = Notice::metrics_failed(&error);
                    if one_shot {
                        bail!("{notice}");
                    }
                    eprintln!("{notice}");
                }
                Some(PollUpdate::Discarded { token }) => {
                    debug!("Skipped stale metrics {token}");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop();

    if export {
        let dir = ctx.config.export_dir(&ctx.dirs);
        match handle.export(&dir)? {
            Some(path) => {
                eprintln!("{}", Notice::metrics_exported());
                println!("{}", path.display());
            }
            None => eprintln!("No metrics snapshot to export yet"),
        }
    }

    let _ = task.await;
    Ok(())
}

async fn run_health(ctx: &AppContext, watch: bool) -> Result<()> {
    if !watch {
        let status = health::check(&ctx.client).await;
        render::health(status.as_ref().ok());
        if let Err(e) = status {
            bail!("Health check failed: {}", e.user_message());
        }
        return Ok(());
    }

    let mut ticker = tokio::time::interval(ctx.config.health_poll());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = health::probe(&ctx.client).await;
                render::health(status.as_ref());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn run_history(ctx: &AppContext, clear: bool) -> Result<()> {
    let store = ctx.history();

    if clear {
        history::clear(&store)?;
        eprintln!("Search history cleared");
        return Ok(());
    }

    let entries = store.read()?;
    if entries.is_empty() {
        println!("No recent searches");
    } else {
        render::history(&entries);
    }
    Ok(())
}
