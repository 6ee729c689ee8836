//! nowcast - Solar nowcasting dashboard

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nowcast_core::analytics::{fields, BoundaryMode, MergedRecord};
use nowcast_core::{
    export_deltas_to_csv, export_deltas_to_json, export_records_to_csv, ApiClient,
    DashboardConfig, DataStore, LoadReport, RefreshOptions, TimePoint,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "nowcast",
    version,
    about = "Solar nowcasting dashboard",
    long_about = "Terminal dashboard comparing national and regional solar forecasts with\n\
                  PV live actuals.\n\
                  \n\
                  Examples:\n\
                    nowcast                          # Run TUI (default)\n\
                    nowcast summary                  # Print the national header\n\
                    nowcast deltas --at 2024-06-01T12:00\n\
                    nowcast export national --out national.csv\n\
                    nowcast regional --json          # Solar/wind regional product\n\
                  \n\
                  Environment Variables:\n\
                    NOWCAST_API_URL                  # Override the backend base URL\n\
                    NOWCAST_BEARER_TOKEN             # Bearer token for the backend\n\
                    NOWCAST_NO_COLOR                 # Disable ANSI colors (log-friendly)\n\
                    NOWCAST_LOG                      # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Config file (default: <config_dir>/nowcast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "NOWCAST_API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token for the backend
    #[arg(long, env = "NOWCAST_BEARER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Use gap-free delta buckets
    #[arg(long, global = true)]
    contiguous_buckets: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "NOWCAST_NO_COLOR", global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Run TUI interface (default)
    Tui,
    /// Print the national header and exit
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print region deltas at a time and exit
    Deltas {
        /// Reference time: now, 2024-06-01T10:30 or RFC 3339
        #[arg(long)]
        at: Option<String>,
        /// Max regions listed
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the solar/wind regional product and exit
    Regional {
        /// Region (default: regional_region from config)
        #[arg(long)]
        region: Option<String>,
        /// Reference time: now, 2024-06-01T10:30 or RFC 3339
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write chart records or region deltas to a file
    Export {
        /// What to export
        #[arg(value_enum)]
        kind: ExportKind,
        /// Reference time: now, 2024-06-01T10:30 or RFC 3339
        #[arg(long)]
        at: Option<String>,
        /// Output path
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportKind {
    /// National chart records (CSV)
    National,
    /// Region deltas (CSV)
    Deltas,
    /// Region deltas (JSON)
    DeltasJson,
    /// Regional solar/wind chart records (CSV)
    Regional,
}

impl ExportKind {
    fn default_file_name(self, reference: TimePoint) -> String {
        let stamp = reference.as_datetime().format("%Y%m%dT%H%M");
        match self {
            ExportKind::National => format!("nowcast-national-{}.csv", stamp),
            ExportKind::Deltas => format!("nowcast-deltas-{}.csv", stamp),
            ExportKind::DeltasJson => format!("nowcast-deltas-{}.json", stamp),
            ExportKind::Regional => format!("nowcast-regional-{}.csv", stamp),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = cli.mode.unwrap_or(Mode::Tui);

    init_tracing(matches!(mode, Mode::Tui));

    let config = load_config(
        cli.config.as_deref(),
        cli.api_url,
        cli.token,
        cli.contiguous_buckets,
    )?;
    let no_color = cli.no_color;

    match mode {
        Mode::Tui => run_tui(config).await?,
        Mode::Summary { json } => run_summary(config, json).await?,
        Mode::Deltas { at, limit, json } => {
            run_deltas(config, at, limit, json, no_color).await?;
        }
        Mode::Regional { region, at, json } => {
            run_regional(config, region, at, json, no_color).await?;
        }
        Mode::Export { kind, at, out } => run_export(config, kind, at, out).await?,
    }

    Ok(())
}

/// Logs go to stderr, or to `<cache_dir>/nowcast/nowcast.log` under the TUI
fn init_tracing(tui: bool) {
    let filter = EnvFilter::try_from_env("NOWCAST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if !tui {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    let log_file = dirs::cache_dir()
        .map(|dir| dir.join("nowcast"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("nowcast.log"))
                .ok()
        });

    match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

/// Config file, then env, then command-line flags
fn load_config(
    path: Option<&std::path::Path>,
    api_url: Option<String>,
    token: Option<String>,
    contiguous_buckets: bool,
) -> Result<DashboardConfig> {
    let config = match path {
        Some(path) => DashboardConfig::load(path),
        None => DashboardConfig::load_default(),
    }
    .context("Failed to load config")?;

    let mut config = config.with_env_overrides().with_token_override(token);
    if let Some(url) = api_url {
        config.api_base_url = url;
    }
    if contiguous_buckets {
        config.bucket_boundaries = BoundaryMode::Contiguous;
    }
    Ok(config)
}

/// Regional product timestamps are quarter-hourly
const REGIONAL_STEP_MINUTES: i64 = 15;

fn client(config: &DashboardConfig) -> Result<Arc<ApiClient>> {
    let client = ApiClient::from_config(config).context("Failed to build HTTP client")?;
    if !client.has_token() {
        tracing::warn!("No bearer token configured, the backend may reject requests");
    }
    Ok(Arc::new(client))
}

async fn run_tui(config: DashboardConfig) -> Result<()> {
    let store = Arc::new(DataStore::default());
    let client = client(&config)?;
    let export_dir = std::env::current_dir().context("Could not determine current directory")?;

    // TUI fetches in the background and shows a spinner until the first load
    nowcast_tui::run(store, client, config, export_dir).await
}

/// Fetch everything once behind a terminal spinner
async fn fetch_once(
    store: &DataStore,
    config: &DashboardConfig,
    quiet: bool,
) -> Result<LoadReport> {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;

    let client = client(config)?;
    let start = Instant::now();

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid spinner template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(format!("Fetching from {}...", client.base_url()));

    let options = RefreshOptions {
        show_4h_view: config.show_4h_view,
        region: None,
    };
    let report = store.refresh(&client, options).await;

    spinner.finish_and_clear();
    if !quiet {
        eprintln!(
            "✓ {} series in {:.2}s",
            report.slots_loaded,
            start.elapsed().as_secs_f64()
        );
        for error in report.errors.iter() {
            eprintln!("  - {}: {}", error.source, error.message);
            if let Some(ref hint) = error.suggestion {
                eprintln!("    💡 {}", hint);
            }
        }
    }

    Ok(report)
}

async fn run_summary(config: DashboardConfig, json: bool) -> Result<()> {
    let store = DataStore::default();
    fetch_once(&store, &config, json).await?;

    let now = TimePoint::now_floored(config.anchor_step());
    let header = cli::require(store.header(now), "national header")?;

    if !json {
        println!("nowcast - National solar ({} UTC)", now);
        println!("==========================================");
        println!();
    }
    println!("{}", cli::format_header(&header, json));

    Ok(())
}

async fn run_deltas(
    config: DashboardConfig,
    at: Option<String>,
    limit: Option<usize>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let reference =
        cli::parse_reference(at.as_deref(), TimePoint::now(), config.anchor_step())?;

    let store = DataStore::default();
    fetch_once(&store, &config, json).await?;

    let summary = cli::require(
        store.deltas(reference, config.bucket_boundaries),
        "region deltas",
    )?;

    if !json {
        println!(
            "Region deltas at {} UTC ({:?} buckets, total {:+.1} MW)",
            reference,
            summary.mode,
            summary.total_delta_mw()
        );
        println!("{}", cli::format_bucket_table(&summary, no_color));
        if summary.unbucketed() > 0 {
            println!("{} regions outside every bucket", summary.unbucketed());
        }
        println!();
    }
    println!(
        "{}",
        cli::format_delta_table(&summary, limit, json, no_color)
    );

    Ok(())
}

/// Fetch the regional product once and return its merged chart
async fn fetch_regional(
    config: &DashboardConfig,
    region: &str,
    reference: TimePoint,
    quiet: bool,
) -> Result<Arc<Vec<MergedRecord>>> {
    let client =
        ApiClient::regional_from_config(config).context("Failed to build HTTP client")?;
    let store = DataStore::default();

    let report = store.refresh_regional(&client, region).await;
    if !quiet {
        for error in report.errors.iter() {
            eprintln!("  - {}: {}", error.source, error.message);
            if let Some(ref hint) = error.suggestion {
                eprintln!("    💡 {}", hint);
            }
        }
    }

    Ok(cli::require(store.regional_chart(reference), "regional chart")?)
}

async fn run_regional(
    config: DashboardConfig,
    region: Option<String>,
    at: Option<String>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let region = region.unwrap_or_else(|| config.regional_region.clone());
    let step = chrono::Duration::minutes(REGIONAL_STEP_MINUTES);
    let reference = cli::parse_reference(at.as_deref(), TimePoint::now(), step)?;

    let records = fetch_regional(&config, &region, reference, json).await?;

    if !json {
        println!("{} solar/wind at {} UTC", region, reference);
        println!();
    }
    println!(
        "{}",
        cli::format_regional_table(&records, reference, json, no_color)
    );

    Ok(())
}

async fn run_export(
    config: DashboardConfig,
    kind: ExportKind,
    at: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let step = match kind {
        ExportKind::Regional => chrono::Duration::minutes(REGIONAL_STEP_MINUTES),
        _ => config.anchor_step(),
    };
    let reference = cli::parse_reference(at.as_deref(), TimePoint::now(), step)?;
    let path = out.unwrap_or_else(|| PathBuf::from(kind.default_file_name(reference)));

    if matches!(kind, ExportKind::Regional) {
        let records = fetch_regional(&config, &config.regional_region, reference, false).await?;
        export_records_to_csv(&records, &fields::GENERATION_MIX_LINES, &path)
            .context("Failed to export regional records")?;
        println!("✅ Exported to {}", path.display());
        return Ok(());
    }

    let store = DataStore::default();
    fetch_once(&store, &config, false).await?;

    if matches!(kind, ExportKind::National) {
        let records = cli::require(
            store.national_chart(reference, config.show_4h_view),
            "national chart",
        )?;
        export_records_to_csv(&records, &fields::NATIONAL_LINES, &path)
            .context("Failed to export chart records")?;
    } else {
        let summary = cli::require(
            store.deltas(reference, config.bucket_boundaries),
            "region deltas",
        )?;
        let written = if matches!(kind, ExportKind::Deltas) {
            export_deltas_to_csv(&summary.deltas, &path)
        } else {
            export_deltas_to_json(&summary.deltas, &path)
        };
        written.context("Failed to export region deltas")?;
    }

    println!("✅ Exported to {}", path.display());
    Ok(())
}
