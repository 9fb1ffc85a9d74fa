use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use wildfire_monitor_lib::config::AppConfig;
use wildfire_monitor_lib::core::orchestrator::{self, PipelineOutcome, MAP_KEY_SETTING};
use wildfire_monitor_lib::core::scheduler;
use wildfire_monitor_lib::db;

#[derive(Parser)]
#[command(name = "wildfire-monitor")]
#[command(about = "Wildfire hotspot monitor: FIRMS detections, weather risk and reports")]
struct Cli {
    /// Overrides DATA_DIR (SQLite database location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Overrides OUTPUT_DIR (map, chart and workbook)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduled updates until Ctrl-C
    Serve,
    /// Run one update now
    Update,
    /// Print the published summary and the latest runs
    Status {
        #[arg(long, default_value_t = 5)]
        runs: i64,
    },
    /// Store the FIRMS MAP_KEY in the settings table
    SetKey { key: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let pool = match db::init(&config.data_dir).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Error initializing database: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => serve(pool, config).await,
        Commands::Update => update(&pool, &config).await,
        Commands::Status { runs } => status(&pool, runs).await,
        Commands::SetKey { key } => set_key(&pool, &key).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(pool: sqlx::SqlitePool, config: AppConfig) -> anyhow::Result<()> {
    let mut sched = scheduler::init(pool, config).await?;
    log::info!("Scheduler running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down scheduler...");
    sched.shutdown().await?;
    Ok(())
}

async fn update(pool: &sqlx::SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    match orchestrator::update(pool, config).await? {
        PipelineOutcome::Report(report) => println!(
            "Published {} detections ({} -> {}) to {}",
            report.detections.len(),
            report.start_date,
            report.end_date,
            config.output_dir.display()
        ),
        PipelineOutcome::NoDetections => println!("No detections in the requested period"),
        PipelineOutcome::NoneAboveThreshold { fetched } => {
            println!("{} detections downloaded, none above {}% confidence", fetched, config.min_confidence)
        }
    }
    Ok(())
}

async fn status(pool: &sqlx::SqlitePool, runs: i64) -> anyhow::Result<()> {
    match db::get_summary_stats(pool).await? {
        Some(stats) => {
            println!("Total detections:  {}", stats.total_detections);
            println!("Dominant risk:     {}", stats.dominant_risk);
            println!("Mean intensity:    {}", stats.intensity);
            println!("Estimated area:    {}", stats.area);
            println!("Last updated:      {}", stats.last_updated);
        }
        None => println!("no data yet"),
    }

    let recent = db::recent_runs(pool, runs).await?;
    if !recent.is_empty() {
        println!();
        println!("Recent runs:");
        for run in recent {
            println!(
                "  #{} {} {:<8} {:>6} {}",
                run.id,
                run.started_at.format("%Y-%m-%d %H:%M"),
                run.status,
                run.detections.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                run.message.unwrap_or_default()
            );
        }
    }
    Ok(())
}

async fn set_key(pool: &sqlx::SqlitePool, key: &str) -> anyhow::Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("MAP_KEY must not be empty");
    }
    db::save_setting(pool, MAP_KEY_SETTING, key).await?;
    println!("MAP_KEY saved ({} chars)", key.len());
    Ok(())
}
