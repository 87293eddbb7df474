use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use carbon_scheduler::carbon_aware::{build_provider, CarbonIntensityProvider, ForecastCache};
use carbon_scheduler::config::{ProviderKind, SchedulerConfig};
use carbon_scheduler::dispatcher::JobDispatcher;
use carbon_scheduler::jobs::{JobStore, ResourceUsage, Task};
use carbon_scheduler::recommendation::RecommendationEngine;
use carbon_scheduler::service::SchedulingService;
use carbon_scheduler::{rest_api, telemetry};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "CARBON_SCHEDULER_CONFIG")]
    config: Option<PathBuf>,

    /// Carbon data source
    #[arg(long, global = true, env = "CARBON_PROVIDER", value_enum)]
    provider: Option<ProviderKind>,

    /// Grid region to read carbon intensity for
    #[arg(long, global = true, env = "CARBON_REGION")]
    region: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API with background refresh and dispatch
    Run(RunArgs),
    /// Print a one-off recommendation as JSON without persisting a job
    Recommend(RecommendArgs),
    /// Show version and build information
    Version,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,
}

#[derive(Parser, Debug)]
struct RecommendArgs {
    #[arg(long)]
    task_name: String,

    #[arg(long)]
    duration_hours: f64,

    /// low, medium, high or very-high
    #[arg(long)]
    resource_usage: ResourceUsage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Commands::Version = args.command {
        println!("carbon-scheduler v{}", env!("CARGO_PKG_VERSION"));
        println!("Build Date: {}", env!("BUILD_DATE"));
        println!("Git SHA: {}", env!("GIT_SHA"));
        println!("Rust Version: {}", env!("RUST_VERSION"));
        return Ok(());
    }

    let config = load_config(&args.common)?;
    telemetry::init_tracing(config.logging.json);

    match args.command {
        Commands::Run(run_args) => run(config, run_args).await,
        Commands::Recommend(rec_args) => recommend(config, rec_args).await,
        Commands::Version => Ok(()),
    }
}

fn load_config(common: &CommonArgs) -> anyhow::Result<SchedulerConfig> {
    let mut config = match &common.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    if let Some(kind) = common.provider {
        config.provider.kind = kind;
    }
    if let Some(region) = &common.region {
        config.provider.region = region.clone();
    }
    if common.log_json {
        config.logging.json = true;
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn build_service(
    config: &SchedulerConfig,
    provider: Arc<dyn CarbonIntensityProvider>,
    store: Arc<JobStore>,
) -> SchedulingService {
    let engine = RecommendationEngine::new(config.recommendation.clone(), config.impact.clone());
    SchedulingService::new(provider, engine, store, &config.provider)
}

async fn run(mut config: SchedulerConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    info!(
        "Starting carbon-scheduler v{} (provider {:?}, region {})",
        env!("CARGO_PKG_VERSION"),
        config.provider.kind,
        config.provider.region
    );

    let source = build_provider(&config.provider).context("building carbon provider")?;
    let provider: Arc<dyn CarbonIntensityProvider> = if config.cache.enabled {
        let cache = Arc::new(ForecastCache::new(source, config.cache.max_age_minutes));
        cache.clone().start_refresh_loop(
            vec![config.provider.region.clone()],
            config.provider.horizon_hours,
            config.provider.resolution_minutes,
            std::time::Duration::from_secs(config.cache.refresh_interval_secs.max(1)),
        );
        cache
    } else {
        source
    };

    let store = Arc::new(JobStore::new());
    if config.dispatcher.enabled {
        Arc::new(JobDispatcher::new(store.clone(), config.dispatcher.tick_secs)).start();
    }

    let service = Arc::new(build_service(&config, provider, store));
    rest_api::run_server(service, &config.server.bind_addr, &config.server.api_prefix)
        .await
        .context("running REST API server")?;
    Ok(())
}

async fn recommend(config: SchedulerConfig, args: RecommendArgs) -> anyhow::Result<()> {
    let task = Task::new(args.task_name, args.duration_hours, args.resource_usage)?;
    let provider = build_provider(&config.provider).context("building carbon provider")?;
    let service = build_service(&config, provider, Arc::new(JobStore::new()));

    let (reading, recommendation) = service.recommend_at(&task, chrono::Utc::now()).await?;
    let output = serde_json::json!({
        "task": task,
        "carbon_data": rest_api::dto::CarbonDataResponse::from(reading),
        "recommendation": recommendation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
