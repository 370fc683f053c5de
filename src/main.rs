use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use device_exporter::aggregator::Aggregator;
use device_exporter::cli::{Args, Commands};
use device_exporter::config::{load_or_create_config, ExportConfig};
use device_exporter::constants::{DEFAULT_SNAPSHOT_NAME, DEFAULT_SUMMARY_NAME, ERROR_FAILED_TO_WRITE_FILE};
use device_exporter::delivery::{purge_stale_scratch, DeliveryClient};
use device_exporter::permissions::PermissionGate;
use device_exporter::pipeline::{ExportResult, ExportWorker};
use device_exporter::serializer::to_wire_format_pretty;
use device_exporter::sources::ProviderStore;
use device_exporter::utils::{device, summary};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd);
    }

    info!("Starting device export");

    // Load configuration and apply command-line overrides
    let config = load_and_process_config(&args)?;

    // Clear scratch space left by interrupted runs
    if let Err(e) = purge_stale_scratch(&config.scratch_root()) {
        warn!("Failed to clean scratch directory: {:#}", e);
    }

    let (hostname, run_dir) = setup_output_directory(&config)?;

    let worker = build_worker(&config, args.skip_upload)?;
    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    let result = runtime.block_on(async {
        let handle = worker.submit()?;
        handle.wait().await
    })?;

    write_outputs(&run_dir, &hostname, &result)?;
    report_delivery(&result);

    info!("Device export completed");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            ExportConfig::create_default_config_file(path)?;
            info!("Configuration created. Grant permissions under consent.granted before exporting.");
            Ok(())
        }
    }
}

/// Load configuration, then let command-line flags override it
fn load_and_process_config(args: &Args) -> Result<ExportConfig> {
    let mut config = load_or_create_config(args.config.as_deref())?;

    if let Some(source) = &args.source {
        config.source.dump_dir = Some(source.to_string_lossy().to_string());
    }
    if let Some(endpoint) = &args.endpoint {
        config.delivery.endpoint = endpoint.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = Some(output.to_string_lossy().to_string());
    }
    if args.sample_mode {
        config.sample_mode = true;
    }

    if config.consent.granted.is_empty() {
        warn!("No permissions granted in the configuration; every category will be skipped");
    }
    if config.sample_mode {
        warn!("Sample mode is on: empty contacts, messages and calls will be replaced with sample records");
    }

    Ok(config)
}

/// Create `<output>/export-<timestamp>` and return it with the hostname
fn setup_output_directory(config: &ExportConfig) -> Result<(String, PathBuf)> {
    let hostname = hostname::get()
        .map_err(|e| anyhow!("Failed to get hostname: {}", e))?
        .to_string_lossy()
        .to_string();

    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let run_dir = config.output_path().join(format!("export-{}", timestamp));
    fs::create_dir_all(&run_dir)
        .context("Failed to create output directory")?;

    info!("Output directory created at {}", run_dir.display());
    Ok((hostname, run_dir))
}

fn build_worker(config: &ExportConfig, skip_upload: bool) -> Result<ExportWorker> {
    let store = match &config.source.dump_dir {
        Some(dir) if !dir.is_empty() => Arc::new(ProviderStore::from_dump_dir(Path::new(dir))?),
        _ => {
            warn!("No device dump configured; collectors will find no data");
            Arc::new(ProviderStore::new())
        }
    };

    let gate = Arc::new(PermissionGate::new(config.consent.to_permissions()));
    let device = device::device_info(&config.device, config.consent.sdk_level);

    let aggregator = Aggregator::new(store.clone(), gate, device)
        .with_sample_mode(config.sample_mode)
        .with_collector_timeout(config.limits.collector_timeout());

    let delivery = if skip_upload {
        info!("Upload skipped by request");
        None
    } else {
        Some(DeliveryClient::with_timeouts(
            &config.delivery.endpoint,
            store,
            config.scratch_root(),
            config.limits.upload_timeout(),
            config.limits.connect_timeout(),
        )?)
    };

    Ok(ExportWorker::new(aggregator, delivery))
}

/// Write the indented snapshot copy and the run summary
fn write_outputs(run_dir: &Path, hostname: &str, result: &ExportResult) -> Result<()> {
    let snapshot_path = run_dir.join(DEFAULT_SNAPSHOT_NAME);
    let snapshot = to_wire_format_pretty(&result.report.snapshot)?;
    fs::write(&snapshot_path, snapshot)
        .context(format!("{}: {}", ERROR_FAILED_TO_WRITE_FILE, snapshot_path.display()))?;
    info!("Snapshot written to {}", snapshot_path.display());

    let summary_path = run_dir.join(DEFAULT_SUMMARY_NAME);
    let summary_json = summary::create_run_summary(hostname, result)?;
    fs::write(&summary_path, summary_json)
        .context(format!("{}: {}", ERROR_FAILED_TO_WRITE_FILE, summary_path.display()))?;
    info!("Run summary written to {}", summary_path.display());

    Ok(())
}

fn report_delivery(result: &ExportResult) {
    match &result.delivery {
        Some(outcome) if outcome.is_success() => info!("Delivery finished: {:?}", outcome),
        Some(outcome) => warn!("Delivery did not succeed: {:?}", outcome),
        None => {}
    }
}
