//! cogbatch - Batch GeoTIFF to Cloud Optimized GeoTIFF conversion.
//!
//! This binary wires the CLI to the library and maps outcomes to exit codes.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cogbatch::{
    config::{
        Cli, Command, ConvertConfig, ManifestConfig, OrphansConfig, PlanConfig, RegisterConfig,
        SourceArgs, VerifyConfig,
    },
    verify_outputs, AssetManifest, CogSuffixResolver, ConversionEngine, CreateOptions,
    Dispatcher, GdalCodec, HttpAssetClient, PlanReport, Planner, Registrar, ResumeMode,
    TileIdParser,
};

/// Exit status when a run completed but some tiles or assets failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Convert(config) => run_convert(config).await,
        Command::Plan(config) => run_plan(config),
        Command::Orphans(config) => run_orphans(config),
        Command::Verify(config) => run_verify(config),
        Command::Manifest(config) => run_manifest(config),
        Command::Register(config) => run_register(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "cogbatch=debug"
    } else {
        "cogbatch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Plan a conversion from the shared source/output flags.
fn plan_from(
    source: &SourceArgs,
    output: &std::path::Path,
    resume: ResumeMode,
) -> Result<PlanReport, String> {
    let parser = source.parser().map_err(|e| e.to_string())?;
    let discoverer = source.discoverer().map_err(|e| e.to_string())?;
    let resolver = CogSuffixResolver::default();
    let planner = Planner {
        discoverer: discoverer.as_ref(),
        parser: &parser,
        resolver: &resolver,
        options: CreateOptions::cog(),
    };
    planner
        .plan(&source.input, output, resume)
        .map_err(|e| e.to_string())
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(config: ConvertConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Input: {}", config.source.input.display());
    info!("  Output: {}", config.output.output.display());
    info!("  Pattern: {} ({:?})", config.source.pattern, config.source.discovery);
    info!("  Workers: {}", config.workers);
    info!("  Row pause: {}s", config.row_pause_secs);
    if config.resume.no_resume {
        info!("  Resume: off");
    }

    let resume = ResumeMode {
        enabled: !config.resume.no_resume,
        verify: config.resume.verify_existing,
    };
    let report = match plan_from(&config.source, &config.output.output, resume) {
        Ok(report) => report,
        Err(e) => {
            error!("Discovery failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if report.plan.is_empty() {
        info!("Nothing to convert");
    }

    let engine = ConversionEngine::new(GdalCodec, config.overwrite);
    let dispatcher = Dispatcher::new(engine, config.workers, config.row_pause());
    let mut summary = dispatcher.run(report.plan).await;
    summary.record_discovery_skips(&report.groups);

    info!("Done: {}", summary);
    for failure in &summary.failures {
        warn!("  {} ({}): {}", failure.tile_id, failure.source, failure.error);
    }

    if let Some(ref path) = config.summary_json {
        if let Err(e) = summary.write_json(path) {
            error!("Failed to write summary to {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL_FAILURE)
    }
}

// =============================================================================
// Plan Command
// =============================================================================

fn run_plan(config: PlanConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let resume = ResumeMode {
        enabled: !config.resume.no_resume,
        verify: config.resume.verify_existing,
    };
    let report = match plan_from(&config.source, &config.output.output, resume) {
        Ok(report) => report,
        Err(e) => {
            error!("Discovery failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for (row, jobs) in report.plan.iter() {
        println!("{} ({} tiles)", row, jobs.len());
        for job in jobs {
            println!("  {} -> {}", job.source.display(), job.target.path.display());
        }
    }
    println!();
    println!(
        "{} jobs in {} rows ({} already converted)",
        report.plan.job_count(),
        report.plan.row_count(),
        report.existing.paths.len()
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Orphans Command
// =============================================================================

fn run_orphans(config: OrphansConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = config.source.parser().and_then(|parser| {
        let discoverer = config.source.discoverer()?;
        let resolver = CogSuffixResolver::default();
        Planner {
            discoverer: discoverer.as_ref(),
            parser: &parser,
            resolver: &resolver,
            options: CreateOptions::cog(),
        }
        .orphans(&config.source.input, &config.output.output)
    });

    match result {
        Ok(orphans) => {
            for path in &orphans {
                println!("{}", path.display());
            }
            info!("{} orphaned outputs", orphans.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Discovery failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Verify Command
// =============================================================================

fn run_verify(config: VerifyConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let report = match verify_outputs(
        &config.output.output,
        &CogSuffixResolver::default(),
        config.min_overviews,
    ) {
        Ok(report) => report,
        Err(e) => {
            error!("Verification failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for (path, reason) in &report.rejected {
        println!("✗ {}: {}", path.display(), reason);
    }
    println!(
        "{} valid, {} invalid",
        report.paths.len(),
        report.rejected.len()
    );

    if report.rejected.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Manifest Command
// =============================================================================

fn run_manifest(config: ManifestConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let parser = match TileIdParser::new(config.id_width) {
        Ok(parser) => parser,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let manifest = match AssetManifest::from_output_tree(
        &config.output.output,
        &CogSuffixResolver::default(),
        &parser,
        &config.uri_prefix,
    ) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Failed to scan outputs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = manifest.save(&config.manifest) {
        error!("Failed to write manifest: {}", e);
        return ExitCode::FAILURE;
    }
    info!(
        "Wrote {} assets in {} rows to {}",
        manifest.asset_count(),
        manifest.row_count(),
        config.manifest.display()
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Register Command
// =============================================================================

async fn run_register(config: RegisterConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let manifest = match AssetManifest::load(&config.manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Failed to read manifest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match HttpAssetClient::new(
        &config.endpoint,
        config.project.as_str(),
        config.collection.as_str(),
        config.token.as_str(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Registering {} assets into {}/{}",
        manifest.asset_count(),
        config.project,
        config.collection
    );

    let registrar = Registrar::new(client, &config.log_dir, config.row_pause());
    let summary = registrar.run(&manifest).await;
    info!(
        "Done: {} registered, {} failed",
        summary.registered, summary.failed
    );

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL_FAILURE)
    }
}
