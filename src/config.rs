//! Command-line configuration for cogbatch.
//!
//! Every subcommand is a clap derive struct. Options can also be set through
//! environment variables with the `COGBATCH_` prefix.
//!
//! # Environment Variables
//!
//! - `COGBATCH_INPUT` - Input root holding the source tiles
//! - `COGBATCH_PATTERN` - Glob pattern for source tiles (default: `**/*.tif`)
//! - `COGBATCH_OUTPUT` - Output root (default: `./dump`)
//! - `COGBATCH_DISCOVERY` - `directories` or `glob` (default: directories)
//! - `COGBATCH_ID_WIDTH` - Tile id width in digits (default: 6)
//! - `COGBATCH_WORKERS` - Worker pool size (default: available parallelism)
//! - `COGBATCH_ROW_PAUSE_SECS` - Pause between rows in seconds (default: 3)
//! - `COGBATCH_OVERWRITE` - `overwrite` or `skip-existing` (default: overwrite)
//! - `COGBATCH_ENDPOINT` - Asset catalog endpoint
//! - `COGBATCH_TOKEN` - Bearer token for the asset catalog

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::codec::OVERVIEW_FACTORS;
use crate::error::DiscoveryError;
use crate::tile::{
    DirectoryListing, PatternGlob, TileDiscoverer, TileIdParser, DEFAULT_ID_WIDTH,
    DEFAULT_PATTERN,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default output root.
pub const DEFAULT_OUTPUT: &str = "./dump";

/// Default pause between conversion rows, in seconds.
pub const DEFAULT_ROW_PAUSE_SECS: f64 = 3.0;

/// Default pause between registration rows, in seconds.
pub const DEFAULT_REGISTER_PAUSE_SECS: f64 = 15.0;

/// Default asset catalog endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://earthengine.googleapis.com/v1alpha";

/// Default manifest file.
pub const DEFAULT_MANIFEST: &str = "manifest.json";

/// Default directory for registration response logs.
pub const DEFAULT_LOG_DIR: &str = "logging";

/// Worker pool size when none is given.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// =============================================================================
// Enums
// =============================================================================

/// How tiles are found under the input root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryMode {
    /// Rows from subdirectory names, tiles from the glob pattern
    Directories,
    /// Rows and tiles from the glob pattern alone
    Glob,
}

/// What to do when a target file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OverwritePolicy {
    /// Convert again and replace the file
    #[default]
    Overwrite,
    /// Leave the file and record the tile as skipped
    SkipExisting,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// cogbatch - Batch conversion of GeoTIFF tiles to Cloud Optimized GeoTIFFs.
#[derive(Parser, Debug, Clone)]
#[command(name = "cogbatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert pending tiles row by row
    Convert(ConvertConfig),
    /// Print the jobs a conversion would dispatch, without converting
    Plan(PlanConfig),
    /// List outputs whose source tile no longer exists
    Orphans(OrphansConfig),
    /// Validate every output under the output root
    Verify(VerifyConfig),
    /// Write a JSON manifest of the output tree
    Manifest(ManifestConfig),
    /// Register manifest entries with the remote asset catalog
    Register(RegisterConfig),
}

// =============================================================================
// Shared Argument Groups
// =============================================================================

/// Where and how to find source tiles.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Input root holding the source tiles.
    #[arg(long, env = "COGBATCH_INPUT")]
    pub input: PathBuf,

    /// Glob pattern, relative to the input root.
    #[arg(long, default_value = DEFAULT_PATTERN, env = "COGBATCH_PATTERN")]
    pub pattern: String,

    /// Discovery strategy.
    #[arg(long, value_enum, default_value_t = DiscoveryMode::Directories, env = "COGBATCH_DISCOVERY")]
    pub discovery: DiscoveryMode,

    /// Number of digits in a tile id (row digits + column digits).
    #[arg(long, default_value_t = DEFAULT_ID_WIDTH, env = "COGBATCH_ID_WIDTH")]
    pub id_width: usize,
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        validate_id_width(self.id_width)?;
        if self.pattern.is_empty() {
            return Err("pattern must not be empty".to_string());
        }
        glob::Pattern::new(&self.pattern)
            .map_err(|e| format!("Invalid glob pattern '{}': {}", self.pattern, e))?;
        Ok(())
    }

    pub fn parser(&self) -> Result<TileIdParser, DiscoveryError> {
        TileIdParser::new(self.id_width)
    }

    /// The discovery strategy selected by `--discovery`.
    pub fn discoverer(&self) -> Result<Box<dyn TileDiscoverer>, DiscoveryError> {
        let parser = self.parser()?;
        Ok(match self.discovery {
            DiscoveryMode::Directories => Box::new(DirectoryListing::new(parser, &self.pattern)),
            DiscoveryMode::Glob => Box::new(PatternGlob::new(parser, &self.pattern)),
        })
    }
}

/// The output root.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output root; converted tiles go to `{output}/{row}/`.
    #[arg(long, default_value = DEFAULT_OUTPUT, env = "COGBATCH_OUTPUT")]
    pub output: PathBuf,
}

/// Incremental resume behavior.
#[derive(Args, Debug, Clone, Default)]
pub struct ResumeArgs {
    /// Convert every discovered tile, ignoring existing outputs.
    #[arg(long, default_value_t = false)]
    pub no_resume: bool,

    /// Count an existing output as done only if it validates as a COG.
    #[arg(long, default_value_t = false)]
    pub verify_existing: bool,
}

fn validate_pause(name: &str, secs: f64) -> Result<(), String> {
    Duration::try_from_secs_f64(secs)
        .map(|_| ())
        .map_err(|_| format!("{} must be a non-negative number of seconds, got {}", name, secs))
}

fn validate_id_width(width: usize) -> Result<(), String> {
    TileIdParser::new(width)
        .map(|_| ())
        .map_err(|e| format!("id_width: {}", e))
}

// =============================================================================
// Convert Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub resume: ResumeArgs,

    /// Number of tiles converted concurrently.
    #[arg(long, default_value_t = default_workers(), env = "COGBATCH_WORKERS")]
    pub workers: usize,

    /// Pause between rows, in seconds (0 disables).
    #[arg(long, default_value_t = DEFAULT_ROW_PAUSE_SECS, env = "COGBATCH_ROW_PAUSE_SECS")]
    pub row_pause_secs: f64,

    /// Policy for targets that already exist.
    #[arg(long, value_enum, default_value_t = OverwritePolicy::Overwrite, env = "COGBATCH_OVERWRITE")]
    pub overwrite: OverwritePolicy,

    /// Also write the run summary as JSON to this file.
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ConvertConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        validate_pause("row_pause_secs", self.row_pause_secs)
    }

    /// Zero when `row_pause_secs` did not pass validation.
    pub fn row_pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.row_pause_secs).unwrap_or_default()
    }
}

// =============================================================================
// Plan / Orphans / Verify Commands
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct PlanConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub resume: ResumeArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl PlanConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct OrphansConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl OrphansConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct VerifyConfig {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Minimum number of overview levels an output must carry.
    #[arg(long, default_value_t = OVERVIEW_FACTORS.len())]
    pub min_overviews: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl VerifyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.output.output.is_dir() {
            return Err(format!(
                "Output root {} is not a directory",
                self.output.output.display()
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Manifest / Register Commands
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ManifestConfig {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Prefix of the remote location mirroring the output root,
    /// e.g. `gs://bucket/cogs`.
    #[arg(long, env = "COGBATCH_URI_PREFIX")]
    pub uri_prefix: String,

    /// Manifest file to write.
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Number of digits in a tile id.
    #[arg(long, default_value_t = DEFAULT_ID_WIDTH, env = "COGBATCH_ID_WIDTH")]
    pub id_width: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ManifestConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.uri_prefix.trim_end_matches('/').is_empty() {
            return Err("uri_prefix must not be empty. Set --uri-prefix or COGBATCH_URI_PREFIX".to_string());
        }
        validate_id_width(self.id_width)?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct RegisterConfig {
    /// Manifest produced by the `manifest` command.
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Base URL of the asset catalog API.
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "COGBATCH_ENDPOINT")]
    pub endpoint: String,

    /// Cloud project owning the collection.
    #[arg(long, env = "COGBATCH_PROJECT")]
    pub project: String,

    /// Collection the assets are created in.
    #[arg(long, env = "COGBATCH_COLLECTION")]
    pub collection: String,

    /// Bearer token sent with every request.
    #[arg(long, env = "COGBATCH_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Directory receiving one response file per asset.
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Pause between rows, in seconds (0 disables).
    #[arg(long, default_value_t = DEFAULT_REGISTER_PAUSE_SECS)]
    pub row_pause_secs: f64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RegisterConfig {
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.endpoint)
            .map_err(|e| format!("Invalid endpoint '{}': {}", self.endpoint, e))?;
        if self.project.is_empty() {
            return Err("project is required. Set --project or COGBATCH_PROJECT".to_string());
        }
        if self.collection.is_empty() {
            return Err(
                "collection is required. Set --collection or COGBATCH_COLLECTION".to_string(),
            );
        }
        if self.token.is_empty() {
            return Err("token is required. Set --token or COGBATCH_TOKEN".to_string());
        }
        validate_pause("row_pause_secs", self.row_pause_secs)
    }

    /// Zero when `row_pause_secs` did not pass validation.
    pub fn row_pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.row_pause_secs).unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================
