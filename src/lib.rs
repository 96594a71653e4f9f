//! # cogbatch
//!
//! Batch conversion of tiled GeoTIFF datasets into Cloud Optimized GeoTIFFs.
//!
//! Source tiles are named after a fixed-width id (`RRRCCC`: row digits then
//! column digits). The converter finds them under an input root, groups
//! them by row, drops the tiles whose output already exists, and converts
//! the rest row by row on a bounded worker pool. Outputs land in
//! `{output_root}/{row}/{stem}_cog.tif`.
//!
//! ## Architecture
//!
//! - [`tile`] - Tile ids, discovery, row grouping and output paths
//! - [`plan`] - Incremental diff against the output tree and job plans
//! - [`codec`] - Raster codec traits and the GDAL-backed codec
//! - [`convert`] - Single-tile engine, row-barrier dispatcher, run summary
//! - [`mod@format`] - COG structure validation
//! - [`register`] - Asset manifest and remote catalog registration
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use cogbatch::{
//!     CogSuffixResolver, ConversionEngine, CreateOptions, Dispatcher, DirectoryListing,
//!     OverwritePolicy, Planner, ResumeMode, GdalCodec, TileIdParser,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let parser = TileIdParser::new(6).unwrap();
//!     let discoverer = DirectoryListing::new(parser.clone(), "**/*.tif");
//!     let resolver = CogSuffixResolver::default();
//!     let planner = Planner {
//!         discoverer: &discoverer,
//!         parser: &parser,
//!         resolver: &resolver,
//!         options: CreateOptions::cog(),
//!     };
//!
//!     let report = planner
//!         .plan(Path::new("tiles"), Path::new("dump"), ResumeMode { enabled: true, verify: false })
//!         .unwrap();
//!
//!     let engine = ConversionEngine::new(GdalCodec, OverwritePolicy::Overwrite);
//!     let dispatcher = Dispatcher::new(engine, 4, Duration::from_secs(3));
//!     let summary = dispatcher.run(report.plan).await;
//!     println!("{}", summary);
//! }
//! ```

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod plan;
pub mod register;
pub mod tile;

// Re-export commonly used types
pub use codec::{
    Compression, CreateOptions, GdalCodec, GeoTransform, Interleave, RasterCodec, RasterSpec,
    Resampling, SourceRaster, SpatialRef, WritableRaster, COG_BLOCK_SIZE, OVERVIEW_FACTORS,
};
pub use config::{
    Cli, Command, ConvertConfig, DiscoveryMode, ManifestConfig, OrphansConfig, OverwritePolicy,
    PlanConfig, RegisterConfig, VerifyConfig,
};
pub use convert::{ConversionEngine, Dispatcher, FailureRecord, RunSummary, TileOutcome};
pub use error::{
    CodecError, ConversionFailure, DiscoveryError, FailureCause, MalformedTileIdError,
    RegistrationError, TargetDirectoryError, TiffError,
};
pub use format::{validate_cog_file, ValidationError, ValidationResult};
pub use pipeline::{verify_outputs, PlanReport, Planner, ResumeMode};
pub use plan::{DiffResult, ExistingOutputs, JobPlan};
pub use register::{
    AssetClient, AssetManifest, AssetRecord, AssetRequest, HttpAssetClient, Registrar,
    RegistrationSummary,
};
pub use tile::{
    CogSuffixResolver, ConversionTarget, DirectoryListing, DiscoveredTiles, PatternGlob, RowGroups,
    TargetPathResolver, TileDiscoverer, TileId, TileIdParser,
};
