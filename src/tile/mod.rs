//! Tile identity, discovery and grouping.
//!
//! ```text
//! input root ──► TileDiscoverer ──► DiscoveredTiles ──► RowGroups
//!                                                          │
//!                      TargetPathResolver ◄────────────────┘
//! ```

mod discovery;
mod grouping;
mod id;
mod target;

pub use discovery::{
    glob_files, DirectoryListing, DiscoveredTiles, PatternGlob, TileDiscoverer, DEFAULT_PATTERN,
};
pub use grouping::RowGroups;
pub use id::{TileId, TileIdParser, DEFAULT_ID_WIDTH, MAX_ID_WIDTH};
pub use target::{
    file_stem, CogSuffixResolver, ConversionTarget, TargetPathResolver, COG_EXTENSION, COG_SUFFIX,
};
