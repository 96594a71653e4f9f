//! Structural validation of written Cloud Optimized GeoTIFFs.
//!
//! A converted tile is accepted when every image directory satisfies:
//! - **Organization**: tiled (no strips), with offsets and byte counts
//! - **Compression**: LZW
//! - **Interleave**: band interleaved (PlanarConfiguration 2) when
//!   multi-band
//! - **Overviews**: every directory after the first is a reduced resolution
//!   image, no larger than the one before it, and at least `min_overviews`
//!   exist
//! - **Tile data**: every tile lies inside the file
//!
//! Directories are read with the `tiff` crate decoder; no pixel data is
//! decoded.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use thiserror::Error;
use tiff::decoder::{Decoder, Limits};
use tiff::tags::Tag;

use crate::error::TiffError;

const COMPRESSION_LZW: u16 = 5;
const PLANAR_SEPARATE: u16 = 2;
const SUBFILE_REDUCED_IMAGE: u32 = 1;

// =============================================================================
// Image Levels
// =============================================================================

/// The layout tags of one image directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageLevel {
    pub width: u32,
    pub height: u32,
    pub subfile_type: u32,
    pub compression: u16,
    pub samples_per_pixel: u16,
    pub planar_configuration: u16,
    pub has_strips: bool,
    pub tile_width: Option<u32>,
    pub tile_height: Option<u32>,
    pub tile_offsets: Option<Vec<u64>>,
    pub tile_byte_counts: Option<Vec<u64>>,
}

impl ImageLevel {
    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self, TiffError> {
        let (width, height) = decoder.dimensions()?;
        Ok(Self {
            width,
            height,
            subfile_type: decoder
                .find_tag_unsigned(Tag::NewSubfileType)?
                .unwrap_or(0),
            compression: decoder.find_tag_unsigned(Tag::Compression)?.unwrap_or(1),
            samples_per_pixel: decoder
                .find_tag_unsigned(Tag::SamplesPerPixel)?
                .unwrap_or(1),
            planar_configuration: decoder
                .find_tag_unsigned(Tag::PlanarConfiguration)?
                .unwrap_or(1),
            has_strips: decoder.find_tag(Tag::StripOffsets)?.is_some(),
            tile_width: decoder.find_tag_unsigned(Tag::TileWidth)?,
            tile_height: decoder.find_tag_unsigned(Tag::TileLength)?,
            tile_offsets: decoder.find_tag_unsigned_vec(Tag::TileOffsets)?,
            tile_byte_counts: decoder.find_tag_unsigned_vec(Tag::TileByteCounts)?,
        })
    }
}

/// Read the layout of every image directory in a TIFF file.
pub fn read_levels(path: &Path) -> Result<Vec<ImageLevel>, TiffError> {
    let file = BufReader::new(File::open(path)?);
    let mut decoder = Decoder::new(file)?.with_limits(Limits::unlimited());

    let mut levels = vec![ImageLevel::read(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image()?;
        levels.push(ImageLevel::read(&mut decoder)?);
    }
    Ok(levels)
}

// =============================================================================
// Validation Result
// =============================================================================

/// Result of validating a COG.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the file is a valid COG
    pub is_valid: bool,

    /// List of validation errors (empty if valid)
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    fn ok() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// All errors joined into one line.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A specific validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File has no image directory at all
    #[error("No image directories")]
    NoImages,

    /// Directory uses strip organization instead of tiles
    #[error("IFD {ifd_index}: strips instead of tiles")]
    StripOrganization { ifd_index: usize },

    /// Missing required tile tags
    #[error("IFD {ifd_index}: missing {missing_tags:?}")]
    MissingTileTags {
        ifd_index: usize,
        missing_tags: Vec<&'static str>,
    },

    /// Compression other than LZW
    #[error("IFD {ifd_index}: compression {compression}, expected LZW")]
    UnsupportedCompression { ifd_index: usize, compression: u16 },

    /// Multi-band image stored pixel interleaved
    #[error("IFD {ifd_index}: {samples} samples stored pixel interleaved")]
    NotBandInterleaved { ifd_index: usize, samples: u16 },

    /// Overview not flagged as reduced resolution, or larger than the
    /// previous level
    #[error("IFD {ifd_index}: not a valid overview ({message})")]
    OverviewOrder { ifd_index: usize, message: String },

    /// Fewer overview levels than required
    #[error("Found {found} overview levels, expected at least {expected}")]
    MissingOverviews { expected: usize, found: usize },

    /// Tile count does not match the image and tile dimensions
    #[error("IFD {ifd_index}: {actual} tiles, expected {expected}")]
    TileCountMismatch {
        ifd_index: usize,
        expected: u64,
        actual: u64,
    },

    /// A tile points past the end of the file
    #[error("IFD {ifd_index}: tile {tile_index} at {offset}+{length} exceeds file size {file_size}")]
    TileDataOutOfBounds {
        ifd_index: usize,
        tile_index: usize,
        offset: u64,
        length: u64,
        file_size: u64,
    },
}

// =============================================================================
// Validation
// =============================================================================

fn validate_level(level: &ImageLevel, ifd_index: usize, file_size: u64) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let (Some(tile_width), Some(tile_height), Some(offsets), Some(counts)) = (
        level.tile_width,
        level.tile_height,
        level.tile_offsets.as_deref(),
        level.tile_byte_counts.as_deref(),
    ) else {
        if level.has_strips {
            errors.push(ValidationError::StripOrganization { ifd_index });
        } else {
            let missing_tags = [
                ("TileWidth", level.tile_width.is_none()),
                ("TileLength", level.tile_height.is_none()),
                ("TileOffsets", level.tile_offsets.is_none()),
                ("TileByteCounts", level.tile_byte_counts.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect();
            errors.push(ValidationError::MissingTileTags {
                ifd_index,
                missing_tags,
            });
        }
        return errors;
    };

    if level.compression != COMPRESSION_LZW {
        errors.push(ValidationError::UnsupportedCompression {
            ifd_index,
            compression: level.compression,
        });
    }

    let samples = level.samples_per_pixel;
    let separate = level.planar_configuration == PLANAR_SEPARATE;
    if samples > 1 && !separate {
        errors.push(ValidationError::NotBandInterleaved { ifd_index, samples });
    }

    if tile_width == 0 || tile_height == 0 {
        errors.push(ValidationError::TileCountMismatch {
            ifd_index,
            expected: 0,
            actual: offsets.len() as u64,
        });
        return errors;
    }

    let planes = if separate { samples as u64 } else { 1 };
    let expected = (level.width as u64).div_ceil(tile_width as u64)
        * (level.height as u64).div_ceil(tile_height as u64)
        * planes;
    if offsets.len() as u64 != expected || counts.len() as u64 != expected {
        errors.push(ValidationError::TileCountMismatch {
            ifd_index,
            expected,
            actual: offsets.len().min(counts.len()) as u64,
        });
    }

    let out_of_bounds = offsets
        .iter()
        .zip(counts)
        .enumerate()
        .find(|(_, (&offset, &length))| offset.saturating_add(length) > file_size);
    if let Some((tile_index, (&offset, &length))) = out_of_bounds {
        errors.push(ValidationError::TileDataOutOfBounds {
            ifd_index,
            tile_index,
            offset,
            length,
            file_size,
        });
    }

    errors
}

/// Validate the image directories of a COG, full resolution first.
pub fn validate_cog(levels: &[ImageLevel], file_size: u64, min_overviews: usize) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if levels.is_empty() {
        result.add_error(ValidationError::NoImages);
        return result;
    }

    for (index, level) in levels.iter().enumerate() {
        for error in validate_level(level, index, file_size) {
            result.add_error(error);
        }
    }

    for (index, pair) in levels.windows(2).enumerate() {
        let (previous, overview) = (&pair[0], &pair[1]);
        let ifd_index = index + 1;

        if overview.subfile_type & SUBFILE_REDUCED_IMAGE == 0 {
            result.add_error(ValidationError::OverviewOrder {
                ifd_index,
                message: "NewSubfileType is not reduced resolution".to_string(),
            });
        }
        if overview.width > previous.width || overview.height > previous.height {
            result.add_error(ValidationError::OverviewOrder {
                ifd_index,
                message: "larger than the previous level".to_string(),
            });
        }
    }

    let found = levels.len() - 1;
    if found < min_overviews {
        result.add_error(ValidationError::MissingOverviews {
            expected: min_overviews,
            found,
        });
    }

    result
}

/// Read a file and validate it as a COG.
///
/// Returns an error only when the file cannot be read as TIFF at all.
pub fn validate_cog_file(path: &Path, min_overviews: usize) -> Result<ValidationResult, TiffError> {
    let file_size = std::fs::metadata(path)?.len();
    let levels = read_levels(path)?;
    Ok(validate_cog(&levels, file_size, min_overviews))
}

// =============================================================================
// Tests
// =============================================================================
