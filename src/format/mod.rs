//! Output file validation.

mod validation;

pub use validation::{
    read_levels, validate_cog, validate_cog_file, ImageLevel, ValidationError, ValidationResult,
};
