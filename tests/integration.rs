//! Integration tests for cogbatch.
//!
//! These tests verify end-to-end functionality including:
//! - Discovery, row grouping and output layout on real GeoTIFF fixtures
//! - Incremental resume and failure isolation
//! - Structure and content of written COGs
//! - Manifest building and asset registration against a mock client

mod integration {
    pub mod test_utils;

    pub mod codec_tests;
    pub mod pipeline_tests;
    pub mod registration_tests;
}
