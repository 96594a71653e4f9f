//! Registering converted tiles with a remote asset catalog.
//!
//! The output tree is first summarized into an [`AssetManifest`]; the
//! [`Registrar`] then creates one cloud-backed asset per record through an
//! [`AssetClient`], pausing between rows.

mod client;
mod manifest;
mod registrar;
mod request;

pub use client::{AssetClient, AssetResponse, HttpAssetClient};
pub use manifest::{AssetManifest, AssetRecord};
pub use registrar::{Registrar, RegistrationSummary};
pub use request::{AssetProperties, AssetRequest, GcsLocation};
