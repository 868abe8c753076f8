//! Repository client
//!
//! Request/response wrapper around the remote package repository's
//! metadata API.

mod api;
mod client;

pub use api::{CommunityListing, PackageMetadataDocument, PackageVersionDocument};
pub use client::{Registry, RegistryClient, RegistryError, DEFAULT_REPOSITORY};
