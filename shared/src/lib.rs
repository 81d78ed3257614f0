//! Shared components for the autofocus workspace.
//!
//! - [`coordinate`]: equatorial coordinates
//! - [`star_catalog`]: declination-bucketed nearest reference star index
//! - [`catalog_file`]: flat-text catalog reader
//! - [`config_storage`]: JSON configuration persisted under `~/.cf_config`

pub mod catalog_file;
pub mod config_storage;
pub mod coordinate;
pub mod star_catalog;

pub use coordinate::{Coordinate, CoordinateError};
pub use star_catalog::{BucketConfig, CatalogError, CatalogResult, StarCatalog};
