//! nata - time-resolved grid and particle datasets
//!
//! Containers for the output of plasma simulation codes such as OSIRIS. Each
//! output file holds one simulation step; format-specific readers (backends)
//! expose that step through a small capability contract, and the containers
//! in this crate assemble steps into time series.
//!
//! # Features
//!
//! - Backend registries with first-match auto-detection of sources
//! - Grid datasets with shape, dtype and axis consistency across steps
//! - Particle datasets with a variable particle count per step
//! - All-or-nothing append with an explicit overlap policy
//! - Step views for iterating over a time series without copying
//!
//! File formats themselves (HDF5, ZDF) are not parsed here. Implement
//! [`GridBackend`] or [`ParticleBackend`] for a reader and register it.
//!
//! # Example
//!
//! ```rust,ignore
//! use nata::{GridBackendRegistry, GridDataset};
//!
//! # fn example() -> nata::Result<()> {
//! let mut registry = GridBackendRegistry::new();
//! registry.register::<MyHdf5Grid>();
//!
//! let mut e1 = GridDataset::open("MS/FLD/e1/e1-000000.h5", &registry)?;
//! e1.append(&GridDataset::open("MS/FLD/e1/e1-000010.h5", &registry)?)?;
//!
//! for (iteration, step) in e1.iter() {
//!     println!("{} at t = {}: {:?}", iteration, step.time(), step.data().shape());
//! }
//! # Ok(())
//! # }
//! ```

pub mod axes;
pub mod backend;
pub mod config;
pub mod error;
pub mod grid;
pub mod particle;
pub mod stock;
pub mod types;
pub mod utils;

// Re-exports
pub use axes::{Axis, AxisBounds, AxisType, GridAxis, IterationAxis, TimeAxis};
pub use backend::{
    BackendEntry, BackendRegistry, DetectBackend, GridBackend, GridBackendRegistry,
    ParticleBackend, ParticleBackendRegistry, RegistryScope,
};
pub use config::DatasetOptions;
pub use error::{NataError, Result};
pub use grid::{GridDataset, GridMetadata, GridRecord, GridStep};
pub use particle::{ParticleDataset, ParticleRecord, ParticleStep, ParticleStepView, QuantityInfo};
pub use stock::{DataStock, OverlapPolicy};
pub use types::{ArrayData, DataType, Element};

/// Version of the library
pub const NATA_VERSION: &str = env!("CARGO_PKG_VERSION");
