//! NAVIS Native - host tier for neuromorphic auditory recordings
//!
//! This crate connects the pure codecs and views of `navis-core` to the
//! filesystem:
//! - Loaders for AEDAT, CSV, TXT and ZynqGrabber recordings
//! - Savers for every output format
//! - JSON configuration files
//! - A batch pipeline (load, normalize, validate, aggregate)
//!
//! # Modules
//!
//! - [`loaders`]: File loaders and input-format inference
//! - [`savers`]: File savers
//! - [`config`]: JSON configuration loading
//! - [`pipeline`]: Batch analysis
//! - [`error`]: I/O-aware error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod loaders;
pub mod pipeline;
pub mod savers;

// Re-export key types
pub use error::{LoadError, PipelineError, SaveError};
pub use loaders::{load_any, InputFormat};
pub use pipeline::{analyze, Analysis};
pub use savers::save_as;
