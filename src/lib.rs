//! Acoustic-to-articulatory inversion toolkit.
//!
//! Turns speech into standardized cepstral feature matrices, runs a trained
//! sequence model over them to predict articulator trajectories, exports the
//! trajectories as ABX evaluation records, and prepares articulatory corpora
//! for training by adding vocal-tract descriptors and bounding sequence length.

pub mod audio;
pub mod augment;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod predict;
pub mod split;
pub mod storage;
pub mod types;

pub use error::{Ac2ArtError, Result};
