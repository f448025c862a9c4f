//! Bahr core: Arabic poetry meter detection.
//!
//! Text flows through [`language`] (normalization, phoneme extraction,
//! rhythm encoding) into [`prosody`] (feet, variations, the meter pattern
//! library, detection). [`analysis`] ties both together per verse.

pub mod analysis;
pub mod config;
pub mod error;
pub mod language;
pub mod prosody;
pub mod types;

pub use analysis::{Analyzer, VerseAnalysis};
pub use error::{ProsodyError, Result};
