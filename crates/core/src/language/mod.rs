//! Text to rhythm: normalization, phoneme extraction and encoding.

pub mod encode;
pub mod normalize;
pub mod phonemes;
