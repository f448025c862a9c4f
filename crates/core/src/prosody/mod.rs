//! Feet, variations, meter definitions, the pattern library and detection.

pub mod detector;
pub mod library;
pub mod meters;
pub mod similarity;
pub mod tafila;
pub mod variations;
