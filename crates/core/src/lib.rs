//! Core library: scanning, extraction, nearest-neighbour classification,
//! placement and the organise pipeline.

pub mod classifier;
pub mod config;
pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod placement;
pub mod review;
pub mod scanner;
