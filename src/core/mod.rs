//! Core domain logic: Hangul handling, segmentation, quality validation,
//! the adaptive pipeline, TextGrid serialization, caching, and telemetry.

pub mod cache;
pub mod factory;
pub mod hangul;
pub mod pipeline;
pub mod quality;
pub mod segment;
pub mod similarity;
pub mod telemetry;
pub mod textgrid;

pub use factory::ComponentFactory;
