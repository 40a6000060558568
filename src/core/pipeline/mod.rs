//! The adaptive processing pipeline: controller, strategies, and results.

pub mod controller;
pub mod result;
pub mod strategy;

pub use controller::{CancelFlag, PipelineController, PipelineRequest};
pub use result::{PipelineResult, Warning};
pub use strategy::{AudioAdjustments, ReprocessingStrategy, SttAdjustments, select_strategy};
