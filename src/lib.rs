#![recursion_limit = "256"]
//! Utilities for temporal graph learning pipelines.
//!
//! Layers, outermost first:
//!
//! * [`application`] runs a whole evaluation from a [`PipelineConfig`]
//! * [`ml`] holds the burn model plus the executor and evaluator factories
//! * [`data`] loads, splits, samples and windows temporal data
//! * [`domain`] holds plain types shared by every layer
//! * [`infra`] covers configuration, logging, seeding and checkpoints

pub mod application;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

pub use domain::error::{PipelineError, Result};
pub use domain::interaction::InteractionSet;
pub use infra::config::PipelineConfig;
pub use infra::logger::get_logger;
pub use infra::naming::trans_naming_rule;
pub use infra::seed::set_random_seed;

