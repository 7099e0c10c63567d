//! Core business logic modules.

pub mod classifier;
pub mod episode;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod quarantine;
pub mod resolver;
pub mod retry;
pub mod scanner;
