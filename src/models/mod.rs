//! Data models.

pub mod config;
pub mod group;
pub mod media;
pub mod plan;
pub mod summary;
