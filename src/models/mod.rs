//! Core data models for the catalogue service.
//!
//! Items serialize to the persisted JSON layout via `serde`; images are
//! addressed by a hash of their content.

pub mod image;
pub mod item;
