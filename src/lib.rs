//! Catalogue service: items with content-addressed images, served over HTTP.
//!
//! Item metadata lives in a flat JSON file; images live in one directory,
//! named by the SHA-256 of their content.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
