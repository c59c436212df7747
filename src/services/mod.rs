//! Storage and orchestration services.
//!
//! `image_store` and `item_repository` expose narrow traits so backends can be
//! swapped; `catalog_service` composes them into the catalogue use cases.

pub(crate) mod atomic_write;
pub mod catalog_service;
pub mod image_store;
pub mod item_repository;
