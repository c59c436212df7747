//! HTTP handlers. Each one extracts request data, calls `CatalogService` and
//! maps its errors through `AppError`.

pub mod health_handlers;
pub mod image_handlers;
pub mod item_handlers;
