//! HTTP handlers for catalogue items.
//! Parses multipart uploads and path ids, then delegates to `CatalogService`.

use crate::{
    errors::AppError,
    models::item::{Item, ItemCollection},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

/// Fields accepted by `POST /items`.
#[derive(Debug, Default)]
struct AddItemForm {
    name: String,
    category: String,
    image: Option<Bytes>,
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub message: String,
}

/// `GET /items` — every item in insertion order.
pub async fn get_items(State(state): State<AppState>) -> Result<Json<ItemCollection>, AppError> {
    let items = state.catalog.list_items(&state.request_token()).await?;
    Ok(Json(items))
}

/// `POST /items` — multipart form with `name`, `category` and an optional
/// `image` file.
pub async fn add_item(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AddItemResponse>, AppError> {
    let form = parse_add_item_form(multipart).await?;

    let item = state
        .catalog
        .create_item(&state.request_token(), &form.name, &form.category, form.image)
        .await?;

    let message = format!(
        "item received: name: {}, category: {}, image_name: {}",
        item.name, item.category, item.image_ref
    );
    info!("{}", message);

    Ok(Json(AddItemResponse { message }))
}

/// `GET /items/{id}` — ordinal lookup by zero-based position.
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError> {
    let position = id
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("id should be a number: `{}`", id)))?;

    let item = state
        .catalog
        .get_item(&state.request_token(), position)
        .await?;
    Ok(Json(item))
}

async fn parse_add_item_form(mut multipart: Multipart) -> Result<AddItemForm, AppError> {
    let mut form = AddItemForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(e.status(), e.body_text()))?
    {
        match field.name() {
            Some("name") => {
                form.name = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(e.status(), e.body_text()))?;
            }
            Some("category") => {
                form.category = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(e.status(), e.body_text()))?;
            }
            Some("image") => {
                form.image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::new(e.status(), e.body_text()))?,
                );
            }
            _ => {}
        }
    }

    Ok(form)
}
