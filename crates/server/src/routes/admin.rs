//! Admin editor route handlers.
//!
//! One page, two modes: create and edit, toggled by the `edit` query
//! parameter. Every mutation ends in a redirect back to `GET /darshan`,
//! so the list is always a fresh full fetch and the form comes back
//! cleared.
//!
//! Mutation sequencing keeps the record as the source of truth: replace
//! uploads and repoints before removing the old object, delete removes
//! the row before the object. A partial failure can orphan a file but
//! never leaves a record pointing at nothing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use daily_darshan_core::ProductId;

use crate::db::{ProductOrder, ProductRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{NewProduct, ProductUpdate};
use crate::routes::gallery::ProductCard;
use crate::state::AppState;

/// Admin page query parameters.
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Product being edited; absent or malformed means create mode.
    #[serde(default, deserialize_with = "crate::routes::gallery::lenient_number")]
    pub edit: Option<i32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Fields submitted through the editor form.
#[derive(Debug)]
pub struct SubmittedForm {
    pub name: String,
    pub description: String,
    pub image: Option<UploadedImage>,
}

/// An image file submitted alongside the form fields.
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Admin editor page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub products: Vec<ProductCard>,
    /// Record pre-filling the form; `None` renders create mode.
    pub editing: Option<ProductCard>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Collect the multipart form into a [`SubmittedForm`].
///
/// A file part with an empty filename or no bytes (the browser submitted
/// an untouched file input) counts as no image.
async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm> {
    let mut name = String::new();
    let mut description = String::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed form: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("malformed form: {e}")))?;
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("malformed form: {e}")))?;
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("malformed upload: {e}")))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    image = Some(UploadedImage {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(SubmittedForm {
        name,
        description,
        image,
    })
}

/// Display the editor page.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> AdminIndexTemplate {
    let repo = ProductRepository::new(state.pool());

    // Fetch failures are logged and render as an empty list
    let products = match repo.list(ProductOrder::Newest).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            Vec::new()
        }
    };

    // Unknown edit ids fall back to create mode
    let editing = match query.edit {
        Some(id) => match repo.get(ProductId::new(id)).await {
            Ok(product) => product.as_ref().map(ProductCard::from),
            Err(e) => {
                tracing::error!("Failed to fetch product {id}: {e}");
                None
            }
        },
        None => None,
    };

    AdminIndexTemplate {
        products: products.iter().map(ProductCard::from).collect(),
        editing,
        error: query.error,
        success: query.success,
    }
}

/// Create a new record: upload the image, then insert.
#[instrument(skip(state, multipart))]
pub async fn create(State(state): State<AppState>, multipart: Multipart) -> Result<Redirect> {
    let form = read_form(multipart).await?;

    // Creating without an image is the one blocking user-visible warning
    let Some(image) = form.image else {
        return Ok(Redirect::to("/darshan?error=Upload%20an%20image%20first"));
    };

    let object = match state.media().upload(&image.file_name, &image.bytes).await {
        Ok(object) => object,
        Err(e) => {
            tracing::error!("Upload error: {e}");
            return Ok(Redirect::to("/darshan?error=Upload%20failed"));
        }
    };

    let new = NewProduct {
        name: form.name,
        description: form.description,
        image_url: object.public_url,
    };

    // A failed insert after a successful upload orphans the object; the
    // stakes don't warrant compensating cleanup
    if let Err(e) = ProductRepository::new(state.pool()).insert(&new).await {
        tracing::error!("Insert error: {e}");
        return Ok(Redirect::to("/darshan?error=Could%20not%20save%20item"));
    }

    Ok(Redirect::to("/darshan?success=Item%20added"))
}

/// Update a record, replacing its image when a new one was submitted.
#[instrument(skip(state, multipart))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());

    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let form = read_form(multipart).await?;

    // No new image: the existing URL is carried forward untouched
    let (image_url, replaced_key) = match form.image {
        None => (existing.image_url.clone(), None),
        Some(image) => {
            let object = match state.media().upload(&image.file_name, &image.bytes).await {
                Ok(object) => object,
                Err(e) => {
                    tracing::error!("Upload error: {e}");
                    return Ok(Redirect::to("/darshan?error=Upload%20failed"));
                }
            };
            (
                object.public_url,
                state.media().key_from_url(&existing.image_url),
            )
        }
    };

    let update = ProductUpdate {
        name: form.name,
        description: form.description,
        image_url,
    };

    if let Err(e) = repo.update(id, &update).await {
        tracing::error!("Update error: {e}");
        return Ok(Redirect::to("/darshan?error=Could%20not%20save%20item"));
    }

    // Record repointed; the old object is now garbage. Best effort only.
    if let Some(key) = replaced_key
        && let Err(e) = state.media().remove(&key).await
    {
        tracing::warn!("Failed to remove replaced object {key}: {e}");
    }

    Ok(Redirect::to("/darshan?success=Item%20updated"))
}

/// Delete a record, then best-effort remove its object.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Redirect> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());

    // Unknown ids redirect back quietly
    let Some(existing) = repo.get(id).await? else {
        return Ok(Redirect::to("/darshan"));
    };

    if let Err(e) = repo.delete(id).await {
        tracing::error!("Delete error: {e}");
        return Ok(Redirect::to("/darshan?error=Could%20not%20delete%20item"));
    }

    if let Some(key) = state.media().key_from_url(&existing.image_url) {
        if let Err(e) = state.media().remove(&key).await {
            tracing::warn!("Failed to remove object {key}: {e}");
        }
    } else {
        tracing::warn!(url = %existing.image_url, "deleted record had a foreign image_url");
    }

    Ok(Redirect::to("/darshan?success=Item%20deleted"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn card(id: i32, name: &str) -> ProductCard {
        ProductCard {
            id,
            name: name.to_string(),
            description: format!("About {name}"),
            image_url: format!("http://localhost:3000/media/1-{name}.jpg"),
        }
    }

    #[test]
    fn test_admin_query_malformed_edit_falls_back_to_create() {
        let query: AdminQuery = serde_json::from_str(r#"{"edit":"abc"}"#).unwrap();
        assert!(query.edit.is_none());

        let query: AdminQuery = serde_json::from_str(r#"{"edit":"4"}"#).unwrap();
        assert_eq!(query.edit, Some(4));
    }

    #[test]
    fn test_template_create_mode() {
        let template = AdminIndexTemplate {
            products: vec![card(1, "A")],
            editing: None,
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("Add Item"));
        assert!(!html.contains("Update Item"));
        assert!(html.contains("action=\"/darshan\""));
    }

    #[test]
    fn test_template_edit_mode_prefills_form() {
        let template = AdminIndexTemplate {
            products: vec![card(2, "B")],
            editing: Some(card(2, "B")),
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("Update Item"));
        assert!(html.contains("Cancel"));
        assert!(html.contains("action=\"/darshan/2\""));
        assert!(html.contains("value=\"B\""));
    }

    #[test]
    fn test_template_shows_blocking_warning() {
        let template = AdminIndexTemplate {
            products: vec![],
            editing: None,
            error: Some("Upload an image first".to_string()),
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("Upload an image first"));
    }

    #[test]
    fn test_template_lists_edit_and_delete_actions() {
        let template = AdminIndexTemplate {
            products: vec![card(5, "E")],
            editing: None,
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("?edit=5"));
        assert!(html.contains("/darshan/5/delete"));
    }
}
