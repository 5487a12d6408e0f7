//! Public gallery route handlers.
//!
//! The gallery fetches the full product list once per request (sorted by
//! name descending), shows the first `visible` cards, and grows the window
//! by [`PAGE_SIZE`] per "Load More" click. The preview dialog and the
//! notification banners are query-string state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use daily_darshan_core::ProductId;

use crate::db::{ProductOrder, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::models::Product;
use crate::state::AppState;

/// Cards revealed initially and added per "Load More" click.
pub const PAGE_SIZE: usize = 3;

/// Gallery query parameters.
///
/// The numeric parameters come from hand-editable URLs; anything that
/// doesn't parse falls back to the default instead of rejecting the
/// request.
#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    /// Number of cards currently revealed.
    #[serde(default, deserialize_with = "lenient_number")]
    pub visible: Option<usize>,
    /// Product whose image the preview dialog shows.
    #[serde(default, deserialize_with = "lenient_number")]
    pub preview: Option<i32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Deserialize an optional number from a query string, treating
/// malformed values as absent.
pub(crate) fn lenient_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Gallery page template.
#[derive(Template, WebTemplate)]
#[template(path = "gallery/index.html")]
pub struct GalleryIndexTemplate {
    pub products: Vec<ProductCard>,
    /// Window size currently shown; preview links carry it forward.
    pub visible: usize,
    /// `visible` value for the "Load More" link; `None` hides the link.
    pub load_more: Option<usize>,
    pub preview: Option<ProductCard>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Clamp the requested window and compute the next "Load More" target.
///
/// Returns `(shown, next)`: how many items to render, and the `visible`
/// value the "Load More" link should request, if any items remain hidden.
fn visible_window(requested: Option<usize>, total: usize) -> (usize, Option<usize>) {
    let window = requested.unwrap_or(PAGE_SIZE).max(PAGE_SIZE);
    let shown = window.min(total);
    let next = if shown < total {
        Some(shown + PAGE_SIZE)
    } else {
        None
    };
    (shown, next)
}

/// Display the public gallery.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> GalleryIndexTemplate {
    // Fetch failures are logged and render as an empty gallery
    let products = match ProductRepository::new(state.pool())
        .list(ProductOrder::NameDesc)
        .await
    {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            Vec::new()
        }
    };

    let (shown, load_more) = visible_window(query.visible, products.len());

    let preview = query.preview.and_then(|id| {
        products
            .iter()
            .find(|p| p.id.as_i32() == id)
            .map(ProductCard::from)
    });

    let cards: Vec<ProductCard> = products.iter().take(shown).map(ProductCard::from).collect();

    GalleryIndexTemplate {
        products: cards,
        visible: shown.max(PAGE_SIZE),
        load_more,
        preview,
        error: query.error,
        success: query.success,
    }
}

/// Download a product's image as an attachment named after the product.
#[instrument(skip(state))]
pub async fn download(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Response> {
    let failed = || Redirect::to("/?error=Download%20failed").into_response();

    let product = match ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return Ok(failed()),
        Err(e) => {
            tracing::error!("Failed to fetch product {id}: {e}");
            return Ok(failed());
        }
    };

    let Some(key) = state.media().key_from_url(&product.image_url) else {
        tracing::error!(url = %product.image_url, "image_url does not point into the media store");
        return Ok(failed());
    };

    let bytes = match state.media().read(&key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read media object {key}: {e}");
            return Ok(failed());
        }
    };

    let filename = attachment_file_name(&product.name, &key);

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&key).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Build the saved filename: product name plus the object's extension.
fn attachment_file_name(name: &str, key: &str) -> String {
    let safe_name: String = name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();

    std::path::Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| safe_name.clone(), |ext| format!("{safe_name}.{ext}"))
}

/// Content type guessed from the object key's extension.
fn content_type_for(key: &str) -> &'static str {
    let ext = std::path::Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
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
    fn test_gallery_query_swallows_malformed_numbers() {
        let query: GalleryQuery =
            serde_json::from_str(r#"{"visible":"abc","preview":"zzz"}"#).unwrap();
        assert!(query.visible.is_none());
        assert!(query.preview.is_none());

        let query: GalleryQuery = serde_json::from_str(r#"{"visible":"6","preview":"2"}"#).unwrap();
        assert_eq!(query.visible, Some(6));
        assert_eq!(query.preview, Some(2));

        let query: GalleryQuery = serde_json::from_str("{}").unwrap();
        assert!(query.visible.is_none());
    }

    #[test]
    fn test_visible_window_defaults_to_page_size() {
        assert_eq!(visible_window(None, 10), (3, Some(6)));
    }

    #[test]
    fn test_visible_window_grows_by_three() {
        assert_eq!(visible_window(Some(3), 10), (3, Some(6)));
        assert_eq!(visible_window(Some(6), 10), (6, Some(9)));
        assert_eq!(visible_window(Some(9), 10), (9, Some(12)));
    }

    #[test]
    fn test_visible_window_never_exceeds_total() {
        // Four items: first render shows 3, one click reveals the 4th
        // and the link disappears
        assert_eq!(visible_window(None, 4), (3, Some(6)));
        assert_eq!(visible_window(Some(6), 4), (4, None));
        assert_eq!(visible_window(Some(100), 4), (4, None));
    }

    #[test]
    fn test_visible_window_empty_list() {
        assert_eq!(visible_window(None, 0), (0, None));
    }

    #[test]
    fn test_visible_window_clamps_small_requests() {
        assert_eq!(visible_window(Some(1), 10), (3, Some(6)));
        assert_eq!(visible_window(Some(0), 10), (3, Some(6)));
    }

    #[test]
    fn test_template_shows_three_cards_and_load_more() {
        let template = GalleryIndexTemplate {
            products: vec![card(1, "A"), card(2, "B"), card(3, "C")],
            visible: 3,
            load_more: Some(6),
            preview: None,
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert_eq!(html.matches("class=\"card\"").count(), 3);
        assert!(html.contains("Load More"));
        assert!(html.contains("?visible=6"));
    }

    #[test]
    fn test_template_hides_load_more_when_all_visible() {
        let template = GalleryIndexTemplate {
            products: vec![card(1, "A")],
            visible: 3,
            load_more: None,
            preview: None,
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(!html.contains("Load More"));
    }

    #[test]
    fn test_template_empty_list_placeholder() {
        let template = GalleryIndexTemplate {
            products: vec![],
            visible: 3,
            load_more: None,
            preview: None,
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("No items found."));
    }

    #[test]
    fn test_template_preview_dialog() {
        let template = GalleryIndexTemplate {
            products: vec![card(1, "A")],
            visible: 3,
            load_more: None,
            preview: Some(card(1, "A")),
            error: None,
            success: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("Preview Image"));
        assert!(html.contains("1-A.jpg"));
    }

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(
            attachment_file_name("Morning Darshan", "1700000000123-photo.jpg"),
            "Morning Darshan.jpg"
        );
        assert_eq!(attachment_file_name("plain", "key-without-ext"), "plain");
        assert_eq!(
            attachment_file_name("with \" quote", "1-a.png"),
            "with _ quote.png"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("1-a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("1-a.png"), "image/png");
        assert_eq!(content_type_for("1-a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
