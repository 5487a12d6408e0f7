//! Product model: one image-backed gallery record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use daily_darshan_core::ProductId;

/// A gallery record backed by an object in the media store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    /// Database-assigned identifier (unique, stable).
    pub id: ProductId,
    /// Short text label shown on the card.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Public URL of the backing object. Must stay valid until the record
    /// is deleted or the image replaced.
    pub image_url: String,
    /// Row creation time, set by the database.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

/// Fields for updating an existing product.
///
/// `image_url` is always present: callers either pass the freshly uploaded
/// URL or carry the record's existing one forward unchanged.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub image_url: String,
}
