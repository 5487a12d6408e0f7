//! Product repository for database operations.
//!
//! Queries use the runtime sqlx API with `FromRow` models so the workspace
//! builds without a live database.

use sqlx::PgPool;

use daily_darshan_core::ProductId;

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductUpdate};

/// Ordering for full-list fetches.
///
/// Every fetch is deterministic: the public gallery sorts by name
/// descending, the admin list shows the newest records first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrder {
    /// Descending by `name` (public gallery).
    NameDesc,
    /// Descending by `created_at`, ties broken by `id` (admin list).
    Newest,
}

impl ProductOrder {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::NameDesc => "name DESC",
            Self::Newest => "created_at DESC, id DESC",
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch every product in the given order.
    ///
    /// The table is small by design; both pages render from a full fetch
    /// and paginate by slicing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, order: ProductOrder) -> Result<Vec<Product>, RepositoryError> {
        let query = format!(
            "SELECT id, name, description, image_url, created_at FROM product ORDER BY {}",
            order.as_sql()
        );

        let products = sqlx::query_as::<_, Product>(&query)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, image_url, created_at FROM product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Insert a new product and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO product (name, description, image_url)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, image_url, created_at
            ",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Update a product's fields and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matched the ID.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE product
            SET name = $1, description = $2, image_url = $3
            WHERE id = $4
            RETURNING id, name, description, image_url, created_at
            ",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.image_url)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(product)
    }

    /// Delete a product by its ID.
    ///
    /// # Returns
    ///
    /// Returns `true` if a row was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_sql_fragments() {
        assert_eq!(ProductOrder::NameDesc.as_sql(), "name DESC");
        assert_eq!(ProductOrder::Newest.as_sql(), "created_at DESC, id DESC");
    }
}
