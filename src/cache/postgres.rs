use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::recognizer::ProductCategory;

use super::{CacheError, CachedEntry, CategorizationCache, CorrectedMapping, NewProductMapping};

pub struct PostgresCategorizationCache {
    pool: PgPool,
}

impl PostgresCategorizationCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: sqlx::postgres::PgRow) -> Result<CachedEntry, CacheError> {
    let product_category: String =
        row.try_get("product_category").map_err(|e| CacheError::Storage(e.to_string()))?;
    let product_category = ProductCategory::from_code(&product_category).ok_or_else(|| {
        CacheError::Storage(format!("cache row holds an unrecognized product_category '{product_category}'"))
    })?;

    Ok(CachedEntry {
        normalized_description: row
            .try_get("normalized_description")
            .map_err(|e| CacheError::Storage(e.to_string()))?,
        product_category,
        brand: row.try_get("brand").map_err(|e| CacheError::Storage(e.to_string()))?,
        account_code: row.try_get("account_code").map_err(|e| CacheError::Storage(e.to_string()))?,
        user_confidence: row.try_get("user_confidence").map_err(|e| CacheError::Storage(e.to_string()))?,
        times_seen: row.try_get("times_seen").map_err(|e| CacheError::Storage(e.to_string()))?,
        first_seen: row.try_get("first_seen").map_err(|e| CacheError::Storage(e.to_string()))?,
        last_seen: row.try_get("last_seen").map_err(|e| CacheError::Storage(e.to_string()))?,
    })
}

#[async_trait]
impl CategorizationCache for PostgresCategorizationCache {
    async fn get(&self, vendor_canonical: &str, sku: &str) -> Result<Option<CachedEntry>, CacheError> {
        let sql = r#"
            UPDATE product_mappings
               SET times_seen = times_seen + 1,
                   last_seen = now()
             WHERE vendor_canonical = $1 AND sku = $2
         RETURNING
               normalized_description,
               product_category,
               brand,
               account_code,
               user_confidence,
               times_seen,
               first_seen,
               last_seen
        "#;

        let row = sqlx::query(sql)
            .bind(vendor_canonical)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        row.map(row_to_entry).transpose()
    }

    async fn put(&self, vendor_canonical: &str, sku: &str, entry: NewProductMapping) -> Result<(), CacheError> {
        let sql = r#"
            INSERT INTO product_mappings
                (vendor_canonical, sku, normalized_description, product_category, brand,
                 account_code, user_confidence, times_seen, first_seen, last_seen)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, now(), now())
            ON CONFLICT (vendor_canonical, sku) DO UPDATE
                SET times_seen = product_mappings.times_seen + 1,
                    last_seen = now()
        "#;

        sqlx::query(sql)
            .bind(vendor_canonical)
            .bind(sku)
            .bind(&entry.normalized_description)
            .bind(entry.product_category.as_code())
            .bind(&entry.brand)
            .bind(&entry.account_code)
            .bind(entry.user_confidence)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn correct(
        &self,
        vendor_canonical: &str,
        sku: &str,
        entry: CorrectedMapping,
        actor: &str,
    ) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await.map_err(|e| CacheError::Storage(e.to_string()))?;

        let upsert_sql = r#"
            INSERT INTO product_mappings
                (vendor_canonical, sku, normalized_description, product_category, brand,
                 account_code, user_confidence, times_seen, first_seen, last_seen)
            VALUES ($1, $2, $3, $4, $5, $6, 1.0, 1, now(), now())
            ON CONFLICT (vendor_canonical, sku) DO UPDATE
                SET normalized_description = $3,
                    product_category = $4,
                    brand = $5,
                    account_code = $6,
                    user_confidence = 1.0,
                    last_seen = now()
        "#;

        sqlx::query(upsert_sql)
            .bind(vendor_canonical)
            .bind(sku)
            .bind(&entry.normalized_description)
            .bind(entry.product_category.as_code())
            .bind(&entry.brand)
            .bind(&entry.account_code)
            .execute(&mut *tx)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        let activity_sql = r#"
            INSERT INTO review_activity (vendor_canonical, sku, actor, action, created_at)
            VALUES ($1, $2, $3, 'correct', now())
        "#;

        sqlx::query(activity_sql)
            .bind(vendor_canonical)
            .bind(sku)
            .bind(actor)
            .execute(&mut *tx)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        tx.commit().await.map_err(|e| CacheError::Storage(e.to_string()))?;

        Ok(())
    }
}
