use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::entity::Entity;
use crate::error::ValidationWarning;
use crate::model::{
    LineId, LineType, ReceiptHeader, ReceiptId, ReceiptLine, ReceiptStatus, Source, TaxFlag,
};

use super::{LineCategorizationUpdate, ReceiptRepository, RepositoryError, ReviewFilters};

/// Entity-routed persistence backed by two structurally identical Postgres
/// schemas (`corp`, `soleprop`). The schema name cannot be bound as a query
/// parameter, so it is interpolated into the SQL text; every other value
/// is passed through a bind parameter.
pub struct PostgresReceiptRepository {
    pool: PgPool,
}

impl PostgresReceiptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn line_type_str(t: LineType) -> &'static str {
    match t {
        LineType::Item => "item",
        LineType::Discount => "discount",
        LineType::Deposit => "deposit",
        LineType::Fee => "fee",
        LineType::Subtotal => "subtotal",
        LineType::Tax => "tax",
        LineType::Total => "total",
    }
}

fn tax_flag_str(t: TaxFlag) -> &'static str {
    match t {
        TaxFlag::Y => "Y",
        TaxFlag::Z => "Z",
        TaxFlag::N => "N",
    }
}

fn status_str(s: ReceiptStatus) -> &'static str {
    match s {
        ReceiptStatus::Pending => "pending",
        ReceiptStatus::Processing => "processing",
        ReceiptStatus::ReviewRequired => "review_required",
        ReceiptStatus::Approved => "approved",
        ReceiptStatus::Posted => "posted",
        ReceiptStatus::Rejected => "rejected",
        ReceiptStatus::Failed => "failed",
    }
}

fn source_str(s: Source) -> &'static str {
    match s {
        Source::Pwa => "pwa",
        Source::Email => "email",
        Source::Drive => "drive",
        Source::Manual => "manual",
    }
}

#[async_trait]
impl ReceiptRepository for PostgresReceiptRepository {
    async fn save_receipt(
        &self,
        entity: Entity,
        header: &ReceiptHeader,
        warnings: &[ValidationWarning],
    ) -> Result<(), RepositoryError> {
        let warnings_json =
            serde_json::to_value(warnings).map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO {schema}.receipts
                (id, source, vendor_guess, purchase_date, invoice_number, currency,
                 subtotal, tax_total, total, is_bill, payment_terms, ocr_method,
                 ocr_confidence, page_count, status, validation_warnings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                vendor_guess = $3, purchase_date = $4, invoice_number = $5, currency = $6,
                subtotal = $7, tax_total = $8, total = $9, is_bill = $10,
                payment_terms = $11, ocr_method = $12, ocr_confidence = $13,
                page_count = $14, status = $15, validation_warnings = $16
            "#,
            schema = entity.schema(),
        );

        sqlx::query(&sql)
            .bind(header.id)
            .bind(source_str(header.source))
            .bind(&header.vendor_guess)
            .bind(header.purchase_date)
            .bind(&header.invoice_number)
            .bind(&header.currency)
            .bind(header.subtotal)
            .bind(header.tax_total)
            .bind(header.total)
            .bind(header.is_bill)
            .bind(&header.payment_terms)
            .bind(format!("{:?}", header.ocr_method))
            .bind(header.ocr_confidence as f64)
            .bind(header.page_count as i32)
            .bind(status_str(header.status))
            .bind(warnings_json)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn save_lines(
        &self,
        entity: Entity,
        receipt_id: ReceiptId,
        lines: &[ReceiptLine],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO {schema}.receipt_lines
                (id, receipt_id, line_index, line_type, sku, upc, raw_text, quantity,
                 unit_price, line_total, tax_flag, tax_amount, normalized_description,
                 product_category, account_code, brand, confidence, requires_review,
                 ai_cost_usd)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (receipt_id, line_index) DO UPDATE SET
                line_type = $4, sku = $5, upc = $6, raw_text = $7, quantity = $8,
                unit_price = $9, line_total = $10, tax_flag = $11, tax_amount = $12,
                normalized_description = $13, product_category = $14, account_code = $15,
                brand = $16, confidence = $17, requires_review = $18, ai_cost_usd = $19
            "#,
            schema = entity.schema(),
        );

        for line in lines {
            sqlx::query(&sql)
                .bind(line.id)
                .bind(receipt_id)
                .bind(line.line_index as i32)
                .bind(line_type_str(line.line_type))
                .bind(&line.sku)
                .bind(&line.upc)
                .bind(&line.raw_text)
                .bind(line.quantity)
                .bind(line.unit_price)
                .bind(line.line_total)
                .bind(tax_flag_str(line.tax_flag))
                .bind(line.tax_amount)
                .bind(&line.normalized_description)
                .bind(&line.product_category)
                .bind(&line.account_code)
                .bind(&line.brand)
                .bind(line.confidence)
                .bind(line.requires_review)
                .bind(line.ai_cost_usd)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_lines_for_review(
        &self,
        entity: Entity,
        filters: ReviewFilters,
    ) -> Result<Vec<ReceiptLine>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT rl.id, rl.line_index, rl.line_type, rl.sku, rl.upc, rl.raw_text,
                   rl.quantity, rl.unit_price, rl.line_total, rl.tax_flag, rl.tax_amount,
                   rl.normalized_description, rl.product_category, rl.account_code,
                   rl.brand, rl.confidence, rl.requires_review, rl.ai_cost_usd
              FROM {schema}.receipt_lines rl
              JOIN {schema}.receipts r ON r.id = rl.receipt_id
             WHERE rl.requires_review = true
               AND ($1::text IS NULL OR r.vendor_guess = $1)
               AND ($2::date IS NULL OR r.purchase_date >= $2)
               AND ($3::date IS NULL OR r.purchase_date <= $3)
               AND ($4::double precision IS NULL OR rl.confidence <= $4)
             ORDER BY r.purchase_date DESC, rl.line_index ASC
            "#,
            schema = entity.schema(),
        );

        let rows = sqlx::query(&sql)
            .bind(&filters.vendor)
            .bind(filters.date_from)
            .bind(filters.date_to)
            .bind(filters.max_confidence)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        rows.into_iter().map(row_to_line).collect()
    }

    async fn update_line_categorization(
        &self,
        entity: Entity,
        line_id: LineId,
        fields: LineCategorizationUpdate,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {schema}.receipt_lines
               SET normalized_description = COALESCE($2, normalized_description),
                   product_category = COALESCE($3, product_category),
                   account_code = COALESCE($4, account_code),
                   brand = COALESCE($5, brand),
                   requires_review = COALESCE($6, requires_review)
             WHERE id = $1
            "#,
            schema = entity.schema(),
        );

        sqlx::query(&sql)
            .bind(line_id)
            .bind(fields.normalized_description)
            .bind(fields.product_category)
            .bind(fields.account_code)
            .bind(fields.brand)
            .bind(fields.requires_review)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn row_to_line(row: sqlx::postgres::PgRow) -> Result<ReceiptLine, RepositoryError> {
    let line_type: String = row.try_get("line_type").map_err(|e| RepositoryError::Storage(e.to_string()))?;
    let tax_flag: String = row.try_get("tax_flag").map_err(|e| RepositoryError::Storage(e.to_string()))?;

    Ok(ReceiptLine {
        id: row.try_get("id").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        line_index: row.try_get::<i32, _>("line_index").map_err(|e| RepositoryError::Storage(e.to_string()))? as u32,
        line_type: match line_type.as_str() {
            "item" => LineType::Item,
            "discount" => LineType::Discount,
            "deposit" => LineType::Deposit,
            "fee" => LineType::Fee,
            "subtotal" => LineType::Subtotal,
            "tax" => LineType::Tax,
            _ => LineType::Total,
        },
        sku: row.try_get("sku").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        upc: row.try_get("upc").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        raw_text: row.try_get("raw_text").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        quantity: row.try_get::<Option<Decimal>, _>("quantity").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        unit_price: row.try_get::<Option<Decimal>, _>("unit_price").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        line_total: row.try_get("line_total").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        tax_flag: match tax_flag.as_str() {
            "Y" => TaxFlag::Y,
            "Z" => TaxFlag::Z,
            _ => TaxFlag::N,
        },
        tax_amount: row.try_get::<Option<Decimal>, _>("tax_amount").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        normalized_description: row.try_get("normalized_description").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        product_category: row.try_get("product_category").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        account_code: row.try_get("account_code").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        brand: row.try_get("brand").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        confidence: row.try_get("confidence").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        requires_review: row.try_get("requires_review").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        ai_cost_usd: row.try_get::<Option<Decimal>, _>("ai_cost_usd").map_err(|e| RepositoryError::Storage(e.to_string()))?,
        bounding_box: None,
    })
}
