//! Generic CRUD for entities that don't carry a dedicated state machine:
//! vendors, RFQs, sales orders, field reports, documents, WO serials and
//! test records. Grounded on the teacher's flatter `mqk-db` accessors for
//! reference/lookup tables that don't need transactional composition.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::now_str;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct VendorRow {
    pub id: String,
    pub name: String,
    pub contact: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_vendor(pool: &SqlitePool, name: &str, contact: Option<&str>) -> Result<VendorRow> {
    crate::with_tx(pool, |tx| {
        let name = name.to_string();
        let contact = contact.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "vendors", "VEN", 4).await?;
            sqlx::query("INSERT INTO vendors (id, name, contact, created_at) VALUES (?, ?, ?, ?)")
                .bind(&id)
                .bind(&name)
                .bind(&contact)
                .bind(now_str())
                .execute(&mut **tx)
                .await
                .context("insert vendor failed")?;

            sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload vendor failed")
        })
    })
    .await
}

pub async fn fetch_vendor(pool: &SqlitePool, id: &str) -> Result<Option<VendorRow>> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_vendor failed")
}

pub async fn list_vendors(pool: &SqlitePool) -> Result<Vec<VendorRow>> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors ORDER BY name")
        .fetch_all(pool)
        .await
        .context("list_vendors failed")
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct RfqRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_rfq(pool: &SqlitePool, title: &str, vendor_ids: &[String], lines: &[(String, i64)]) -> Result<RfqRow> {
    crate::with_tx(pool, |tx| {
        let title = title.to_string();
        let vendor_ids = vendor_ids.to_vec();
        let lines = lines.to_vec();
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "rfqs", "RFQ", 4).await?;
            sqlx::query("INSERT INTO rfqs (id, title, status, created_at) VALUES (?, ?, 'open', ?)")
                .bind(&id)
                .bind(&title)
                .bind(now_str())
                .execute(&mut **tx)
                .await
                .context("insert rfq failed")?;

            for vendor_id in &vendor_ids {
                sqlx::query("INSERT INTO rfq_vendors (rfq_id, vendor_id) VALUES (?, ?)")
                    .bind(&id)
                    .bind(vendor_id)
                    .execute(&mut **tx)
                    .await
                    .context("insert rfq_vendor failed")?;
            }
            for (ipn, qty) in &lines {
                sqlx::query("INSERT INTO rfq_lines (rfq_id, ipn, qty) VALUES (?, ?, ?)")
                    .bind(&id)
                    .bind(ipn)
                    .bind(qty)
                    .execute(&mut **tx)
                    .await
                    .context("insert rfq_line failed")?;
            }

            sqlx::query_as::<_, RfqRow>("SELECT * FROM rfqs WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload rfq failed")
        })
    })
    .await
}

pub async fn fetch_rfq(pool: &SqlitePool, id: &str) -> Result<Option<RfqRow>> {
    sqlx::query_as::<_, RfqRow>("SELECT * FROM rfqs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_rfq failed")
}

pub async fn list_rfqs(pool: &SqlitePool) -> Result<Vec<RfqRow>> {
    sqlx::query_as::<_, RfqRow>("SELECT * FROM rfqs ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .context("list_rfqs failed")
}

pub async fn record_rfq_quote(
    pool: &SqlitePool,
    rfq_line_id: i64,
    vendor_id: &str,
    unit_price: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO rfq_quotes (rfq_line_id, vendor_id, unit_price, awarded, created_at) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(rfq_line_id)
    .bind(vendor_id)
    .bind(unit_price)
    .bind(now_str())
    .execute(pool)
    .await
    .context("record_rfq_quote failed")?;
    Ok(())
}

pub async fn award_rfq_quote(pool: &SqlitePool, quote_id: i64) -> Result<()> {
    sqlx::query("UPDATE rfq_quotes SET awarded = 1 WHERE id = ?")
        .bind(quote_id)
        .execute(pool)
        .await
        .context("award_rfq_quote failed")?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SalesOrderRow {
    pub id: String,
    pub customer: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_sales_order(
    pool: &SqlitePool,
    customer: &str,
    lines: &[(String, i64)],
) -> Result<SalesOrderRow> {
    crate::with_tx(pool, |tx| {
        let customer = customer.to_string();
        let lines = lines.to_vec();
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "sales_orders", "SO", 4).await?;
            sqlx::query("INSERT INTO sales_orders (id, customer, created_at) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(&customer)
                .bind(now_str())
                .execute(&mut **tx)
                .await
                .context("insert sales_order failed")?;

            for (ipn, qty) in &lines {
                sqlx::query(
                    "INSERT INTO sales_order_lines (sales_order_id, ipn, qty, qty_allocated) VALUES (?, ?, ?, 0)",
                )
                .bind(&id)
                .bind(ipn)
                .bind(qty)
                .execute(&mut **tx)
                .await
                .context("insert sales_order_line failed")?;
            }

            sqlx::query_as::<_, SalesOrderRow>("SELECT * FROM sales_orders WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload sales_order failed")
        })
    })
    .await
}

pub async fn fetch_sales_order(pool: &SqlitePool, id: &str) -> Result<Option<SalesOrderRow>> {
    sqlx::query_as::<_, SalesOrderRow>("SELECT * FROM sales_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_sales_order failed")
}

pub async fn list_sales_orders(pool: &SqlitePool) -> Result<Vec<SalesOrderRow>> {
    sqlx::query_as::<_, SalesOrderRow>("SELECT * FROM sales_orders ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .context("list_sales_orders failed")
}

pub async fn fetch_sales_order_lines(
    pool: &SqlitePool,
    sales_order_id: &str,
) -> Result<Vec<crate::model::SalesOrderLineRow>> {
    sqlx::query_as::<_, crate::model::SalesOrderLineRow>(
        "SELECT * FROM sales_order_lines WHERE sales_order_id = ? ORDER BY id",
    )
    .bind(sales_order_id)
    .fetch_all(pool)
    .await
    .context("fetch_sales_order_lines failed")
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct FieldReportRow {
    pub id: String,
    pub priority: String,
    pub title: String,
    pub description: Option<String>,
    pub ncr_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_field_report(
    pool: &SqlitePool,
    priority: &str,
    title: &str,
    description: Option<&str>,
    ncr_id: Option<&str>,
) -> Result<FieldReportRow> {
    crate::with_tx(pool, |tx| {
        let priority = priority.to_string();
        let title = title.to_string();
        let description = description.map(|s| s.to_string());
        let ncr_id = ncr_id.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "field_reports", "FR", 4).await?;
            sqlx::query(
                "INSERT INTO field_reports (id, priority, title, description, ncr_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&priority)
            .bind(&title)
            .bind(&description)
            .bind(&ncr_id)
            .bind(now_str())
            .execute(&mut **tx)
            .await
            .context("insert field_report failed")?;

            sqlx::query_as::<_, FieldReportRow>("SELECT * FROM field_reports WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload field_report failed")
        })
    })
    .await
}

pub async fn fetch_field_report(pool: &SqlitePool, id: &str) -> Result<Option<FieldReportRow>> {
    sqlx::query_as::<_, FieldReportRow>("SELECT * FROM field_reports WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_field_report failed")
}

pub async fn list_field_reports(pool: &SqlitePool) -> Result<Vec<FieldReportRow>> {
    sqlx::query_as::<_, FieldReportRow>("SELECT * FROM field_reports ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .context("list_field_reports failed")
}

/// NCR creation from an existing field report (§4.6.6): the field report's
/// `ncr_id` is set once the linked NCR exists, kept separate from
/// [`create_field_report`] since a field report may outlive several
/// investigation steps before an NCR is opened.
pub async fn set_field_report_ncr(pool: &SqlitePool, id: &str, ncr_id: &str) -> Result<()> {
    sqlx::query("UPDATE field_reports SET ncr_id = ? WHERE id = ?")
        .bind(ncr_id)
        .bind(id)
        .execute(pool)
        .await
        .context("set_field_report_ncr failed")?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct DocumentRow {
    pub id: String,
    pub module: String,
    pub record_id: String,
    pub name: String,
    pub path: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn attach_document(
    pool: &SqlitePool,
    module: &str,
    record_id: &str,
    name: &str,
    path: &str,
) -> Result<DocumentRow> {
    crate::with_tx(pool, |tx| {
        let module = module.to_string();
        let record_id = record_id.to_string();
        let name = name.to_string();
        let path = path.to_string();
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "documents", "DOC", 4).await?;
            sqlx::query(
                "INSERT INTO documents (id, module, record_id, name, path, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&module)
            .bind(&record_id)
            .bind(&name)
            .bind(&path)
            .bind(now_str())
            .execute(&mut **tx)
            .await
            .context("insert document failed")?;

            sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload document failed")
        })
    })
    .await
}

pub async fn fetch_documents_for_record(
    pool: &SqlitePool,
    module: &str,
    record_id: &str,
) -> Result<Vec<DocumentRow>> {
    sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM documents WHERE module = ? AND record_id = ? ORDER BY created_at DESC",
    )
    .bind(module)
    .bind(record_id)
    .fetch_all(pool)
    .await
    .context("fetch_documents_for_record failed")
}
