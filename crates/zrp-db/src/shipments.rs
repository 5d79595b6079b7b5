//! Sales order and shipment queries backing C6.7 (packing/shipping).

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{SalesOrderLineRow, ShipmentLineRow, ShipmentRow};
use crate::now_str;

pub async fn create_shipment(pool: &SqlitePool, shipment_type: &str) -> Result<ShipmentRow> {
    crate::with_tx(pool, |tx| {
        let shipment_type = shipment_type.to_string();
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "shipments", "SHP", 4).await?;
            let created_at = now_str();
            sqlx::query("INSERT INTO shipments (id, type, status, created_at) VALUES (?, ?, 'draft', ?)")
                .bind(&id)
                .bind(&shipment_type)
                .bind(&created_at)
                .execute(&mut **tx)
                .await
                .context("insert shipment failed")?;

            sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload shipment failed")
        })
    })
    .await
}

pub async fn fetch_shipment(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<ShipmentRow>> {
    sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_shipment failed")
}

/// Pool-based twin of [`fetch_shipment`], for read-only GET handlers.
pub async fn fetch_shipment_pool(pool: &SqlitePool, id: &str) -> Result<Option<ShipmentRow>> {
    sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_shipment_pool failed")
}

pub async fn list_shipments(pool: &SqlitePool, limit: i64) -> Result<Vec<ShipmentRow>> {
    sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_shipments failed")
}

pub async fn fetch_shipment_lines_pool(
    pool: &SqlitePool,
    shipment_id: &str,
) -> Result<Vec<ShipmentLineRow>> {
    sqlx::query_as::<_, ShipmentLineRow>("SELECT * FROM shipment_lines WHERE shipment_id = ?")
        .bind(shipment_id)
        .fetch_all(pool)
        .await
        .context("fetch_shipment_lines_pool failed")
}

pub async fn set_shipment_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    ship_date: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE shipments SET status = ?, ship_date = COALESCE(?, ship_date) WHERE id = ?")
        .bind(status)
        .bind(ship_date)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("set_shipment_status failed")?;
    Ok(())
}

pub async fn insert_shipment_line(
    tx: &mut Transaction<'_, Sqlite>,
    shipment_id: &str,
    sales_order_line_id: Option<i64>,
    ipn: &str,
    qty: i64,
) -> Result<ShipmentLineRow> {
    let id = sqlx::query(
        "INSERT INTO shipment_lines (shipment_id, sales_order_line_id, ipn, qty) VALUES (?, ?, ?, ?)",
    )
    .bind(shipment_id)
    .bind(sales_order_line_id)
    .bind(ipn)
    .bind(qty)
    .execute(&mut **tx)
    .await
    .context("insert_shipment_line failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, ShipmentLineRow>("SELECT * FROM shipment_lines WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("reload shipment line failed")
}

pub async fn fetch_shipment_lines(
    tx: &mut Transaction<'_, Sqlite>,
    shipment_id: &str,
) -> Result<Vec<ShipmentLineRow>> {
    sqlx::query_as::<_, ShipmentLineRow>("SELECT * FROM shipment_lines WHERE shipment_id = ?")
        .bind(shipment_id)
        .fetch_all(&mut **tx)
        .await
        .context("fetch_shipment_lines failed")
}

pub async fn fetch_sales_order_line(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<Option<SalesOrderLineRow>> {
    sqlx::query_as::<_, SalesOrderLineRow>("SELECT * FROM sales_order_lines WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_sales_order_line failed")
}

pub async fn adjust_sales_order_line_allocated(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    delta: i64,
) -> Result<()> {
    sqlx::query("UPDATE sales_order_lines SET qty_allocated = qty_allocated + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("adjust_sales_order_line_allocated failed")?;
    Ok(())
}
