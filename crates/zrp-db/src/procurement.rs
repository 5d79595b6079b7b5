//! Purchase order queries backing C6.2 (PO receiving).

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{PoLineRow, PoRow};
use crate::now_str;

pub struct NewPoLine {
    pub ipn: String,
    pub qty_ordered: i64,
    pub unit_price: i64,
}

pub async fn create_po(
    pool: &SqlitePool,
    vendor_id: &str,
    created_by: i64,
    expected_date: Option<&str>,
    lines: Vec<NewPoLine>,
) -> Result<(PoRow, Vec<PoLineRow>)> {
    crate::with_tx(pool, |tx| {
        let vendor_id = vendor_id.to_string();
        let expected_date = expected_date.map(|s| s.to_string());
        Box::pin(async move {
            if lines.is_empty() {
                anyhow::bail!("a PO must have at least one line");
            }
            let id = crate::next_sequence_id(tx, "pos", "PO", 4).await?;
            let total: i64 = lines.iter().map(|l| l.qty_ordered * l.unit_price).sum();
            let created_at = now_str();

            sqlx::query(
                "INSERT INTO pos (id, vendor_id, status, expected_date, created_by, total, created_at)
                 VALUES (?, ?, 'draft', ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&vendor_id)
            .bind(&expected_date)
            .bind(created_by)
            .bind(total)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert po failed")?;

            let mut line_rows = Vec::with_capacity(lines.len());
            for line in &lines {
                let line_id = sqlx::query(
                    "INSERT INTO po_lines (po_id, ipn, qty_ordered, qty_received, unit_price)
                     VALUES (?, ?, ?, 0, ?)",
                )
                .bind(&id)
                .bind(&line.ipn)
                .bind(line.qty_ordered)
                .bind(line.unit_price)
                .execute(&mut **tx)
                .await
                .context("insert po line failed")?
                .last_insert_rowid();

                line_rows.push(
                    sqlx::query_as::<_, PoLineRow>("SELECT * FROM po_lines WHERE id = ?")
                        .bind(line_id)
                        .fetch_one(&mut **tx)
                        .await
                        .context("reload po line failed")?,
                );
            }

            let po = sqlx::query_as::<_, PoRow>("SELECT * FROM pos WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload po failed")?;

            Ok((po, line_rows))
        })
    })
    .await
}

pub async fn fetch_po(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<PoRow>> {
    sqlx::query_as::<_, PoRow>("SELECT * FROM pos WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_po failed")
}

/// Pool-based twin of [`fetch_po`], for read-only GET handlers.
pub async fn fetch_po_pool(pool: &SqlitePool, id: &str) -> Result<Option<PoRow>> {
    sqlx::query_as::<_, PoRow>("SELECT * FROM pos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_po_pool failed")
}

pub async fn list_pos(pool: &SqlitePool, limit: i64) -> Result<Vec<PoRow>> {
    sqlx::query_as::<_, PoRow>("SELECT * FROM pos ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_pos failed")
}

pub async fn fetch_po_lines_pool(pool: &SqlitePool, po_id: &str) -> Result<Vec<PoLineRow>> {
    sqlx::query_as::<_, PoLineRow>("SELECT * FROM po_lines WHERE po_id = ? ORDER BY id")
        .bind(po_id)
        .fetch_all(pool)
        .await
        .context("fetch_po_lines_pool failed")
}

pub async fn fetch_po_lines(
    tx: &mut Transaction<'_, Sqlite>,
    po_id: &str,
) -> Result<Vec<PoLineRow>> {
    sqlx::query_as::<_, PoLineRow>("SELECT * FROM po_lines WHERE po_id = ? ORDER BY id")
        .bind(po_id)
        .fetch_all(&mut **tx)
        .await
        .context("fetch_po_lines failed")
}

pub async fn set_po_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    received_at: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE pos SET status = ?, received_at = COALESCE(?, received_at) WHERE id = ?")
        .bind(status)
        .bind(received_at)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("set_po_status failed")?;
    Ok(())
}

pub async fn set_po_line_qty_received(
    tx: &mut Transaction<'_, Sqlite>,
    line_id: i64,
    qty_received: i64,
) -> Result<()> {
    sqlx::query("UPDATE po_lines SET qty_received = ? WHERE id = ?")
        .bind(qty_received)
        .bind(line_id)
        .execute(&mut **tx)
        .await
        .context("set_po_line_qty_received failed")?;
    Ok(())
}

pub async fn insert_receiving_inspection(
    tx: &mut Transaction<'_, Sqlite>,
    po_id: &str,
    po_line_id: i64,
    qty_received: i64,
    qty_passed: i64,
    qty_failed: i64,
    qty_on_hold: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO receiving_inspections (po_id, po_line_id, qty_received, qty_passed, qty_failed, qty_on_hold, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(po_id)
    .bind(po_line_id)
    .bind(qty_received)
    .bind(qty_passed)
    .bind(qty_failed)
    .bind(qty_on_hold)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("insert_receiving_inspection failed")?;
    Ok(())
}

pub async fn insert_price_history(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    vendor_id: &str,
    unit_price: i64,
    qty: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO price_history (ipn, vendor_id, unit_price, qty, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ipn)
    .bind(vendor_id)
    .bind(unit_price)
    .bind(qty)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("insert_price_history failed")?;
    Ok(())
}
