//! Work order queries backing C6.3 (reservation + consumption).

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{WoReservationRow, WorkOrderRow};
use crate::now_str;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct WoSerialRow {
    pub serial_number: String,
    pub wo_id: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TestRecordRow {
    pub id: i64,
    pub serial_number: String,
    pub ipn: String,
    pub firmware_version: Option<String>,
    pub test_type: String,
    pub result: String,
    pub measurements: String,
    pub tested_by: i64,
    pub tested_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_work_order(
    pool: &SqlitePool,
    assembly_ipn: &str,
    qty: i64,
    priority: &str,
    notes: Option<&str>,
    due_date: Option<&str>,
) -> Result<WorkOrderRow> {
    crate::with_tx(pool, |tx| {
        let assembly_ipn = assembly_ipn.to_string();
        let priority = priority.to_string();
        let notes = notes.map(|s| s.to_string());
        let due_date = due_date.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "work_orders", "WO", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO work_orders (id, assembly_ipn, qty, qty_good, qty_scrap, status, priority, notes, due_date, created_at)
                 VALUES (?, ?, ?, 0, 0, 'open', ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&assembly_ipn)
            .bind(qty)
            .bind(&priority)
            .bind(&notes)
            .bind(&due_date)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert work_order failed")?;

            sqlx::query_as::<_, WorkOrderRow>("SELECT * FROM work_orders WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload work_order failed")
        })
    })
    .await
}

pub async fn fetch_work_order(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<WorkOrderRow>> {
    sqlx::query_as::<_, WorkOrderRow>("SELECT * FROM work_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_work_order failed")
}

/// Pool-based twin of [`fetch_work_order`], for read-only GET handlers.
pub async fn fetch_work_order_pool(pool: &SqlitePool, id: &str) -> Result<Option<WorkOrderRow>> {
    sqlx::query_as::<_, WorkOrderRow>("SELECT * FROM work_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_work_order_pool failed")
}

pub async fn list_work_orders(pool: &SqlitePool, limit: i64) -> Result<Vec<WorkOrderRow>> {
    sqlx::query_as::<_, WorkOrderRow>("SELECT * FROM work_orders ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_work_orders failed")
}

pub async fn fetch_wo_serials_pool(pool: &SqlitePool, wo_id: &str) -> Result<Vec<WoSerialRow>> {
    sqlx::query_as::<_, WoSerialRow>("SELECT * FROM wo_serials WHERE wo_id = ?")
        .bind(wo_id)
        .fetch_all(pool)
        .await
        .context("fetch_wo_serials_pool failed")
}

pub async fn set_work_order_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    qty_good: Option<i64>,
    qty_scrap: Option<i64>,
) -> Result<()> {
    sqlx::query(
        "UPDATE work_orders SET status = ?, qty_good = COALESCE(?, qty_good), qty_scrap = COALESCE(?, qty_scrap), updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(qty_good)
    .bind(qty_scrap)
    .bind(now_str())
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("set_work_order_status failed")?;
    Ok(())
}

pub async fn insert_wo_reservation(
    tx: &mut Transaction<'_, Sqlite>,
    wo_id: &str,
    ipn: &str,
    qty_reserved: i64,
) -> Result<()> {
    sqlx::query("INSERT INTO wo_reservations (wo_id, ipn, qty_reserved, released) VALUES (?, ?, ?, 0)")
        .bind(wo_id)
        .bind(ipn)
        .bind(qty_reserved)
        .execute(&mut **tx)
        .await
        .context("insert_wo_reservation failed")?;
    Ok(())
}

pub async fn fetch_wo_reservations(
    tx: &mut Transaction<'_, Sqlite>,
    wo_id: &str,
) -> Result<Vec<WoReservationRow>> {
    sqlx::query_as::<_, WoReservationRow>(
        "SELECT * FROM wo_reservations WHERE wo_id = ? AND released = 0",
    )
    .bind(wo_id)
    .fetch_all(&mut **tx)
    .await
    .context("fetch_wo_reservations failed")
}

pub async fn mark_wo_reservations_released(
    tx: &mut Transaction<'_, Sqlite>,
    wo_id: &str,
) -> Result<()> {
    sqlx::query("UPDATE wo_reservations SET released = 1 WHERE wo_id = ?")
        .bind(wo_id)
        .execute(&mut **tx)
        .await
        .context("mark_wo_reservations_released failed")?;
    Ok(())
}

pub async fn create_wo_serial(
    tx: &mut Transaction<'_, Sqlite>,
    serial_number: &str,
    wo_id: &str,
) -> Result<WoSerialRow> {
    sqlx::query(
        "INSERT INTO wo_serials (serial_number, wo_id, status, created_at) VALUES (?, ?, 'building', ?)",
    )
    .bind(serial_number)
    .bind(wo_id)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("insert wo_serial failed")?;

    sqlx::query_as::<_, WoSerialRow>("SELECT * FROM wo_serials WHERE serial_number = ?")
        .bind(serial_number)
        .fetch_one(&mut **tx)
        .await
        .context("reload wo_serial failed")
}

pub async fn set_wo_serial_status(
    tx: &mut Transaction<'_, Sqlite>,
    serial_number: &str,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE wo_serials SET status = ? WHERE serial_number = ?")
        .bind(status)
        .bind(serial_number)
        .execute(&mut **tx)
        .await
        .context("set_wo_serial_status failed")?;
    Ok(())
}

pub async fn fetch_wo_serials(
    tx: &mut Transaction<'_, Sqlite>,
    wo_id: &str,
) -> Result<Vec<WoSerialRow>> {
    sqlx::query_as::<_, WoSerialRow>("SELECT * FROM wo_serials WHERE wo_id = ?")
        .bind(wo_id)
        .fetch_all(&mut **tx)
        .await
        .context("fetch_wo_serials failed")
}

pub async fn insert_test_record(
    tx: &mut Transaction<'_, Sqlite>,
    serial_number: &str,
    ipn: &str,
    firmware_version: Option<&str>,
    test_type: &str,
    result: &str,
    measurements_json: &str,
    tested_by: i64,
) -> Result<TestRecordRow> {
    let tested_at = now_str();
    let id = sqlx::query(
        "INSERT INTO test_records (serial_number, ipn, firmware_version, test_type, result, measurements, tested_by, tested_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(serial_number)
    .bind(ipn)
    .bind(firmware_version)
    .bind(test_type)
    .bind(result)
    .bind(measurements_json)
    .bind(tested_by)
    .bind(&tested_at)
    .execute(&mut **tx)
    .await
    .context("insert test_record failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, TestRecordRow>("SELECT * FROM test_records WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("reload test_record failed")
}
