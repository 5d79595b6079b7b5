//! Engineering-change and quality queries (ECO / NCR / CAPA / RMA), C6.5–C6.7.

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{CapaRow, EcoPartChangeRow, EcoRevisionRow, EcoRow, NcrRow, RmaRow};
use crate::now_str;

// ---------------------------------------------------------------------------
// ECO
// ---------------------------------------------------------------------------

pub async fn create_eco(
    pool: &SqlitePool,
    title: &str,
    description: &str,
    priority: &str,
    affected_ipns_json: &str,
    ncr_id: Option<&str>,
) -> Result<EcoRow> {
    crate::with_tx(pool, |tx| {
        let title = title.to_string();
        let description = description.to_string();
        let priority = priority.to_string();
        let affected_ipns_json = affected_ipns_json.to_string();
        let ncr_id = ncr_id.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "ecos", "ECO", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO ecos (id, title, description, status, priority, affected_ipns, ncr_id, created_at)
                 VALUES (?, ?, ?, 'draft', ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&title)
            .bind(&description)
            .bind(&priority)
            .bind(&affected_ipns_json)
            .bind(&ncr_id)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert eco failed")?;

            sqlx::query_as::<_, EcoRow>("SELECT * FROM ecos WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload eco failed")
        })
    })
    .await
}

pub async fn fetch_eco(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<EcoRow>> {
    sqlx::query_as::<_, EcoRow>("SELECT * FROM ecos WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_eco failed")
}

/// Pool-based twin of [`fetch_eco`], for read-only GET handlers.
pub async fn fetch_eco_pool(pool: &SqlitePool, id: &str) -> Result<Option<EcoRow>> {
    sqlx::query_as::<_, EcoRow>("SELECT * FROM ecos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_eco_pool failed")
}

pub async fn list_ecos(pool: &SqlitePool, limit: i64) -> Result<Vec<EcoRow>> {
    sqlx::query_as::<_, EcoRow>("SELECT * FROM ecos ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_ecos failed")
}

pub async fn set_eco_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    approved_by: Option<i64>,
    approved_at: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE ecos SET status = ?, approved_by = COALESCE(?, approved_by), approved_at = COALESCE(?, approved_at), updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(approved_by)
    .bind(approved_at)
    .bind(now_str())
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("set_eco_status failed")?;
    Ok(())
}

pub async fn latest_eco_revision(
    tx: &mut Transaction<'_, Sqlite>,
    eco_id: &str,
) -> Result<Option<EcoRevisionRow>> {
    sqlx::query_as::<_, EcoRevisionRow>(
        "SELECT * FROM eco_revisions WHERE eco_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(eco_id)
    .fetch_optional(&mut **tx)
    .await
    .context("latest_eco_revision failed")
}

pub async fn insert_eco_revision(
    tx: &mut Transaction<'_, Sqlite>,
    eco_id: &str,
    letter: &str,
) -> Result<EcoRevisionRow> {
    let created_at = now_str();
    let id = sqlx::query(
        "INSERT INTO eco_revisions (eco_id, letter, status, created_at) VALUES (?, ?, 'created', ?)",
    )
    .bind(eco_id)
    .bind(letter)
    .bind(&created_at)
    .execute(&mut **tx)
    .await
    .context("insert_eco_revision failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, EcoRevisionRow>("SELECT * FROM eco_revisions WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("reload eco revision failed")
}

pub async fn set_eco_revision_status(
    tx: &mut Transaction<'_, Sqlite>,
    revision_id: i64,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE eco_revisions SET status = ? WHERE id = ?")
        .bind(status)
        .bind(revision_id)
        .execute(&mut **tx)
        .await
        .context("set_eco_revision_status failed")?;
    Ok(())
}

pub async fn fetch_eco_part_changes(
    tx: &mut Transaction<'_, Sqlite>,
    eco_id: &str,
) -> Result<Vec<EcoPartChangeRow>> {
    sqlx::query_as::<_, EcoPartChangeRow>(
        "SELECT * FROM eco_part_changes WHERE eco_id = ? AND applied = 0",
    )
    .bind(eco_id)
    .fetch_all(&mut **tx)
    .await
    .context("fetch_eco_part_changes failed")
}

pub async fn apply_eco_part_change(
    tx: &mut Transaction<'_, Sqlite>,
    change: &EcoPartChangeRow,
) -> Result<()> {
    // §3 Part has a closed set of named columns; only those the ECO staged
    // change mechanism is allowed to touch are matched here.
    let column = match change.field.as_str() {
        "description" => "description",
        "status" => "status",
        "lifecycle" => "lifecycle",
        "category" => "category",
        other => anyhow::bail!("ECO part change targets unsupported field {other}"),
    };
    let query = format!("UPDATE parts SET {column} = ?, updated_at = ? WHERE ipn = ?");
    sqlx::query(&query)
        .bind(&change.new_value)
        .bind(now_str())
        .bind(&change.ipn)
        .execute(&mut **tx)
        .await
        .context("apply_eco_part_change failed")?;

    sqlx::query("UPDATE eco_part_changes SET applied = 1 WHERE id = ?")
        .bind(change.id)
        .execute(&mut **tx)
        .await
        .context("mark eco part change applied failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// NCR
// ---------------------------------------------------------------------------

pub async fn create_ncr(
    pool: &SqlitePool,
    title: &str,
    severity: &str,
    ipn: Option<&str>,
    serial_number: Option<&str>,
    defect_type: Option<&str>,
    created_by: i64,
) -> Result<NcrRow> {
    crate::with_tx(pool, |tx| {
        let title = title.to_string();
        let severity = severity.to_string();
        let ipn = ipn.map(|s| s.to_string());
        let serial_number = serial_number.map(|s| s.to_string());
        let defect_type = defect_type.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "ncrs", "NCR", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO ncrs (id, title, severity, status, ipn, serial_number, defect_type, created_by, created_at)
                 VALUES (?, ?, ?, 'open', ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&title)
            .bind(&severity)
            .bind(&ipn)
            .bind(&serial_number)
            .bind(&defect_type)
            .bind(created_by)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert ncr failed")?;

            sqlx::query_as::<_, NcrRow>("SELECT * FROM ncrs WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload ncr failed")
        })
    })
    .await
}

pub async fn fetch_ncr(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<NcrRow>> {
    sqlx::query_as::<_, NcrRow>("SELECT * FROM ncrs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_ncr failed")
}

/// Pool-based twin of [`fetch_ncr`], for read-only GET handlers.
pub async fn fetch_ncr_pool(pool: &SqlitePool, id: &str) -> Result<Option<NcrRow>> {
    sqlx::query_as::<_, NcrRow>("SELECT * FROM ncrs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_ncr_pool failed")
}

pub async fn list_ncrs(pool: &SqlitePool, limit: i64) -> Result<Vec<NcrRow>> {
    sqlx::query_as::<_, NcrRow>("SELECT * FROM ncrs ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_ncrs failed")
}

pub async fn set_ncr_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    resolved_at: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE ncrs SET status = ?, resolved_at = COALESCE(?, resolved_at) WHERE id = ?")
        .bind(status)
        .bind(resolved_at)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("set_ncr_status failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CAPA
// ---------------------------------------------------------------------------

pub async fn create_capa(
    pool: &SqlitePool,
    capa_type: &str,
    linked_ncr_id: Option<&str>,
    linked_rma_id: Option<&str>,
) -> Result<CapaRow> {
    crate::with_tx(pool, |tx| {
        let capa_type = capa_type.to_string();
        let linked_ncr_id = linked_ncr_id.map(|s| s.to_string());
        let linked_rma_id = linked_rma_id.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "capas", "CAPA", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO capas (id, type, linked_ncr_id, linked_rma_id, status, created_at)
                 VALUES (?, ?, ?, ?, 'open', ?)",
            )
            .bind(&id)
            .bind(&capa_type)
            .bind(&linked_ncr_id)
            .bind(&linked_rma_id)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert capa failed")?;

            sqlx::query_as::<_, CapaRow>("SELECT * FROM capas WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload capa failed")
        })
    })
    .await
}

pub async fn fetch_capa(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<CapaRow>> {
    sqlx::query_as::<_, CapaRow>("SELECT * FROM capas WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_capa failed")
}

/// Pool-based twin of [`fetch_capa`], for read-only GET handlers.
pub async fn fetch_capa_pool(pool: &SqlitePool, id: &str) -> Result<Option<CapaRow>> {
    sqlx::query_as::<_, CapaRow>("SELECT * FROM capas WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_capa_pool failed")
}

pub async fn list_capas(pool: &SqlitePool, limit: i64) -> Result<Vec<CapaRow>> {
    sqlx::query_as::<_, CapaRow>("SELECT * FROM capas ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_capas failed")
}

pub async fn set_capa_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE capas SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("set_capa_status failed")?;
    Ok(())
}

pub async fn record_capa_qe_approval(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    approved_by: i64,
) -> Result<()> {
    sqlx::query("UPDATE capas SET qe_approved_by = ?, qe_approved_at = ? WHERE id = ?")
        .bind(approved_by)
        .bind(now_str())
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("record_capa_qe_approval failed")?;
    Ok(())
}

pub async fn record_capa_manager_approval(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    approved_by: i64,
) -> Result<()> {
    sqlx::query("UPDATE capas SET manager_approved_by = ?, manager_approved_at = ? WHERE id = ?")
        .bind(approved_by)
        .bind(now_str())
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("record_capa_manager_approval failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// RMA
// ---------------------------------------------------------------------------

pub async fn create_rma(
    pool: &SqlitePool,
    serial_number: &str,
    customer: &str,
    reason: &str,
    defect_description: Option<&str>,
) -> Result<RmaRow> {
    crate::with_tx(pool, |tx| {
        let serial_number = serial_number.to_string();
        let customer = customer.to_string();
        let reason = reason.to_string();
        let defect_description = defect_description.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "rmas", "RMA", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO rmas (id, serial_number, customer, reason, status, defect_description, created_at)
                 VALUES (?, ?, ?, ?, 'open', ?, ?)",
            )
            .bind(&id)
            .bind(&serial_number)
            .bind(&customer)
            .bind(&reason)
            .bind(&defect_description)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert rma failed")?;

            sqlx::query_as::<_, RmaRow>("SELECT * FROM rmas WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload rma failed")
        })
    })
    .await
}

pub async fn fetch_rma(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<RmaRow>> {
    sqlx::query_as::<_, RmaRow>("SELECT * FROM rmas WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_rma failed")
}

/// Pool-based twin of [`fetch_rma`], for read-only GET handlers.
pub async fn fetch_rma_pool(pool: &SqlitePool, id: &str) -> Result<Option<RmaRow>> {
    sqlx::query_as::<_, RmaRow>("SELECT * FROM rmas WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_rma_pool failed")
}

pub async fn list_rmas(pool: &SqlitePool, limit: i64) -> Result<Vec<RmaRow>> {
    sqlx::query_as::<_, RmaRow>("SELECT * FROM rmas ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_rmas failed")
}

pub async fn set_rma_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    received_at: Option<&str>,
    resolved_at: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE rmas SET status = ?, received_at = COALESCE(?, received_at), resolved_at = COALESCE(?, resolved_at) WHERE id = ?",
    )
    .bind(status)
    .bind(received_at)
    .bind(resolved_at)
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("set_rma_status failed")?;
    Ok(())
}
