//! Device and firmware-campaign queries backing C8.

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{CampaignDeviceRow, CampaignRow, DeviceRow};
use crate::now_str;

pub async fn upsert_device(
    pool: &SqlitePool,
    serial_number: &str,
    ipn: &str,
    firmware_version: Option<&str>,
    customer: Option<&str>,
    location: Option<&str>,
) -> Result<DeviceRow> {
    sqlx::query(
        "INSERT INTO devices (serial_number, ipn, firmware_version, customer, location, status, install_date, last_seen)
         VALUES (?, ?, ?, ?, ?, 'active', ?, ?)
         ON CONFLICT(serial_number) DO UPDATE SET
           firmware_version = excluded.firmware_version,
           customer = excluded.customer,
           location = excluded.location,
           last_seen = excluded.last_seen",
    )
    .bind(serial_number)
    .bind(ipn)
    .bind(firmware_version)
    .bind(customer)
    .bind(location)
    .bind(now_str())
    .bind(now_str())
    .execute(pool)
    .await
    .context("upsert_device failed")?;

    fetch_device_pool(pool, serial_number)
        .await?
        .context("device vanished after upsert")
}

pub async fn fetch_device_pool(pool: &SqlitePool, serial_number: &str) -> Result<Option<DeviceRow>> {
    sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE serial_number = ?")
        .bind(serial_number)
        .fetch_optional(pool)
        .await
        .context("fetch_device_pool failed")
}

pub async fn fetch_device(
    tx: &mut Transaction<'_, Sqlite>,
    serial_number: &str,
) -> Result<Option<DeviceRow>> {
    sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE serial_number = ?")
        .bind(serial_number)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_device failed")
}

pub async fn list_active_devices(
    pool: &SqlitePool,
    ipn: Option<&str>,
) -> Result<Vec<DeviceRow>> {
    match ipn {
        Some(ipn) => sqlx::query_as::<_, DeviceRow>(
            "SELECT * FROM devices WHERE status = 'active' AND ipn = ?",
        )
        .bind(ipn)
        .fetch_all(pool)
        .await
        .context("list_active_devices failed"),
        None => sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE status = 'active'")
            .fetch_all(pool)
            .await
            .context("list_active_devices failed"),
    }
}

pub async fn list_devices(pool: &SqlitePool, limit: i64) -> Result<Vec<DeviceRow>> {
    sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices ORDER BY serial_number LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_devices failed")
}

/// Transactional twin of [`list_active_devices`], used by campaign
/// enrollment so the snapshot and the campaign-activation write commit
/// together.
pub async fn list_active_devices_tx(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: Option<&str>,
) -> Result<Vec<DeviceRow>> {
    match ipn {
        Some(ipn) => sqlx::query_as::<_, DeviceRow>(
            "SELECT * FROM devices WHERE status = 'active' AND ipn = ?",
        )
        .bind(ipn)
        .fetch_all(&mut **tx)
        .await
        .context("list_active_devices_tx failed"),
        None => sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE status = 'active'")
            .fetch_all(&mut **tx)
            .await
            .context("list_active_devices_tx failed"),
    }
}

pub async fn list_campaigns(pool: &SqlitePool) -> Result<Vec<CampaignRow>> {
    sqlx::query_as::<_, CampaignRow>("SELECT * FROM firmware_campaigns ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .context("list_campaigns failed")
}

pub async fn create_campaign(
    pool: &SqlitePool,
    name: &str,
    version: &str,
    category: &str,
    target_filter: Option<&str>,
) -> Result<CampaignRow> {
    crate::with_tx(pool, |tx| {
        let name = name.to_string();
        let version = version.to_string();
        let category = category.to_string();
        let target_filter = target_filter.map(|s| s.to_string());
        Box::pin(async move {
            let id = crate::next_sequence_id(tx, "firmware_campaigns", "CAMP", 4).await?;
            let created_at = now_str();
            sqlx::query(
                "INSERT INTO firmware_campaigns (id, name, version, category, status, target_filter, created_at)
                 VALUES (?, ?, ?, ?, 'draft', ?, ?)",
            )
            .bind(&id)
            .bind(&name)
            .bind(&version)
            .bind(&category)
            .bind(&target_filter)
            .bind(&created_at)
            .execute(&mut **tx)
            .await
            .context("insert firmware_campaign failed")?;

            sqlx::query_as::<_, CampaignRow>("SELECT * FROM firmware_campaigns WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut **tx)
                .await
                .context("reload firmware_campaign failed")
        })
    })
    .await
}

pub async fn fetch_campaign(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<CampaignRow>> {
    sqlx::query_as::<_, CampaignRow>("SELECT * FROM firmware_campaigns WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_campaign failed")
}

pub async fn fetch_campaign_pool(pool: &SqlitePool, id: &str) -> Result<Option<CampaignRow>> {
    sqlx::query_as::<_, CampaignRow>("SELECT * FROM firmware_campaigns WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_campaign_pool failed")
}

pub async fn set_campaign_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    status: &str,
    started_at: Option<&str>,
    completed_at: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE firmware_campaigns SET status = ?, started_at = COALESCE(?, started_at), completed_at = COALESCE(?, completed_at) WHERE id = ?",
    )
    .bind(status)
    .bind(started_at)
    .bind(completed_at)
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("set_campaign_status failed")?;
    Ok(())
}

pub async fn enroll_campaign_device(
    tx: &mut Transaction<'_, Sqlite>,
    campaign_id: &str,
    serial_number: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO campaign_devices (campaign_id, serial_number, status, updated_at) VALUES (?, ?, 'pending', ?)",
    )
    .bind(campaign_id)
    .bind(serial_number)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("enroll_campaign_device failed")?;
    Ok(())
}

pub async fn set_campaign_device_status(
    pool: &SqlitePool,
    campaign_id: &str,
    serial_number: &str,
    status: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE campaign_devices SET status = ?, updated_at = ? WHERE campaign_id = ? AND serial_number = ?",
    )
    .bind(status)
    .bind(now_str())
    .bind(campaign_id)
    .bind(serial_number)
    .execute(pool)
    .await
    .context("set_campaign_device_status failed")?;
    Ok(())
}

/// Transactional twin of [`set_campaign_device_status`].
pub async fn set_campaign_device_status_tx(
    tx: &mut Transaction<'_, Sqlite>,
    campaign_id: &str,
    serial_number: &str,
    status: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE campaign_devices SET status = ?, updated_at = ? WHERE campaign_id = ? AND serial_number = ?",
    )
    .bind(status)
    .bind(now_str())
    .bind(campaign_id)
    .bind(serial_number)
    .execute(&mut **tx)
    .await
    .context("set_campaign_device_status_tx failed")?;
    Ok(())
}

pub async fn fetch_campaign_devices(
    pool: &SqlitePool,
    campaign_id: &str,
) -> Result<Vec<CampaignDeviceRow>> {
    sqlx::query_as::<_, CampaignDeviceRow>(
        "SELECT * FROM campaign_devices WHERE campaign_id = ? ORDER BY id",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await
    .context("fetch_campaign_devices failed")
}

/// Transactional twin of [`fetch_campaign_devices`].
pub async fn fetch_campaign_devices_tx(
    tx: &mut Transaction<'_, Sqlite>,
    campaign_id: &str,
) -> Result<Vec<CampaignDeviceRow>> {
    sqlx::query_as::<_, CampaignDeviceRow>(
        "SELECT * FROM campaign_devices WHERE campaign_id = ? ORDER BY id",
    )
    .bind(campaign_id)
    .fetch_all(&mut **tx)
    .await
    .context("fetch_campaign_devices_tx failed")
}

/// (total, updated, failed, pending_or_in_progress) for progress reporting
/// (§4.8: "aggregate counts of pending/sent/updated/failed").
pub async fn campaign_progress_counts(
    pool: &SqlitePool,
    campaign_id: &str,
) -> Result<(i64, i64, i64, i64)> {
    let devices = fetch_campaign_devices(pool, campaign_id).await?;
    let total = devices.len() as i64;
    let updated = devices.iter().filter(|d| d.status == "updated").count() as i64;
    let failed = devices.iter().filter(|d| d.status == "failed").count() as i64;
    let pending = total - updated - failed;
    Ok((total, updated, failed, pending))
}
