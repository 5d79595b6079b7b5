//! Firmware rollout campaign runtime (C8): enrollment, per-device progress
//! marking, and a pollable progress stream. Mirrors
//! `zrp-workflow`'s one-function-per-transition shape — every mutation runs
//! inside `zrp_db::with_tx`, audits unconditionally via `zrp_audit`, and
//! returns the `DomainEvent`s its caller fans out through `zrp-notify`
//! strictly after commit.

use std::time::Duration;

use anyhow::Result;
use futures_util::stream::unfold;
use futures_util::Stream;
use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::{CampaignDeviceRow, CampaignRow};
use zrp_schemas::{CampaignStatus, DomainEvent, Principal};

/// How often the progress stream re-polls aggregate counts (§4.8: "streams
/// progress... every 2 seconds").
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn to_campaign_error(err: anyhow::Error) -> CampaignError {
    match err.downcast::<CampaignError>() {
        Ok(ce) => ce,
        Err(err) => CampaignError::Internal(err),
    }
}

pub type CampaignResult<T> = Result<T, CampaignError>;

/// Aggregate progress for one campaign (§4.8: "pending/sent/updated/failed
/// counts and a percent-complete figure").
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressSnapshot {
    pub campaign_id: String,
    pub total: i64,
    pub updated: i64,
    pub failed: i64,
    pub pending: i64,
    pub pct: f64,
}

fn pct_complete(total: i64, updated: i64, failed: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (updated + failed) as f64 / total as f64 * 100.0
    }
}

/// Snapshots every currently-active device into `campaign_devices` as
/// `pending` and flips the campaign from `draft` to `active` in one
/// transaction (§4.8: "enrollment is a point-in-time snapshot — devices that
/// come online afterward are not swept in"). `target_filter` narrows
/// enrollment to one IPN when the campaign was scoped to one at creation.
pub async fn enroll(
    pool: &SqlitePool,
    principal: &Principal,
    campaign_id: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> CampaignResult<(CampaignRow, usize, Vec<DomainEvent>)> {
    let (campaign, enrolled) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let campaign_id = campaign_id.to_string();
        Box::pin(async move {
            let campaign = zrp_db::fleet::fetch_campaign(tx, &campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(format!("campaign {campaign_id}")))?;

            if campaign.status != CampaignStatus::Draft.as_str() {
                return Err(CampaignError::Conflict(format!(
                    "campaign {campaign_id} is {}, expected draft",
                    campaign.status
                ))
                .into());
            }

            let devices = zrp_db::fleet::list_active_devices_tx(tx, campaign.target_filter.as_deref()).await?;
            for device in &devices {
                zrp_db::fleet::enroll_campaign_device(tx, &campaign_id, &device.serial_number).await?;
            }

            let started_at = zrp_db::now_str();
            zrp_db::fleet::set_campaign_status(tx, &campaign_id, CampaignStatus::Active.as_str(), Some(&started_at), None)
                .await?;

            zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "firmware",
                    record_id: &campaign_id,
                    action: "edit",
                    summary: &format!("enrolled {} device(s), campaign activated", devices.len()),
                    before: Some(&campaign.status),
                    after: Some(&CampaignStatus::Active.as_str().to_string()),
                },
            )
            .await?;

            let reloaded = zrp_db::fleet::fetch_campaign(tx, &campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(format!("campaign {campaign_id}")))?;
            Ok((reloaded, devices.len()))
        })
    })
    .await
    .map_err(to_campaign_error)?;

    Ok((campaign, enrolled, Vec::new()))
}

/// Legal terminal statuses a per-device update may report (§4.8: "per-device
/// progress is reported as `updated` or `failed`" — any other value, e.g. a
/// client mistakenly sending `success`, is rejected rather than silently
/// accepted).
fn validate_mark_status(status: &str) -> CampaignResult<()> {
    match status {
        "updated" | "failed" => Ok(()),
        other => Err(CampaignError::Validation(format!(
            "device status must be 'updated' or 'failed', got '{other}'"
        ))),
    }
}

/// Records one device's rollout outcome and, once every enrolled device has
/// reached a terminal status, flips the campaign to `completed` in the same
/// transaction (§4.8: "the campaign is marked `completed` the instant the
/// last device resolves").
pub async fn mark_device(
    pool: &SqlitePool,
    principal: &Principal,
    campaign_id: &str,
    serial_number: &str,
    status: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> CampaignResult<(CampaignDeviceRow, Vec<DomainEvent>)> {
    validate_mark_status(status)?;

    let (device_row, events) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let campaign_id = campaign_id.to_string();
        let serial_number = serial_number.to_string();
        let status = status.to_string();
        Box::pin(async move {
            let campaign = zrp_db::fleet::fetch_campaign(tx, &campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(format!("campaign {campaign_id}")))?;
            if campaign.status != CampaignStatus::Active.as_str() {
                return Err(CampaignError::Conflict(format!(
                    "campaign {campaign_id} is {}, not accepting device updates",
                    campaign.status
                ))
                .into());
            }

            let devices = zrp_db::fleet::fetch_campaign_devices_tx(tx, &campaign_id).await?;
            if !devices.iter().any(|d| d.serial_number == serial_number) {
                return Err(CampaignError::NotFound(format!(
                    "device {serial_number} is not enrolled in campaign {campaign_id}"
                ))
                .into());
            }

            zrp_db::fleet::set_campaign_device_status_tx(tx, &campaign_id, &serial_number, &status).await?;

            zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "firmware",
                    record_id: &format!("{campaign_id}/{serial_number}"),
                    action: "edit",
                    summary: &format!("device {serial_number} reported {status}"),
                    before: None::<&String>,
                    after: Some(&status),
                },
            )
            .await?;

            let refreshed = zrp_db::fleet::fetch_campaign_devices_tx(tx, &campaign_id).await?;
            let total = refreshed.len() as i64;
            let updated = refreshed.iter().filter(|d| d.status == "updated").count() as i64;
            let failed = refreshed.iter().filter(|d| d.status == "failed").count() as i64;

            if total > 0 && updated + failed == total {
                let completed_at = zrp_db::now_str();
                zrp_db::fleet::set_campaign_status(
                    tx,
                    &campaign_id,
                    CampaignStatus::Completed.as_str(),
                    None,
                    Some(&completed_at),
                )
                .await?;
            }

            let events = vec![DomainEvent::CampaignProgress {
                campaign_id: campaign_id.clone(),
                pct: pct_complete(total, updated, failed),
            }];

            let row = refreshed
                .into_iter()
                .find(|d| d.serial_number == serial_number)
                .expect("just updated above");
            Ok((row, events))
        })
    })
    .await
    .map_err(to_campaign_error)?;

    Ok((device_row, events))
}

/// Pauses or cancels an in-flight campaign. Both halt further enrollment and
/// device updates but leave existing `campaign_devices` history untouched
/// (§4.8). `to` must be `paused` or `cancelled`; anything else is a
/// programming error in the caller, not a domain validation failure.
pub async fn halt(
    pool: &SqlitePool,
    principal: &Principal,
    campaign_id: &str,
    to: CampaignStatus,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> CampaignResult<(CampaignRow, Vec<DomainEvent>)> {
    if !matches!(to, CampaignStatus::Paused | CampaignStatus::Cancelled) {
        return Err(CampaignError::Validation("halt only accepts paused or cancelled".into()));
    }

    let campaign = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let campaign_id = campaign_id.to_string();
        Box::pin(async move {
            let campaign = zrp_db::fleet::fetch_campaign(tx, &campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(format!("campaign {campaign_id}")))?;

            let legal = matches!(
                (campaign.status.as_str(), to),
                ("draft" | "active", CampaignStatus::Paused)
                    | ("draft" | "active" | "paused", CampaignStatus::Cancelled)
            );
            if !legal {
                return Err(CampaignError::Conflict(format!(
                    "cannot move campaign {campaign_id} from {} to {to}",
                    campaign.status
                ))
                .into());
            }

            zrp_db::fleet::set_campaign_status(tx, &campaign_id, to.as_str(), None, None).await?;

            zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "firmware",
                    record_id: &campaign_id,
                    action: "edit",
                    summary: &format!("campaign {to}"),
                    before: Some(&campaign.status),
                    after: Some(&to.as_str().to_string()),
                },
            )
            .await?;

            zrp_db::fleet::fetch_campaign(tx, &campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(format!("campaign {campaign_id}")).into())
        })
    })
    .await
    .map_err(to_campaign_error)?;

    Ok((campaign, Vec::new()))
}

/// Plain aggregate read, no mutation — backs both the one-shot progress
/// endpoint and each tick of [`progress_stream`].
pub async fn progress(pool: &SqlitePool, campaign_id: &str) -> Result<ProgressSnapshot> {
    let (total, updated, failed, pending) = zrp_db::fleet::campaign_progress_counts(pool, campaign_id).await?;
    Ok(ProgressSnapshot {
        campaign_id: campaign_id.to_string(),
        total,
        updated,
        failed,
        pending,
        pct: pct_complete(total, updated, failed),
    })
}

/// Polls [`progress`] every [`POLL_INTERVAL`] and yields one event per tick
/// until every enrolled device has resolved, then ends the stream (§4.8:
/// "the stream terminates once `updated + failed == total`"). Re-subscribing
/// after a disconnect just restarts polling from current state — there is no
/// stream-side cursor to resume, which is what makes it resumable for free.
pub fn progress_stream(
    pool: SqlitePool,
    campaign_id: String,
) -> impl Stream<Item = Result<DomainEvent>> {
    unfold((pool, campaign_id, false), |(pool, campaign_id, done)| Box::pin(async move {
        if done {
            return None;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
        match progress(&pool, &campaign_id).await {
            Ok(snapshot) => {
                let finished = snapshot.total > 0 && snapshot.updated + snapshot.failed == snapshot.total;
                let event = DomainEvent::CampaignProgress {
                    campaign_id: campaign_id.clone(),
                    pct: snapshot.pct,
                };
                Some((Ok(event), (pool, campaign_id, finished)))
            }
            Err(err) => Some((Err(err), (pool, campaign_id, true))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use zrp_db::connect_in_memory;
    use zrp_schemas::{AuthMethod, Role};

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "qe".into(),
            role: Role::Admin,
            auth_method: AuthMethod::Cookie,
        }
    }

    async fn seed_device(pool: &SqlitePool, serial: &str, ipn: &str) {
        sqlx::query(
            "INSERT INTO devices (serial_number, ipn, status, install_date, last_seen)
             VALUES (?, ?, 'active', datetime('now'), datetime('now'))",
        )
        .bind(serial)
        .bind(ipn)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn setup_campaign(pool: &SqlitePool) -> String {
        zrp_db::migrate(pool).await.unwrap();
        seed_device(pool, "SN-001", "IPN-100").await;
        seed_device(pool, "SN-002", "IPN-100").await;
        let row = zrp_db::fleet::create_campaign(pool, "Q3 rollout", "2.1.0", "public", None)
            .await
            .unwrap();
        row.id
    }

    #[tokio::test]
    async fn enroll_snapshots_active_devices_and_activates_campaign() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;

        let (campaign, enrolled, _events) = enroll(&pool, &principal(), &campaign_id, None, None)
            .await
            .unwrap();

        assert_eq!(enrolled, 2);
        assert_eq!(campaign.status, "active");
        assert!(campaign.started_at.is_some());
    }

    #[tokio::test]
    async fn enrolling_twice_is_conflict() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;
        enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap();

        let err = enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap_err();
        assert!(matches!(err, CampaignError::Conflict(_)));
    }

    #[tokio::test]
    async fn mark_rejects_status_outside_updated_or_failed() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;
        enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap();

        let err = mark_device(&pool, &principal(), &campaign_id, "SN-001", "success", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
    }

    #[tokio::test]
    async fn campaign_completes_once_every_device_resolves() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;
        enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap();

        let (_row, events) = mark_device(&pool, &principal(), &campaign_id, "SN-001", "updated", None, None)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);

        let (_row, events) = mark_device(&pool, &principal(), &campaign_id, "SN-002", "failed", None, None)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::CampaignProgress { pct, .. } if pct == 100.0));

        let snapshot = progress(&pool, &campaign_id).await.unwrap();
        assert_eq!(snapshot.pct, 100.0);
    }

    #[tokio::test]
    async fn paused_campaign_rejects_further_marks() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;
        enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap();
        halt(&pool, &principal(), &campaign_id, CampaignStatus::Paused, None, None)
            .await
            .unwrap();

        let err = mark_device(&pool, &principal(), &campaign_id, "SN-001", "updated", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Conflict(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_stream_terminates_at_full_completion() {
        let pool = connect_in_memory().await.unwrap();
        let campaign_id = setup_campaign(&pool).await;
        enroll(&pool, &principal(), &campaign_id, None, None).await.unwrap();
        mark_device(&pool, &principal(), &campaign_id, "SN-001", "updated", None, None)
            .await
            .unwrap();
        mark_device(&pool, &principal(), &campaign_id, "SN-002", "updated", None, None)
            .await
            .unwrap();

        let mut stream = Box::pin(progress_stream(pool, campaign_id));
        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, DomainEvent::CampaignProgress { pct, .. } if pct == 100.0));
        assert!(stream.next().await.is_none());
    }
}
