//! §4.6.6 NCR→CAPA→ECO threading and §4.6.7 RMA lifecycle.

use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::{CapaRow, EcoRow, NcrRow, RmaRow};
use zrp_schemas::{CapaStatus, DomainEvent, NcrSeverity, NcrStatus, Principal, RmaStatus};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

/// Severity mapping for an NCR spawned from a field report (§4.6.6:
/// "severity mapped from priority: critical→critical, high→major, otherwise
/// minor").
pub fn severity_from_field_report_priority(priority: &str) -> NcrSeverity {
    match priority {
        "critical" => NcrSeverity::Critical,
        "high" => NcrSeverity::Major,
        _ => NcrSeverity::Minor,
    }
}

pub async fn create_ncr(
    pool: &SqlitePool,
    principal: &Principal,
    title: &str,
    severity: NcrSeverity,
    ipn: Option<&str>,
    serial_number: Option<&str>,
    defect_type: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(NcrRow, Vec<DomainEvent>)> {
    let (ncr, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let title = title.to_string();
        let ipn = ipn.map(str::to_string);
        let serial_number = serial_number.map(str::to_string);
        let defect_type = defect_type.map(str::to_string);
        Box::pin(async move {
            let id = zrp_db::next_sequence_id(tx, "ncrs", "NCR", 4).await?;
            let created_at = zrp_db::now_str();
            sqlx::query(
                "INSERT INTO ncrs (id, title, severity, status, ipn, serial_number, defect_type, created_by, created_at)
                 VALUES (?, ?, ?, 'open', ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&title)
            .bind(severity.as_str())
            .bind(&ipn)
            .bind(&serial_number)
            .bind(&defect_type)
            .bind(principal.user_id)
            .bind(&created_at)
            .execute(&mut **tx)
            .await?;

            let ncr = zrp_db::quality::fetch_ncr(tx, &id).await?.unwrap();
            let audit_id = zrp_audit::record_change::<(), NcrRow>(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "ncrs",
                    record_id: &id,
                    action: "create",
                    summary: "NCR created",
                    before: None,
                    after: Some(&ncr),
                },
            )
            .await?;
            Ok((ncr, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![
        DomainEvent::NcrCreated { ncr_id: ncr.id.clone(), severity },
        zrp_audit::audit_domain_event(audit_id, "ncrs", "create", &ncr.id, "NCR created").map_err(WorkflowError::Internal)?,
    ];
    Ok((ncr, events))
}

pub async fn ncr_transition(
    pool: &SqlitePool,
    principal: &Principal,
    ncr_id: &str,
    to: NcrStatus,
    root_cause: Option<&str>,
    corrective_action: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(NcrRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let ncr_id = ncr_id.to_string();
        let root_cause = root_cause.map(str::to_string);
        let corrective_action = corrective_action.map(str::to_string);
        Box::pin(async move {
            let before = zrp_db::quality::fetch_ncr(tx, &ncr_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("NCR {ncr_id}")))?;
            let from: NcrStatus = before.status.parse()?;

            let legal = matches!(
                (from, to),
                (NcrStatus::Open, NcrStatus::Investigating)
                    | (NcrStatus::Investigating, NcrStatus::Resolved)
                    | (NcrStatus::Resolved, NcrStatus::Closed)
            );
            if !legal {
                return Err(WorkflowError::Conflict(format!(
                    "NCR {ncr_id} cannot transition from {} to {}",
                    from.as_str(),
                    to.as_str()
                ))
                .into());
            }

            if let Some(root_cause) = &root_cause {
                sqlx::query("UPDATE ncrs SET root_cause = ? WHERE id = ?")
                    .bind(root_cause)
                    .bind(&ncr_id)
                    .execute(&mut **tx)
                    .await?;
            }
            if let Some(corrective_action) = &corrective_action {
                sqlx::query("UPDATE ncrs SET corrective_action = ? WHERE id = ?")
                    .bind(corrective_action)
                    .bind(&ncr_id)
                    .execute(&mut **tx)
                    .await?;
            }

            let resolved_at = matches!(to, NcrStatus::Resolved).then(zrp_db::now_str);
            zrp_db::quality::set_ncr_status(tx, &ncr_id, to.as_str(), resolved_at.as_deref()).await?;

            let after = zrp_db::quality::fetch_ncr(tx, &ncr_id).await?.unwrap();
            let summary = format!("NCR transitioned {} -> {}", from.as_str(), to.as_str());
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "ncrs",
                    record_id: &ncr_id,
                    action: "edit",
                    summary: &summary,
                    before: Some(&before),
                    after: Some(&after),
                },
            )
            .await?;
            Ok((after, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "ncrs", "edit", &after.id, "NCR status change")
        .map_err(WorkflowError::Internal)?];
    Ok((after, events))
}

/// Creates a CAPA linked to an NCR and/or an RMA (§4.6.6: "Creating a CAPA
/// from an NCR links back by `linked_ncr_id`").
pub async fn create_capa(
    pool: &SqlitePool,
    principal: &Principal,
    capa_type: &str,
    linked_ncr_id: Option<&str>,
    linked_rma_id: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(CapaRow, Vec<DomainEvent>)> {
    let (capa, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let capa_type = capa_type.to_string();
        let linked_ncr_id = linked_ncr_id.map(str::to_string);
        let linked_rma_id = linked_rma_id.map(str::to_string);
        Box::pin(async move {
            if let Some(ncr_id) = &linked_ncr_id {
                zrp_db::quality::fetch_ncr(tx, ncr_id)
                    .await?
                    .ok_or_else(|| WorkflowError::NotFound(format!("NCR {ncr_id}")))?;
            }
            if let Some(rma_id) = &linked_rma_id {
                zrp_db::quality::fetch_rma(tx, rma_id)
                    .await?
                    .ok_or_else(|| WorkflowError::NotFound(format!("RMA {rma_id}")))?;
            }

            let id = zrp_db::next_sequence_id(tx, "capas", "CAPA", 4).await?;
            let created_at = zrp_db::now_str();
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
            .await?;

            let capa = zrp_db::quality::fetch_capa(tx, &id).await?.unwrap();
            let audit_id = zrp_audit::record_change::<(), CapaRow>(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "capas",
                    record_id: &id,
                    action: "create",
                    summary: "CAPA created",
                    before: None,
                    after: Some(&capa),
                },
            )
            .await?;
            Ok((capa, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "capas", "create", &capa.id, "CAPA created")
        .map_err(WorkflowError::Internal)?];
    Ok((capa, events))
}

/// QE approval. Does not close the CAPA by itself — closure additionally
/// requires a manager approval (§4.6.6).
pub async fn approve_capa_qe(
    pool: &SqlitePool,
    principal: &Principal,
    capa_id: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(CapaRow, Vec<DomainEvent>)> {
    record_capa_approval(pool, principal, capa_id, true, ip, user_agent).await
}

pub async fn approve_capa_manager(
    pool: &SqlitePool,
    principal: &Principal,
    capa_id: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(CapaRow, Vec<DomainEvent>)> {
    record_capa_approval(pool, principal, capa_id, false, ip, user_agent).await
}

async fn record_capa_approval(
    pool: &SqlitePool,
    principal: &Principal,
    capa_id: &str,
    is_qe: bool,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(CapaRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let capa_id = capa_id.to_string();
        Box::pin(async move {
            let before = zrp_db::quality::fetch_capa(tx, &capa_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("CAPA {capa_id}")))?;
            let status: CapaStatus = before.status.parse()?;
            if matches!(status, CapaStatus::Closed | CapaStatus::Cancelled) {
                return Err(WorkflowError::Conflict(format!("CAPA {capa_id} is already {}", before.status)).into());
            }

            if is_qe {
                zrp_db::quality::record_capa_qe_approval(tx, &capa_id, principal.user_id).await?;
            } else {
                zrp_db::quality::record_capa_manager_approval(tx, &capa_id, principal.user_id).await?;
            }
            zrp_db::quality::set_capa_status(tx, &capa_id, CapaStatus::PendingReview.as_str()).await?;

            let after = zrp_db::quality::fetch_capa(tx, &capa_id).await?.unwrap();
            if after.qe_approved_by.is_some() && after.manager_approved_by.is_some() {
                zrp_db::quality::set_capa_status(tx, &capa_id, CapaStatus::Closed.as_str()).await?;
            }
            let after = zrp_db::quality::fetch_capa(tx, &capa_id).await?.unwrap();

            let summary = if is_qe { "CAPA approved by QE" } else { "CAPA approved by manager" };
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "capas",
                    record_id: &capa_id,
                    action: "approve",
                    summary,
                    before: Some(&before),
                    after: Some(&after),
                },
            )
            .await?;
            Ok((after, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "capas", "approve", &after.id, "CAPA approval recorded")
        .map_err(WorkflowError::Internal)?];
    Ok((after, events))
}

/// Creates an ECO from an NCR, stamping `ecos.ncr_id` (§4.6.6).
pub async fn create_eco_from_ncr(
    pool: &SqlitePool,
    principal: &Principal,
    ncr_id: &str,
    title: &str,
    description: &str,
    priority: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(EcoRow, Vec<DomainEvent>)> {
    let (eco, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let ncr_id = ncr_id.to_string();
        let title = title.to_string();
        let description = description.to_string();
        let priority = priority.to_string();
        Box::pin(async move {
            zrp_db::quality::fetch_ncr(tx, &ncr_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("NCR {ncr_id}")))?;

            let id = zrp_db::next_sequence_id(tx, "ecos", "ECO", 4).await?;
            let created_at = zrp_db::now_str();
            sqlx::query(
                "INSERT INTO ecos (id, title, description, status, priority, affected_ipns, ncr_id, created_at)
                 VALUES (?, ?, ?, 'draft', ?, '[]', ?, ?)",
            )
            .bind(&id)
            .bind(&title)
            .bind(&description)
            .bind(&priority)
            .bind(&ncr_id)
            .bind(&created_at)
            .execute(&mut **tx)
            .await?;

            let eco = zrp_db::quality::fetch_eco(tx, &id).await?.unwrap();
            let audit_id = zrp_audit::record_change::<(), EcoRow>(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "ecos",
                    record_id: &id,
                    action: "create",
                    summary: "ECO created from NCR",
                    before: None,
                    after: Some(&eco),
                },
            )
            .await?;
            Ok((eco, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "ecos", "create", &eco.id, "ECO created from NCR")
        .map_err(WorkflowError::Internal)?];
    Ok((eco, events))
}

pub async fn create_rma(
    pool: &SqlitePool,
    principal: &Principal,
    serial_number: &str,
    customer: &str,
    reason: &str,
    defect_description: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(RmaRow, Vec<DomainEvent>)> {
    let (rma, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let serial_number = serial_number.to_string();
        let customer = customer.to_string();
        let reason = reason.to_string();
        let defect_description = defect_description.map(str::to_string);
        Box::pin(async move {
            let id = zrp_db::next_sequence_id(tx, "rmas", "RMA", 4).await?;
            let created_at = zrp_db::now_str();
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
            .await?;

            let rma = zrp_db::quality::fetch_rma(tx, &id).await?.unwrap();
            let audit_id = zrp_audit::record_change::<(), RmaRow>(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "rmas",
                    record_id: &id,
                    action: "create",
                    summary: "RMA created",
                    before: None,
                    after: Some(&rma),
                },
            )
            .await?;
            Ok((rma, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "rmas", "create", &rma.id, "RMA created")
        .map_err(WorkflowError::Internal)?];
    Ok((rma, events))
}

/// §4.6.7: `open → received → diagnosing → repairing → shipped → resolved →
/// closed`, with `scrapped` a terminal exit from `received`/`diagnosing`/
/// `repairing`. Stamps `received_at` on entry to `received`, `resolved_at` on
/// entry to `closed` or `scrapped`.
pub async fn rma_transition(
    pool: &SqlitePool,
    principal: &Principal,
    rma_id: &str,
    to: RmaStatus,
    resolution: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(RmaRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let rma_id = rma_id.to_string();
        let resolution = resolution.map(str::to_string);
        Box::pin(async move {
            let before = zrp_db::quality::fetch_rma(tx, &rma_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("RMA {rma_id}")))?;
            let from: RmaStatus = before.status.parse()?;

            let legal = match (from, to) {
                (RmaStatus::Open, RmaStatus::Received) => true,
                (RmaStatus::Received, RmaStatus::Diagnosing) => true,
                (RmaStatus::Diagnosing, RmaStatus::Repairing) => true,
                (RmaStatus::Repairing, RmaStatus::Shipped) => true,
                (RmaStatus::Shipped, RmaStatus::Resolved) => true,
                (RmaStatus::Resolved, RmaStatus::Closed) => true,
                (RmaStatus::Received | RmaStatus::Diagnosing | RmaStatus::Repairing, RmaStatus::Scrapped) => true,
                _ => false,
            };
            if !legal {
                return Err(WorkflowError::Conflict(format!(
                    "RMA {rma_id} cannot transition from {} to {}",
                    from.as_str(),
                    to.as_str()
                ))
                .into());
            }

            if let Some(resolution) = &resolution {
                sqlx::query("UPDATE rmas SET resolution = ? WHERE id = ?")
                    .bind(resolution)
                    .bind(&rma_id)
                    .execute(&mut **tx)
                    .await?;
            }

            let received_at = matches!(to, RmaStatus::Received).then(zrp_db::now_str);
            let resolved_at = matches!(to, RmaStatus::Closed | RmaStatus::Scrapped).then(zrp_db::now_str);
            zrp_db::quality::set_rma_status(tx, &rma_id, to.as_str(), received_at.as_deref(), resolved_at.as_deref()).await?;

            let after = zrp_db::quality::fetch_rma(tx, &rma_id).await?.unwrap();
            let summary = format!("RMA transitioned {} -> {}", from.as_str(), to.as_str());
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "rmas",
                    record_id: &rma_id,
                    action: "edit",
                    summary: &summary,
                    before: Some(&before),
                    after: Some(&after),
                },
            )
            .await?;
            Ok((after, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "rmas", "edit", &after.id, "RMA status change")
        .map_err(WorkflowError::Internal)?];
    Ok((after, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_schemas::Role;

    fn principal() -> Principal {
        Principal {
            user_id: 3,
            username: "qe".into(),
            role: Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    async fn seed_user(pool: &SqlitePool) {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, display_name, email, role, created_at)
             VALUES (3, 'qe', 'hash', 'QE', 'qe@example.com', 'admin', datetime('now'))",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn severity_mapping_matches_spec_table() {
        assert_eq!(severity_from_field_report_priority("critical"), NcrSeverity::Critical);
        assert_eq!(severity_from_field_report_priority("high"), NcrSeverity::Major);
        assert_eq!(severity_from_field_report_priority("low"), NcrSeverity::Minor);
    }

    #[tokio::test]
    async fn capa_closes_only_after_both_approvals() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_user(&pool).await;
        let (ncr, _) = create_ncr(&pool, &principal(), "cracked housing", NcrSeverity::Major, None, None, None, None, None)
            .await
            .unwrap();
        let (capa, _) = create_capa(&pool, &principal(), "corrective", Some(&ncr.id), None, None, None).await.unwrap();

        let (after_qe, _) = approve_capa_qe(&pool, &principal(), &capa.id, None, None).await.unwrap();
        assert_eq!(after_qe.status, "pending_review");

        let (after_mgr, _) = approve_capa_manager(&pool, &principal(), &capa.id, None, None).await.unwrap();
        assert_eq!(after_mgr.status, "closed");
    }

    #[tokio::test]
    async fn rma_scrapped_is_terminal_exit_from_diagnosing() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let (rma, _) = create_rma(&pool, &principal(), "SN-1", "Acme Corp", "dead on arrival", None, None, None)
            .await
            .unwrap();

        rma_transition(&pool, &principal(), &rma.id, RmaStatus::Received, None, None, None).await.unwrap();
        rma_transition(&pool, &principal(), &rma.id, RmaStatus::Diagnosing, None, None, None).await.unwrap();
        let (after, _) = rma_transition(&pool, &principal(), &rma.id, RmaStatus::Scrapped, Some("beyond repair"), None, None)
            .await
            .unwrap();

        assert_eq!(after.status, "scrapped");
        assert!(after.resolved_at.is_some());

        let err = rma_transition(&pool, &principal(), &rma.id, RmaStatus::Closed, None, None, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[tokio::test]
    async fn eco_from_ncr_stamps_ncr_id() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_user(&pool).await;
        let (ncr, _) = create_ncr(&pool, &principal(), "solder bridge", NcrSeverity::Critical, None, None, None, None, None)
            .await
            .unwrap();
        let (eco, _) = create_eco_from_ncr(&pool, &principal(), &ncr.id, "rework footprint", "desc", "high", None, None)
            .await
            .unwrap();
        assert_eq!(eco.ncr_id.as_deref(), Some(ncr.id.as_str()));
    }
}
