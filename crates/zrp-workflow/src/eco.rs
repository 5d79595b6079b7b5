//! §4.6.5 ECO state machine: `draft → review → approved → implemented`, with
//! side exits to `rejected` (from `review`) and `cancelled` (from any
//! non-terminal state).

use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::EcoRow;
use zrp_schemas::{DomainEvent, EcoStatus, Principal};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

fn next_revision_letter(current: Option<&str>) -> String {
    match current {
        None => "A".to_string(),
        Some(letter) => {
            let c = letter.chars().next().unwrap_or('A');
            char::from_u32(c as u32 + 1).unwrap_or('Z').to_string()
        }
    }
}

/// One legal transition in the §4.6.5 table. `approved_by` is required (and
/// ignored otherwise) for `review → approved`; it is threaded through as the
/// `approved_by` stamp.
pub async fn transition(
    pool: &SqlitePool,
    principal: &Principal,
    eco_id: &str,
    to: EcoStatus,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(EcoRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let eco_id = eco_id.to_string();
        Box::pin(async move {
            let before = zrp_db::quality::fetch_eco(tx, &eco_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("ECO {eco_id}")))?;
            let from: EcoStatus = before.status.parse()?;

            let legal = match (from, to) {
                (EcoStatus::Draft, EcoStatus::Review) => true,
                (EcoStatus::Review, EcoStatus::Approved) => true,
                (EcoStatus::Review, EcoStatus::Rejected) => true,
                (EcoStatus::Approved, EcoStatus::Implemented) => true,
                (from, EcoStatus::Cancelled) => {
                    !matches!(from, EcoStatus::Implemented | EcoStatus::Rejected | EcoStatus::Cancelled)
                }
                _ => false,
            };
            if !legal {
                return Err(WorkflowError::Conflict(format!(
                    "ECO {eco_id} cannot transition from {} to {}",
                    from.as_str(),
                    to.as_str()
                ))
                .into());
            }

            match to {
                EcoStatus::Review => {
                    if zrp_db::quality::latest_eco_revision(tx, &eco_id).await?.is_none() {
                        let letter = next_revision_letter(None);
                        zrp_db::quality::insert_eco_revision(tx, &eco_id, &letter).await?;
                    }
                    zrp_db::quality::set_eco_status(tx, &eco_id, to.as_str(), None, None).await?;
                }
                EcoStatus::Approved => {
                    let approved_at = zrp_db::now_str();
                    zrp_db::quality::set_eco_status(tx, &eco_id, to.as_str(), Some(principal.user_id), Some(&approved_at))
                        .await?;
                    if let Some(revision) = zrp_db::quality::latest_eco_revision(tx, &eco_id).await? {
                        zrp_db::quality::set_eco_revision_status(tx, revision.id, "approved").await?;
                    }
                }
                EcoStatus::Implemented => {
                    if let Some(revision) = zrp_db::quality::latest_eco_revision(tx, &eco_id).await? {
                        zrp_db::quality::set_eco_revision_status(tx, revision.id, "implemented").await?;
                    }
                    for change in zrp_db::quality::fetch_eco_part_changes(tx, &eco_id).await? {
                        zrp_db::quality::apply_eco_part_change(tx, &change).await?;
                    }
                    zrp_db::quality::set_eco_status(tx, &eco_id, to.as_str(), None, None).await?;
                }
                _ => {
                    zrp_db::quality::set_eco_status(tx, &eco_id, to.as_str(), None, None).await?;
                }
            }

            let after = zrp_db::quality::fetch_eco(tx, &eco_id).await?.unwrap();
            let summary = format!("ECO transitioned {} -> {}", from.as_str(), to.as_str());
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "ecos",
                    record_id: &eco_id,
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

    let mut events = vec![zrp_audit::audit_domain_event(audit_id, "ecos", "edit", &after.id, "ECO status change")
        .map_err(WorkflowError::Internal)?];
    match to {
        EcoStatus::Approved => events.push(DomainEvent::EcoApproved {
            eco_id: after.id.clone(),
            approved_by: principal.user_id,
        }),
        EcoStatus::Implemented => events.push(DomainEvent::EcoImplemented { eco_id: after.id.clone() }),
        _ => {}
    }
    Ok((after, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_schemas::Role;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: 7,
            username: "eng".into(),
            role,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    async fn setup_eco(pool: &SqlitePool) -> EcoRow {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, display_name, email, role, created_at)
             VALUES (7, 'eng', 'hash', 'Eng', 'eng@example.com', 'admin', datetime('now'))",
        )
        .execute(pool)
        .await
        .unwrap();
        zrp_db::quality::create_eco(pool, "Tighten tolerance", "desc", "normal", "[]", None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn approval_stamps_approver_matches_scenario_6() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let eco = setup_eco(&pool).await;

        transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Review, None, None)
            .await
            .unwrap();
        let (after, events) = transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Approved, None, None)
            .await
            .unwrap();

        assert_eq!(after.status, "approved");
        assert_eq!(after.approved_by, Some(7));
        assert!(events.iter().any(|e| matches!(e, DomainEvent::EcoApproved { .. })));
    }

    #[tokio::test]
    async fn skipping_review_is_illegal() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let eco = setup_eco(&pool).await;

        let err = transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Approved, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[tokio::test]
    async fn implement_applies_staged_part_changes() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO parts (ipn, category, mpn, manufacturer, lifecycle, status, description, attributes, created_at)
             VALUES ('P1', 'resistor', 'MPN', 'Acme', 'active', 'active', 'old desc', '{}', datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();

        let eco = setup_eco(&pool).await;
        sqlx::query("INSERT INTO eco_part_changes (eco_id, ipn, field, new_value, applied) VALUES (?, 'P1', 'description', 'new desc', 0)")
            .bind(&eco.id)
            .execute(&pool)
            .await
            .unwrap();

        transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Review, None, None)
            .await
            .unwrap();
        transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Approved, None, None)
            .await
            .unwrap();
        transition(&pool, &principal(Role::Admin), &eco.id, EcoStatus::Implemented, None, None)
            .await
            .unwrap();

        let (description,): (String,) = sqlx::query_as("SELECT description FROM parts WHERE ipn = 'P1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(description, "new desc");
    }
}
