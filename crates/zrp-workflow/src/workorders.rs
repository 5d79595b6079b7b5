//! §4.6.3 work-order reservation and consumption: creation reserves stock
//! against the assembly's direct BOM children, completion consumes it and
//! receives the finished assembly, cancellation releases it untouched.

use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::WorkOrderRow;
use zrp_schemas::{DomainEvent, InventoryTxnType, Principal, ShortageLine, WoStatus};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

/// Creates a WO and reserves stock against its direct BOM children in the
/// same transaction. A WO is created even when reservation would exceed
/// available stock — the caller gets the shortage list back and decides
/// whether to proceed (§4.6.3: "the WO is created anyway but flagged as
/// short").
pub async fn create_work_order(
    pool: &SqlitePool,
    principal: &Principal,
    assembly_ipn: &str,
    qty: i64,
    priority: &str,
    notes: Option<&str>,
    due_date: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(WorkOrderRow, Vec<ShortageLine>, Vec<DomainEvent>)> {
    if qty <= 0 {
        return Err(WorkflowError::Validation("qty must be positive".into()));
    }

    let (wo, shortages, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let assembly_ipn = assembly_ipn.to_string();
        let priority = priority.to_string();
        let notes = notes.map(str::to_string);
        let due_date = due_date.map(str::to_string);
        Box::pin(async move {
            let id = zrp_db::next_sequence_id(tx, "work_orders", "WO", 4).await?;
            let created_at = zrp_db::now_str();
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
            .await?;

            let children = zrp_db::inventory::bom_children(tx, &assembly_ipn).await?;
            let mut shortages = Vec::new();
            for child in &children {
                let required = qty * child.qty_per;
                let available = zrp_db::inventory::fetch_inventory(tx, &child.child_ipn)
                    .await?
                    .map(|r| r.qty_on_hand - r.qty_reserved)
                    .unwrap_or(0);
                let shortage = (required - available).max(0);
                if shortage > 0 {
                    shortages.push(ShortageLine {
                        ipn: child.child_ipn.clone(),
                        required,
                        available,
                        shortage,
                    });
                }

                zrp_db::workorders::insert_wo_reservation(tx, &id, &child.child_ipn, required).await?;
                crate::inventory::adjust_reservation(tx, &child.child_ipn, required)
                    .await
                    .map_err(anyhow::Error::from)?;
            }

            let wo = zrp_db::workorders::fetch_work_order(tx, &id).await?.unwrap();

            let audit_id = zrp_audit::record_change::<(), WorkOrderRow>(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "work_orders",
                    record_id: &id,
                    action: "create",
                    summary: "work order created",
                    before: None,
                    after: Some(&wo),
                },
            )
            .await?;

            Ok((wo, shortages, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![zrp_audit::audit_domain_event(audit_id, "work_orders", "create", &wo.id, "work order created")
        .map_err(WorkflowError::Internal)?];
    Ok((wo, shortages, events))
}

/// Status transition for a work order. `complete` consumes reservations and
/// receives the finished assembly; `cancelled` releases reservations with no
/// inventory movement; any other target is a plain status write.
pub async fn transition(
    pool: &SqlitePool,
    principal: &Principal,
    wo_id: &str,
    new_status: WoStatus,
    qty_good: Option<i64>,
    qty_scrap: Option<i64>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(WorkOrderRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let wo_id = wo_id.to_string();
        Box::pin(async move {
            let before = zrp_db::workorders::fetch_work_order(tx, &wo_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("work order {wo_id}")))?;
            let current: WoStatus = before.status.parse()?;

            if matches!(current, WoStatus::Complete | WoStatus::Cancelled) {
                return Err(WorkflowError::Conflict(format!("work order {wo_id} is already {}", before.status)).into());
            }

            match new_status {
                WoStatus::Complete => {
                    let qty_good = qty_good.ok_or_else(|| WorkflowError::Validation("qty_good is required to complete a work order".into()))?;
                    let qty_scrap = qty_scrap.unwrap_or(0);
                    if qty_good + qty_scrap > before.qty {
                        return Err(WorkflowError::Validation(format!(
                            "qty_good + qty_scrap ({}) exceeds WO qty ({})",
                            qty_good + qty_scrap,
                            before.qty
                        ))
                        .into());
                    }

                    let bom_children = zrp_db::inventory::bom_children(tx, &before.assembly_ipn).await?;
                    let reservations = zrp_db::workorders::fetch_wo_reservations(tx, &wo_id).await?;
                    let built = qty_good + qty_scrap;
                    for reservation in &reservations {
                        let qty_per = bom_children
                            .iter()
                            .find(|c| c.child_ipn == reservation.ipn)
                            .map(|c| c.qty_per)
                            .unwrap_or(0);
                        let consumed = qty_per * built;
                        if consumed > 0 {
                            crate::inventory::post_inventory_transaction(
                                tx,
                                &reservation.ipn,
                                InventoryTxnType::Issue,
                                -consumed,
                                Some(&wo_id),
                                Some("WO completion consumption"),
                            )
                            .await?;
                        }
                        crate::inventory::adjust_reservation(tx, &reservation.ipn, -reservation.qty_reserved).await?;
                    }
                    zrp_db::workorders::mark_wo_reservations_released(tx, &wo_id).await?;

                    if qty_good > 0 {
                        crate::inventory::post_inventory_transaction(
                            tx,
                            &before.assembly_ipn,
                            InventoryTxnType::Receive,
                            qty_good,
                            Some(&wo_id),
                            Some("WO completion"),
                        )
                        .await?;
                    }

                    zrp_db::workorders::set_work_order_status(tx, &wo_id, new_status.as_str(), Some(qty_good), Some(qty_scrap)).await?;
                }
                WoStatus::Cancelled => {
                    zrp_db::workorders::mark_wo_reservations_released(tx, &wo_id).await?;
                    let reservations = zrp_db::workorders::fetch_wo_reservations(tx, &wo_id).await?;
                    for reservation in &reservations {
                        crate::inventory::adjust_reservation(tx, &reservation.ipn, -reservation.qty_reserved).await?;
                    }
                    zrp_db::workorders::set_work_order_status(tx, &wo_id, new_status.as_str(), None, None).await?;
                }
                _ => {
                    zrp_db::workorders::set_work_order_status(tx, &wo_id, new_status.as_str(), None, None).await?;
                }
            }

            let after = zrp_db::workorders::fetch_work_order(tx, &wo_id).await?.unwrap();
            let summary = format!("work order transitioned to {}", new_status.as_str());
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "work_orders",
                    record_id: &wo_id,
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

    let mut events = vec![zrp_audit::audit_domain_event(audit_id, "work_orders", "edit", &after.id, "work order status change")
        .map_err(WorkflowError::Internal)?];
    if new_status == WoStatus::Complete {
        events.push(DomainEvent::WoComplete {
            wo_id: after.id.clone(),
            qty_good: after.qty_good,
            qty_scrap: after.qty_scrap,
        });
    }
    Ok((after, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_schemas::Role;

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "planner".into(),
            role: Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    #[tokio::test]
    async fn completion_consumes_children_and_receives_assembly() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        zrp_db::inventory::insert_bom_line(&pool, "A", "R", 2, None, 32).await.unwrap();
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            crate::inventory::post_inventory_transaction(tx, "R", InventoryTxnType::Receive, 100, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();

        let (wo, shortages, _) = create_work_order(&pool, &principal(), "A", 10, "normal", None, None, None, None)
            .await
            .unwrap();
        assert!(shortages.is_empty());

        let (after, events) = transition(&pool, &principal(), &wo.id, WoStatus::Complete, Some(9), Some(1), None, None)
            .await
            .unwrap();
        assert_eq!(after.qty_good, 9);
        assert_eq!(after.qty_scrap, 1);
        assert!(events.iter().any(|e| matches!(e, DomainEvent::WoComplete { .. })));

        let assembly_inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move { zrp_db::inventory::fetch_inventory(tx, "A").await }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(assembly_inv.qty_on_hand, 9);

        let child_inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move { zrp_db::inventory::fetch_inventory(tx, "R").await }))
            .await
            .unwrap()
            .unwrap();
        // 10 built (good+scrap) x 2 per unit = 20 consumed from the 100 on hand.
        assert_eq!(child_inv.qty_on_hand, 80);
        assert_eq!(child_inv.qty_reserved, 0);
    }

    #[tokio::test]
    async fn cancel_releases_reservation_without_moving_stock() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        zrp_db::inventory::insert_bom_line(&pool, "A", "R", 1, None, 32).await.unwrap();
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            crate::inventory::post_inventory_transaction(tx, "R", InventoryTxnType::Receive, 50, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();

        let (wo, _, _) = create_work_order(&pool, &principal(), "A", 10, "normal", None, None, None, None)
            .await
            .unwrap();
        transition(&pool, &principal(), &wo.id, WoStatus::Cancelled, None, None, None, None)
            .await
            .unwrap();

        let child_inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move { zrp_db::inventory::fetch_inventory(tx, "R").await }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(child_inv.qty_on_hand, 50);
        assert_eq!(child_inv.qty_reserved, 0);
    }
}
