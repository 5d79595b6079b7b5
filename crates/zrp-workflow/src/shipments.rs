//! §4.6.8 shipment packing: `draft → packed` validates part existence and
//! allocation, `packed → shipped` posts `issue` inventory transactions and
//! stamps `ship_date`.

use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::ShipmentRow;
use zrp_schemas::{DomainEvent, InventoryTxnType, Principal, ShipmentStatus};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

/// Transition a shipment one step forward. `draft → packed` verifies each
/// line's part exists and, for lines tied to a sales-order line, that
/// `qty ≤ qty_allocated` (Open Question 4: no auto-allocation — packing a
/// line beyond what was already allocated is a `Conflict`, not a silent
/// top-up). `packed → shipped` posts `issue` transactions and stamps
/// `ship_date`.
pub async fn transition(
    pool: &SqlitePool,
    principal: &Principal,
    shipment_id: &str,
    to: ShipmentStatus,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(ShipmentRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let shipment_id = shipment_id.to_string();
        Box::pin(async move {
            let before = zrp_db::shipments::fetch_shipment(tx, &shipment_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("shipment {shipment_id}")))?;
            let from: ShipmentStatus = before.status.parse()?;

            let legal = matches!(
                (from, to),
                (ShipmentStatus::Draft, ShipmentStatus::Packed)
                    | (ShipmentStatus::Packed, ShipmentStatus::Shipped)
                    | (ShipmentStatus::Draft | ShipmentStatus::Packed, ShipmentStatus::Cancelled)
            );
            if !legal {
                return Err(WorkflowError::Conflict(format!(
                    "shipment {shipment_id} cannot transition from {} to {}",
                    from.as_str(),
                    to.as_str()
                ))
                .into());
            }

            let lines = zrp_db::shipments::fetch_shipment_lines(tx, &shipment_id).await?;

            if matches!(to, ShipmentStatus::Packed) {
                for line in &lines {
                    zrp_db::inventory::fetch_part(tx, &line.ipn)
                        .await?
                        .ok_or_else(|| WorkflowError::Validation(format!("part {} does not exist", line.ipn)))?;
                    if let Some(sol_id) = line.sales_order_line_id {
                        let sol = zrp_db::shipments::fetch_sales_order_line(tx, sol_id)
                            .await?
                            .ok_or_else(|| WorkflowError::NotFound(format!("sales order line {sol_id}")))?;
                        if line.qty > sol.qty_allocated {
                            return Err(WorkflowError::Conflict(format!(
                                "shipment line {} requests {} but only {} is allocated",
                                line.id, line.qty, sol.qty_allocated
                            ))
                            .into());
                        }
                    }
                }
            }

            if matches!(to, ShipmentStatus::Shipped) {
                for line in &lines {
                    crate::inventory::post_inventory_transaction(
                        tx,
                        &line.ipn,
                        InventoryTxnType::Issue,
                        -line.qty,
                        Some(&shipment_id),
                        Some("shipment issue"),
                    )
                    .await?;
                    if let Some(sol_id) = line.sales_order_line_id {
                        zrp_db::shipments::adjust_sales_order_line_allocated(tx, sol_id, -line.qty).await?;
                    }
                }
            }

            let ship_date = matches!(to, ShipmentStatus::Shipped).then(zrp_db::now_str);
            zrp_db::shipments::set_shipment_status(tx, &shipment_id, to.as_str(), ship_date.as_deref()).await?;

            let after = zrp_db::shipments::fetch_shipment(tx, &shipment_id).await?.unwrap();
            let summary = format!("shipment transitioned {} -> {}", from.as_str(), to.as_str());
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "shipments",
                    record_id: &shipment_id,
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

    let events = vec![zrp_audit::audit_domain_event(audit_id, "shipments", "edit", &after.id, "shipment status change")
        .map_err(WorkflowError::Internal)?];
    Ok((after, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_schemas::Role;

    fn principal() -> Principal {
        Principal {
            user_id: 2,
            username: "shipper".into(),
            role: Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    async fn setup_part_and_inventory(pool: &SqlitePool, ipn: &str, qty: i64) {
        sqlx::query(
            "INSERT INTO parts (ipn, category, mpn, manufacturer, lifecycle, status, description, attributes, created_at)
             VALUES (?, 'assembly', 'MPN', 'Acme', 'active', 'active', 'desc', '{}', datetime('now'))",
        )
        .bind(ipn)
        .execute(pool)
        .await
        .unwrap();
        zrp_db::with_tx(pool, |tx| {
            let ipn = ipn.to_string();
            Box::pin(async move {
                crate::inventory::post_inventory_transaction(tx, &ipn, InventoryTxnType::Receive, qty, None, None)
                    .await
                    .map_err(Into::into)
            })
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn pack_and_ship_consumes_inventory() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        setup_part_and_inventory(&pool, "A", 20).await;

        let shipment = zrp_db::shipments::create_shipment(&pool, "outbound").await.unwrap();
        zrp_db::with_tx(&pool, |tx| {
            let id = shipment.id.clone();
            Box::pin(async move { zrp_db::shipments::insert_shipment_line(tx, &id, None, "A", 5).await })
        })
        .await
        .unwrap();

        transition(&pool, &principal(), &shipment.id, ShipmentStatus::Packed, None, None).await.unwrap();
        let (after, events) = transition(&pool, &principal(), &shipment.id, ShipmentStatus::Shipped, None, None)
            .await
            .unwrap();
        assert_eq!(after.status, "shipped");
        assert!(after.ship_date.is_some());
        assert_eq!(events.len(), 1);

        let inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move { zrp_db::inventory::fetch_inventory(tx, "A").await }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.qty_on_hand, 15);
    }

    #[tokio::test]
    async fn packing_beyond_allocation_is_conflict() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        setup_part_and_inventory(&pool, "A", 20).await;

        sqlx::query("INSERT INTO sales_orders (id, customer, created_at) VALUES ('SO-1', 'Acme', datetime('now'))")
            .execute(&pool)
            .await
            .unwrap();
        let sol_id = sqlx::query("INSERT INTO sales_order_lines (sales_order_id, ipn, qty, qty_allocated) VALUES ('SO-1', 'A', 10, 3)")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let shipment = zrp_db::shipments::create_shipment(&pool, "outbound").await.unwrap();
        zrp_db::with_tx(&pool, |tx| {
            let id = shipment.id.clone();
            Box::pin(async move { zrp_db::shipments::insert_shipment_line(tx, &id, Some(sol_id), "A", 5).await })
        })
        .await
        .unwrap();

        let err = transition(&pool, &principal(), &shipment.id, ShipmentStatus::Packed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }
}
