//! §4.6.1 `postInventoryTransaction` and §4.6.4 BOM shortage rollup. Every
//! other module in this crate that touches `qty_on_hand`/`qty_reserved`
//! (receiving, WO consumption, shipment issue) calls through
//! [`post_inventory_transaction`] rather than writing to `inventory` or
//! `inventory_transactions` directly.

use std::collections::BTreeMap;

use sqlx::{Sqlite, SqlitePool, Transaction};
use zrp_audit::ChangeDescription;
use zrp_db::model::InventoryRow;
use zrp_schemas::{DomainEvent, InventoryTxnType, Principal, ShortageLine};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

/// The single chokepoint for inventory mutation (§4.6.1). Runs inside the
/// caller's transaction so it composes with the rest of a larger workflow
/// step (PO receipt, WO completion) atomically.
///
/// Auto-creates the inventory row at `qty_on_hand = signed_qty` when it is
/// absent and `signed_qty` is a positive receipt; any other missing-row case
/// is a `NotFound`.
pub async fn post_inventory_transaction(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    txn_type: InventoryTxnType,
    signed_qty: i64,
    reference: Option<&str>,
    notes: Option<&str>,
) -> WorkflowResult<InventoryRow> {
    let existing = zrp_db::inventory::fetch_inventory(tx, ipn)
        .await
        .map_err(WorkflowError::Internal)?;

    let (new_on_hand, new_reserved) = match &existing {
        Some(row) => (row.qty_on_hand + signed_qty, row.qty_reserved),
        None if signed_qty > 0 => (signed_qty, 0),
        None => return Err(WorkflowError::NotFound(format!("inventory row for {ipn}"))),
    };

    if new_on_hand < 0 {
        return Err(WorkflowError::Validation(format!(
            "{ipn}: qty_on_hand would go negative ({new_on_hand})"
        )));
    }
    if new_reserved > new_on_hand {
        return Err(WorkflowError::Validation(format!(
            "{ipn}: qty_reserved ({new_reserved}) would exceed qty_on_hand ({new_on_hand})"
        )));
    }

    if existing.is_some() {
        zrp_db::inventory::set_qty_on_hand(tx, ipn, new_on_hand)
            .await
            .map_err(WorkflowError::Internal)?;
    } else {
        zrp_db::inventory::create_inventory_row(tx, ipn, new_on_hand, new_reserved)
            .await
            .map_err(WorkflowError::Internal)?;
    }

    zrp_db::inventory::insert_inventory_transaction(tx, ipn, txn_type.as_str(), signed_qty, reference, notes)
        .await
        .map_err(WorkflowError::Internal)?;

    zrp_db::inventory::fetch_inventory(tx, ipn)
        .await
        .map_err(WorkflowError::Internal)?
        .ok_or_else(|| WorkflowError::Internal(anyhow::anyhow!("inventory row for {ipn} vanished mid-transaction")))
}

/// Reservation delta, used by the work-order module (§4.6.3) to bump or
/// release `qty_reserved` without moving `qty_on_hand`.
pub async fn adjust_reservation(tx: &mut Transaction<'_, Sqlite>, ipn: &str, delta: i64) -> WorkflowResult<()> {
    zrp_db::inventory::adjust_qty_reserved(tx, ipn, delta)
        .await
        .map_err(WorkflowError::Internal)
}

/// Direct, audited inventory adjustment (the `adjust` transaction type) —
/// the operator-facing counterpart to the PO/WO-driven postings elsewhere in
/// this crate.
pub async fn adjust_inventory(
    pool: &SqlitePool,
    principal: &Principal,
    ipn: &str,
    signed_qty: i64,
    notes: Option<&str>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(InventoryRow, Vec<DomainEvent>)> {
    let (after, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let notes = notes.map(str::to_string);
        let ipn = ipn.to_string();
        Box::pin(async move {
            let before = zrp_db::inventory::fetch_inventory(tx, &ipn).await?;
            let after =
                post_inventory_transaction(tx, &ipn, InventoryTxnType::Adjust, signed_qty, None, notes.as_deref())
                    .await?;
            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "inventory",
                    record_id: &ipn,
                    action: "edit",
                    summary: "manual inventory adjustment",
                    before: before.as_ref(),
                    after: Some(&after),
                },
            )
            .await?;
            Ok((after, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![
        DomainEvent::InventoryChanged {
            ipn: after.ipn.clone(),
            qty_on_hand: after.qty_on_hand,
            qty_reserved: after.qty_reserved,
        },
        zrp_audit::audit_domain_event(audit_id, "inventory", "edit", &after.ipn, "manual inventory adjustment")
            .map_err(WorkflowError::Internal)?,
    ];
    Ok((after, events))
}

/// BFS expansion of the BOM tree for `assembly_ipn × qty`, aggregating
/// required quantity at the leaves (nodes with no BOM children) by `ipn`.
/// Bounded by `max_depth` (§9: "bound traversal depth") to fail fast on
/// malformed data rather than looping.
async fn expand_bom(
    tx: &mut Transaction<'_, Sqlite>,
    assembly_ipn: &str,
    qty: i64,
    max_depth: u32,
) -> anyhow::Result<BTreeMap<String, i64>> {
    let mut required: BTreeMap<String, i64> = BTreeMap::new();
    let mut frontier = vec![(assembly_ipn.to_string(), qty)];
    let mut depth = 0u32;

    while !frontier.is_empty() {
        if depth >= max_depth {
            anyhow::bail!("BOM for {assembly_ipn} exceeds max depth of {max_depth}");
        }
        let mut next_frontier = Vec::new();
        for (ipn, parent_qty) in frontier {
            let children = zrp_db::inventory::bom_children(tx, &ipn).await?;
            if children.is_empty() {
                if depth > 0 {
                    *required.entry(ipn).or_insert(0) += parent_qty;
                }
                continue;
            }
            for child in children {
                next_frontier.push((child.child_ipn, parent_qty * child.qty_per));
            }
        }
        frontier = next_frontier;
        depth += 1;
    }

    Ok(required)
}

/// `GET /api/v1/workorders/{id}/bom-check` and the standalone bom-check
/// endpoint share this: expand the tree, diff each leaf's requirement
/// against `qty_on_hand − qty_reserved`, and return only the non-zero rows
/// (§4.6.4 returns the full shortage vector; callers filter to shortages
/// themselves if they want the "clean" empty-list signal from scenario 3).
pub async fn bom_shortage_rollup(
    pool: &SqlitePool,
    assembly_ipn: &str,
    qty: i64,
    max_depth: u32,
) -> WorkflowResult<Vec<ShortageLine>> {
    if qty <= 0 {
        return Err(WorkflowError::Validation("qty must be positive".into()));
    }

    zrp_db::with_tx(pool, |tx| {
        let assembly_ipn = assembly_ipn.to_string();
        Box::pin(async move {
            let required = expand_bom(tx, &assembly_ipn, qty, max_depth).await?;
            let mut lines = Vec::with_capacity(required.len());
            for (ipn, required_qty) in required {
                let available = match zrp_db::inventory::fetch_inventory(tx, &ipn).await? {
                    Some(row) => row.qty_on_hand - row.qty_reserved,
                    None => 0,
                };
                let shortage = (required_qty - available).max(0);
                lines.push(ShortageLine {
                    ipn,
                    required: required_qty,
                    available,
                    shortage,
                });
            }
            Ok(lines)
        })
    })
    .await
    .map_err(to_workflow_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_schemas::Role;

    async fn setup() -> SqlitePool {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        pool
    }

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "qe".into(),
            role: Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    #[tokio::test]
    async fn receipt_auto_creates_missing_inventory_row() {
        let pool = setup().await;
        let row = zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "P1", InventoryTxnType::Receive, 75, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();
        assert_eq!(row.qty_on_hand, 75);
        assert_eq!(row.qty_reserved, 0);
    }

    #[tokio::test]
    async fn issue_against_missing_row_is_not_found() {
        let pool = setup().await;
        let err = zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "P2", InventoryTxnType::Issue, -5, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap_err();
        assert!(matches!(to_workflow_error(err), WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn negative_on_hand_is_rejected() {
        let pool = setup().await;
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "P3", InventoryTxnType::Receive, 10, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();

        let err = zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "P3", InventoryTxnType::Issue, -20, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap_err();
        assert!(matches!(to_workflow_error(err), WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn bom_shortage_matches_scenario_3() {
        let pool = setup().await;
        zrp_db::inventory::insert_bom_line(&pool, "A", "R", 10, None, 32).await.unwrap();
        zrp_db::inventory::insert_bom_line(&pool, "A", "C", 5, None, 32).await.unwrap();
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "R", InventoryTxnType::Receive, 5, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            post_inventory_transaction(tx, "C", InventoryTxnType::Receive, 2, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();

        let shortages = bom_shortage_rollup(&pool, "A", 10, 32).await.unwrap();
        let mut by_ipn: BTreeMap<_, _> = shortages.into_iter().map(|s| (s.ipn.clone(), s)).collect();

        let r = by_ipn.remove("R").unwrap();
        assert_eq!((r.required, r.available, r.shortage), (100, 5, 95));
        let c = by_ipn.remove("C").unwrap();
        assert_eq!((c.required, c.available, c.shortage), (50, 2, 48));
    }

    #[tokio::test]
    async fn adjust_inventory_emits_two_events() {
        let pool = setup().await;
        let (_, events) = adjust_inventory(&pool, &principal(), "P9", 20, Some("cycle count"), None, None)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DomainEvent::InventoryChanged { .. }));
        assert!(matches!(events[1], DomainEvent::Audit { .. }));
    }
}
