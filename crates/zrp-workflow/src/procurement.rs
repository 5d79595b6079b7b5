//! §4.6.2 PO receiving: full or per-line receipt against a PO, optionally
//! split through a receiving inspection, with price history and status
//! recomputation.

use sqlx::SqlitePool;
use zrp_audit::ChangeDescription;
use zrp_db::model::{PoLineRow, PoRow};
use zrp_schemas::{DomainEvent, InventoryTxnType, PoStatus, Principal};

use crate::{to_workflow_error, WorkflowError, WorkflowResult};

/// One line's disposition on receipt. `qty_passed + qty_failed + qty_on_hold`
/// must equal the quantity actually received on this call (§3 "Receiving
/// inspection" invariant); only the `pass` portion reaches `qty_on_hand`.
pub struct LineReceipt {
    pub po_line_id: i64,
    pub qty_passed: i64,
    pub qty_failed: i64,
    pub qty_on_hold: i64,
}

impl LineReceipt {
    fn qty_received(&self) -> i64 {
        self.qty_passed + self.qty_failed + self.qty_on_hold
    }
}

/// Receives part or all of a PO (§4.6.2). `receipts` is empty to mean "full
/// receipt of every remaining line with no inspection split" (scenario 1/2);
/// non-empty to mean "receive exactly these lines with this disposition"
/// (partial or inspected receipt).
pub async fn receive_po(
    pool: &SqlitePool,
    principal: &Principal,
    po_id: &str,
    receipts: Vec<LineReceipt>,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> WorkflowResult<(PoRow, Vec<PoLineRow>, Vec<DomainEvent>)> {
    let (po, lines, audit_id) = zrp_db::with_tx(pool, |tx| {
        let principal = principal.clone();
        let ip = ip.map(str::to_string);
        let user_agent = user_agent.map(str::to_string);
        let po_id = po_id.to_string();
        Box::pin(async move {
            let before = zrp_db::procurement::fetch_po(tx, &po_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound(format!("PO {po_id}")))?;

            let status: PoStatus = before.status.parse()?;
            if !matches!(status, PoStatus::Sent | PoStatus::Confirmed | PoStatus::Partial) {
                return Err(WorkflowError::Conflict(format!(
                    "PO {po_id} is {} and cannot be received",
                    before.status
                ))
                .into());
            }

            let mut lines = zrp_db::procurement::fetch_po_lines(tx, &po_id).await?;
            let plan: Vec<LineReceipt> = if receipts.is_empty() {
                lines
                    .iter()
                    .filter(|l| l.qty_received < l.qty_ordered)
                    .map(|l| LineReceipt {
                        po_line_id: l.id,
                        qty_passed: l.qty_ordered - l.qty_received,
                        qty_failed: 0,
                        qty_on_hold: 0,
                    })
                    .collect()
            } else {
                receipts
            };

            for receipt in plan {
                let line = lines
                    .iter()
                    .find(|l| l.id == receipt.po_line_id)
                    .ok_or_else(|| WorkflowError::Validation(format!("PO line {} not on PO {po_id}", receipt.po_line_id)))?
                    .clone();

                let new_qty_received = line.qty_received + receipt.qty_received();
                if new_qty_received > line.qty_ordered {
                    return Err(WorkflowError::Validation(format!(
                        "PO line {}: receiving {} would exceed qty_ordered {}",
                        line.id,
                        receipt.qty_received(),
                        line.qty_ordered
                    ))
                    .into());
                }

                if receipt.qty_passed > 0 {
                    crate::inventory::post_inventory_transaction(
                        tx,
                        &line.ipn,
                        InventoryTxnType::Receive,
                        receipt.qty_passed,
                        Some(&po_id),
                        None,
                    )
                    .await?;
                }

                zrp_db::procurement::set_po_line_qty_received(tx, line.id, new_qty_received).await?;
                zrp_db::procurement::insert_receiving_inspection(
                    tx,
                    &po_id,
                    line.id,
                    receipt.qty_received(),
                    receipt.qty_passed,
                    receipt.qty_failed,
                    receipt.qty_on_hold,
                )
                .await?;
                zrp_db::procurement::insert_price_history(tx, &line.ipn, &before.vendor_id, line.unit_price, receipt.qty_received())
                    .await?;
            }

            lines = zrp_db::procurement::fetch_po_lines(tx, &po_id).await?;
            let all_received = lines.iter().all(|l| l.qty_received >= l.qty_ordered);
            let new_status = if all_received { PoStatus::Received } else { PoStatus::Partial };
            let received_at = all_received.then(zrp_db::now_str);
            zrp_db::procurement::set_po_status(tx, &po_id, new_status.as_str(), received_at.as_deref()).await?;

            let after = zrp_db::procurement::fetch_po(tx, &po_id).await?.unwrap();

            let audit_id = zrp_audit::record_change(
                tx,
                &principal,
                ip.as_deref(),
                user_agent.as_deref(),
                ChangeDescription {
                    module: "procurement",
                    record_id: &po_id,
                    action: "edit",
                    summary: "PO received",
                    before: Some(&before),
                    after: Some(&after),
                },
            )
            .await?;

            Ok((after, lines, audit_id))
        })
    })
    .await
    .map_err(to_workflow_error)?;

    let events = vec![
        DomainEvent::PoReceived { po_id: po.id.clone() },
        zrp_audit::audit_domain_event(audit_id, "procurement", "edit", &po.id, "PO received").map_err(WorkflowError::Internal)?,
    ];
    Ok((po, lines, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zrp_db::procurement::NewPoLine;
    use zrp_schemas::Role;

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "buyer".into(),
            role: Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    async fn setup_po(pool: &SqlitePool, qty: i64) -> PoRow {
        sqlx::query("INSERT INTO vendors (id, name, created_at) VALUES ('V1', 'Acme', datetime('now'))")
            .execute(pool)
            .await
            .unwrap();
        let (po, _lines) = zrp_db::procurement::create_po(
            pool,
            "V1",
            1,
            None,
            vec![NewPoLine { ipn: "P1".into(), qty_ordered: qty, unit_price: 500 }],
        )
        .await
        .unwrap();
        zrp_db::with_tx(pool, |tx| {
            let id = po.id.clone();
            Box::pin(async move { zrp_db::procurement::set_po_status(tx, &id, "sent", None).await })
        })
        .await
        .unwrap();
        po
    }

    #[tokio::test]
    async fn full_receipt_of_po_with_prior_stock_matches_scenario_1() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            crate::inventory::post_inventory_transaction(tx, "P1", InventoryTxnType::Receive, 50, None, None)
                .await
                .map_err(Into::into)
        }))
        .await
        .unwrap();

        let po = setup_po(&pool, 100).await;
        let (received, lines, events) = receive_po(&pool, &principal(), &po.id, vec![], None, None).await.unwrap();

        assert_eq!(received.status, "received");
        assert_eq!(lines[0].qty_received, 100);
        assert_eq!(events.len(), 2);

        let inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            zrp_db::inventory::fetch_inventory(tx, "P1").await
        }))
        .await
        .unwrap()
        .unwrap();
        assert_eq!(inv.qty_on_hand, 150);
    }

    #[tokio::test]
    async fn receipt_with_no_prior_row_auto_creates_inventory_matches_scenario_2() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let po = setup_po(&pool, 75).await;
        receive_po(&pool, &principal(), &po.id, vec![], None, None).await.unwrap();

        let inv = zrp_db::with_tx(&pool, |tx| Box::pin(async move {
            zrp_db::inventory::fetch_inventory(tx, "P1").await
        }))
        .await
        .unwrap()
        .unwrap();
        assert_eq!(inv.qty_on_hand, 75);
    }

    #[tokio::test]
    async fn second_full_receipt_conflicts_instead_of_double_crediting() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let po = setup_po(&pool, 50).await;
        receive_po(&pool, &principal(), &po.id, vec![], None, None).await.unwrap();

        let err = receive_po(&pool, &principal(), &po.id, vec![], None, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }
}
