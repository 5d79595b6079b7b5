//! Inventory & parts queries backing C6.1 (`postInventoryTransaction`) and
//! the BOM shortage rollup. All writes here are expected to run inside a
//! caller-owned transaction (see `crate::with_tx`); this module never opens
//! its own transaction so the workflow layer can compose several of these
//! calls atomically.

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{BomLineRow, InventoryRow, InventoryTransactionRow, PartRow};
use crate::now_str;

/// Pool-based twin of [`fetch_part`], for read-only GET handlers that have
/// no surrounding transaction.
pub async fn fetch_part_pool(pool: &SqlitePool, ipn: &str) -> Result<Option<PartRow>> {
    sqlx::query_as::<_, PartRow>("SELECT * FROM parts WHERE ipn = ?")
        .bind(ipn)
        .fetch_optional(pool)
        .await
        .context("fetch_part_pool failed")
}

pub async fn list_parts(pool: &SqlitePool, limit: i64) -> Result<Vec<PartRow>> {
    sqlx::query_as::<_, PartRow>("SELECT * FROM parts ORDER BY ipn LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_parts failed")
}

pub async fn create_part(
    pool: &SqlitePool,
    ipn: &str,
    category: &str,
    mpn: &str,
    manufacturer: &str,
    description: &str,
) -> Result<PartRow> {
    sqlx::query(
        "INSERT INTO parts (ipn, category, mpn, manufacturer, lifecycle, status, description, attributes, created_at)
         VALUES (?, ?, ?, ?, 'active', 'active', ?, '{}', ?)",
    )
    .bind(ipn)
    .bind(category)
    .bind(mpn)
    .bind(manufacturer)
    .bind(description)
    .bind(now_str())
    .execute(pool)
    .await
    .context("create_part failed")?;

    fetch_part_pool(pool, ipn)
        .await?
        .context("part vanished after insert")
}

/// Pool-based twin of [`fetch_inventory`].
pub async fn fetch_inventory_pool(pool: &SqlitePool, ipn: &str) -> Result<Option<InventoryRow>> {
    sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory WHERE ipn = ?")
        .bind(ipn)
        .fetch_optional(pool)
        .await
        .context("fetch_inventory_pool failed")
}

pub async fn list_inventory(pool: &SqlitePool, limit: i64) -> Result<Vec<InventoryRow>> {
    sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory ORDER BY ipn LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("list_inventory failed")
}

pub async fn fetch_inventory(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
) -> Result<Option<InventoryRow>> {
    sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory WHERE ipn = ?")
        .bind(ipn)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_inventory failed")
}

pub async fn fetch_part(tx: &mut Transaction<'_, Sqlite>, ipn: &str) -> Result<Option<PartRow>> {
    sqlx::query_as::<_, PartRow>("SELECT * FROM parts WHERE ipn = ?")
        .bind(ipn)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch_part failed")
}

pub async fn create_inventory_row(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    qty_on_hand: i64,
    qty_reserved: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO inventory (ipn, qty_on_hand, qty_reserved, location, reorder_point, reorder_qty, updated_at)
         VALUES (?, ?, ?, '', 0, 0, ?)",
    )
    .bind(ipn)
    .bind(qty_on_hand)
    .bind(qty_reserved)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("create_inventory_row failed")?;
    Ok(())
}

pub async fn set_qty_on_hand(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    qty_on_hand: i64,
) -> Result<()> {
    sqlx::query("UPDATE inventory SET qty_on_hand = ?, updated_at = ? WHERE ipn = ?")
        .bind(qty_on_hand)
        .bind(now_str())
        .bind(ipn)
        .execute(&mut **tx)
        .await
        .context("set_qty_on_hand failed")?;
    Ok(())
}

pub async fn adjust_qty_reserved(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    delta: i64,
) -> Result<()> {
    sqlx::query("UPDATE inventory SET qty_reserved = qty_reserved + ?, updated_at = ? WHERE ipn = ?")
        .bind(delta)
        .bind(now_str())
        .bind(ipn)
        .execute(&mut **tx)
        .await
        .context("adjust_qty_reserved failed")?;
    Ok(())
}

pub async fn insert_inventory_transaction(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    txn_type: &str,
    signed_qty: i64,
    reference: Option<&str>,
    notes: Option<&str>,
) -> Result<InventoryTransactionRow> {
    let created_at = now_str();
    let id = sqlx::query(
        "INSERT INTO inventory_transactions (ipn, type, qty, reference, notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(ipn)
    .bind(txn_type)
    .bind(signed_qty)
    .bind(reference)
    .bind(notes)
    .bind(&created_at)
    .execute(&mut **tx)
    .await
    .context("insert_inventory_transaction failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, InventoryTransactionRow>("SELECT * FROM inventory_transactions WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("reload inventory transaction failed")
}

/// Direct children of `parent_ipn` (one BOM level).
pub async fn bom_children(
    tx: &mut Transaction<'_, Sqlite>,
    parent_ipn: &str,
) -> Result<Vec<BomLineRow>> {
    sqlx::query_as::<_, BomLineRow>("SELECT * FROM bom_lines WHERE parent_ipn = ?")
        .bind(parent_ipn)
        .fetch_all(&mut **tx)
        .await
        .context("bom_children failed")
}

/// All descendant IPNs of `ipn` (used by the acyclicity guard at insert
/// time, §9 "Cyclic risk in BOM traversal").
pub async fn bom_transitive_children(
    tx: &mut Transaction<'_, Sqlite>,
    ipn: &str,
    max_depth: u32,
) -> Result<Vec<String>> {
    let mut seen = Vec::new();
    let mut frontier = vec![ipn.to_string()];
    let mut depth = 0;

    while !frontier.is_empty() && depth < max_depth {
        let mut next_frontier = Vec::new();
        for parent in &frontier {
            for child in bom_children(tx, parent).await? {
                if !seen.contains(&child.child_ipn) {
                    seen.push(child.child_ipn.clone());
                    next_frontier.push(child.child_ipn);
                }
            }
        }
        frontier = next_frontier;
        depth += 1;
    }

    Ok(seen)
}

pub async fn insert_bom_line(
    pool: &sqlx::SqlitePool,
    parent_ipn: &str,
    child_ipn: &str,
    qty_per: i64,
    notes: Option<&str>,
    max_depth: u32,
) -> Result<BomLineRow> {
    crate::with_tx(pool, |tx| {
        let parent_ipn = parent_ipn.to_string();
        let child_ipn = child_ipn.to_string();
        let notes = notes.map(|s| s.to_string());
        Box::pin(async move {
            if parent_ipn == child_ipn {
                anyhow::bail!("a part cannot be its own BOM child");
            }
            let descendants = bom_transitive_children(tx, &child_ipn, max_depth).await?;
            if descendants.contains(&parent_ipn) {
                anyhow::bail!("BOM line would introduce a cycle");
            }

            let id = sqlx::query(
                "INSERT INTO bom_lines (parent_ipn, child_ipn, qty_per, notes) VALUES (?, ?, ?, ?)",
            )
            .bind(&parent_ipn)
            .bind(&child_ipn)
            .bind(qty_per)
            .bind(&notes)
            .execute(&mut **tx)
            .await
            .context("insert_bom_line failed")?
            .last_insert_rowid();

            sqlx::query_as::<_, BomLineRow>("SELECT * FROM bom_lines WHERE id = ?")
                .bind(id)
                .fetch_one(&mut **tx)
                .await
                .context("reload bom line failed")
        })
    })
    .await
}
