//! Row types returned by the gateway. Plain data; no behavior. Statuses are
//! kept as `String` at this layer (SQLite has no native enum type) and
//! parsed into `zrp_schemas` closed enums by the caller — the boundary the
//! teacher draws between `mqk-db`'s row tuples and `mqk-schemas`'s typed
//! wire structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub failed_login_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CsrfTokenRow {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyRow {
    pub id: i64,
    pub user_id: i64,
    pub hash: String,
    pub prefix: String,
    pub name: String,
    pub enabled: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RolePermissionRow {
    pub role: String,
    pub module: String,
    pub action: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PartRow {
    pub ipn: String,
    pub category: String,
    pub mpn: String,
    pub manufacturer: String,
    pub lifecycle: String,
    pub status: String,
    pub description: String,
    pub attributes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryRow {
    pub ipn: String,
    pub qty_on_hand: i64,
    pub qty_reserved: i64,
    pub location: String,
    pub reorder_point: i64,
    pub reorder_qty: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryTransactionRow {
    pub id: i64,
    pub ipn: String,
    pub r#type: String,
    pub qty: i64,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BomLineRow {
    pub id: i64,
    pub parent_ipn: String,
    pub child_ipn: String,
    pub qty_per: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PoRow {
    pub id: String,
    pub vendor_id: String,
    pub status: String,
    pub expected_date: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub total: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PoLineRow {
    pub id: i64,
    pub po_id: String,
    pub ipn: String,
    pub qty_ordered: i64,
    pub qty_received: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkOrderRow {
    pub id: String,
    pub assembly_ipn: String,
    pub qty: i64,
    pub qty_good: i64,
    pub qty_scrap: i64,
    pub status: String,
    pub priority: String,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WoReservationRow {
    pub id: i64,
    pub wo_id: String,
    pub ipn: String,
    pub qty_reserved: i64,
    pub released: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcoRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub affected_ipns: String,
    pub ncr_id: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcoRevisionRow {
    pub id: i64,
    pub eco_id: String,
    pub letter: String,
    pub status: String,
    pub effectivity_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcoPartChangeRow {
    pub id: i64,
    pub eco_id: String,
    pub ipn: String,
    pub field: String,
    pub new_value: String,
    pub applied: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NcrRow {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub status: String,
    pub ipn: Option<String>,
    pub serial_number: Option<String>,
    pub defect_type: Option<String>,
    pub root_cause: Option<String>,
    pub corrective_action: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CapaRow {
    pub id: String,
    pub r#type: String,
    pub linked_ncr_id: Option<String>,
    pub linked_rma_id: Option<String>,
    pub status: String,
    pub qe_approved_by: Option<i64>,
    pub qe_approved_at: Option<DateTime<Utc>>,
    pub manager_approved_by: Option<i64>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub effectiveness_check: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RmaRow {
    pub id: String,
    pub serial_number: String,
    pub customer: String,
    pub reason: String,
    pub status: String,
    pub defect_description: Option<String>,
    pub resolution: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceRow {
    pub serial_number: String,
    pub ipn: String,
    pub firmware_version: Option<String>,
    pub customer: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub install_date: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignRow {
    pub id: String,
    pub name: String,
    pub version: String,
    pub category: String,
    pub status: String,
    pub target_filter: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignDeviceRow {
    pub id: i64,
    pub campaign_id: String,
    pub serial_number: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShipmentRow {
    pub id: String,
    pub r#type: String,
    pub status: String,
    pub ship_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShipmentLineRow {
    pub id: i64,
    pub shipment_id: String,
    pub sales_order_line_id: Option<i64>,
    pub ipn: String,
    pub qty: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SalesOrderLineRow {
    pub id: i64,
    pub sales_order_id: String,
    pub ipn: String,
    pub qty: i64,
    pub qty_allocated: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationRow {
    pub id: i64,
    pub r#type: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub record_id: Option<String>,
    pub module: Option<String>,
    pub user_id: Option<i64>,
    pub emailed: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEventRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub module: String,
    pub record_id: String,
    pub summary: String,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
