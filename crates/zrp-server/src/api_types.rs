//! Request/response DTOs for the C9 HTTP surface. Write endpoints use
//! explicit structs with `deny_unknown_fields` per §4.9 ("unknown fields
//! are rejected in strict endpoints"); list/get responses reuse the
//! `zrp_db::model` row types directly, the same shortcut the teacher takes
//! for its read-only trading endpoints.

use serde::{Deserialize, Serialize};
use zrp_schemas::{CampaignCategory, EcoStatus, NcrSeverity, NcrStatus, RmaStatus, Role, ShipmentStatus, WoStatus};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePartRequest {
    pub ipn: String,
    pub category: String,
    pub mpn: String,
    pub manufacturer: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBomLineRequest {
    pub child_ipn: String,
    pub qty_per: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPoLineRequest {
    pub ipn: String,
    pub qty_ordered: i64,
    pub unit_price: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePoRequest {
    pub vendor_id: String,
    pub expected_date: Option<String>,
    pub lines: Vec<NewPoLineRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordRfqQuoteRequest {
    pub rfq_line_id: i64,
    pub vendor_id: String,
    pub unit_price: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwardRfqQuoteRequest {
    pub quote_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDeviceRequest {
    pub serial_number: String,
    pub ipn: String,
    pub firmware_version: Option<String>,
    pub customer: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWoSerialRequest {
    pub serial_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordTestRequest {
    pub serial_number: String,
    pub ipn: String,
    pub firmware_version: Option<String>,
    pub test_type: String,
    pub result: zrp_schemas::TestResult,
    pub measurements: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEcoRequest {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub affected_ipns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateShipmentRequest {
    pub shipment_type: zrp_schemas::ShipmentType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddShipmentLineRequest {
    pub sales_order_line_id: Option<i64>,
    pub ipn: String,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachDocumentRequest {
    pub module: String,
    pub record_id: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkReadRequest {
    pub notification_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub auth_method: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub id: i64,
    pub plaintext: String,
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacePermissionsRequest {
    pub pairs: Vec<(zrp_schemas::Module, zrp_schemas::Action)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustInventoryRequest {
    pub ipn: String,
    pub signed_qty: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineReceiptRequest {
    pub po_line_id: i64,
    pub qty_pass: i64,
    pub qty_fail: i64,
    pub qty_hold: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceivePoRequest {
    pub lines: Vec<LineReceiptRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkOrderRequest {
    pub assembly_ipn: String,
    pub qty: i64,
    pub priority: String,
    pub notes: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionWorkOrderRequest {
    pub status: WoStatus,
    pub qty_good: Option<i64>,
    pub qty_scrap: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BomCheckQuery {
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcoTransitionRequest {
    pub status: EcoStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNcrRequest {
    pub title: String,
    pub severity: NcrSeverity,
    pub ipn: Option<String>,
    pub serial_number: Option<String>,
    pub defect_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NcrTransitionRequest {
    pub status: NcrStatus,
    pub root_cause: Option<String>,
    pub corrective_action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCapaRequest {
    pub capa_type: String,
    pub linked_ncr_id: Option<String>,
    pub linked_rma_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEcoFromNcrRequest {
    pub ncr_id: String,
    pub title: String,
    pub description: String,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRmaRequest {
    pub serial_number: String,
    pub customer: String,
    pub reason: String,
    pub defect_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RmaTransitionRequest {
    pub status: RmaStatus,
    pub resolution: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipmentTransitionRequest {
    pub status: ShipmentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub version: String,
    pub category: CampaignCategory,
    pub target_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkDeviceRequest {
    pub serial_number: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HaltCampaignRequest {
    pub status: zrp_schemas::CampaignStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateVendorRequest {
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRfqRequest {
    pub title: String,
    pub vendor_ids: Vec<String>,
    pub lines: Vec<(String, i64)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSalesOrderRequest {
    pub customer: String,
    pub lines: Vec<(String, i64)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFieldReportRequest {
    pub title: String,
    pub priority: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEmailSubscriptionRequest {
    pub module: zrp_schemas::Module,
    pub event_type: zrp_schemas::EmailEventType,
    pub enabled: bool,
}
