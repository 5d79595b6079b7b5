//! Shared domain types for the ZRP back-end.
//!
//! Every enum here is a closed set per spec §3/§4 — new variants require a
//! deliberate schema change, not silent string growth. `sqlx` (de)codes them
//! via `TEXT` columns using the `Display`/`FromStr` impls below rather than
//! native enum types, matching the embedded store's dynamic typing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Timestamp = DateTime<Utc>;

/// Common envelope wrapping every successful API response body (§4.9, §6).
#[derive(Debug, Clone, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    pub fn with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            data,
            meta: Some(meta),
        }
    }
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(anyhow::anyhow!(concat!(stringify!($name), " invalid value: {}"), other)),
                }
            }
        }
    };
}

closed_enum!(
    /// User role; drives the default capability set in `zrp-authz`.
    Role { Admin => "admin", User => "user", Readonly => "readonly" }
);

closed_enum!(
    /// Capability module; one row of the (role, module, action) table per pair.
    Module {
        Parts => "parts",
        Inventory => "inventory",
        Ecos => "ecos",
        Procurement => "procurement",
        WorkOrders => "work_orders",
        Ncrs => "ncrs",
        Capas => "capas",
        Rmas => "rmas",
        Shipments => "shipments",
        FieldReports => "field_reports",
        Firmware => "firmware",
        Quotes => "quotes",
        Documents => "documents",
        Vendors => "vendors",
        Users => "users",
        Audit => "audit",
        Settings => "settings",
        Admin => "admin",
        Dashboard => "dashboard",
    }
);

closed_enum!(
    Action { View => "view", Create => "create", Edit => "edit", Delete => "delete", Approve => "approve" }
);

closed_enum!(
    InventoryTxnType {
        Receive => "receive",
        Issue => "issue",
        Adjust => "adjust",
        Transfer => "transfer",
        Return => "return",
        Scrap => "scrap",
    }
);

closed_enum!(
    PoStatus {
        Draft => "draft",
        Sent => "sent",
        Confirmed => "confirmed",
        Partial => "partial",
        Received => "received",
        Cancelled => "cancelled",
    }
);

closed_enum!(
    WoStatus {
        Open => "open",
        InProgress => "in_progress",
        Complete => "complete",
        Cancelled => "cancelled",
        OnHold => "on_hold",
    }
);

closed_enum!(
    WoSerialStatus { Building => "building", Testing => "testing", Complete => "complete", Failed => "failed", Scrapped => "scrapped" }
);

closed_enum!(
    TestResult { Pass => "pass", Fail => "fail", Conditional => "conditional" }
);

closed_enum!(
    EcoStatus {
        Draft => "draft",
        Review => "review",
        Approved => "approved",
        Implemented => "implemented",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
);

closed_enum!(
    EcoRevisionStatus { Created => "created", Approved => "approved", Implemented => "implemented" }
);

closed_enum!(
    NcrSeverity { Minor => "minor", Major => "major", Critical => "critical" }
);

closed_enum!(
    NcrStatus { Open => "open", Investigating => "investigating", Resolved => "resolved", Closed => "closed" }
);

closed_enum!(
    CapaType { Corrective => "corrective", Preventive => "preventive" }
);

closed_enum!(
    /// Resolved per SPEC_FULL.md Open Question 3: the schema enum wins over
    /// the richer comment-only enum. `Cancelled` is a side exit.
    CapaStatus { Open => "open", InProgress => "in_progress", PendingReview => "pending_review", Closed => "closed", Cancelled => "cancelled" }
);

closed_enum!(
    /// Resolved per SPEC_FULL.md Open Question 1: `Shipped` is inserted
    /// between `Repairing` and `Resolved`.
    RmaStatus {
        Open => "open",
        Received => "received",
        Diagnosing => "diagnosing",
        Repairing => "repairing",
        Shipped => "shipped",
        Resolved => "resolved",
        Closed => "closed",
        Scrapped => "scrapped",
    }
);

closed_enum!(
    DeviceStatus { Active => "active", Inactive => "inactive", Rma => "rma", Decommissioned => "decommissioned", Maintenance => "maintenance" }
);

closed_enum!(
    CampaignCategory { Public => "public", Beta => "beta", Internal => "internal" }
);

closed_enum!(
    CampaignStatus { Draft => "draft", Active => "active", Paused => "paused", Completed => "completed", Cancelled => "cancelled" }
);

closed_enum!(
    CampaignDeviceStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Sent => "sent",
        Success => "success",
        Updated => "updated",
        Failed => "failed",
        Skipped => "skipped",
    }
);

closed_enum!(
    ShipmentType { Outbound => "outbound", Inbound => "inbound" }
);

closed_enum!(
    ShipmentStatus { Draft => "draft", Packed => "packed", Shipped => "shipped", Cancelled => "cancelled" }
);

closed_enum!(
    NotificationSeverity { Info => "info", Warning => "warning", Error => "error" }
);

closed_enum!(
    /// Closed enum of subscribable event types (§6 "Email subscription event types").
    EmailEventType {
        EcoApproved => "eco_approved",
        EcoImplemented => "eco_implemented",
        LowStock => "low_stock",
        OverdueWorkOrder => "overdue_work_order",
        PoReceived => "po_received",
        NcrCreated => "ncr_created",
    }
);

closed_enum!(
    EmailLogStatus { Sent => "sent", Failed => "failed" }
);

closed_enum!(
    AuthMethod { Cookie => "cookie", Bearer => "bearer", Anonymous => "anonymous" }
);

/// Immutable per-request identity attached by the auth middleware (§9).
/// Handlers read this instead of re-touching the session/API-key tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub auth_method: AuthMethod,
}

/// Domain events fanned out by the notification hub (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    InventoryChanged {
        ipn: String,
        qty_on_hand: i64,
        qty_reserved: i64,
    },
    EcoApproved {
        eco_id: String,
        approved_by: i64,
    },
    EcoImplemented {
        eco_id: String,
    },
    WoComplete {
        wo_id: String,
        qty_good: i64,
        qty_scrap: i64,
    },
    PoReceived {
        po_id: String,
    },
    NcrCreated {
        ncr_id: String,
        severity: NcrSeverity,
    },
    CampaignProgress {
        campaign_id: String,
        pct: f64,
    },
    Audit {
        audit_id: i64,
        module: Module,
        action: Action,
        record_id: String,
        summary: String,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::InventoryChanged { .. } => "inventory_changed",
            DomainEvent::EcoApproved { .. } => "eco_approved",
            DomainEvent::EcoImplemented { .. } => "eco_implemented",
            DomainEvent::WoComplete { .. } => "wo_complete",
            DomainEvent::PoReceived { .. } => "po_received",
            DomainEvent::NcrCreated { .. } => "ncr_created",
            DomainEvent::CampaignProgress { .. } => "campaign_progress",
            DomainEvent::Audit { .. } => "audit",
        }
    }
}

/// A shortage line returned by the BOM rollup (§4.6.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortageLine {
    pub ipn: String,
    pub required: i64,
    pub available: i64,
    pub shortage: i64,
}

/// Opaque request id threaded through tracing spans and error envelopes.
pub fn new_trace_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for r in Role::ALL {
            assert_eq!(Role::from_str(r.as_str()).unwrap(), *r);
        }
    }

    #[test]
    fn rma_status_includes_shipped_between_repairing_and_resolved() {
        assert_eq!(RmaStatus::from_str("shipped").unwrap(), RmaStatus::Shipped);
    }

    #[test]
    fn invalid_enum_value_errors() {
        assert!(PoStatus::from_str("bogus").is_err());
    }
}
