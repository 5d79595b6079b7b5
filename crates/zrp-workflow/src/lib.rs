//! Workflow engine (C6): inventory transactions, PO receiving, work-order
//! reservation/consumption, BOM shortage rollup, the ECO/NCR/CAPA/RMA state
//! machines, and shipment packing. Mirrors the teacher's
//! `mqk-execution::oms::state_machine` shape — one function per transition,
//! each running inside `zrp_db::with_tx` and returning the domain events its
//! caller must fan out to `zrp-notify` strictly after commit.
//!
//! Every mutating function here returns `(row, Vec<DomainEvent>)`. The
//! events are collected *inside* the transaction (so they reflect only state
//! that actually committed) but must not be published until after
//! `with_tx` returns `Ok` — that ordering guarantee belongs to the caller
//! (`zrp-server`'s handlers), not to this crate.

pub mod eco;
pub mod inventory;
pub mod procurement;
pub mod quality;
pub mod shipments;
pub mod workorders;

use anyhow::Result;

/// Errors a workflow step can fail with. Deliberately coarse — `zrp-server`
/// maps each variant to one HTTP status from §7's taxonomy and does not need
/// finer-grained detail than these four buckets.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Recovers a `WorkflowError` raised with `?` inside a `zrp_db::with_tx`
/// closure (where the closure's `Fut::Output` is `anyhow::Result<T>`, so the
/// typed error travels boxed inside `anyhow::Error`). Anything that isn't
/// one of ours — a `sqlx` error, a `serde_json` error — becomes `Internal`.
pub(crate) fn to_workflow_error(err: anyhow::Error) -> WorkflowError {
    match err.downcast::<WorkflowError>() {
        Ok(wf) => wf,
        Err(err) => WorkflowError::Internal(err),
    }
}

pub(crate) type WorkflowResult<T> = Result<T, WorkflowError>;
