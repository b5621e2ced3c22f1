//! # warden-contracts
//!
//! Shared types and contracts for the warden audit trail.
//!
//! All crates in the workspace import from here. No I/O lives in this crate,
//! only the on-disk record types, the caller-facing append payload, the
//! verification result types and the error enum.

pub mod entry;
pub mod error;
pub mod record;
pub mod verify;
