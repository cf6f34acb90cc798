//! Integration tests for moneta-protocol.
//!
//! These tests drive the coordinator end to end over in-memory tokens:
//! - Pause switches and their precedence
//! - Liquidation across and within markets
//! - Admin authority and parameter snapshots
//! - Accounting invariants under interest accrual

pub mod common;
