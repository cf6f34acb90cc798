//! Per-market accounting.
//!
//! A `Ledger` owns the interest-bearing token table, the borrow snapshots and the
//! aggregate counters of one market. Balance-changing operations are split in
//! two: a `plan_*` method validates and computes every new value without
//! touching state, and the matching `apply_*` method commits the plan and
//! cannot fail. Accrual is the only in-place mutation that can precede a
//! refusal, and it is undone with `Ledger::restore`.

pub mod error;
pub mod ledger;
pub mod plan;
pub mod state;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, MAX_BORROW_RATE_MANTISSA};
pub use plan::{
    BorrowPlan, MintPlan, RedeemAmount, RedeemPlan, RepayPlan, ReservesPlan, SeizePlan,
    TransferPlan,
};
pub use state::{BorrowSnapshot, LedgerParams, LedgerState};
