use crate::catalog::CounterName;

use super::domain::{MonthStamp, PassId};

/// Result of an atomic decrement attempt against one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The counter was decremented; `remaining` is the post-decrement value.
    Approved { remaining: u32 },
    /// The counter was already at zero for this month; nothing changed.
    Exhausted,
}

/// Storage abstraction for per-pass, per-counter monthly balances.
///
/// Implementations must make `try_redeem` atomic per (pass, counter): two
/// concurrent calls observing remaining=1 must yield exactly one `Approved`.
/// A counter with no stored state, or state stamped with an earlier month,
/// reads as `max_per_month` (calendar-month reset).
pub trait BalanceStore: Send + Sync {
    fn remaining(
        &self,
        pass: &PassId,
        counter: &CounterName,
        max_per_month: u32,
        month: MonthStamp,
    ) -> Result<u32, StoreError>;

    fn try_redeem(
        &self,
        pass: &PassId,
        counter: &CounterName,
        max_per_month: u32,
        month: MonthStamp,
    ) -> Result<RedeemOutcome, StoreError>;
}

/// Error enumeration for balance store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("balance store unavailable: {0}")]
    Unavailable(String),
}
