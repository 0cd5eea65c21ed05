//! Usage counters and quota enforcement.
//!
//! Counters are keyed `(user, kind, period)` where the period key derives
//! from the current UTC day or month per the kind's configured
//! granularity. A counter only ever increases within its period; crossing
//! a period boundary resets the effective remaining quota to the full
//! limit because a fresh key reads as zero. Old rows are never rewritten
//! or deleted - they are retained for audit and simply stop being read.

mod enforcement;
mod period;

pub use enforcement::{QuotaDecision, QuotaEnforcer};
pub use period::PeriodKey;
