// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Step event records.
use serde::{Deserialize, Serialize};

use crate::ident::TermId;

/// One applied rewrite, in step order.
///
/// Timestamps are wall-clock microseconds and are explicitly outside the
/// determinism contract; everything else in the record is reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Zero-based step index.
    pub step: u64,
    /// Name of the rule that fired.
    pub rule: String,
    /// Term the rule fired on.
    pub before: TermId,
    /// Replacement ids, in action order.
    pub after: Vec<TermId>,
    /// Scale of the rewritten term.
    pub scale: u32,
    /// Wall-clock capture time in microseconds since the Unix epoch.
    pub timestamp_micros: u128,
    /// Hex-encoded RNG state after the pop, for the random scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler_token: Option<String>,
}

/// Current wall-clock time in microseconds; falls back to 0 on clock errors.
#[must_use]
pub fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}
