//! Debug assertion macros for commit-core invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`); zero overhead
//! in release builds.

/// Reserved capacity must never go negative.
macro_rules! debug_assert_capacity_nonneg {
    ($items:expr, $vals:expr) => {
        debug_assert!(
            $items >= 0 && $vals >= 0,
            "reservation bookkeeping went negative: items {} vals {}",
            $items,
            $vals
        )
    };
}

/// A reservation's consumed counters must never exceed what it reserved.
macro_rules! debug_assert_within_reservation {
    ($actual:expr, $reserved:expr) => {
        debug_assert!(
            $actual.fits_within(&$reserved),
            "tracked usage {:?} exceeds reservation {:?}",
            $actual,
            $reserved
        )
    };
}

/// The holder count must stay non-negative and should only reach zero
/// exactly when there is nothing left to drain.
macro_rules! debug_assert_holders_nonneg {
    ($holders:expr) => {
        debug_assert!($holders >= 0, "holder count went negative: {}", $holders)
    };
}

/// A reservation's magic sentinel must still match at release time, i.e.
/// the reservation was not reused after being dropped.
macro_rules! debug_assert_reservation_magic {
    ($magic:expr) => {
        debug_assert_eq!(
            $magic,
            crate::config::RESERVATION_MAGIC,
            "reservation used after release (magic mismatch)"
        )
    };
}

/// Only the committer's own recorded actor may call `commit_one` for the
/// in-progress commit; every other writer must be blocked on the drained
/// waitqueue instead.
macro_rules! debug_assert_single_committer {
    ($committer:expr, $caller:expr) => {
        debug_assert!(
            $committer.map_or(true, |c| c == $caller),
            "commit pipeline re-entered by a second actor"
        )
    };
}

pub(crate) use debug_assert_capacity_nonneg;
pub(crate) use debug_assert_holders_nonneg;
pub(crate) use debug_assert_reservation_magic;
pub(crate) use debug_assert_single_committer;
pub(crate) use debug_assert_within_reservation;
