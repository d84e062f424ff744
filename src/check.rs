//! Sortedness checking (`-c`)

use crate::compare::compare_ordered;
use crate::config::SortConfig;
use crate::error::SortResult;
use crate::record::Record;
use std::cmp::Ordering;

/// Outcome of a sortedness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub is_sorted: bool,
    /// 0-based index of the first record that is out of order
    pub first_violation: Option<usize>,
}

impl CheckOutcome {
    fn sorted() -> Self {
        Self {
            is_sorted: true,
            first_violation: None,
        }
    }

    fn violation_at(index: usize) -> Self {
        Self {
            is_sorted: false,
            first_violation: Some(index),
        }
    }

    /// Exit code for the check: 0 when sorted, 1 on disorder
    pub fn exit_code(&self) -> i32 {
        if self.is_sorted {
            crate::EXIT_SUCCESS
        } else {
            crate::EXIT_FAILURE
        }
    }
}

/// Walk `records` once and stop at the first record that sorts before its
/// predecessor under `config` (including `config.reverse`).
///
/// Equal neighbours are in order. Read errors from the record stream are
/// returned as they occur.
pub fn check_sorted<I>(records: I, config: &SortConfig) -> SortResult<CheckOutcome>
where
    I: IntoIterator<Item = SortResult<Record>>,
{
    let mut previous: Option<Record> = None;

    for (index, record) in records.into_iter().enumerate() {
        let record = record?;
        if let Some(ref prev) = previous {
            if compare_ordered(prev, &record, config) == Ordering::Greater {
                log::debug!("disorder at record {index}");
                return Ok(CheckOutcome::violation_at(index));
            }
        }
        previous = Some(record);
    }

    Ok(CheckOutcome::sorted())
}

/// [`check_sorted`] over records already in memory
pub fn check_sorted_slice(records: &[Record], config: &SortConfig) -> CheckOutcome {
    records
        .windows(2)
        .position(|pair| compare_ordered(&pair[0], &pair[1], config) == Ordering::Greater)
        .map(|index| CheckOutcome::violation_at(index + 1))
        .unwrap_or_else(CheckOutcome::sorted)
}
