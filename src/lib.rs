//! Line-oriented sorting engine
//!
//! Sorts text records under lexicographic, numeric, human-numeric or month
//! ordering, optionally keyed on one delimited field, with deduplication and
//! a check-only mode. Inputs above a size threshold are sorted externally:
//! chunks are sorted concurrently into temporary runs that are then merged.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod check;
pub mod compare;
pub mod config;
pub mod core_sort;
pub mod error;
pub mod external_sort;
pub mod record;

// Re-export commonly used types
pub use check::CheckOutcome;
pub use config::{SortConfig, SortConfigBuilder, SortMode};
pub use core_sort::CoreSort;
pub use error::{SortError, SortResult};
pub use record::{Record, RecordReader};

/// Process exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const SORT_FAILURE: i32 = 2;

/// Run one sort or check as configured and return the process exit code.
///
/// In check mode a disorder is reported on stderr with its 1-based line
/// number and yields [`EXIT_FAILURE`].
pub fn sort(config: &SortConfig) -> SortResult<i32> {
    let core_sort = CoreSort::new(config.clone());

    if config.check {
        let outcome = core_sort.check()?;
        if let Some(index) = outcome.first_violation {
            eprintln!("sort: disorder at line {}", index + 1);
        }
        return Ok(outcome.exit_code());
    }

    core_sort.sort()?;
    Ok(EXIT_SUCCESS)
}
