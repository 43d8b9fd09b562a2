//! Recursive enumeration of index combinations.
//!
//! Given N independent inclusive ranges (row, column, …) the enumerator
//! visits every combination in lexicographic ascending order, outer dimension
//! varying slowest. A failing visit never aborts the remaining combinations.

use crate::action::IndexRange;
use crate::utils::error::EngineError;

/// A visit that failed, with the indices it was invoked for.
#[derive(Debug)]
pub struct CombinationFailure {
    pub indices: Vec<i64>,
    pub error: EngineError,
}

/// Invokes `visit` exactly once per combination of the supplied ranges.
///
/// Failures are collected and returned; enumeration order is a pure function
/// of the ranges. Zero ranges yield a single empty-index visit.
pub fn for_each_combination<F>(ranges: &[IndexRange], visit: &mut F) -> Vec<CombinationFailure>
where
    F: FnMut(&[i64]) -> Result<(), EngineError>,
{
    let mut failures = Vec::new();
    let mut indices = Vec::with_capacity(ranges.len());
    recurse(ranges, &mut indices, visit, &mut failures);
    failures
}

fn recurse<F>(
    ranges: &[IndexRange],
    indices: &mut Vec<i64>,
    visit: &mut F,
    failures: &mut Vec<CombinationFailure>,
) where
    F: FnMut(&[i64]) -> Result<(), EngineError>,
{
    if indices.len() == ranges.len() {
        if let Err(error) = visit(indices) {
            failures.push(CombinationFailure {
                indices: indices.clone(),
                error,
            });
        }
        return;
    }

    let dim = &ranges[indices.len()];
    for idx in dim.start..=dim.end {
        indices.push(idx);
        recurse(ranges, indices, visit, failures);
        indices.pop();
    }
}

/// Total number of combinations the ranges describe.
pub fn combination_count(ranges: &[IndexRange]) -> usize {
    ranges.iter().map(|r| r.len()).product()
}
