//! Referential precheck applied before the write stage.
//!
//! Given a prepared batch whose references have already been resolved (or
//! not), partitions rows and applies the configured missing-reference
//! strategy. Runs strictly before any write, so `abort` guarantees zero
//! rows were committed.

use ledgerly_core::config::MissingReferenceStrategy;
use ledgerly_core::error::CoreError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A row whose foreign reference could not be resolved.
#[derive(Debug, Clone)]
pub struct UnresolvedRow {
    /// 1-based row number in the source file.
    pub row_number: usize,
    /// The reference text as it appeared in the row.
    pub reference: String,
    /// Which field the reference came from (e.g. `product`).
    pub label: String,
    pub reason: String,
}

/// Partition result after the strategy has been applied.
#[derive(Debug)]
pub struct PrecheckOutcome<T> {
    /// Rows that proceed to the write stage.
    pub accepted: Vec<T>,
    /// Rows removed from the batch (only under `skip`).
    pub skipped: Vec<UnresolvedRow>,
}

// ---------------------------------------------------------------------------
// Strategy application
// ---------------------------------------------------------------------------

/// Apply the missing-reference strategy to a batch.
///
/// `items` pairs each prepared row with `Some(UnresolvedRow)` when its
/// reference failed to resolve.
///
/// - `skip`: unresolvable rows are removed and returned in `skipped`.
/// - `abort`: any unresolvable row fails the whole batch.
/// - `insert-anyway`: everything proceeds; the storage layer's own
///   constraints decide the outcome.
pub fn apply_strategy<T>(
    strategy: MissingReferenceStrategy,
    items: Vec<(T, Option<UnresolvedRow>)>,
) -> Result<PrecheckOutcome<T>, CoreError> {
    match strategy {
        MissingReferenceStrategy::Skip => {
            let mut accepted = Vec::with_capacity(items.len());
            let mut skipped = Vec::new();
            for (item, unresolved) in items {
                match unresolved {
                    None => accepted.push(item),
                    Some(row) => skipped.push(row),
                }
            }
            Ok(PrecheckOutcome { accepted, skipped })
        }
        MissingReferenceStrategy::Abort => {
            let unresolved: Vec<&UnresolvedRow> =
                items.iter().filter_map(|(_, u)| u.as_ref()).collect();
            if let Some(first) = unresolved.first() {
                return Err(CoreError::MissingReference(format!(
                    "{} row(s) reference entities that do not exist (first: row {}, {} '{}')",
                    unresolved.len(),
                    first.row_number,
                    first.label,
                    first.reference
                )));
            }
            Ok(PrecheckOutcome {
                accepted: items.into_iter().map(|(item, _)| item).collect(),
                skipped: Vec::new(),
            })
        }
        MissingReferenceStrategy::InsertAnyway => Ok(PrecheckOutcome {
            accepted: items.into_iter().map(|(item, _)| item).collect(),
            skipped: Vec::new(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn unresolved(row: usize, reference: &str) -> UnresolvedRow {
        UnresolvedRow {
            row_number: row,
            reference: reference.to_string(),
            label: "product".to_string(),
            reason: format!("product '{reference}' not found"),
        }
    }

    fn batch() -> Vec<(&'static str, Option<UnresolvedRow>)> {
        vec![
            ("ok-1", None),
            ("bad-2", Some(unresolved(2, "Ghost Item"))),
            ("ok-3", None),
        ]
    }

    #[test]
    fn skip_partitions_rows() {
        let outcome = apply_strategy(MissingReferenceStrategy::Skip, batch()).unwrap();
        assert_eq!(outcome.accepted, vec!["ok-1", "ok-3"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].row_number, 2);
    }

    #[test]
    fn abort_fails_on_first_unresolved() {
        let err = apply_strategy(MissingReferenceStrategy::Abort, batch()).unwrap_err();
        assert_matches!(err, CoreError::MissingReference(msg) => {
            assert!(msg.contains("row 2"));
            assert!(msg.contains("Ghost Item"));
        });
    }

    #[test]
    fn abort_passes_clean_batch() {
        let clean: Vec<(&str, Option<UnresolvedRow>)> = vec![("ok", None), ("ok2", None)];
        let outcome = apply_strategy(MissingReferenceStrategy::Abort, clean).unwrap();
        assert_eq!(outcome.accepted.len(), 2);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn insert_anyway_keeps_everything() {
        let outcome = apply_strategy(MissingReferenceStrategy::InsertAnyway, batch()).unwrap();
        assert_eq!(outcome.accepted.len(), 3);
        assert!(outcome.skipped.is_empty());
    }
}
