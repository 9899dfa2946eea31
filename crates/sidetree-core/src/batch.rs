//! Batch driver.
//!
//! Anchors are independent of one another: one processor runs per anchor,
//! a failing anchor yields a record with its `error` field populated, and
//! no failure aborts the rest of the batch. Results always come back in
//! the input anchor order.
//!
//! Within one anchor the file graph is linear, so nothing is parallelized
//! there; across anchors [`process_batch_parallel`] fans out over scoped
//! threads with no shared mutable state.

use std::thread;

use crate::anchor::Anchor;
use crate::operations::ProcessedOperations;
use crate::options::ProcessorOptions;
use crate::processor::OperationsProcessor;

/// Processes one anchor, folding constructor preconditions into the
/// record.
fn process_one(anchor: Anchor, options: &ProcessorOptions) -> ProcessedOperations {
    match OperationsProcessor::new(anchor.clone(), options) {
        Ok(processor) => processor.process(),
        Err(error) => ProcessedOperations::failed(&anchor, error),
    }
}

/// Processes anchors sequentially, in input order.
#[must_use]
pub fn process_batch(anchors: Vec<Anchor>, options: &ProcessorOptions) -> Vec<ProcessedOperations> {
    anchors
        .into_iter()
        .map(|anchor| process_one(anchor, options))
        .collect()
}

/// Processes anchors on one scoped worker thread each.
///
/// Results are re-assembled in input order. All workers finish before this
/// returns; no background work outlives the call.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn process_batch_parallel(
    anchors: Vec<Anchor>,
    options: &ProcessorOptions,
) -> Vec<ProcessedOperations> {
    thread::scope(|scope| {
        let workers: Vec<_> = anchors
            .into_iter()
            .map(|anchor| scope.spawn(move || process_one(anchor, options)))
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().expect("anchor worker panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cas::MemoryStore;
    use crate::error::{FileKind, ProcessError};

    fn options() -> ProcessorOptions {
        let store = MemoryStore::new();
        store.insert("good", b"{}".to_vec());
        ProcessorOptions::builder()
            .method("sidetree")
            .cas(Arc::new(store))
            .build()
    }

    #[test]
    fn failing_anchor_does_not_abort_the_batch() {
        let options = options();
        let records = process_batch(
            vec![
                Anchor::new("seq-0", "1.good"),
                Anchor::new("seq-1", "1.missing"),
                Anchor::new("seq-2", "1.good"),
            ],
            &options,
        );

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].error, None);
        assert_eq!(
            records[1].error,
            Some(ProcessError::CasNotFound {
                file: FileKind::CoreIndex,
                cid: "missing".into()
            })
        );
        assert_eq!(records[2].error, None);
    }

    #[test]
    fn malformed_anchor_yields_a_failed_record() {
        let options = options();
        let records = process_batch(vec![Anchor::new("seq-0", "no-dot")], &options);
        assert!(matches!(
            records[0].error,
            Some(ProcessError::EmptyAnchorUri { .. })
        ));
    }

    #[test]
    fn parallel_results_preserve_input_order() {
        let options = options();
        let anchors: Vec<_> = (0..8)
            .map(|i| {
                let cid = if i % 2 == 0 { "good" } else { "missing" };
                Anchor::new(format!("seq-{i}"), format!("1.{cid}"))
            })
            .collect();

        let records = process_batch_parallel(anchors, &options);
        assert_eq!(records.len(), 8);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.anchor_sequence, format!("seq-{i}"));
            assert_eq!(record.error.is_none(), i % 2 == 0);
        }
    }
}
