//! Batch execution.
//!
//! Decides between acting on the selected item once and acting on several
//! items, one call per element, bounded by the configured operand cap.

use std::future::Future;

use futures::future::join_all;
use steward_core::{KeyStatus, ResultItem};

/// Prefix marking the items a batch would act on.
pub const OPERAND_MARK: &str = "⇧: ";

/// What the user selected.
#[derive(Debug, Clone)]
pub enum Selection {
    Single(ResultItem),
    Many(Vec<ResultItem>),
}

impl Selection {
    pub fn len(&self) -> usize {
        match self {
            Selection::Single(_) => 1,
            Selection::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_items(self) -> Vec<ResultItem> {
        match self {
            Selection::Single(item) => vec![item],
            Selection::Many(items) => items,
        }
    }
}

/// Outcome of one `decide` call.
#[derive(Debug)]
pub struct BatchReport<T, E> {
    /// Whether the batch action was used.
    pub batched: bool,
    /// One result per dispatched invocation, in selection order.
    pub results: Vec<Result<T, E>>,
    /// Elements dropped by the operand cap.
    pub skipped: usize,
}

impl<T, E> BatchReport<T, E> {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    max_operands: usize,
}

impl BatchExecutor {
    pub fn new(max_operands: usize) -> Self {
        Self { max_operands }
    }

    pub fn max_operands(&self) -> usize {
        self.max_operands
    }

    /// Run `batch` once per element, or `single` once.
    ///
    /// The batch path is taken when `predicate` holds or the selection already
    /// has several items. Batch invocations run concurrently and all of them
    /// settle before this returns; a failing element does not stop its
    /// siblings. Elements beyond the cap are skipped without error.
    pub async fn decide<T, E, B, BF, S, SF>(
        &self,
        predicate: bool,
        selection: Selection,
        key_status: KeyStatus,
        batch: B,
        single: S,
    ) -> BatchReport<T, E>
    where
        B: Fn(ResultItem) -> BF,
        BF: Future<Output = Result<T, E>>,
        S: FnOnce(ResultItem, KeyStatus) -> SF,
        SF: Future<Output = Result<T, E>>,
    {
        let is_many = matches!(selection, Selection::Many(_));

        if predicate || is_many {
            let mut items = selection.into_items();
            let take = self.max_operands.min(items.len());
            let skipped = items.len() - take;
            items.truncate(take);

            tracing::debug!("Batch over {} items ({} skipped)", take, skipped);
            let results = join_all(items.into_iter().map(&batch)).await;

            return BatchReport {
                batched: true,
                results,
                skipped,
            };
        }

        let results = match selection {
            Selection::Single(item) => vec![single(item, key_status).await],
            Selection::Many(_) => Vec::new(),
        };

        BatchReport {
            batched: false,
            results,
            skipped: 0,
        }
    }

    /// Prefix the titles of the items a batch would act on.
    pub fn mark_operands(&self, items: &mut [ResultItem]) {
        for item in items.iter_mut().take(self.max_operands) {
            if !item.title.starts_with(OPERAND_MARK) {
                item.title = format!("{}{}", OPERAND_MARK, item.title);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn items(n: usize) -> Vec<ResultItem> {
        (0..n).map(|i| ResultItem::new("url", format!("item{}", i))).collect()
    }

    #[tokio::test]
    async fn test_cap_enforced() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let executor = BatchExecutor::new(3);

        let report: BatchReport<(), ()> = executor
            .decide(
                true,
                Selection::Many(items(10)),
                KeyStatus::shift(),
                |item| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.lock().push(item.title);
                        Ok(())
                    }
                },
                |_, _| async { Err(()) },
            )
            .await;

        assert!(report.batched);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.skipped, 7);
        assert_eq!(*calls.lock(), vec!["item0", "item1", "item2"]);
    }

    #[tokio::test]
    async fn test_many_selection_batches_without_predicate() {
        let executor = BatchExecutor::new(10);
        let report: BatchReport<usize, ()> = executor
            .decide(
                false,
                Selection::Many(items(4)),
                KeyStatus::default(),
                |item| async move { Ok(item.title.len()) },
                |_, _| async { Ok(0) },
            )
            .await;

        assert!(report.batched);
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_single_forwards_key_status() {
        let executor = BatchExecutor::new(10);
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);

        let report: BatchReport<(), ()> = executor
            .decide(
                false,
                Selection::Single(ResultItem::new("url", "one")),
                KeyStatus::meta(),
                |_| async { Err(()) },
                move |item, status| async move {
                    *seen_in.lock() = Some((item.title, status));
                    Ok(())
                },
            )
            .await;

        assert!(!report.batched);
        assert_eq!(report.results.len(), 1);
        assert_eq!(*seen.lock(), Some(("one".to_string(), KeyStatus::meta())));
    }

    #[tokio::test]
    async fn test_partial_failure_tolerated() {
        let executor = BatchExecutor::new(10);
        let report: BatchReport<(), String> = executor
            .decide(
                true,
                Selection::Many(items(4)),
                KeyStatus::shift(),
                |item| async move {
                    if item.title == "item1" {
                        Err("boom".to_string())
                    } else {
                        Ok(())
                    }
                },
                |_, _| async { Ok(()) },
            )
            .await;

        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_mark_operands() {
        let executor = BatchExecutor::new(2);
        let mut list = items(3);
        executor.mark_operands(&mut list);
        executor.mark_operands(&mut list);

        assert_eq!(list[0].title, "⇧: item0");
        assert_eq!(list[1].title, "⇧: item1");
        assert_eq!(list[2].title, "item2");
    }
}
