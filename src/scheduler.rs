use crate::classifier::ClickClassifier;
use crate::core::{Backend, Config};
use crate::descriptor::ElementDescriptor;
use crate::report::{ConcurrencyInfo, TestRun};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Split `elements` into at most `batches` contiguous chunks whose sizes
/// differ by at most one, earlier chunks taking the remainder. Empty chunks
/// are never produced.
pub fn partition<T>(elements: Vec<T>, batches: usize) -> Vec<Vec<T>> {
    if elements.is_empty() {
        return Vec::new();
    }
    let batches = batches.clamp(1, elements.len());
    let base = elements.len() / batches;
    let remainder = elements.len() % batches;
    let mut out = Vec::with_capacity(batches);
    let mut iter = elements.into_iter();
    for index in 0..batches {
        let size = base + usize::from(index < remainder);
        out.push(iter.by_ref().take(size).collect());
    }
    out
}

/// Runs click classification over a bounded pool of browser sessions, one
/// worker task per session, and aggregates results in completion order.
pub struct Scheduler<B: Backend> {
    backend: Arc<B>,
    config: Config,
}

impl<B> Scheduler<B>
where
    B: Backend + 'static,
    B::Session: 'static,
    B::Handle: 'static,
{
    pub fn new(backend: Arc<B>, config: Config) -> Self {
        Self { backend, config }
    }

    /// Never fails outright: a pool that cannot open a single session
    /// yields a `TestRun` with `error` set and no results.
    pub async fn run(
        &self,
        url: &str,
        total_elements_found: usize,
        descriptors: Vec<ElementDescriptor>,
    ) -> TestRun {
        let started = Instant::now();
        if descriptors.is_empty() {
            return TestRun::from_results(url, total_elements_found, Vec::new(), None);
        }

        let requested = self.config.test.concurrency.clamp(1, descriptors.len());
        let mut sessions = Vec::with_capacity(requested);
        for _ in 0..requested {
            match self.backend.new_session().await {
                Ok(session) => sessions.push(session),
                Err(err) => warn!(error = %err, "could not open a pool session"),
            }
        }
        if sessions.is_empty() {
            return TestRun::failed(
                url,
                total_elements_found,
                "could not open any browser session",
            );
        }
        let workers = sessions.len();
        if workers < requested {
            warn!(requested, workers, "running with a reduced session pool");
        }

        let batches = partition(descriptors, workers);
        let batch_sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        info!(workers, batch_sizes = ?batch_sizes, "starting click testing");

        let mut tasks: JoinSet<Vec<crate::classifier::ClickResult>> = JoinSet::new();
        for (batch, session) in batches.into_iter().zip(sessions) {
            let backend = Arc::clone(&self.backend);
            let config = self.config.clone();
            let url = url.to_string();
            tasks.spawn(async move {
                run_batch(backend, session, config, url, batch).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(mut batch_results) => results.append(&mut batch_results),
                Err(err) => warn!(error = %err, "worker task panicked"),
            }
        }

        let concurrency = ConcurrencyInfo {
            workers,
            batches: batch_sizes.len(),
            batch_sizes,
            total_time_secs: started.elapsed().as_secs_f64(),
        };
        TestRun::from_results(url, total_elements_found, results, Some(concurrency))
    }
}

/// One worker: classify a batch on its own session, renavigating whenever a
/// previous click moved the page away. A failed renavigation abandons the
/// rest of the batch; results collected so far still count.
async fn run_batch<B>(
    backend: Arc<B>,
    session: B::Session,
    config: Config,
    url: String,
    batch: Vec<ElementDescriptor>,
) -> Vec<crate::classifier::ClickResult>
where
    B: Backend + 'static,
{
    let classifier = ClickClassifier::new(config.clone());
    let mut results = Vec::with_capacity(batch.len());
    for descriptor in &batch {
        let current = backend.current_url(&session).await.unwrap_or_default();
        if current != url {
            if let Err(err) = backend.navigate(&session, &url).await {
                warn!(error = %err, "renavigation failed, abandoning rest of batch");
                break;
            }
            tokio::time::sleep(Duration::from_millis(config.test.renavigate_settle_ms)).await;
        }
        results.push(
            classifier
                .classify(backend.as_ref(), &session, descriptor)
                .await,
        );
    }
    if let Err(err) = backend.close_session(session).await {
        warn!(error = %err, "could not close pool session");
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_sizes_differ_by_at_most_one() {
        let batches = partition((0..10).collect::<Vec<_>>(), 3);
        assert_eq!(batches.len(), 3);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn partition_preserves_order_and_elements() {
        let batches = partition((0..7).collect::<Vec<_>>(), 2);
        let flattened: Vec<i32> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn partition_never_yields_empty_batches() {
        let batches = partition(vec![1, 2], 5);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn partition_of_empty_input() {
        let batches: Vec<Vec<i32>> = partition(Vec::new(), 3);
        assert!(batches.is_empty());
    }

    #[test]
    fn partition_single_batch() {
        let batches = partition(vec![1, 2, 3], 1);
        assert_eq!(batches, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn partition_exact_division() {
        let batches = partition((0..9).collect::<Vec<_>>(), 3);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3]);
    }
}
