//! Runs independent requests concurrently, one loop each.

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info};
use tokio::sync::Semaphore;

use crate::content::{ContentRequest, LoopOutcome};
use crate::error::{PostforgeError, Result};
use crate::runner::loop_runner::ContentLoop;

/// Bounded fan-out over a shared `ContentLoop`.
///
/// Loops share no mutable state; the semaphore only caps how many talk to
/// the text-generation service at once.
pub struct Orchestrator {
    content_loop: Arc<ContentLoop>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Orchestrator {
    pub fn new(content_loop: ContentLoop, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            content_loop: Arc::new(content_loop),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every request; results come back in request order.
    /// An invalid request fails alone and does not affect the others.
    pub async fn run_all(&self, requests: &[ContentRequest]) -> Vec<Result<LoopOutcome>> {
        info!(
            "Running {} requests, at most {} at a time",
            requests.len(),
            self.max_concurrent
        );

        let runs = requests.iter().map(|request| {
            let semaphore = self.semaphore.clone();
            let content_loop = self.content_loop.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| PostforgeError::Config(format!("concurrency limiter closed: {}", e)))?;
                debug!("Permit acquired for {} {}", request.platform(), request.ticker());
                content_loop.run(request).await
            }
        });

        join_all(runs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Candidate, LengthUnit, Platform};
    use crate::evaluator::{QualityScore, Rubric, ScriptedEvaluator};
    use crate::strategy::{GenerationError, GenerationStrategy, StrategyChain};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many generate calls overlap
    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl GenerationStrategy for Gauge {
        fn name(&self) -> &str {
            "gauge"
        }

        async fn generate(
            &self,
            request: &ContentRequest,
            _revision: Option<&str>,
            round: u32,
        ) -> std::result::Result<Candidate, GenerationError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Candidate::text(
                round,
                "gauge",
                format!("Quarterly notes on {} margins and demand.", request.ticker()),
            ))
        }
    }

    fn request(platform: Platform, ticker: &str) -> ContentRequest {
        ContentRequest::builder(platform, ticker)
            .source_text("Quarterly notes on margins and demand.")
            .length(3, 20, LengthUnit::Words)
            .build()
            .unwrap()
    }

    fn orchestrator(gauge: Arc<Gauge>, max_concurrent: usize) -> Orchestrator {
        let evaluator = Arc::new(ScriptedEvaluator::constant(Ok(QualityScore::uniform(
            &Rubric::default(),
            4.0,
        ))));
        Orchestrator::new(ContentLoop::new(StrategyChain::single(gauge), evaluator), max_concurrent)
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let requests = vec![
            request(Platform::Twitter, "AMD"),
            request(Platform::Twitter, "NVDA"),
            request(Platform::Twitter, "TSM"),
        ];
        let results = orchestrator(Arc::new(Gauge::default()), 3).run_all(&requests).await;

        let tickers: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().artifact().unwrap().ticker.clone())
            .collect();
        assert_eq!(tickers, vec!["AMD", "NVDA", "TSM"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let gauge = Arc::new(Gauge::default());
        let requests: Vec<ContentRequest> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|t| request(Platform::Twitter, t))
            .collect();
        let results = orchestrator(gauge.clone(), 2).run_all(&requests).await;

        assert!(results.iter().all(|r| r.as_ref().unwrap().is_accepted()));
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        assert_eq!(orchestrator(Arc::new(Gauge::default()), 0).max_concurrent(), 1);
    }
}
