//! The generate-evaluate-revise loop.
//!
//! Each round:
//! 1. Generates a candidate through the strategy chain, with the previous
//!    round's revision instructions
//! 2. Runs the full check battery
//! 3. On a blocking check failure, skips the evaluator and revises
//! 4. Otherwise asks the evaluator for a score and accepts when the score
//!    clears the threshold with no hard fail
//!
//! Rounds run strictly in sequence. Service failures never escape as errors;
//! the caller always gets a `LoopOutcome`, unless the request is invalid.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::checks::{
    CheckBattery, CheckResult, FailureCategory, FailureDetail, FeedbackFormatter, RoundFeedback, RoundStage,
};
use crate::content::{ContentRequest, FailureKind, FailureReport, FinalArtifact, LoopOutcome};
use crate::error::{PostforgeError, Result};
use crate::evaluator::QualityEvaluator;
use crate::id::generate_run_id;
use crate::runner::abort::{AbortSignal, NeverAbort};
use crate::runner::state::LoopState;
use crate::strategy::StrategyChain;

/// Caller-imposed budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Rounds before giving up (must be positive)
    pub max_rounds: u32,
    /// Wall-clock budget for the whole loop
    pub deadline: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            deadline: None,
        }
    }
}

impl LoopConfig {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Runs one request through bounded rounds of generation and evaluation
pub struct ContentLoop {
    chain: StrategyChain,
    battery: CheckBattery,
    evaluator: Arc<dyn QualityEvaluator>,
    config: LoopConfig,
    abort: Arc<dyn AbortSignal>,
    formatter: FeedbackFormatter,
}

/// Why a round stopped early
enum Interrupt {
    Deadline,
}

impl ContentLoop {
    pub fn new(chain: StrategyChain, evaluator: Arc<dyn QualityEvaluator>) -> Self {
        Self {
            chain,
            battery: CheckBattery::standard(),
            evaluator,
            config: LoopConfig::default(),
            abort: Arc::new(NeverAbort),
            formatter: FeedbackFormatter::new(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_battery(mut self, battery: CheckBattery) -> Self {
        self.battery = battery;
        self
    }

    pub fn with_abort(mut self, abort: Arc<dyn AbortSignal>) -> Self {
        self.abort = abort;
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run the loop to completion.
    ///
    /// Fails only with `InvalidRequest`, before any generation call.
    pub async fn run(&self, request: &ContentRequest) -> Result<LoopOutcome> {
        if self.config.max_rounds == 0 {
            return Err(PostforgeError::invalid("max_rounds must be positive"));
        }
        self.chain.validate(request)?;

        let run_id = generate_run_id(request.platform().as_str(), request.ticker());
        let started = Instant::now();
        let threshold = request.rubric().threshold;
        let mut state = LoopState::new();

        info!(
            "{} starting: {} {} up to {} rounds, strategies [{}]",
            run_id,
            request.platform(),
            request.ticker(),
            self.config.max_rounds,
            self.chain.names().join(", ")
        );

        for round in 1..=self.config.max_rounds {
            state.round = round;

            if self.abort.is_aborted() {
                info!("{} aborted before round {}", run_id, round);
                return Ok(self.fail(&run_id, request, state, FailureKind::Aborted));
            }
            if self.deadline_passed(started) {
                return Ok(self.timed_out(&run_id, request, state, round, RoundStage::Generation));
            }

            let round_started = Instant::now();

            // 1. Generate
            let generated = match self
                .within(started, self.chain.generate(request, state.revision.as_deref(), round))
                .await
            {
                Err(Interrupt::Deadline) => {
                    return Ok(self.timed_out(&run_id, request, state, round, RoundStage::Generation));
                }
                Ok(generated) => generated,
            };

            let candidate = match generated {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!("{} round {}: no candidate: {}", run_id, round, err);
                    state.note_service(true, err.is_rate_limit());
                    let category = if err.is_timeout() {
                        FailureCategory::Timeout
                    } else {
                        FailureCategory::Generation
                    };
                    state.record(RoundFeedback::fail(
                        round,
                        RoundStage::Generation,
                        vec![FailureDetail::new(category, err.to_string())],
                        elapsed_ms(round_started),
                    ));
                    continue;
                }
            };
            state.produced = true;
            state.note_service(false, false);

            // 2. Automatic checks
            let checks = self.battery.check_all(&candidate, request);
            let warnings: Vec<CheckResult> = checks.iter().filter(|r| r.is_warning()).cloned().collect();

            if CheckBattery::any_blocking(&checks) {
                let failures: Vec<FailureDetail> = checks
                    .iter()
                    .filter(|r| !r.passed)
                    .flat_map(FailureDetail::from_check)
                    .collect();
                info!(
                    "{} round {}: rejected by checks ({} issues) from {}",
                    run_id,
                    round,
                    failures.len(),
                    candidate.strategy()
                );
                self.reject(&mut state, RoundFeedback::fail(round, RoundStage::Checks, failures, elapsed_ms(round_started)));
                continue;
            }

            // 3. Model-based score
            let scored = match self.within(started, self.evaluator.score(&candidate, request)).await {
                Err(Interrupt::Deadline) => {
                    state.offer(&candidate, None, &checks);
                    return Ok(self.timed_out(&run_id, request, state, round, RoundStage::Evaluator));
                }
                Ok(scored) => scored,
            };

            let mut failures: Vec<FailureDetail> = warnings.iter().flat_map(FailureDetail::from_check).collect();

            match scored {
                Ok(score) if score.accepts(threshold) => {
                    info!(
                        "{} round {}: accepted at {:.2} (threshold {:.2}) from {}",
                        run_id,
                        round,
                        score.weighted,
                        threshold,
                        candidate.strategy()
                    );
                    let measured_length = candidate.measure(request.length().unit);
                    return Ok(LoopOutcome::Accepted(FinalArtifact {
                        run_id,
                        platform: request.platform(),
                        ticker: request.ticker().to_string(),
                        candidate,
                        rounds: round,
                        score,
                        measured_length,
                        warnings,
                    }));
                }
                Ok(score) => {
                    state.scored = true;
                    for rule in &score.hard_fails {
                        failures.push(FailureDetail::new(
                            FailureCategory::HardFail,
                            format!("hard-fail rule triggered: {}", rule),
                        ));
                    }
                    if score.weighted < threshold {
                        failures.push(FailureDetail::new(
                            FailureCategory::Judge,
                            format!("quality score {:.2} below threshold {:.2}", score.weighted, threshold),
                        ));
                    }
                    if !score.rewrite_instructions.is_empty()
                        && let Some(last) = failures.last_mut()
                    {
                        last.context = Some(score.rewrite_instructions.clone());
                    }
                    info!(
                        "{} round {}: rejected by evaluator at {:.2} ({} hard fails)",
                        run_id,
                        round,
                        score.weighted,
                        score.hard_fails.len()
                    );
                    state.offer(&candidate, Some(&score), &checks);
                }
                Err(err) => {
                    warn!("{} round {}: evaluator failed: {}", run_id, round, err);
                    state.note_service(err.is_service_error(), err.is_rate_limit());
                    let category = if err.is_timeout() {
                        FailureCategory::Timeout
                    } else {
                        FailureCategory::Judge
                    };
                    failures.push(FailureDetail::new(category, format!("quality evaluation unavailable: {}", err)));
                    state.offer(&candidate, None, &checks);
                }
            }

            self.reject(&mut state, RoundFeedback::fail(round, RoundStage::Evaluator, failures, elapsed_ms(round_started)));
        }

        let kind = if state.quality_limited() {
            FailureKind::QualityThresholdNotMet
        } else if state.rate_limited {
            FailureKind::RateLimited
        } else {
            FailureKind::TransientServiceError
        };
        info!("{} exhausted {} rounds: {}", run_id, self.config.max_rounds, kind);
        Ok(self.fail(&run_id, request, state, kind))
    }

    fn reject(&self, state: &mut LoopState, feedback: RoundFeedback) {
        state.revision = Some(self.formatter.revision_instructions(&feedback));
        state.record(feedback);
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.config.deadline.is_some_and(|d| started.elapsed() >= d)
    }

    /// Await `fut`, bounded by what is left of the loop deadline
    async fn within<F: Future>(&self, started: Instant, fut: F) -> std::result::Result<F::Output, Interrupt> {
        match self.config.deadline {
            None => Ok(fut.await),
            Some(deadline) => {
                let remaining = deadline.saturating_sub(started.elapsed());
                tokio::time::timeout(remaining, fut).await.map_err(|_| Interrupt::Deadline)
            }
        }
    }

    fn timed_out(
        &self,
        run_id: &str,
        request: &ContentRequest,
        mut state: LoopState,
        round: u32,
        stage: RoundStage,
    ) -> LoopOutcome {
        let deadline = self.config.deadline.unwrap_or_default();
        warn!("{} round {}: loop deadline of {:?} exceeded", run_id, round, deadline);
        state.record(RoundFeedback::fail(
            round,
            stage,
            vec![FailureDetail::new(
                FailureCategory::Timeout,
                format!("loop deadline of {}s exceeded", deadline.as_secs_f64()),
            )],
            0,
        ));
        self.fail(run_id, request, state, FailureKind::Timeout)
    }

    fn fail(&self, run_id: &str, request: &ContentRequest, state: LoopState, kind: FailureKind) -> LoopOutcome {
        let mut summary = self.formatter.format_history(&state.history);
        if kind == FailureKind::Aborted {
            if !summary.is_empty() {
                summary.push_str("\n\n");
            }
            summary.push_str(&format!("Aborted before round {}", state.round));
        }
        LoopOutcome::Failed(FailureReport {
            run_id: run_id.to_string(),
            platform: request.platform(),
            ticker: request.ticker().to_string(),
            kind,
            rounds: state.round,
            best: state.best,
            history: state.history,
            summary,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
