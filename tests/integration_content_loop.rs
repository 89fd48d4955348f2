//! Content loop integration tests
//!
//! Runs the full loop (strategies, checks, evaluator) against mock clients.

use std::sync::Arc;
use std::time::Duration;

use postforge::checks::{CheckBattery, FailureCategory};
use postforge::content::{ContentRequest, FailureKind, LengthUnit, LoopOutcome, Platform};
use postforge::evaluator::{LlmEvaluator, QualityScore, Rubric, ScriptedEvaluator};
use postforge::llm::{LlmClient, LlmError, MockLlmClient, RetryPolicy};
use postforge::output::ArtifactWriter;
use postforge::prompt::PromptLoader;
use postforge::runner::{ContentLoop, LoopConfig, Orchestrator};
use postforge::source::SourceDocument;
use postforge::strategy::{GenerationStrategy, SinglePassStrategy, StrategyChain, TemplateStrategy};
use tempfile::TempDir;

const CLOSING: &str = "Data: https://www.100baggers.club/reports/amd";

const SCORE_FOUR: &str =
    r#"{"scores": {"data_density": 4, "coherence": 4, "analysis_depth": 4}, "violations": [], "rewrite_instructions": ""}"#;

fn document() -> SourceDocument {
    SourceDocument {
        ticker: "AMD".to_string(),
        company_name: "Advanced Micro Devices".to_string(),
        executive_summary: "Data center revenue reached $6.9B, up from $3.5B a year earlier.".to_string(),
        core_contradiction: "Accelerator share gains versus gross margin dilution.".to_string(),
        key_findings: vec!["MI300 shipments grew 115% compared with the prior quarter.".to_string()],
        raw_markdown: "## Summary\n\n\
            Data center revenue reached $6.9B, up from $3.5B a year earlier, while gross margin rose to 53%.\n\n\
            MI300 shipments grew 115% compared with the prior quarter as cloud demand rose.\n\n\
            Client revenue fell to $1.4B versus $1.9B as inventory normalized across the channel."
            .to_string(),
        ..Default::default()
    }
}

/// Twitter request: 200-300 words, closing line, small denylist
fn request() -> ContentRequest {
    let doc = document();
    ContentRequest::builder(Platform::Twitter, "AMD")
        .company_name(doc.company_name.clone())
        .source_text(doc.source_text())
        .bindings(&doc.bindings("https://www.100baggers.club/reports/amd"))
        .length(200, 300, LengthUnit::Words)
        .denylist(["overvalued", "buy", "sell"])
        .closing_line(CLOSING)
        .build()
        .unwrap()
}

/// `n` filler words with no numbers and no denylisted terms
fn filler(n: usize) -> String {
    const WORDS: [&str; 6] = ["margin", "demand", "capacity", "wafer", "pricing", "cycle"];
    (0..n).map(|i| WORDS[i % WORDS.len()]).collect::<Vec<_>>().join(" ")
}

fn writer(client: Arc<MockLlmClient>) -> SinglePassStrategy {
    SinglePassStrategy::new(client, Arc::new(PromptLoader::builtin())).with_retry(RetryPolicy::immediate(2))
}

fn judge(client: Arc<MockLlmClient>) -> Arc<LlmEvaluator> {
    Arc::new(LlmEvaluator::new(client).with_retry(RetryPolicy::immediate(1)))
}

fn loop_with(chain: StrategyChain, evaluator: Arc<dyn postforge::evaluator::QualityEvaluator>) -> ContentLoop {
    ContentLoop::new(chain, evaluator).with_config(LoopConfig::default().with_max_rounds(3))
}

/// Integration test: a too-long draft is revised and the second round is accepted
#[tokio::test]
async fn test_length_revision_then_acceptance() {
    let too_long = format!("{}\n{}", filler(348), CLOSING);
    let just_right = format!("{} undervalued\n{}", filler(247), CLOSING);
    let writer_client = Arc::new(MockLlmClient::with_responses([too_long, just_right]));
    let judge_client = Arc::new(MockLlmClient::with_responses([SCORE_FOUR]));

    let outcome = loop_with(
        StrategyChain::single(Arc::new(writer(writer_client.clone()))),
        judge(judge_client.clone()),
    )
    .run(&request())
    .await
    .unwrap();

    let artifact = outcome.artifact().expect("accepted");
    assert_eq!(artifact.rounds, 2);
    assert_eq!(artifact.measured_length, 250);
    assert_eq!(artifact.score.weighted, 4.0);
    assert!(artifact.candidate.as_text().contains("undervalued"));

    assert_eq!(writer_client.call_count(), 2);
    assert_eq!(judge_client.call_count(), 1);

    let revised = writer_client.requests()[1].user_text();
    assert!(revised.contains("REWRITE REQUIRED"));
    assert!(revised.contains("too long: 350 words (required 200-300)"));
}

/// Integration test: a structural marker missing in every round ends in a failure report
#[tokio::test]
async fn test_missing_closing_line_every_round() {
    let draft = filler(250);
    let writer_client = Arc::new(MockLlmClient::with_responses([draft.clone(), draft.clone(), draft]));
    let judge_client = Arc::new(MockLlmClient::new());

    let outcome = loop_with(
        StrategyChain::single(Arc::new(writer(writer_client.clone()))),
        judge(judge_client.clone()),
    )
    .run(&request())
    .await
    .unwrap();

    let report = outcome.failure().expect("failed");
    assert_eq!(report.kind, FailureKind::QualityThresholdNotMet);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.history.len(), 3);
    for round in &report.history {
        assert!(round.failures.iter().any(|f| f.category == FailureCategory::Structure
            && f.message == format!("missing closing line \"{}\" at the end", CLOSING)));
    }
    assert!(report.best.is_none());
    assert_eq!(judge_client.call_count(), 0);
    assert!(report.summary.contains("Round 3"));
}

/// Integration test: service timeouts in every round surface as a transient failure
#[tokio::test]
async fn test_timeouts_exhaust_to_transient_error() {
    let writer_client = Arc::new(MockLlmClient::failing(LlmError::Timeout(Duration::from_secs(30))));
    let judge_client = Arc::new(MockLlmClient::new());

    let outcome = loop_with(
        StrategyChain::single(Arc::new(writer(writer_client.clone()))),
        judge(judge_client.clone()),
    )
    .run(&request())
    .await
    .unwrap();

    let report = outcome.failure().expect("failed");
    assert_eq!(report.kind, FailureKind::TransientServiceError);
    assert_eq!(report.rounds, 3);
    assert!(report.best.is_none());
    // two attempts per round
    assert_eq!(writer_client.call_count(), 6);
    assert_eq!(judge_client.call_count(), 0);
}

/// Integration test: a malformed verdict costs a round but never crashes the loop
#[tokio::test]
async fn test_malformed_verdict_triggers_revision() {
    let draft = format!("{}\n{}", filler(250), CLOSING);
    let writer_client = Arc::new(MockLlmClient::with_responses([draft.clone(), draft]));
    let judge_client = Arc::new(MockLlmClient::with_responses([
        "Looks great to me!",
        "Still not JSON",
        SCORE_FOUR,
    ]));

    let outcome = loop_with(
        StrategyChain::single(Arc::new(writer(writer_client.clone()))),
        judge(judge_client.clone()),
    )
    .run(&request())
    .await
    .unwrap();

    assert_eq!(outcome.rounds(), 2);
    assert!(outcome.is_accepted());
    assert_eq!(judge_client.call_count(), 3);
}

/// Integration test: a rate-limited writer falls back to the deterministic template
#[tokio::test]
async fn test_rate_limited_writer_falls_back_to_template() {
    let writer_client = Arc::new(MockLlmClient::failing(LlmError::RateLimited {
        retry_after: Duration::from_secs(60),
    }));
    let single_pass = SinglePassStrategy::new(writer_client.clone(), Arc::new(PromptLoader::builtin()))
        .with_retry(RetryPolicy::immediate(1));
    let strategies: Vec<Arc<dyn GenerationStrategy>> = vec![Arc::new(single_pass), Arc::new(TemplateStrategy)];

    let request = ContentRequest::builder(Platform::Twitter, "AMD")
        .source_text(document().source_text())
        .bindings(&document().bindings("https://www.100baggers.club/reports/amd"))
        .length(10, 300, LengthUnit::Words)
        .closing_line(CLOSING)
        .build()
        .unwrap();
    let evaluator = Arc::new(ScriptedEvaluator::constant(Ok(QualityScore::uniform(&Rubric::default(), 3.5))));

    let outcome = loop_with(StrategyChain::new(strategies), evaluator).run(&request).await.unwrap();

    let artifact = outcome.artifact().expect("accepted");
    assert_eq!(artifact.candidate.strategy(), "template");
    assert!(artifact.candidate.as_text().ends_with(CLOSING));
    assert_eq!(writer_client.call_count(), 1);
}

/// Integration test: invalid requests are rejected before any service call
#[tokio::test]
async fn test_invalid_request_makes_no_calls() {
    let writer_client = Arc::new(MockLlmClient::new());
    let content_loop = ContentLoop::new(
        StrategyChain::single(Arc::new(writer(writer_client.clone()))),
        judge(Arc::new(MockLlmClient::new())),
    )
    .with_config(LoopConfig::default().with_max_rounds(0));

    let err = content_loop.run(&request()).await.unwrap_err();
    assert!(err.is_invalid_request());
    assert_eq!(writer_client.call_count(), 0);
}

/// Integration test: checks are pure, so repeating them gives identical results
#[test]
fn test_checks_are_idempotent() {
    let candidate = postforge::content::Candidate::text(1, "manual", format!("{} buy sell", filler(20)));
    let battery = CheckBattery::standard();
    let first = battery.check_all(&candidate, &request());
    let second = battery.check_all(&candidate, &request());
    assert_eq!(first, second);

    let forbidden = first.iter().find(|r| r.check == "forbidden_terms").unwrap();
    assert_eq!(forbidden.reasons.len(), 2);
}

/// Integration test: concurrent loops write one file per platform
#[tokio::test]
async fn test_orchestrated_run_persists_outcomes() {
    let doc = document();
    let config = postforge::config::Config::default();
    let requests = vec![
        config.profile(Platform::Twitter).build_request(&doc).unwrap(),
        config.profile(Platform::Xueqiu).build_request(&doc).unwrap(),
    ];

    let evaluator = Arc::new(ScriptedEvaluator::constant(Ok(QualityScore::uniform(&Rubric::default(), 2.0))));
    let orchestrator = Orchestrator::new(
        ContentLoop::new(StrategyChain::single(Arc::new(TemplateStrategy)), evaluator)
            .with_config(LoopConfig::default().with_max_rounds(1)),
        2,
    );
    let results = orchestrator.run_all(&requests).await;
    assert_eq!(results.len(), 2);

    let dir = TempDir::new().unwrap();
    let writer = ArtifactWriter::new(dir.path());
    let mut paths = Vec::new();
    for result in results {
        let outcome: LoopOutcome = result.unwrap();
        assert!(!outcome.is_accepted());
        paths.push(writer.write(&outcome).unwrap());
    }

    assert!(paths.iter().all(|p| p.starts_with(dir.path().join("AMD"))));
    assert!(paths[0].to_string_lossy().ends_with("-twitter.failed.json"));
    assert!(paths[1].to_string_lossy().ends_with("-xueqiu.failed.json"));
}

/// Integration test: the mock client stands in for a real provider
#[test]
fn test_mock_llm_client_creation() {
    let mock = MockLlmClient::new();
    assert!(mock.is_ready());
    assert_eq!(mock.call_count(), 0);
}
