use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use postforge::checks::{CheckBattery, CheckResult};
use postforge::config::Config;
use postforge::content::{Candidate, ContentRequest, LoopOutcome, Platform};
use postforge::llm::build_client;
use postforge::output::ArtifactWriter;
use postforge::runner::{AbortFlag, ContentLoop, Orchestrator};
use postforge::source::SourceDocument;

mod cli;

use cli::{Cli, Commands};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("postforge.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Generate {
            ticker,
            platforms,
            source,
            max_rounds,
            output,
            dry_run,
        } => {
            let mut config = config.clone();
            if let Some(rounds) = max_rounds {
                config.run.max_rounds = *rounds;
            }
            if let Some(dir) = output {
                config.run.output_dir = dir.clone();
            }
            handle_generate_command(ticker, platforms, source.as_deref(), *dry_run, &config).await
        }
        Commands::Check {
            file,
            platform,
            ticker,
            source,
        } => handle_check_command(file, *platform, ticker, source.as_deref(), config),
        Commands::Platforms => handle_platforms_command(cli.is_verbose(), config),
    }
}

fn load_source(ticker: &str, source: Option<&Path>, config: &Config) -> Result<SourceDocument> {
    let document = match source {
        Some(path) => SourceDocument::load(path, ticker),
        None => SourceDocument::locate(&config.run.reports_dir, ticker),
    };
    document.context(format!("Failed to load report for {}", ticker))
}

async fn handle_generate_command(
    ticker: &str,
    platforms: &[Platform],
    source: Option<&Path>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let platforms = if platforms.is_empty() {
        Platform::ALL.to_vec()
    } else {
        platforms.to_vec()
    };
    info!("Generating {} for {:?}", ticker, platforms);

    let document = load_source(ticker, source, config)?;
    let requests = platforms
        .iter()
        .map(|p| config.profile(*p).build_request(&document))
        .collect::<postforge::Result<Vec<ContentRequest>>>()
        .context("Invalid request")?;

    let loader = Arc::new(config.prompt_loader());

    if dry_run {
        let offline: Arc<dyn postforge::llm::LlmClient> = Arc::new(postforge::llm::MockLlmClient::new());
        let chain = config.build_chain(offline, loader);
        for request in &requests {
            chain.validate(request).context(format!("{} request is invalid", request.platform()))?;
            let length = request.length();
            println!(
                "{} {} {}: {}-{} {}, {} denylisted terms, threshold {:.1}",
                "OK".green(),
                request.platform(),
                request.ticker(),
                length.min,
                length.max,
                length.unit.as_str(),
                request.denylist().len(),
                request.rubric().threshold
            );
        }
        return Ok(());
    }

    let timeout = Duration::from_millis(config.llm.timeout_ms);
    let client = build_client(
        config.llm.provider,
        config.llm.model.as_deref(),
        config.llm.max_tokens,
        timeout,
        config.llm.temperature,
    )?;
    let judge_client = if config.evaluator_provider() == config.llm.provider {
        client.clone()
    } else {
        build_client(config.evaluator_provider(), None, config.evaluator.max_tokens, timeout, Some(0.0))?
    };

    let abort = AbortFlag::new();
    let on_signal = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping before the next round...".yellow());
            on_signal.abort();
        }
    });

    let content_loop = ContentLoop::new(
        config.build_chain(client, loader),
        Arc::new(config.build_evaluator(judge_client)),
    )
    .with_config(config.loop_config())
    .with_abort(Arc::new(abort));

    let orchestrator = Orchestrator::new(content_loop, config.run.max_concurrent_requests);
    let results = orchestrator.run_all(&requests).await;

    let writer = ArtifactWriter::new(&config.run.output_dir);
    let mut failed = 0;
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(outcome) => {
                let path = writer.write(&outcome)?;
                print_outcome(&outcome, &path);
                if !outcome.is_accepted() {
                    failed += 1;
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} {} {}: {}", "ERROR".red(), request.platform(), request.ticker(), e);
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{} of {} platforms produced no accepted post", failed, requests.len()));
    }
    Ok(())
}

fn print_outcome(outcome: &LoopOutcome, path: &Path) {
    match outcome {
        LoopOutcome::Accepted(artifact) => println!(
            "{} {} {} in {} round(s), score {:.2} -> {}",
            "ACCEPTED".green(),
            artifact.platform,
            artifact.ticker,
            artifact.rounds,
            artifact.score.weighted,
            path.display()
        ),
        LoopOutcome::Failed(report) => {
            println!(
                "{} {} {} after {} round(s): {} -> {}",
                "FAILED".red(),
                report.platform,
                report.ticker,
                report.rounds,
                report.kind,
                path.display()
            );
            for reason in report.last_reasons() {
                println!("  - {}", reason);
            }
        }
    }
}

fn handle_check_command(
    file: &Path,
    platform: Platform,
    ticker: &str,
    source: Option<&Path>,
    config: &Config,
) -> Result<()> {
    info!("Checking {} as {} post for {}", file.display(), platform, ticker);

    let text = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let candidate = if file.extension().is_some_and(|ext| ext == "json") {
        let value: serde_json::Value = serde_json::from_str(&text).context("Post is not valid JSON")?;
        Candidate::structured(0, "file", value)
    } else {
        Candidate::text(0, "file", text)
    };

    let document = load_source(ticker, source, config)?;
    let request = config.profile(platform).build_request(&document).context("Invalid request")?;

    let results = CheckBattery::standard().check_all(&candidate, &request);
    for result in &results {
        print_check(result);
    }

    if CheckBattery::any_blocking(&results) {
        return Err(eyre!("{} post fails the automatic checks", platform));
    }
    println!("{}", "All blocking checks passed".green());
    Ok(())
}

fn print_check(result: &CheckResult) {
    let status = if result.passed {
        "PASS".green()
    } else if result.is_warning() {
        "WARN".yellow()
    } else {
        "FAIL".red()
    };
    match result.measured {
        Some(measured) => println!("{} {} (measured {})", status, result.check, measured),
        None => println!("{} {}", status, result.check),
    }
    for reason in &result.reasons {
        println!("  - {}", reason);
    }
}

fn handle_platforms_command(verbose: bool, config: &Config) -> Result<()> {
    for platform in Platform::ALL {
        let profile = config.profile(platform);
        println!(
            "{} {}-{} {}, threshold {:.1}",
            platform.as_str().cyan(),
            profile.length.min,
            profile.length.max,
            profile.length.unit.as_str(),
            profile.rubric.threshold
        );
        if let Some(line) = &profile.closing_line {
            println!("  closing line: {}", line);
        }
        if let Some(units) = &profile.required_units {
            println!("  units: {}", units.count);
        }
        if let Some(disclaimer) = &profile.disclaimer {
            println!("  disclaimer: {}", disclaimer);
        }
        if verbose {
            print!("{}", serde_yaml::to_string(&profile).context("Failed to render profile")?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
