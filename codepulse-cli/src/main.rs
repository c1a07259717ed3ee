#![deny(missing_docs)]
//! CodePulse command-line interface.
//!
//! Analyses local repositories for test health, coverage and common issues.

mod insight;

use chrono::Utc;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand, ValueEnum};
use codepulse_core::fs::to_forward_slashes;
use codepulse_core::{
    AnalysisConfig, AnalysisStatus, ContentScores, CoverageToolKind, HealthReport, Severity,
    StdFileSystem, analyze_characteristics, analyze_repository, classify, detect_frameworks,
    format_language_stats, health_label, render_json, render_markdown,
};
use insight::{InsightArgs, ReqwestInsightClient, insights_for};
use log::{debug, info};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "codepulse", version, about = "CodePulse repository health analyzer")]
struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(&["dir", "path"])
))]
struct RepoSourceArgs {
    /// Directory containing repositories to analyse.
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Local repository path to analyse.
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct AnalysisArgs {
    /// Maximum number of repositories analysed at once.
    #[arg(short = 'j', long, default_value_t = 4)]
    concurrency: usize,
    /// JSON file with analysis settings.
    #[arg(long, env = "CODEPULSE_CONFIG")]
    config: Option<PathBuf>,
    /// Coverage backend: auto or none.
    #[arg(long, env = "CODEPULSE_COVERAGE_TOOL", value_parser = parse_coverage_tool)]
    coverage_tool: Option<CoverageToolKind>,
    /// Coverage tool timeout in seconds.
    #[arg(long, env = "CODEPULSE_COVERAGE_TIMEOUT")]
    coverage_timeout: Option<u64>,
    /// Skip the issue scanner.
    #[arg(long)]
    no_issues: bool,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse repositories from a directory or a local path.
    Analyze {
        #[command(flatten)]
        source: RepoSourceArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        insight: InsightArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Classify a single test file.
    Classify {
        /// Test file to classify.
        file: PathBuf,
        /// Repository root the path is taken relative to.
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            source,
            analysis,
            insight,
            report,
        } => {
            let source = resolve_source_args(&source)?;
            run_analyze(source, analysis, insight, report).await?
        }
        Commands::Classify { file, root } => {
            print!("{}", classify_command(&file, root.as_deref())?);
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

#[cfg_attr(test, allow(dead_code))]
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn parse_coverage_tool(value: &str) -> Result<CoverageToolKind, String> {
    CoverageToolKind::parse(value).ok_or_else(|| format!("unknown coverage tool: {value}"))
}

fn load_config(args: &AnalysisArgs) -> CliResult<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(kind) = args.coverage_tool {
        config.coverage_tool = kind;
    }
    if let Some(timeout) = args.coverage_timeout {
        config.coverage_timeout_secs = timeout;
    }
    if args.no_issues {
        config.scan_issues = false;
    }
    Ok(config)
}

async fn run_analyze(
    source: RepoSource,
    analysis: AnalysisArgs,
    insight: InsightArgs,
    report: OutputArgs,
) -> CliResult<()> {
    let targets = load_repo_targets(source).await?;
    if targets.is_empty() {
        println!("No repositories found to analyze.");
        return Ok(());
    }

    let config = Arc::new(load_config(&analysis)?);
    let client = Arc::new(ReqwestInsightClient::from_args(&insight)?);
    let with_insights = insight.enabled;
    let concurrency = if analysis.concurrency == 0 {
        1
    } else {
        analysis.concurrency
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for path in targets {
        let permit = semaphore.clone().acquire_owned().await?;
        let config = config.clone();
        let client = client.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let mut report = analyze_target(path, config).await;
            if with_insights {
                report.insights = Some(insights_for((*client).as_ref(), &report).await);
            }
            report
        });
    }

    let mut reports = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => reports.push(report_from_task_error(err)),
        }
    }
    reports.sort_by(|a, b| a.source.cmp(&b.source));

    emit_reports(&reports, &report).await
}

async fn analyze_target(path: PathBuf, config: Arc<AnalysisConfig>) -> HealthReport {
    let source = path.display().to_string();
    let fallback_path = path.clone();
    let task = tokio::task::spawn_blocking(move || analyze_local(path, &config));
    match task.await {
        Ok(report) => report,
        Err(err) => HealthReport::failed(source, fallback_path, err.to_string()),
    }
}

fn analyze_local(path: PathBuf, config: &AnalysisConfig) -> HealthReport {
    let source = path.display().to_string();
    if !path.is_dir() {
        return HealthReport::failed(
            source,
            path.clone(),
            format!("path not found: {}", path.display()),
        );
    }
    info!("analysing {source}");
    let fs = StdFileSystem::new();
    analyze_repository(&fs, &path, source, None, config, Utc::now())
}

fn resolve_source_args(source: &RepoSourceArgs) -> CliResult<RepoSource> {
    if let Some(dir) = source.dir.clone() {
        return Ok(RepoSource::Dir(dir));
    }
    if let Some(path) = source.path.clone() {
        return Ok(RepoSource::Path(path));
    }
    Err("no repository source provided".into())
}

/// Every visible subdirectory of `path`, each treated as one repository.
async fn load_repo_paths_from_dir(path: &Path) -> CliResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut repos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let repo = entry.path();
        if !entry.file_type().await?.is_dir() || is_hidden_path(&repo) {
            debug!("{} is not a repository directory", repo.display());
            continue;
        }
        repos.push(repo);
    }
    repos.sort();
    info!("found {} repositories under {}", repos.len(), path.display());
    Ok(repos)
}

fn is_hidden_path(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

async fn load_repo_targets(source: RepoSource) -> CliResult<Vec<PathBuf>> {
    match source {
        RepoSource::Dir(dir) => load_repo_paths_from_dir(&dir).await,
        RepoSource::Path(path) => Ok(vec![path]),
    }
}

enum RepoSource {
    Dir(PathBuf),
    Path(PathBuf),
}

fn report_from_task_error(error: tokio::task::JoinError) -> HealthReport {
    HealthReport::failed("unknown".to_string(), PathBuf::from("."), error.to_string())
}

async fn emit_reports(reports: &[HealthReport], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_text(reports),
        OutputFormat::Markdown => render_markdown(reports),
        OutputFormat::Json => render_json(reports)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    let Some(path) = &output.report_output else {
        print!("{contents}");
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!("report written to {}", path.display());
    Ok(())
}

fn render_text(reports: &[HealthReport]) -> String {
    let mut output = String::new();
    for report in reports {
        let _ = writeln!(output, "Source: {}", report.source);
        let _ = writeln!(output, "Path: {}", report.path.display());
        match &report.status {
            AnalysisStatus::Analyzed => {
                let _ = writeln!(output, "Status: analyzed");
            }
            AnalysisStatus::Failed(error) => {
                let _ = writeln!(output, "Status: failed ({error})");
                let _ = writeln!(output);
                continue;
            }
            AnalysisStatus::Pending => {
                let _ = writeln!(output, "Status: pending");
                let _ = writeln!(output);
                continue;
            }
        }

        if let Some(scores) = &report.scores {
            let _ = writeln!(
                output,
                "Health: {:.1} ({})",
                scores.health_score,
                health_label(scores.health_score)
            );
        }

        match &report.language_stats {
            Some(stats) if stats.is_empty() => {
                let _ = writeln!(output, "Languages: none detected");
            }
            Some(stats) => {
                let _ = writeln!(output, "Languages:");
                for (language, percent) in format_language_stats(stats) {
                    let _ = writeln!(output, "- {language}: {percent:.2}%");
                }
            }
            None => {
                let _ = writeln!(output, "Languages: unavailable");
            }
        }

        if let Some(coverage) = &report.coverage {
            let metrics = &coverage.coverage_metrics;
            let grade = report
                .coverage_grade
                .map(|grade| grade.as_str())
                .unwrap_or("ungraded");
            let how = if metrics.estimated {
                "estimated"
            } else {
                metrics.tool_used.as_str()
            };
            let _ = writeln!(output, "Coverage: {:.1}% ({how}, {grade})", metrics.overall);
            let _ = writeln!(
                output,
                "Test files: {} ({} language)",
                coverage.test_files_count, coverage.primary_language
            );
            for recommendation in &coverage.recommendations {
                let _ = writeln!(
                    output,
                    "- [{}] {}",
                    recommendation.kind.as_str(),
                    recommendation.title
                );
            }
        }

        match &report.issues {
            Some(issues) => {
                let counts: Vec<String> = Severity::ALL
                    .iter()
                    .map(|severity| format!("{severity} {}", issues.count(*severity)))
                    .collect();
                let _ = writeln!(output, "Issues: {} ({})", issues.total(), counts.join(", "));
                for item in &issues.action_items {
                    let _ = writeln!(output, "{}. {}", item.priority, item.title);
                }
            }
            None => {
                let _ = writeln!(output, "Issues: not scanned");
            }
        }

        if let Some(insights) = &report.insights {
            let origin = if insights.fallback { " (fallback)" } else { "" };
            let _ = writeln!(
                output,
                "AI architecture score: {:.1}/10{origin}",
                insights.architecture_score
            );
        }

        if !report.errors.is_empty() {
            let _ = writeln!(output, "Errors:");
            for error in &report.errors {
                let _ = writeln!(output, "- {error}");
            }
        }

        let _ = writeln!(output);
    }
    output
}

fn classify_command(file: &Path, root: Option<&Path>) -> CliResult<String> {
    let content = std::fs::read_to_string(file)?;
    let relative = root
        .and_then(|root| file.strip_prefix(root).ok())
        .map(to_forward_slashes)
        .unwrap_or_else(|| to_forward_slashes(file));

    let test_type = classify(&relative, &content);
    let scores = ContentScores::score(&content);
    let mut output = String::new();
    let _ = writeln!(output, "File: {relative}");
    let _ = writeln!(output, "Type: {test_type}");
    let _ = writeln!(
        output,
        "Content scores: unit {}, integration {}, e2e {}, performance {}",
        scores.unit, scores.integration, scores.e2e, scores.performance
    );

    let characteristics: Vec<String> = analyze_characteristics(&content)
        .iter()
        .map(|characteristic| characteristic.as_str().to_string())
        .collect();
    let frameworks: Vec<String> = detect_frameworks(&content).into_iter().collect();
    let _ = writeln!(output, "Characteristics: {}", join_or_none(&characteristics));
    let _ = writeln!(output, "Frameworks: {}", join_or_none(&frameworks));
    Ok(output)
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
