//! Coverage measurement with a heuristic fallback.
//!
//! A [`CoverageTool`] gets one chance to report real numbers for the checkout.
//! Anything short of a parsed report (missing binary, non-zero exit, timeout,
//! malformed JSON, even a panic inside the backend) degrades to
//! [`estimate_coverage`], which only looks at the test-to-source file ratio.

use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, CoverageThresholds, CoverageToolKind};
use crate::domain::CoverageMetrics;
use crate::profile::Language;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const REPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// A backend able to measure coverage of a checkout.
#[cfg_attr(test, mockall::automock)]
pub trait CoverageTool {
    /// Short tool name.
    fn name(&self) -> &str;
    /// Measured metrics, or `None` when the tool is unavailable or failed.
    fn run(&self, root: &Path) -> Option<CoverageMetrics>;
}

/// Backend that never measures anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCoverageTool;

impl CoverageTool for NoCoverageTool {
    fn name(&self) -> &str {
        "none"
    }

    fn run(&self, _root: &Path) -> Option<CoverageMetrics> {
        None
    }
}

/// Runs `coverage.py` over `pytest` in a subprocess.
#[derive(Debug, Clone)]
pub struct PythonCoverageTool {
    program: String,
    probe_timeout: Duration,
    run_timeout: Duration,
}

impl PythonCoverageTool {
    /// Backend calling `python` with the configured timeouts.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self::with_program("python", config)
    }

    /// Backend calling a specific interpreter.
    pub fn with_program(program: impl Into<String>, config: &AnalysisConfig) -> Self {
        Self {
            program: program.into(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs()),
            run_timeout: Duration::from_secs(config.coverage_timeout_secs),
        }
    }

    fn command(&self, args: &[&str], timeout: Duration) -> CommandSpec {
        CommandSpec {
            program: self.program.clone(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            timeout,
        }
    }
}

impl CoverageTool for PythonCoverageTool {
    fn name(&self) -> &str {
        "coverage.py"
    }

    fn run(&self, root: &Path) -> Option<CoverageMetrics> {
        let probe = self
            .command(&["-m", "coverage", "--version"], self.probe_timeout)
            .run(root)?;
        if !probe.status.success() {
            debug!("coverage.py not installed for {}", root.display());
            return None;
        }

        // Failing tests still leave a usable data file.
        self.command(&["-m", "coverage", "run", "-m", "pytest"], self.run_timeout)
            .run(root)?;

        let report = self
            .command(&["-m", "coverage", "json", "-o", "-"], REPORT_TIMEOUT)
            .run(root)?;
        if !report.status.success() {
            debug!("coverage json failed: {}", report.stderr.trim());
            return None;
        }

        let percent = parse_coverage_json(&report.stdout)?.clamp(0.0, 100.0);
        Some(CoverageMetrics {
            overall: percent,
            line_coverage: Some(percent),
            branch_coverage: None,
            function_coverage: None,
            estimated: false,
            tool_used: self.name().to_string(),
        })
    }
}

/// Pick the backend for a language under the given settings.
pub fn coverage_tool_for(language: Language, config: &AnalysisConfig) -> Box<dyn CoverageTool> {
    match (config.coverage_tool, language) {
        (CoverageToolKind::Auto, Language::Python) => Box::new(PythonCoverageTool::new(config)),
        _ => Box::new(NoCoverageTool),
    }
}

/// `totals.percent_covered` from a `coverage json` report.
pub fn parse_coverage_json(raw: &str) -> Option<f64> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    value.pointer("/totals/percent_covered")?.as_f64()
}

#[derive(Debug, Clone)]
struct CommandSpec {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Debug)]
struct CommandOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl CommandSpec {
    /// Run in `cwd`, killing the child once the timeout elapses.
    fn run(&self, cwd: &Path) -> Option<CommandOutput> {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                debug!("cannot spawn {}: {err}", self.program);
                return None;
            }
        };

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(
                        "{} {} timed out after {:?}",
                        self.program,
                        self.args.join(" "),
                        self.timeout
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    warn!("waiting on {} failed: {err}", self.program);
                    let _ = child.kill();
                    return None;
                }
            }
        };

        Some(CommandOutput {
            status,
            stdout: stdout.map(join_reader).unwrap_or_default(),
            stderr: stderr.map(join_reader).unwrap_or_default(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Ratio-based estimate used whenever no tool reported numbers.
pub fn estimate_coverage(test_count: usize, source_count: usize) -> CoverageMetrics {
    if source_count == 0 {
        return CoverageMetrics::zeroed();
    }

    let ratio = test_count as f64 / source_count as f64;
    let overall = if ratio >= 0.8 {
        (60.0 + ratio * 30.0).min(85.0)
    } else if ratio >= 0.5 {
        (40.0 + ratio * 40.0).min(70.0)
    } else if ratio >= 0.3 {
        (20.0 + ratio * 50.0).min(50.0)
    } else {
        (ratio * 60.0).min(30.0)
    };

    CoverageMetrics {
        overall: round1(overall),
        line_coverage: Some(round1(overall * 0.9)),
        branch_coverage: Some(round1(overall * 0.7)),
        function_coverage: Some(round1(overall * 0.8)),
        estimated: true,
        tool_used: "analysis".to_string(),
    }
}

/// Ask `tool` first and estimate when it yields nothing or panics.
pub fn calculate_coverage_metrics(
    root: &Path,
    tool: &dyn CoverageTool,
    test_count: usize,
    source_count: usize,
) -> CoverageMetrics {
    match catch_unwind(AssertUnwindSafe(|| tool.run(root))) {
        Ok(Some(metrics)) => return metrics,
        Ok(None) => debug!("{} produced no coverage, estimating", tool.name()),
        Err(_) => warn!("{} panicked, estimating coverage", tool.name()),
    }
    estimate_coverage(test_count, source_count)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Coarse label for an overall coverage value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageGrade {
    /// At or above the `excellent` threshold.
    Excellent,
    /// At or above `good`.
    Good,
    /// At or above `fair`.
    Fair,
    /// Below `fair`.
    Poor,
}

impl CoverageGrade {
    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl CoverageMetrics {
    /// Grade the overall value against `thresholds`.
    pub fn grade(&self, thresholds: &CoverageThresholds) -> CoverageGrade {
        if self.overall >= thresholds.excellent {
            CoverageGrade::Excellent
        } else if self.overall >= thresholds.good {
            CoverageGrade::Good
        } else if self.overall >= thresholds.fair {
            CoverageGrade::Fair
        } else {
            CoverageGrade::Poor
        }
    }
}
