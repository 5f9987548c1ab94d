//! Output formatting for CLI

use console::style;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Where a timeline entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Step,
    State,
    Time,
    Plugin,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Step => write!(f, "step"),
            Channel::State => write!(f, "state"),
            Channel::Time => write!(f, "time"),
            Channel::Plugin => write!(f, "plugin"),
        }
    }
}

/// One line of the simulation timeline
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    /// Virtual time since the session started
    pub at_ms: u64,
    pub channel: Channel,
    pub detail: serde_json::Value,
}

#[derive(Tabled)]
struct TimelineRow {
    #[tabled(rename = "at (ms)")]
    at_ms: u64,
    channel: Channel,
    detail: String,
}

/// Final state of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub scenario: Option<String>,
    pub final_state: String,
    pub failovers: usize,
    pub refreshes: usize,
    pub strategy_instances: usize,
    pub remaining_cdns: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
}

/// Render a report in the selected format
pub fn render_report(report: &SimulationReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let rows = report.timeline.iter().map(|entry| TimelineRow {
                at_ms: entry.at_ms,
                channel: entry.channel,
                detail: entry.detail.to_string(),
            });
            format!("{}\n\n{}", Table::new(rows), summary(report))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for entry in &report.timeline {
                let channel = match entry.channel {
                    Channel::Step => style(entry.channel).cyan(),
                    Channel::State => style(entry.channel).green(),
                    Channel::Time => style(entry.channel).dim(),
                    Channel::Plugin => style(entry.channel).yellow(),
                };
                out.push_str(&format!("{:>8}ms  {:<7} {}\n", entry.at_ms, channel, entry.detail));
            }
            out.push('\n');
            out.push_str(&summary(report));
            out
        }
    }
}

fn summary(report: &SimulationReport) -> String {
    let mut lines = Vec::new();
    if let Some(name) = &report.scenario {
        lines.push(format!("Scenario: {}", name));
    }
    lines.push(format!("  Final state: {}", report.final_state));
    lines.push(format!("  Failovers: {}", report.failovers));
    lines.push(format!("  Live refreshes: {}", report.refreshes));
    lines.push(format!("  Strategy instances: {}", report.strategy_instances));
    lines.push(format!("  Remaining CDNs: {:?}", report.remaining_cdns));
    lines.join("\n")
}
