//! Run report generation.

use crate::error::Result;
use crate::tasks::TaskKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

impl LatencyStats {
    /// Formats latency as a human-readable string.
    pub fn format_ms(&self) -> String {
        if self.count == 0 {
            "N/A".to_string()
        } else {
            format!(
                "p50={:.1}ms p95={:.1}ms p99={:.1}ms",
                self.p50_us as f64 / 1000.0,
                self.p95_us as f64 / 1000.0,
                self.p99_us as f64 / 1000.0
            )
        }
    }
}

/// Outcome counts for one task kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Requests attempted, including failures
    pub requests: u64,
    /// 2xx responses with body `ok`
    pub accepted: u64,
    /// 2xx responses with body `nok`
    pub rejected: u64,
    /// Transport failures and non-2xx responses
    pub errors: u64,
    pub latency: LatencyStats,
}

/// Complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    // Configuration
    pub server_url: String,
    pub users: usize,
    pub configured_duration: Duration,
    pub duration: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub known_weight: u32,
    pub unknown_weight: u32,
    pub seed: Option<u64>,
    pub interrupted: bool,

    // Results
    pub bytes_sent: u64,
    pub known_device: TaskReport,
    pub unknown_device: TaskReport,
}

impl Report {
    pub fn task(&self, task: TaskKind) -> &TaskReport {
        match task {
            TaskKind::KnownDevice => &self.known_device,
            TaskKind::UnknownDevice => &self.unknown_device,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.known_device.requests + self.unknown_device.requests
    }

    pub fn total_errors(&self) -> u64 {
        self.known_device.errors + self.unknown_device.errors
    }

    pub fn requests_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total_requests() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Observed share of requests per task, next to the configured share.
    pub fn mix(&self, task: TaskKind) -> (f64, f64) {
        let total_weight = self.known_weight as f64 + self.unknown_weight as f64;
        let weight = match task {
            TaskKind::KnownDevice => self.known_weight,
            TaskKind::UnknownDevice => self.unknown_weight,
        } as f64;
        let expected = if total_weight > 0.0 {
            weight / total_weight
        } else {
            0.0
        };

        let total = self.total_requests();
        let observed = if total > 0 {
            self.task(task).requests as f64 / total as f64
        } else {
            0.0
        };

        (observed, expected)
    }

    /// Generates a markdown report.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Sensor Ingest Simulator Report\n\n");

        md.push_str("## Configuration\n\n");
        md.push_str("| Setting | Value |\n");
        md.push_str("|---------|-------|\n");
        md.push_str(&format!("| Target | {} |\n", self.server_url));
        md.push_str(&format!("| Users | {} |\n", self.users));
        md.push_str(&format!(
            "| Duration | {:.1}s of {:.1}s |\n",
            self.duration.as_secs_f64(),
            self.configured_duration.as_secs_f64()
        ));
        md.push_str(&format!(
            "| Pacing | {:.2}s - {:.2}s |\n",
            self.min_wait.as_secs_f64(),
            self.max_wait.as_secs_f64()
        ));
        md.push_str(&format!(
            "| Weights | known={} unknown={} |\n",
            self.known_weight, self.unknown_weight
        ));
        if let Some(seed) = self.seed {
            md.push_str(&format!("| Seed | {} |\n", seed));
        }
        md.push('\n');

        md.push_str("## Requests\n\n");
        md.push_str("| Task | Requests | Share | Accepted | Rejected | Errors | p50 | p95 | p99 |\n");
        md.push_str("|------|----------|-------|----------|----------|--------|-----|-----|-----|\n");
        for &task in TaskKind::all() {
            let report = self.task(task);
            let (observed, expected) = self.mix(task);
            let latency = if report.latency.count > 0 {
                format!(
                    "{:.1}ms | {:.1}ms | {:.1}ms",
                    report.latency.p50_us as f64 / 1000.0,
                    report.latency.p95_us as f64 / 1000.0,
                    report.latency.p99_us as f64 / 1000.0
                )
            } else {
                "N/A | N/A | N/A".to_string()
            };
            md.push_str(&format!(
                "| {} | {} | {:.1}% (target {:.1}%) | {} | {} | {} | {} |\n",
                task,
                format_number(report.requests),
                observed * 100.0,
                expected * 100.0,
                format_number(report.accepted),
                format_number(report.rejected),
                format_number(report.errors),
                latency
            ));
        }
        md.push('\n');

        md.push_str("## Summary\n\n");
        md.push_str(&format!(
            "{} requests ({:.1}/s), {} sent\n\n",
            format_number(self.total_requests()),
            self.requests_per_second(),
            format_bytes(self.bytes_sent)
        ));

        if self.interrupted {
            md.push_str("**Run interrupted before the configured duration**\n");
        } else if self.total_errors() > 0 {
            md.push_str("**Errors detected during run**\n");
        } else {
            md.push_str("**Run completed without errors**\n");
        }

        md
    }

    /// Generates a JSON report.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Prints a summary to stdout.
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("INGEST LOAD RESULTS");
        println!("{}", "=".repeat(60));

        println!(
            "\nTarget: {} | Users: {} | Duration: {:.1}s{}",
            self.server_url,
            self.users,
            self.duration.as_secs_f64(),
            if self.interrupted { " (interrupted)" } else { "" }
        );
        println!(
            "Requests: {} ({:.1}/s) | Sent: {}",
            format_number(self.total_requests()),
            self.requests_per_second(),
            format_bytes(self.bytes_sent)
        );

        for &task in TaskKind::all() {
            let report = self.task(task);
            let (observed, expected) = self.mix(task);
            println!("\n{}:", task);
            println!(
                "   Requests: {} ({:.1}%, target {:.1}%)",
                format_number(report.requests),
                observed * 100.0,
                expected * 100.0
            );
            println!(
                "   Accepted: {} | Rejected: {}",
                format_number(report.accepted),
                format_number(report.rejected)
            );
            println!("   Latency: {}", report.latency.format_ms());
            if report.errors > 0 {
                println!("   Errors: {}", format_number(report.errors));
            }
        }

        println!("\n{}", "=".repeat(60));
    }
}

/// Formats a number with thousand separators.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Formats bytes in human-readable form.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
