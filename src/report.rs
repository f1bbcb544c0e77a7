//! Console summaries for the analyze and build commands.
//!
//! Each summary is derived as data first and rendered to a plain-text table
//! second; callers decide where the text goes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::assemble::{AssembledSplits, AssemblyStats, CountValidation};
use crate::constants::reallocation::ALL_TARGETS;
use crate::data::OriginSet;
use crate::reallocation::{ReallocationMap, SplitCounts};
use crate::registry::Origin;
use crate::splits::{Bucket, classify};

/// Bucket distribution of one origin file.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketSummary {
    /// Origin summarized.
    pub origin: Origin,
    /// Records in the origin.
    pub total: usize,
    /// Records per bucket (every bucket present, zero when empty).
    pub counts: BTreeMap<Bucket, usize>,
    /// Records whose bucket the origin does not expect.
    pub not_belong: usize,
}

impl BucketSummary {
    /// Classify every id of `set`.
    pub fn from_origin(set: &OriginSet) -> Self {
        let mut counts: BTreeMap<Bucket, usize> =
            Bucket::ALL.into_iter().map(|bucket| (bucket, 0)).collect();
        for id in set.ids() {
            *counts.entry(classify(id)).or_insert(0) += 1;
        }
        let belong: usize = counts
            .iter()
            .filter(|(bucket, _)| set.origin.expects(**bucket))
            .map(|(_, count)| *count)
            .sum();
        Self {
            origin: set.origin,
            total: set.len(),
            counts,
            not_belong: set.len() - belong,
        }
    }

    /// Records in `bucket`.
    pub fn count(&self, bucket: Bucket) -> usize {
        self.counts.get(&bucket).copied().unwrap_or(0)
    }

    /// Share of records outside the expected buckets, in percent.
    pub fn pct_not_belong(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.not_belong as f64 / self.total as f64
    }
}

enum Cell {
    Text(String),
    Number(usize),
}

impl Cell {
    fn width(&self) -> usize {
        match self {
            Cell::Text(text) => text.chars().count(),
            Cell::Number(value) => value.to_string().len(),
        }
    }
}

/// Per-origin bucket table with a `%NotBelong` column.
pub fn render_bucket_table(summaries: &[BucketSummary]) -> String {
    let headers = [
        "File",
        "Total",
        "Train",
        "Valid",
        "Test1",
        "Test2",
        "Test3",
        "Other",
        "%NotBelong",
    ];
    let rows: Vec<Vec<Cell>> = summaries
        .iter()
        .map(|summary| {
            let mut row = vec![
                Cell::Text(summary.origin.filename().to_string()),
                Cell::Number(summary.total),
            ];
            row.extend(
                Bucket::ALL
                    .into_iter()
                    .map(|bucket| Cell::Number(summary.count(bucket))),
            );
            row.push(Cell::Text(format!("{:.1}%", summary.pct_not_belong())));
            row
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .map(|row| row[col].width())
                .fold(header.len(), usize::max)
        })
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", header_line.join("  "));
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| match cell {
                Cell::Text(text) => format!("{text:<width$}"),
                Cell::Number(value) => format!("{value:>width$}"),
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  "));
    }
    out
}

fn signed(delta: i64) -> String {
    if delta == 0 {
        "-".to_string()
    } else {
        format!("{delta:+}")
    }
}

/// Before/after/change table of a reallocation map.
pub fn render_reallocation_table(map: &ReallocationMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:<10}  {:>6}  {:>6}  {:>6}", "Split", "Before", "After", "Change");
    let _ = writeln!(out, "  {:-<10}  {:-<6}  {:-<6}  {:-<6}", "", "", "", "");
    for origin in Origin::ALL {
        let split = origin.canonical_split();
        let _ = writeln!(
            out,
            "  {:<10}  {:>6}  {:>6}  {:>6}",
            origin.display_label(),
            map.counts_before.get(split),
            map.counts_after.get(split),
            signed(map.delta.get(split))
        );
    }
    let _ = writeln!(out, "  {:-<10}  {:-<6}  {:-<6}  {:-<6}", "", "", "", "");
    let _ = writeln!(
        out,
        "  {:<10}  {:>6}  {:>6}",
        "total", map.counts_before.total, map.counts_after.total
    );
    out
}

/// Assembly counters, one per line.
pub fn render_stats(stats: &AssemblyStats) -> String {
    let mut out = String::new();
    for (label, value) in [
        ("Total IDs", stats.total),
        ("ACI-Bench", stats.acibench),
        ("Primock", stats.primock),
        ("Missing transcript", stats.missing_transcript),
        ("Missing orders", stats.missing_orders),
        ("Unparseable", stats.unparseable),
        ("Success", stats.success),
    ] {
        let _ = writeln!(out, "  {label:<20} {value:>6}");
    }
    out
}

/// Expected versus actual row counts per split.
pub fn render_count_validation(validation: &CountValidation) -> String {
    let status = |ok: bool| if ok { "ok" } else { "MISMATCH" };
    let mut out = String::new();
    let _ = writeln!(out, "  {:<10} {:>10} {:>10} {:>10}", "Split", "Expected", "Actual", "Status");
    let _ = writeln!(out, "  {:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "");
    for check in &validation.checks {
        let _ = writeln!(
            out,
            "  {:<10} {:>10} {:>10} {:>10}",
            check.split.as_str(),
            check.expected,
            check.actual,
            status(check.matches())
        );
    }
    let _ = writeln!(out, "  {:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "");
    let _ = writeln!(
        out,
        "  {:<10} {:>10} {:>10} {:>10}",
        "TOTAL",
        validation.expected_total,
        validation.actual_total,
        status(validation.expected_total == validation.actual_total)
    );
    out
}

/// Original origin sizes against assembled split sizes.
pub fn render_delta_table(original: &SplitCounts, assembled: &AssembledSplits) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:<15} {:>10} {:>10} {:>10}", "Split", "Original", "New", "Delta");
    let _ = writeln!(out, "  {:-<15} {:-<10} {:-<10} {:-<10}", "", "", "", "");
    let mut total_new = 0usize;
    for (origin, split) in Origin::ALL.into_iter().zip(ALL_TARGETS) {
        let before = original.get(split);
        let after = assembled.split(split).len();
        total_new += after;
        let _ = writeln!(
            out,
            "  {:<15} {:>10} {:>10} {:>10}",
            origin.display_label(),
            before,
            after,
            signed(after as i64 - before as i64)
        );
    }
    let _ = writeln!(out, "  {:-<15} {:-<10} {:-<10} {:-<10}", "", "", "", "");
    let _ = writeln!(
        out,
        "  {:<15} {:>10} {:>10} {:>10}",
        "TOTAL",
        original.total,
        total_new,
        signed(total_new as i64 - original.total as i64)
    );
    out
}
