// src/report.rs

use crate::api_spec::ApiKind;
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Claimable amounts of one address, in `apis_to_use` order. Only strictly
/// positive amounts are present.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    pub address: String,
    pub amounts: IndexMap<ApiKind, f64>,
}

impl CombinedRecord {
    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }
}

/// Serialized flat: `{"address": ..., "puffer": ..., ...}`.
impl Serialize for CombinedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.amounts.len()))?;
        map.serialize_entry("address", &self.address)?;
        for (kind, amount) in &self.amounts {
            map.serialize_entry(kind.key(), amount)?;
        }
        map.end()
    }
}

fn format_amount(kind: ApiKind, amount: f64) -> String {
    match kind {
        // Reported as the API returns it.
        ApiKind::EigenS2 => amount.to_string(),
        _ => format!("{:.3}", amount),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub records: Vec<CombinedRecord>,
}

impl Report {
    pub fn new(records: Vec<CombinedRecord>) -> Self {
        Self { records }
    }

    pub fn wallet_count(&self) -> usize {
        self.records.len()
    }

    /// Sum of every amount of every record.
    pub fn total(&self) -> f64 {
        self.records.iter().map(CombinedRecord::total).sum()
    }

    /// Plain-text per-address breakdown followed by the totals.
    pub fn render_summary(&self) -> String {
        self.render(false)
    }

    /// Colored [`Report::render_summary`] on stdout.
    pub fn print_summary(&self) {
        print!("\n{}", self.render(true));
    }

    fn render(&self, styled: bool) -> String {
        let bold = |text: &str| paint(styled, text, |s| s.bold());

        let mut out = format!("{}\n", bold("Results:"));
        for record in &self.records {
            let address = paint(styled, &record.address, |s| s.cyan());
            let _ = writeln!(out, "\n{} {}", bold("Address:"), address);
            for (kind, amount) in &record.amounts {
                let amount = paint(styled, &format_amount(*kind, *amount), |s| s.green());
                let _ = writeln!(out, "  {}: {} EIGEN", kind, amount);
            }
        }
        let _ = write!(
            out,
            "\n{} {}\n{} {}\n",
            bold("Total number of wallets:"),
            paint(styled, &self.wallet_count().to_string(), |s| s.yellow()),
            bold("Sum of Eigen found:"),
            paint(styled, &format!("{:.3}", self.total()), |s| s.yellow().bold())
        );
        out
    }

    /// JSON array of the records, indented with four spaces.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records
            .serialize(&mut serializer)
            .context("serializing report")?;
        String::from_utf8(buf).context("report JSON is not UTF-8")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).with_context(|| format!("writing results to {}", path.display()))
    }
}

fn paint(styled: bool, text: &str, style: impl FnOnce(ColoredString) -> ColoredString) -> String {
    if styled {
        style(text.normal()).to_string()
    } else {
        text.to_string()
    }
}
