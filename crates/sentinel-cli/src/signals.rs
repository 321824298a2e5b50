use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use sentinel_signals::{detect, technical_score, Signal};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignalScan {
    pub technical_score: u8,
    pub signals: Vec<Signal>,
}

pub(crate) fn scan(html: &str) -> SignalScan {
    let signals = detect(html);
    SignalScan {
        technical_score: technical_score(&signals),
        signals,
    }
}

/// Run every detector over a saved HTML file and print the verdicts.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub(crate) fn run_signals(path: &Path, json: bool) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading HTML file {}", path.display()))?;
    let result = scan(&html);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_scan(&result));
    }
    Ok(())
}

pub(crate) fn render_scan(scan: &SignalScan) -> String {
    let mut out = format!("technical score: {}/100\n\n", scan.technical_score);
    let _ = writeln!(out, "{:<22}{:<10}{:<10}DESCRIPTION", "ID", "SEVERITY", "DETECTED");
    for signal in &scan.signals {
        let _ = writeln!(
            out,
            "{:<22}{:<10}{:<10}{}",
            signal.id,
            signal.severity.to_string(),
            if signal.detected { "yes" } else { "no" },
            signal.description
        );
    }
    out
}
