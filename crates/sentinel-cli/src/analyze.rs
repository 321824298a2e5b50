use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use sentinel_analysis::{AnalysisResult, AnalysisStatus, Analyzer, BatchError, Caller};
use sentinel_core::parse_domain_list;

use crate::CLI_CALLER;

/// Analyze one URL as the local caller and print the result.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the site cannot be reached.
pub(crate) async fn run_analyze(analyzer: &Analyzer, url: &str, json: bool) -> anyhow::Result<()> {
    let caller = Caller::Member(CLI_CALLER.to_owned());
    let result = analyzer.analyze_single(url, &caller).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_report(&result));
    }
    Ok(())
}

/// Analyze every domain in a `.txt`/`.csv` list and print a summary table.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported
/// extension, or contains no domains.
pub(crate) async fn run_bulk(analyzer: &Analyzer, path: &Path, json: bool) -> anyhow::Result<()> {
    ensure_list_file(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading domain list {}", path.display()))?;
    let domains = parse_domain_list(&content);
    if domains.is_empty() {
        anyhow::bail!("no domains found in {}", path.display());
    }

    tracing::info!(domains = domains.len(), file = %path.display(), "bulk run starting");
    let results = analyze_domains(analyzer, &domains).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render_table(&results));
    }
    Ok(())
}

/// Splits `domains` into requests no larger than the per-batch maximum and
/// concatenates the results in input order. A refused request becomes
/// `failed` placeholders; after a quota refusal every remaining domain is
/// marked failed without further requests.
pub(crate) async fn analyze_domains(
    analyzer: &Analyzer,
    domains: &[String],
) -> Vec<AnalysisResult> {
    let per_request = analyzer.settings().max_batch_domains.max(1);
    let mut results = Vec::with_capacity(domains.len());

    for batch in domains.chunks(per_request) {
        match analyzer.analyze_batch(Some(CLI_CALLER), batch).await {
            Ok(batch_results) => results.extend(batch_results),
            Err(e) => {
                tracing::warn!(error = %e, domains = batch.len(), "batch refused");
                let stop = matches!(e, BatchError::QuotaExceeded { .. });
                results.extend(
                    batch
                        .iter()
                        .map(|domain| AnalysisResult::failed(domain, e.to_string())),
                );
                if stop {
                    let done = results.len();
                    results.extend(
                        domains[done..]
                            .iter()
                            .map(|domain| AnalysisResult::failed(domain, e.to_string())),
                    );
                    break;
                }
            }
        }
    }
    results
}

fn ensure_list_file(path: &Path) -> anyhow::Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt" | "csv") => Ok(()),
        _ => anyhow::bail!(
            "unsupported domain list {}; expected a .txt or .csv file",
            path.display()
        ),
    }
}

pub(crate) fn render_report(result: &AnalysisResult) -> String {
    let detected: Vec<_> = result.signals.iter().filter(|s| s.detected).collect();
    let mut out = String::new();

    let _ = writeln!(out, "{:<12}{}", "DOMAIN", result.domain);
    let _ = writeln!(out, "{:<12}{}/100", "SPAM SCORE", result.metrics.spam_score);
    let _ = writeln!(
        out,
        "{:<12}{} / {}",
        "DA / PA", result.metrics.da, result.metrics.pa
    );
    let _ = writeln!(out, "{:<12}{}", "BACKLINKS", result.metrics.backlinks);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "SIGNALS ({} of {} detected)",
        detected.len(),
        result.signals.len()
    );
    for signal in detected {
        let _ = writeln!(
            out,
            "  {:<10}{:<28}{}",
            signal.severity.to_string(),
            signal.name,
            signal.description
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "INSIGHT");
    let _ = writeln!(out, "  {}", result.insight);
    out
}

pub(crate) fn render_table(results: &[AnalysisResult]) -> String {
    let mut out = format!(
        "{:<34}{:<7}{:<6}{:<6}{:<8}STATUS\n",
        "DOMAIN", "SPAM", "DA", "PA", "CACHED"
    );
    for result in results {
        let status = match result.status {
            AnalysisStatus::Success => "ok".to_owned(),
            AnalysisStatus::Failed => format!(
                "failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ),
        };
        let cached = if result.cached == Some(true) { "yes" } else { "no" };
        let _ = writeln!(
            out,
            "{:<34}{:<7}{:<6}{:<6}{:<8}{}",
            result.domain,
            result.metrics.spam_score,
            result.metrics.da,
            result.metrics.pa,
            cached,
            status
        );
    }
    out
}
