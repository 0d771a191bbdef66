//! Terminal output formatting.

use std::fmt::Write as FmtWrite;

use console::style;

use crate::models::SearchCandidate;
use crate::services::IndexReport;

/// Render ranked search results for the terminal.
///
/// Each hit gets a header line with its rank, source document, and
/// rerank score, followed by the passage text.
pub fn format_search_results(results: &[SearchCandidate]) -> String {
    let mut output = String::new();
    for (i, result) in results.iter().enumerate() {
        let score = result.rerank_score.unwrap_or(0.0);
        let header = format!(
            "--- [{}] {} (score: {:.4}) ---",
            i + 1,
            result.source_file,
            score
        );
        writeln!(output, "{}", style(header).cyan()).unwrap();
        writeln!(output, "{}", result.text).unwrap();
        writeln!(output).unwrap();
    }
    output
}

pub fn format_index_report(report: &IndexReport) -> String {
    format!(
        "Indexed {} passages from {} documents\n",
        report.passages, report.documents
    )
}
