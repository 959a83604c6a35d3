use std::time::Instant;

use tracing::{info, warn};

use crate::analyzer::ChunkResult;
use crate::completion::{CompletionClient, CompletionRequest, ModelParams};

pub const FUSION_FAILURE_PREFIX: &str = "Fusion analysis failed:";

/// The fixed top-level structure every consolidated report must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSection {
    BillSummary,
    ImpactedSectors,
    SectorStocks,
    MarketPredictions,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        ReportSection::BillSummary,
        ReportSection::ImpactedSectors,
        ReportSection::SectorStocks,
        ReportSection::MarketPredictions,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            ReportSection::BillSummary => "1. BILL SUMMARY",
            ReportSection::ImpactedSectors => "2. TOP 5 IMPACTED SECTORS",
            ReportSection::SectorStocks => "3. TOP 3 STOCKS PER SECTOR",
            ReportSection::MarketPredictions => "4. MARKET PREDICTIONS",
        }
    }

    /// Sections whose heading is absent, or appears before the previous one.
    pub fn missing_from(report: &str) -> Vec<ReportSection> {
        let upper = report.to_uppercase();
        let mut cursor = 0;
        let mut missing = Vec::new();
        for section in Self::ALL {
            // numbering and markdown decoration vary, match on the title
            let title = &section.heading()[3..];
            match upper[cursor..].find(title) {
                Some(pos) => cursor += pos + title.len(),
                None => missing.push(section),
            }
        }
        missing
    }
}

/// The single artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedReport {
    pub raw_text: String,
    pub source_document_name: String,
    /// The consolidation call failed and `raw_text` is the failure marker.
    pub fusion_failed: bool,
}

impl ConsolidatedReport {
    pub fn is_degraded(&self) -> bool {
        self.fusion_failed
    }
}

pub fn fusion_prompt(results: &[ChunkResult]) -> String {
    let mut ordered: Vec<&ChunkResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.ordinal);

    let combined = ordered
        .iter()
        .map(|r| format!("CHUNK {}:\n{}", r.ordinal, r.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on these chunk analyses of a regulatory bill, provide a consolidated report:

{}

Provide EXACTLY this structure:

{}:
[Key facts about the bill - what it does, main provisions, budget amounts]

{}:
Sector 1: [Name] - Impact Score: [1-10] - [Description]
Sector 2: [Name] - Impact Score: [1-10] - [Description]
Sector 3: [Name] - Impact Score: [1-10] - [Description]
Sector 4: [Name] - Impact Score: [1-10] - [Description]
Sector 5: [Name] - Impact Score: [1-10] - [Description]

{}:
Sector 1 Stocks:
- [TICKER]: [Company] - [Impact description]
- [TICKER]: [Company] - [Impact description]
- [TICKER]: [Company] - [Impact description]

Sector 2 Stocks:
- [TICKER]: [Company] - [Impact description]
- [TICKER]: [Company] - [Impact description]
- [TICKER]: [Company] - [Impact description]

[Continue for all 5 sectors]

{}:
Mid-term (6-18 months): [Predictions]
Long-term (2-5 years): [Predictions]

Be specific with company names and stock tickers.",
        combined,
        ReportSection::BillSummary.heading(),
        ReportSection::ImpactedSectors.heading(),
        ReportSection::SectorStocks.heading(),
        ReportSection::MarketPredictions.heading(),
    )
}

/// Merge chunk extractions into one report. Failed chunks are passed through
/// verbatim; a failed consolidation call yields a marker report, never an error.
pub async fn synthesize(
    client: &dyn CompletionClient,
    params: &ModelParams,
    results: &[ChunkResult],
    source_document_name: &str,
) -> ConsolidatedReport {
    let start = Instant::now();
    let request = CompletionRequest::prompt(params, fusion_prompt(results));

    let (raw_text, fusion_failed) = match client.complete(&request).await {
        Ok(text) => {
            let missing = ReportSection::missing_from(&text);
            if !missing.is_empty() {
                warn!(?missing, "Consolidated report does not follow the expected structure");
            }
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                chunks = results.len(),
                "Consolidation complete"
            );
            (text, false)
        }
        Err(e) => {
            warn!(error = %e, "Consolidation failed");
            (format!("{} {}", FUSION_FAILURE_PREFIX, e), true)
        }
    };

    ConsolidatedReport {
        raw_text,
        source_document_name: source_document_name.to_string(),
        fusion_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::scripted::ScriptedClient;
    use crate::error::CapabilityError;

    const SAMPLE_REPORT: &str = "1. BILL SUMMARY:
Authorizes $2.5B per year for battery and solar manufacturing grants.

2. TOP 5 IMPACTED SECTORS:
Sector 1: Batteries - Impact Score: 9 - Direct grant recipients.

3. TOP 3 STOCKS PER SECTOR:
Sector 1 Stocks:
- ALB: Albemarle - Lithium demand.

4. MARKET PREDICTIONS:
Mid-term (6-18 months): Capex announcements.
Long-term (2-5 years): Domestic capacity doubles.";

    fn params() -> ModelParams {
        ModelParams {
            model: "fuse-large".into(),
            max_tokens: 3000,
            temperature: 0.1,
        }
    }

    #[test]
    fn prompt_orders_chunks_by_ordinal() {
        let results = vec![
            ChunkResult::success(2, "second".into()),
            ChunkResult::failure(3, "timed out"),
            ChunkResult::success(1, "first".into()),
        ];
        let prompt = fusion_prompt(&results);
        let p1 = prompt.find("CHUNK 1:\nfirst").unwrap();
        let p2 = prompt.find("CHUNK 2:\nsecond").unwrap();
        let p3 = prompt.find("CHUNK 3:\nChunk 3 analysis failed: timed out").unwrap();
        assert!(p1 < p2 && p2 < p3);
        assert!(prompt.contains("first\n\nCHUNK 2:"));
    }

    #[test]
    fn prompt_lists_sections_in_order() {
        let prompt = fusion_prompt(&[ChunkResult::success(1, "x".into())]);
        assert!(ReportSection::missing_from(&prompt).is_empty());
        assert!(prompt.contains("Impact Score: [1-10]"));
        assert!(prompt.contains("Mid-term (6-18 months)"));
        assert!(prompt.contains("Long-term (2-5 years)"));
    }

    #[test]
    fn section_check() {
        assert!(ReportSection::missing_from(SAMPLE_REPORT).is_empty());
        assert_eq!(
            ReportSection::missing_from("**Bill summary**\n... Market predictions ..."),
            vec![ReportSection::ImpactedSectors, ReportSection::SectorStocks]
        );
        // out of order counts as missing
        let swapped = "MARKET PREDICTIONS\nBILL SUMMARY\nTOP 5 IMPACTED SECTORS\nTOP 3 STOCKS PER SECTOR";
        assert_eq!(
            ReportSection::missing_from(swapped),
            vec![ReportSection::MarketPredictions]
        );
    }

    #[tokio::test]
    async fn successful_synthesis() {
        let client = ScriptedClient::new(|_| Ok(SAMPLE_REPORT.to_string()));
        let results = vec![ChunkResult::success(1, "facts".into())];
        let report = synthesize(&client, &params(), &results, "hr1").await;

        assert!(!report.is_degraded());
        assert_eq!(report.raw_text, SAMPLE_REPORT);
        assert_eq!(report.source_document_name, "hr1");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "fuse-large");
        assert_eq!(calls[0].max_tokens, 3000);
    }

    #[tokio::test]
    async fn failure_yields_marker_report() {
        let client = ScriptedClient::new(|_| Err(CapabilityError::Malformed("response has no completion text".into())));
        let report = synthesize(&client, &params(), &[ChunkResult::success(1, "x".into())], "hr1").await;

        assert!(report.is_degraded());
        assert!(report.raw_text.starts_with(FUSION_FAILURE_PREFIX));
        assert_eq!(
            report.raw_text,
            "Fusion analysis failed: malformed response: response has no completion text"
        );
    }
}
