use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::chunker::Chunk;
use crate::completion::{CompletionClient, CompletionRequest, ModelParams};
use crate::error::CapabilityError;

/// Extraction output for one chunk. Failures carry their diagnostic in `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub ordinal: usize,
    pub text: String,
    pub failed: bool,
}

impl ChunkResult {
    pub fn success(ordinal: usize, text: String) -> Self {
        Self {
            ordinal,
            text,
            failed: false,
        }
    }

    pub fn failure(ordinal: usize, diagnostic: impl Display) -> Self {
        Self {
            ordinal,
            text: format!("Chunk {} analysis failed: {}", ordinal, diagnostic),
            failed: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzeOptions {
    /// Max completion requests in flight.
    pub concurrency: usize,
    /// No request is issued after this instant; in-flight ones are abandoned at it.
    pub deadline: Option<tokio::time::Instant>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            deadline: None,
        }
    }
}

pub fn extraction_prompt(chunk: &Chunk, total: usize) -> String {
    format!(
        "Extract key information from this regulatory document chunk {}/{}:

{}

Extract:
1. Key provisions and financial amounts
2. Affected sectors and companies
3. Implementation timelines
4. Economic impacts

Be concise and factual.",
        chunk.ordinal,
        total,
        chunk.content()
    )
}

/// Analyze one chunk. Never fails: errors become a failed `ChunkResult`.
pub async fn analyze_chunk(
    client: &dyn CompletionClient,
    params: &ModelParams,
    chunk: &Chunk,
    total: usize,
) -> ChunkResult {
    let start = Instant::now();
    if let Some((first, last)) = chunk.span() {
        debug!(chunk = chunk.ordinal, first, last, "Analyzing units {}..={}", first, last);
    }
    let request = CompletionRequest::prompt(params, extraction_prompt(chunk, total));

    match client.complete(&request).await {
        Ok(text) => {
            info!(
                chunk = chunk.ordinal,
                total,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Chunk {}/{} analyzed",
                chunk.ordinal,
                total
            );
            ChunkResult::success(chunk.ordinal, text)
        }
        Err(e) => {
            warn!(chunk = chunk.ordinal, total, error = %e, "Chunk analysis failed");
            ChunkResult::failure(chunk.ordinal, e)
        }
    }
}

/// Analyze every chunk through a bounded worker pool.
///
/// Returns exactly one result per chunk, ordered by ordinal, whatever order
/// the workers finish in.
pub async fn analyze_chunks(
    client: Arc<dyn CompletionClient>,
    params: &ModelParams,
    chunks: Vec<Chunk>,
    options: AnalyzeOptions,
) -> Vec<ChunkResult> {
    let total = chunks.len();
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let pb = progress_bar(total);

    // Unbounded: the issuing loop below must never wait on the receiver.
    let (tx, mut rx) = mpsc::unbounded_channel::<ChunkResult>();

    for chunk in chunks {
        if deadline_passed(options.deadline) {
            let _ = tx.send(ChunkResult::failure(chunk.ordinal, CapabilityError::DeadlineExceeded));
            continue;
        }

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                let _ = tx.send(ChunkResult::failure(chunk.ordinal, "worker pool closed"));
                continue;
            }
        };
        // the wait for a free slot may have eaten the budget
        if deadline_passed(options.deadline) {
            let _ = tx.send(ChunkResult::failure(chunk.ordinal, CapabilityError::DeadlineExceeded));
            continue;
        }

        let client = Arc::clone(&client);
        let params = params.clone();
        let tx = tx.clone();
        let deadline = options.deadline;

        tokio::spawn(async move {
            let _permit = permit;
            let work = analyze_chunk(client.as_ref(), &params, &chunk, total);
            let result = match deadline {
                Some(d) => tokio::time::timeout_at(d, work)
                    .await
                    .unwrap_or_else(|_| ChunkResult::failure(chunk.ordinal, CapabilityError::DeadlineExceeded)),
                None => work.await,
            };
            let _ = tx.send(result);
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while let Some(result) = rx.recv().await {
        pb.inc(1);
        results.push(result);
    }
    pb.finish_and_clear();

    let assembled = assemble(results, total);
    let failed = assembled.iter().filter(|r| r.failed).count();
    info!(total, failed, "Chunk analysis complete");
    assembled
}

/// Order results by ordinal. A slot nobody reported for (worker died) is
/// filled with a failure so every chunk stays accounted for.
pub fn assemble(results: Vec<ChunkResult>, total: usize) -> Vec<ChunkResult> {
    let mut slots: Vec<Option<ChunkResult>> = vec![None; total];
    for result in results {
        match result.ordinal.checked_sub(1).and_then(|i| slots.get_mut(i)) {
            Some(slot) if slot.is_none() => *slot = Some(result),
            _ => warn!(ordinal = result.ordinal, "Discarding unexpected chunk result"),
        }
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.unwrap_or_else(|| ChunkResult::failure(i + 1, "no result received")))
        .collect()
}

fn deadline_passed(deadline: Option<tokio::time::Instant>) -> bool {
    deadline.is_some_and(|d| tokio::time::Instant::now() >= d)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} chunks (eta {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

// ── Tests ──
