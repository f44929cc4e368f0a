use anyhow::{Context, Result};
use quarry::{BulkIndexRequest, BulkProcessorStats, Client};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Where documents are read from
pub enum DocumentSource {
    FromFile(PathBuf),
    FromStdin,
}

impl DocumentSource {
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            DocumentSource::FromStdin
        } else {
            DocumentSource::FromFile(PathBuf::from(arg))
        }
    }

    pub fn reader(&self) -> io::Result<Box<dyn BufRead + Send>> {
        match self {
            DocumentSource::FromFile(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
            DocumentSource::FromStdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }
}

/// Stream one JSON document per line into `index`
pub async fn run_bulk(
    client: &Client,
    index: &str,
    typ: &str,
    file: &str,
    batch: usize,
    workers: usize,
) -> Result<()> {
    let source = DocumentSource::parse(file);
    let reader = source
        .reader()
        .with_context(|| format!("opening {}", file))?;

    let failed_commits = Arc::new(AtomicU64::new(0));
    let failed = failed_commits.clone();
    let processor = client
        .bulk_processor()
        .name("quarry-cli")
        .workers(workers)
        .bulk_actions(batch)
        .stats(true)
        .after(move |id, requests, outcome| match outcome {
            Ok(res) if res.errors => {
                tracing::warn!("bulk #{}: {} of {} items failed", id, res.failed().len(), requests.len());
            }
            Ok(_) => tracing::debug!("bulk #{}: {} items committed", id, requests.len()),
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!("bulk #{} failed: {}", id, e);
            }
        })
        .start()?;

    let start = Instant::now();
    let mut lines = 0u64;
    let mut skipped = 0u64;
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: serde_json::Value = match serde_json::from_str(&line) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("line {}: skipping invalid JSON: {}", n + 1, e);
                skipped += 1;
                continue;
            }
        };
        processor
            .add(BulkIndexRequest::new(doc).index(index).typ(typ))
            .await?;
        lines += 1;
        if lines % 10_000 == 0 {
            eprint!("\r  Queued {} docs", lines);
        }
    }

    processor.close().await?;
    let stats = processor.stats();
    print_stats(lines, skipped, &stats, start);

    let failed_commits = failed_commits.load(Ordering::Relaxed);
    if failed_commits > 0 || stats.failed > 0 {
        anyhow::bail!(
            "{} failed commit(s), {} failed document(s)",
            failed_commits,
            stats.failed
        );
    }
    Ok(())
}

fn print_stats(lines: u64, skipped: u64, stats: &BulkProcessorStats, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    eprintln!();
    println!("Bulk load completed:");
    println!("  Documents:  {} ({} skipped)", lines, skipped);
    println!("  Commits:    {} ({} flushed)", stats.committed, stats.flushed);
    println!("  Indexed:    {}", stats.indexed);
    println!("  Created:    {}", stats.created);
    println!("  Succeeded:  {}", stats.succeeded);
    println!("  Failed:     {}", stats.failed);
    println!("  Time:       {:.2}s", elapsed);
    if elapsed > 0.0 {
        println!("  Throughput: {:.1} docs/s", lines as f64 / elapsed);
    }
}
