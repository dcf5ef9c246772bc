use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::SplitArgs;
use crate::model::{ErrorLedger, RecoveryState, SplitRunManifest};
use crate::pdf::SourceDocument;
use crate::util::{
    format_elapsed, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

use super::boundary::{compute_boundaries, find_lookahead};
use super::emit::SessionEmitter;
use super::locate::locate_sessions;
use super::recover::recover_page;
use super::segment::segment_page_text;

pub fn run(args: SplitArgs) -> Result<()> {
    validate_args(&args)?;

    let started = Instant::now();
    let started_ts = Utc::now();

    let source = SourceDocument::load(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let page_count = source.page_count();

    info!(
        input = %args.input.display(),
        pages = page_count,
        recover = args.recover,
        marker = %args.marker,
        "starting split"
    );

    let mut state = RecoveryState::default();
    let mut ledger = ErrorLedger::default();
    let mut emitter = SessionEmitter::new(&args.output_dir);
    let mut sessions = Vec::new();
    let mut undetected = 0_usize;

    let mut page = 0_usize;
    while page < page_count {
        info!(page = page + 1, total = page_count, "processing page");

        let text = source
            .page_text(page)
            .with_context(|| format!("failed to extract text from page {}", page + 1))?;
        let segments = segment_page_text(&text, &args.marker);

        let fragments = source
            .page_fragments(page)
            .with_context(|| format!("failed to extract fragments from page {}", page + 1))?;
        let mut candidates = locate_sessions(&fragments, &segments, &args.marker)?;

        if candidates.is_empty() {
            bail!(
                "no marker fragment could be located on page {}: rendering resolution too low",
                page + 1
            );
        }

        if args.recover {
            state = recover_page(page, &mut candidates, state, &mut ledger);
        }

        undetected += candidates
            .iter()
            .filter(|candidate| !candidate.id.is_resolved())
            .count();

        let lookahead = find_lookahead(&source, page + 1, &args.marker)?;
        let plan = compute_boundaries(page, &candidates, lookahead, page_count, args.gap);

        for (candidate, boundary) in candidates.iter().zip(plan.boundaries.iter()) {
            let entry = emitter.emit(source.bytes(), candidate, boundary)?;
            sessions.push(entry);
        }

        // The plan's cursor always moves past pages consumed by the last
        // session's span.
        page = plan.resume_page;
    }

    let extracted = emitter.count();
    let undetected_rate = if extracted == 0 {
        0.0
    } else {
        undetected as f64 / extracted as f64 * 100.0
    };

    info!(sessions = extracted, "sessions extracted");
    if args.recover {
        info!(
            undetected_rate = %format!("{undetected_rate:.2}%"),
            recovered_ids = ledger.len(),
            "session id recovery was attempted; undetected session ids after reconstruction"
        );
    } else {
        info!(
            undetected_rate = %format!("{undetected_rate:.2}%"),
            "no session id recovery was attempted; undetected session ids"
        );
    }

    let elapsed = started.elapsed();
    info!(elapsed = %format_elapsed(elapsed), "split complete");

    let manifest = SplitRunManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        input_path: args.input.display().to_string(),
        input_sha256: sha256_file(&args.input)?,
        marker: args.marker.clone(),
        recovery_enabled: args.recover,
        page_count,
        sessions_extracted: extracted,
        undetected_count: undetected,
        undetected_rate_percent: undetected_rate,
        recovered_ids: ledger.ids().to_vec(),
        sessions,
        elapsed_ms: elapsed.as_millis(),
    };

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.output_dir
            .join(format!("split_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    Ok(())
}

fn validate_args(args: &SplitArgs) -> Result<()> {
    if !args.input.is_file() {
        bail!("invalid input file: {}", args.input.display());
    }

    let is_pdf = args
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        bail!(
            "invalid input file (expected a .pdf extension): {}",
            args.input.display()
        );
    }

    if !args.output_dir.is_dir() {
        bail!("invalid output directory: {}", args.output_dir.display());
    }

    if args.marker.trim().is_empty() {
        bail!("marker token must not be empty");
    }

    Ok(())
}
