use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InspectArgs;
use crate::commands::split::{locate_sessions, segment_page_text};
use crate::model::{InspectManifest, InspectPageReport};
use crate::pdf::SourceDocument;
use crate::util::{now_utc_string, write_json_pretty};

/// Read-only dry run: report what the splitter would detect on every page,
/// without recovery and without writing any output documents.
pub fn run(args: InspectArgs) -> Result<()> {
    let source = SourceDocument::load(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let page_count = source.page_count();

    info!(
        input = %args.input.display(),
        pages = page_count,
        marker = %args.marker,
        "inspecting document"
    );

    let mut pages = Vec::with_capacity(page_count);
    for page in 0..page_count {
        let text = source
            .page_text(page)
            .with_context(|| format!("failed to extract text from page {}", page + 1))?;
        let segments = segment_page_text(&text, &args.marker);

        let fragments = source
            .page_fragments(page)
            .with_context(|| format!("failed to extract fragments from page {}", page + 1))?;
        let candidates = locate_sessions(&fragments, &segments, &args.marker)?;

        let resolved_count = candidates
            .iter()
            .filter(|candidate| candidate.id.is_resolved())
            .count();

        info!(
            page = page + 1,
            segments = segments.len(),
            candidates = candidates.len(),
            resolved = resolved_count,
            "page inspected"
        );

        pages.push(InspectPageReport {
            page: page + 1,
            segment_count: segments.len(),
            candidate_count: candidates.len(),
            resolved_count,
            unresolved_count: candidates.len() - resolved_count,
            ids: candidates
                .iter()
                .map(|candidate| candidate.id.label())
                .collect(),
        });
    }

    if let Some(path) = &args.json {
        let manifest = InspectManifest {
            manifest_version: 1,
            generated_at: now_utc_string(),
            input_path: args.input.display().to_string(),
            marker: args.marker.clone(),
            page_count,
            pages,
        };
        write_json_pretty(path, &manifest)?;
        info!(path = %path.display(), "wrote inspect report");
    }

    Ok(())
}
