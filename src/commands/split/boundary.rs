use anyhow::{Context, Result};

use crate::model::{Boundary, BoundaryPlan, SessionCandidate};
use crate::pdf::SourceDocument;

/// The next marker-bearing page after the current one, plus the top of its
/// first marker fragment. Pages without the marker are skipped entirely: a
/// session's content may continue onto marker-free pages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lookahead {
    pub page: usize,
    pub marker_top: f32,
}

pub(crate) fn find_lookahead(
    source: &SourceDocument,
    from_page: usize,
    marker: &str,
) -> Result<Option<Lookahead>> {
    for page in from_page..source.page_count() {
        let text = source
            .page_text(page)
            .with_context(|| format!("failed to extract text from lookahead page {}", page + 1))?;
        if !text.contains(marker) {
            continue;
        }

        let fragments = source.page_fragments(page).with_context(|| {
            format!("failed to extract fragments from lookahead page {}", page + 1)
        })?;

        // Marker present in text but not localizable to a fragment: fall
        // back to the page bottom, cropping nothing off the lookahead page.
        let marker_top = fragments
            .iter()
            .find(|fragment| fragment.text.contains(marker))
            .map(|fragment| fragment.rect.top)
            .unwrap_or(0.0);

        return Ok(Some(Lookahead { page, marker_top }));
    }

    Ok(None)
}

/// Compute each session's crop region for one page, plus the cursor where
/// the outer page loop resumes. Sessions followed by another session on
/// the same page crop between the two marker lines; the last session runs
/// to the lookahead page's first marker line, or to the bottom of the
/// final document page when no marker page follows.
pub(crate) fn compute_boundaries(
    page: usize,
    candidates: &[SessionCandidate],
    lookahead: Option<Lookahead>,
    page_count: usize,
    gap: f32,
) -> BoundaryPlan {
    let mut boundaries = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        let top_crop_y = candidate.rect.top + gap;

        let boundary = match candidates.get(index + 1) {
            Some(next) => Boundary {
                start_page: page,
                end_page: page,
                top_crop_y,
                bottom_crop_y: next.rect.top + gap,
            },
            None => match lookahead {
                Some(next) => Boundary {
                    start_page: page,
                    end_page: next.page,
                    top_crop_y,
                    bottom_crop_y: next.marker_top + gap,
                },
                None => Boundary {
                    start_page: page,
                    end_page: page_count - 1,
                    top_crop_y,
                    bottom_crop_y: 0.0,
                },
            },
        };

        boundaries.push(boundary);
    }

    let resume_page = lookahead.map_or(page_count, |next| next.page);

    BoundaryPlan {
        boundaries,
        resume_page,
    }
}
