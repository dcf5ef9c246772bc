use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{SessionCandidate, SessionId, TextFragment};

/// Pair marker-bearing fragments with candidate identifiers extracted from
/// the page's text segments. Marker fragments immediately followed by a
/// placeholder fragment are column headers, not sessions; they are skipped
/// without consuming a segment.
pub(crate) fn locate_sessions(
    fragments: &[TextFragment],
    segments: &[String],
    marker: &str,
) -> Result<Vec<SessionCandidate>> {
    let digits = Regex::new(r"^[0-9]+$").context("failed to compile identifier pattern")?;

    let mut candidates = Vec::new();
    let mut consumed = 0_usize;

    for (index, fragment) in fragments.iter().enumerate() {
        let Some(marker_at) = fragment.text.find(marker) else {
            continue;
        };

        if is_placeholder(fragment, fragments.get(index + 1), marker_at + marker.len()) {
            continue;
        }

        // Segments can run short of marker fragments when the rendering
        // drops text the plain view kept; such a candidate stays
        // unresolved instead of failing the page.
        let id = match segments.get(consumed) {
            Some(segment) => extract_id(segment, marker, &digits),
            None => SessionId::Unresolved,
        };
        consumed += 1;

        candidates.push(SessionCandidate {
            id,
            rect: fragment.rect,
        });
    }

    Ok(candidates)
}

/// Header test: "#" in the token(s) right after the marker, either inside
/// the same fragment or as the immediately following fragment.
fn is_placeholder(
    fragment: &TextFragment,
    next: Option<&TextFragment>,
    after_marker: usize,
) -> bool {
    let tail = fragment.text.get(after_marker..).unwrap_or("");
    if tail
        .split_whitespace()
        .take(2)
        .any(|token| token.contains('#'))
    {
        return true;
    }

    next.is_some_and(|fragment| fragment.text.contains('#'))
}

/// Tokenize the segment, find the token carrying the marker and test the
/// token after it for an all-digits identifier.
fn extract_id(segment: &str, marker: &str, digits: &Regex) -> SessionId {
    let tokens: Vec<&str> = segment.split_whitespace().collect();

    for (position, token) in tokens.iter().enumerate() {
        if !token.contains(marker) {
            continue;
        }

        if let Some(next) = tokens.get(position + 1) {
            let trimmed = next.trim();
            if digits.is_match(trimmed) {
                if let Ok(value) = trimmed.parse::<i64>() {
                    return SessionId::Resolved(value);
                }
            }
        }

        // Only the first marker token decides; the rest of the segment is
        // session content.
        break;
    }

    SessionId::Unresolved
}
