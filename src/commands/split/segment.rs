/// Split one page's plain text into per-marker segments: each segment runs
/// from a valid marker occurrence up to (but not including) the next valid
/// one. Occurrences whose following token contains "#" are column-header
/// false positives ("Session #") and are never used as segment starts or
/// ends.
pub(crate) fn segment_page_text(text: &str, marker: &str) -> Vec<String> {
    let mut segments = Vec::new();
    if marker.is_empty() {
        return segments;
    }

    let Some(mut start) = next_valid_occurrence(text, 0, marker) else {
        return segments;
    };

    loop {
        match next_valid_occurrence(text, start + marker.len(), marker) {
            Some(end) => {
                segments.push(text[start..end].to_string());
                start = end;
            }
            None => {
                // A trailing lone occurrence still yields one segment.
                segments.push(text[start..].to_string());
                break;
            }
        }
    }

    segments
}

fn next_valid_occurrence(text: &str, from: usize, marker: &str) -> Option<usize> {
    let mut from = from;
    while let Some(offset) = text.get(from..)?.find(marker) {
        let index = from + offset;
        if !placeholder_follows(text, index) {
            return Some(index);
        }
        from = index + marker.len();
    }

    None
}

/// True when the occurrence at `index` reads like a placeholder header:
/// the occurrence's own token or the token right after it contains "#".
fn placeholder_follows(text: &str, index: usize) -> bool {
    let mut tokens = text[index..].split_whitespace();
    let first = tokens.next().unwrap_or("");
    if first.contains('#') {
        return true;
    }

    matches!(tokens.next(), Some(second) if second.contains('#'))
}
