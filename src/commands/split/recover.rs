use tracing::warn;

use crate::model::{ErrorLedger, RecoveryState, SessionCandidate, SessionId};

/// One recovery pass over a page's session list: find a trustworthy anchor,
/// then derive every other identifier by unit offset so the page reads as a
/// contiguous ascending run consistent with the previous page's carry-over.
/// Returns the carry-over state for the next page.
pub(crate) fn recover_page(
    page: usize,
    candidates: &mut [SessionCandidate],
    state: RecoveryState,
    ledger: &mut ErrorLedger,
) -> RecoveryState {
    if candidates.is_empty() {
        return state;
    }

    match find_anchor(candidates, state) {
        Some(anchor) => {
            fill_from_anchor(candidates, anchor, state, ledger);
            RecoveryState {
                last_confirmed_id: candidates.last().and_then(|entry| entry.id.value()),
            }
        }
        None => continue_without_anchor(page, candidates, state, ledger),
    }
}

/// Anchor search. An anchor is confirmed as soon as either
/// (a) two resolved entries are unit-step consistent with each other
///     (the later index wins), or
/// (b) a resolved entry's distance from the carry-over equals its 1-based
///     offset into the list.
/// When the scan exhausts the list unconfirmed, the tentative anchor (the
/// latest resolved entry) is kept only if nothing could have contradicted
/// it: it is the lone resolved entry, or it is the final element.
fn find_anchor(candidates: &[SessionCandidate], state: RecoveryState) -> Option<usize> {
    let mut tentative: Option<(usize, i64)> = None;
    let mut resolved_count = 0_usize;

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(value) = candidate.id.value() else {
            continue;
        };
        resolved_count += 1;

        if let Some((found, prior)) = tentative {
            if prior - value == found as i64 - index as i64 {
                return Some(index);
            }
        }

        tentative = Some((index, value));

        if let Some(last) = state.last_confirmed_id {
            if (last - value).abs() == index as i64 + 1 {
                return Some(index);
            }
        }
    }

    match tentative {
        Some((found, _)) if resolved_count == 1 || found == candidates.len() - 1 => Some(found),
        _ => None,
    }
}

/// Rewrite the whole list from one implied base: the carry-over plus one
/// when the previous page is known, otherwise the anchor value shifted to
/// index zero. Resolved entries that disagree are OCR misreads; they are
/// overwritten silently and tallied.
fn fill_from_anchor(
    candidates: &mut [SessionCandidate],
    anchor: usize,
    state: RecoveryState,
    ledger: &mut ErrorLedger,
) {
    let Some(anchor_value) = candidates[anchor].id.value() else {
        return;
    };

    let base = match state.last_confirmed_id {
        Some(last) => last + 1,
        None => anchor_value - anchor as i64,
    };

    for (index, candidate) in candidates.iter_mut().enumerate() {
        let implied = base + index as i64;
        match candidate.id {
            SessionId::Resolved(value) if value == implied => {}
            _ => {
                candidate.id = SessionId::Resolved(implied);
                ledger.record(implied);
            }
        }
    }
}

/// No anchor on this page. With a known carry-over the unresolved entries
/// continue the sequence by unit increments; without one the page is
/// reported unrecoverable and the carry-over stays unknown.
fn continue_without_anchor(
    page: usize,
    candidates: &mut [SessionCandidate],
    state: RecoveryState,
    ledger: &mut ErrorLedger,
) -> RecoveryState {
    let Some(last) = state.last_confirmed_id else {
        warn!(
            page = page + 1,
            "could not recover session ids: no anchor and no prior confirmed id"
        );
        return state;
    };

    for (index, candidate) in candidates.iter_mut().enumerate() {
        if candidate.id == SessionId::Unresolved {
            let implied = last + 1 + index as i64;
            candidate.id = SessionId::Resolved(implied);
            ledger.record(implied);
        }
    }

    RecoveryState {
        last_confirmed_id: candidates.last().and_then(|entry| entry.id.value()),
    }
}
