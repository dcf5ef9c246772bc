use serde::Serialize;

/// Axis-aligned rectangle in PDF page coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Rect {
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }
}

/// One positioned chunk of text as rendered on a page, in visual order.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub text: String,
    pub rect: Rect,
}

/// A session identifier as read from the page, or the not-recovered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionId {
    Resolved(i64),
    Unresolved,
}

impl SessionId {
    pub fn value(self) -> Option<i64> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Rendering used for filenames, metadata and reports.
    pub fn label(self) -> String {
        match self {
            Self::Resolved(value) => value.to_string(),
            Self::Unresolved => "NA".to_string(),
        }
    }
}

/// One detected marker occurrence on a page: candidate id plus the marker
/// fragment's bounding rectangle.
#[derive(Debug, Clone)]
pub struct SessionCandidate {
    pub id: SessionId,
    pub rect: Rect,
}

/// Carry-over between pages: the last confirmed identifier, threaded
/// functionally through the page loop (state in, state out).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryState {
    pub last_confirmed_id: Option<i64>,
}

/// Append-only record of identifier values produced by recovery, kept for
/// reporting only; never consulted for correctness decisions.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    recovered: Vec<i64>,
}

impl ErrorLedger {
    pub fn record(&mut self, id: i64) {
        self.recovered.push(id);
    }

    pub fn len(&self) -> usize {
        self.recovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recovered.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.recovered
    }
}

/// Crop region of one session: page span plus the vertical crop edges on
/// the first and last page of the span. Interior pages keep full height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub start_page: usize,
    pub end_page: usize,
    /// Upper crop edge on the first page of the span.
    pub top_crop_y: f32,
    /// Lower crop edge on the last page of the span.
    pub bottom_crop_y: f32,
}

impl Boundary {
    pub fn page_span(&self) -> usize {
        self.end_page - self.start_page + 1
    }
}

/// Boundaries for one page's sessions plus the immutable resume cursor for
/// the outer page loop.
#[derive(Debug, Clone)]
pub struct BoundaryPlan {
    pub boundaries: Vec<Boundary>,
    pub resume_page: usize,
}

/// Manifest rows use 1-based page numbers, matching the log output.
#[derive(Debug, Serialize)]
pub struct SessionManifestEntry {
    pub label: String,
    pub resolved: bool,
    pub start_page: usize,
    pub end_page: usize,
    pub output_file: String,
}

#[derive(Debug, Serialize)]
pub struct SplitRunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub marker: String,
    pub recovery_enabled: bool,
    pub page_count: usize,
    pub sessions_extracted: usize,
    pub undetected_count: usize,
    pub undetected_rate_percent: f64,
    pub recovered_ids: Vec<i64>,
    pub sessions: Vec<SessionManifestEntry>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct InspectPageReport {
    pub page: usize,
    pub segment_count: usize,
    pub candidate_count: usize,
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub marker: String,
    pub page_count: usize,
    pub pages: Vec<InspectPageReport>,
}
