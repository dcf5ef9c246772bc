use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::model::{Boundary, SessionCandidate, SessionManifestEntry};
use crate::pdf;

/// Writes session output files, resolving filename collisions with a
/// running 4-digit suffix. Collisions arise when recovery yields duplicate
/// identifiers, or when every identifier on a page stays unresolved.
pub(crate) struct SessionEmitter {
    output_dir: PathBuf,
    emitted: usize,
    seen_labels: HashSet<String>,
}

impl SessionEmitter {
    pub(crate) fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            emitted: 0,
            seen_labels: HashSet::new(),
        }
    }

    pub(crate) fn emit(
        &mut self,
        source_bytes: &[u8],
        candidate: &SessionCandidate,
        boundary: &Boundary,
    ) -> Result<SessionManifestEntry> {
        let label = candidate.id.label();

        if candidate.id.is_resolved() && !self.seen_labels.insert(label.clone()) {
            warn!(
                id = %label,
                "duplicate session id resolved; output name will be disambiguated"
            );
        }

        let mut filename = format!("{label}.pdf");
        if self.output_dir.join(&filename).exists() {
            filename = format!("{}-{:04}.pdf", label, self.emitted + 1);
        }
        self.emitted += 1;

        let output_path = self.output_dir.join(&filename);
        pdf::write_session(source_bytes, boundary, &label, &output_path)
            .with_context(|| format!("failed to write session file: {}", output_path.display()))?;

        debug!(
            file = %output_path.display(),
            start_page = boundary.start_page + 1,
            end_page = boundary.end_page + 1,
            "wrote session"
        );

        Ok(SessionManifestEntry {
            label,
            resolved: candidate.id.is_resolved(),
            start_page: boundary.start_page + 1,
            end_page: boundary.end_page + 1,
            output_file: filename,
        })
    }

    pub(crate) fn count(&self) -> usize {
        self.emitted
    }
}
