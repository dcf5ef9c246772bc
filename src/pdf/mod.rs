mod document;
mod text;
mod writer;


pub use document::SourceDocument;
pub use writer::write_session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("malformed page object: {0}")]
    Malformed(String),
}
