use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf structure error: {0}")]
    Structure(#[from] lopdf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("document has no pages")]
    EmptyDocument,
    #[error("unsupported attachment `{0}`")]
    UnsupportedAttachment(String),
    #[error("{0}")]
    Section(String),
}
