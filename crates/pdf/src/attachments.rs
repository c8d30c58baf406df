//! Resolution of datasheet and company document ids to files, and loading
//! those files as PDF pages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lopdf::Document;
use solquote_core::{CompanyDocument, CompanyDocumentId, Product, ProductId};

use crate::canvas::{Font, PageCanvas, PdfWriter, Rgb, A4_HEIGHT, A4_WIDTH};
use crate::error::PdfError;
use crate::images::prepare_for_slot;
use crate::layout::{CONTENT_WIDTH, MARGIN};

/// Maps catalog ids to files on disk.
pub trait AttachmentResolver {
    fn datasheet(&self, product_id: ProductId) -> Option<PathBuf>;

    fn company_document(&self, document_id: CompanyDocumentId) -> Option<PathBuf>;

    /// Label shown in logs and on image pages.
    fn label_for_document(&self, document_id: CompanyDocumentId) -> Option<String> {
        self.company_document(document_id)
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
    }
}

/// Resolver backed by catalog rows and the configured base directories.
#[derive(Clone, Debug, Default)]
pub struct DirectoryAttachmentResolver {
    datasheet_dir: PathBuf,
    company_docs_base_dir: PathBuf,
    datasheets: HashMap<ProductId, String>,
    documents: HashMap<CompanyDocumentId, (String, String)>,
}

impl DirectoryAttachmentResolver {
    pub fn new<'a>(
        datasheet_dir: impl Into<PathBuf>,
        company_docs_base_dir: impl Into<PathBuf>,
        products: impl IntoIterator<Item = &'a Product>,
        documents: impl IntoIterator<Item = &'a CompanyDocument>,
    ) -> Self {
        Self {
            datasheet_dir: datasheet_dir.into(),
            company_docs_base_dir: company_docs_base_dir.into(),
            datasheets: products
                .into_iter()
                .filter_map(|product| {
                    product.datasheet_path.as_ref().map(|path| (product.id, path.clone()))
                })
                .collect(),
            documents: documents
                .into_iter()
                .map(|document| {
                    (document.id, (document.relative_path.clone(), document.display_name.clone()))
                })
                .collect(),
        }
    }
}

impl AttachmentResolver for DirectoryAttachmentResolver {
    fn datasheet(&self, product_id: ProductId) -> Option<PathBuf> {
        self.datasheets.get(&product_id).map(|relative| self.datasheet_dir.join(relative))
    }

    fn company_document(&self, document_id: CompanyDocumentId) -> Option<PathBuf> {
        self.documents
            .get(&document_id)
            .map(|(relative, _)| self.company_docs_base_dir.join(relative))
    }

    fn label_for_document(&self, document_id: CompanyDocumentId) -> Option<String> {
        self.documents.get(&document_id).map(|(_, display_name)| display_name.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Image,
}

impl AttachmentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Loads an attachment as a PDF document. Images become a single A4 page.
pub fn load_attachment(path: &Path, caption: &str) -> Result<Document, PdfError> {
    let kind = AttachmentKind::from_path(path)
        .ok_or_else(|| PdfError::UnsupportedAttachment(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    match kind {
        AttachmentKind::Pdf => Ok(Document::load_mem(&bytes)?),
        AttachmentKind::Image => Ok(Document::load_mem(&image_page(&bytes, caption)?)?),
    }
}

/// One A4 page showing the image centered below an optional caption.
pub fn image_page(bytes: &[u8], caption: &str) -> Result<Vec<u8>, PdfError> {
    let caption_height = if caption.is_empty() { 0.0 } else { 28.0 };
    let slot_width = CONTENT_WIDTH;
    let slot_height = A4_HEIGHT - 2.0 * MARGIN - caption_height;
    let prepared = prepare_for_slot(bytes, slot_width, slot_height)?;
    let (width, height) = prepared.fit(slot_width, slot_height);

    let mut writer = PdfWriter::new();
    let handle = writer.add_jpeg(prepared.jpeg, prepared.width_px, prepared.height_px);
    let mut canvas = PageCanvas::default();
    if !caption.is_empty() {
        canvas.text_colored(MARGIN, A4_HEIGHT - MARGIN - 14.0, 12.0, Font::Bold, Rgb::GREY, caption);
    }
    let x = (A4_WIDTH - width) / 2.0;
    let y = MARGIN + (slot_height - height) / 2.0;
    canvas.image(&handle, x, y, width, height);
    writer.add_page(canvas)?;
    writer.finish()
}
