//! Page-level concatenation of PDF documents into a single page tree.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::PdfError;

const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Collects pages from any number of documents and writes them out once.
pub struct PdfMerger {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self { document, pages_id, page_ids: Vec::new() }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Appends every page of the serialized PDF and returns how many were added.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<usize, PdfError> {
        let document = Document::load_mem(bytes)?;
        self.append_document(document)
    }

    pub fn append_document(&mut self, mut source: Document) -> Result<usize, PdfError> {
        source.renumber_objects_with(self.document.max_id + 1);
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();

        let mut rewritten = Vec::with_capacity(source_pages.len());
        for page_id in &source_pages {
            let mut page = source.get_object(*page_id)?.as_dict()?.clone();
            for key in INHERITABLE_KEYS {
                if !page.has(key) {
                    if let Some(value) = inherited_attribute(&source, &page, key) {
                        page.set(key.to_vec(), value);
                    }
                }
            }
            page.set("Parent", self.pages_id);
            rewritten.push((*page_id, page));
        }

        let source_max_id = source.max_id;
        for (id, object) in source.objects {
            let skip = matches!(
                object.type_name(),
                Ok(name) if name == "Catalog" || name == "Pages"
            );
            if !skip {
                self.document.objects.insert(id, object);
            }
        }
        for (id, page) in rewritten {
            self.document.objects.insert(id, Object::Dictionary(page));
        }

        self.document.max_id = self.document.max_id.max(source_max_id);
        self.page_ids.extend(&source_pages);
        debug!(
            event_name = "pdf.merge.appended",
            pages = source_pages.len(),
            total_pages = self.page_ids.len(),
            "appended document pages"
        );
        Ok(source_pages.len())
    }

    /// Serializes the merged document. No pages means empty bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        if self.page_ids.is_empty() {
            return Ok(Vec::new());
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.compress();

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Walks the `Parent` chain for an attribute the page does not carry itself.
fn inherited_attribute(document: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        if depth > 32 {
            return None;
        }
        let node = document.get_object(parent_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Concatenates serialized PDFs. Empty input yields empty bytes.
pub fn merge_pdfs<B: AsRef<[u8]>>(sources: &[B]) -> Result<Vec<u8>, PdfError> {
    let mut merger = PdfMerger::new();
    for source in sources {
        merger.append_bytes(source.as_ref())?;
    }
    merger.finish()
}
