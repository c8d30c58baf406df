//! Minimal page composition on top of `lopdf`: text with the built-in
//! Helvetica fonts, lines, filled rectangles and JPEG images.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::PdfError;
use crate::text::{encode_win_ansi, text_width};

pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const GREY: Rgb = Rgb(0.45, 0.45, 0.45);
    pub const LIGHT: Rgb = Rgb(0.93, 0.95, 0.97);
    pub const ACCENT: Rgb = Rgb(0.96, 0.62, 0.04);
    pub const HIGHLIGHT: Rgb = Rgb(0.85, 0.95, 0.85);
}

/// Handle of an image XObject registered with a [`PdfWriter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageHandle {
    name: String,
    id: ObjectId,
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

/// Drawing operations of one page, in PDF user space (origin bottom left).
#[derive(Default)]
pub struct PageCanvas {
    operations: Vec<Operation>,
    images: Vec<ImageHandle>,
}

impl PageCanvas {
    pub fn text(&mut self, x: f32, y: f32, size: f32, font: Font, text: &str) {
        self.text_colored(x, y, size, font, Rgb::BLACK, text);
    }

    pub fn text_colored(&mut self, x: f32, y: f32, size: f32, font: Font, color: Rgb, text: &str) {
        if text.is_empty() {
            return;
        }
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![real(color.0), real(color.1), real(color.2)]),
            Operation::new("Tf", vec![font.resource_name().into(), real(size)]),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draws `text` so that it ends at `right_x`.
    pub fn text_right(&mut self, right_x: f32, y: f32, size: f32, font: Font, text: &str) {
        let x = right_x - text_width(text, size);
        self.text(x, y, size, font, text);
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", vec![real(color.0), real(color.1), real(color.2)]),
            Operation::new("w", vec![real(width)]),
            Operation::new("m", vec![real(from.0), real(from.1)]),
            Operation::new("l", vec![real(to.0), real(to.1)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![real(color.0), real(color.1), real(color.2)]),
            Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    pub fn image(&mut self, image: &ImageHandle, x: f32, y: f32, width: f32, height: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
            ),
            Operation::new("Do", vec![image.name.as_str().into()]),
            Operation::new("Q", vec![]),
        ]);
        if !self.images.contains(image) {
            self.images.push(image.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Accumulates A4 pages into a single in-memory document.
pub struct PdfWriter {
    document: Document,
    pages_id: ObjectId,
    font_regular: ObjectId,
    font_bold: ObjectId,
    page_ids: Vec<ObjectId>,
    image_count: usize,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_regular = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_bold = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        Self { document, pages_id, font_regular, font_bold, page_ids: Vec::new(), image_count: 0 }
    }

    /// Registers baseline JPEG data as an RGB image XObject.
    pub fn add_jpeg(&mut self, jpeg: Vec<u8>, width_px: u32, height_px: u32) -> ImageHandle {
        self.image_count += 1;
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width_px),
                "Height" => i64::from(height_px),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let id = self.document.add_object(stream);
        ImageHandle { name: format!("Im{}", self.image_count), id }
    }

    pub fn add_page(&mut self, canvas: PageCanvas) -> Result<(), PdfError> {
        let content = Content { operations: canvas.operations };
        let content_id = self.document.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut xobjects = lopdf::Dictionary::new();
        for image in &canvas.images {
            xobjects.set(image.name.as_bytes().to_vec(), image.id);
        }
        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => self.font_regular,
                "F2" => self.font_bold,
            },
            "XObject" => xobjects,
        };

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(A4_WIDTH), real(A4_HEIGHT)],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        if self.page_ids.is_empty() {
            return Err(PdfError::EmptyDocument);
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
