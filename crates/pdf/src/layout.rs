use crate::canvas::{Font, PageCanvas, PdfWriter, Rgb, A4_HEIGHT, A4_WIDTH};
use crate::error::PdfError;
use crate::text::wrap_text;

pub const MARGIN: f32 = 50.0;
pub const CONTENT_WIDTH: f32 = A4_WIDTH - 2.0 * MARGIN;
const TOP: f32 = A4_HEIGHT - MARGIN;
const BOTTOM: f32 = MARGIN + 20.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 14.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct Column {
    pub header: String,
    pub width: f32,
    pub align: Align,
}

impl Column {
    pub fn left(header: &str, width: f32) -> Self {
        Self { header: header.to_string(), width, align: Align::Left }
    }

    pub fn right(header: &str, width: f32) -> Self {
        Self { header: header.to_string(), width, align: Align::Right }
    }
}

/// Top-to-bottom text flow that starts a new page when the current one is
/// full. Every page carries `footer` at the bottom.
pub struct FlowDocument {
    writer: PdfWriter,
    canvas: PageCanvas,
    cursor: f32,
    footer: String,
}

impl FlowDocument {
    pub fn new(footer: impl Into<String>) -> Self {
        Self::with_writer(PdfWriter::new(), footer)
    }

    pub fn with_writer(writer: PdfWriter, footer: impl Into<String>) -> Self {
        Self { writer, canvas: PageCanvas::default(), cursor: TOP, footer: footer.into() }
    }

    pub fn writer_mut(&mut self) -> &mut PdfWriter {
        &mut self.writer
    }

    pub fn canvas_mut(&mut self) -> &mut PageCanvas {
        &mut self.canvas
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn new_page(&mut self) -> Result<(), PdfError> {
        let mut canvas = std::mem::take(&mut self.canvas);
        if !self.footer.is_empty() {
            canvas.line((MARGIN, MARGIN + 12.0), (A4_WIDTH - MARGIN, MARGIN + 12.0), 0.5, Rgb::GREY);
            canvas.text_colored(MARGIN, MARGIN, 7.5, Font::Regular, Rgb::GREY, &self.footer);
        }
        self.writer.add_page(canvas)?;
        self.cursor = TOP;
        Ok(())
    }

    /// Moves to a fresh page unless `height` points still fit.
    pub fn ensure_space(&mut self, height: f32) -> Result<(), PdfError> {
        if self.cursor - height < BOTTOM && self.cursor < TOP {
            self.new_page()?;
        }
        Ok(())
    }

    pub fn space(&mut self, height: f32) {
        self.cursor -= height;
    }

    pub fn title(&mut self, text: &str) -> Result<(), PdfError> {
        self.ensure_space(40.0)?;
        self.canvas.text(MARGIN, self.cursor - 18.0, 18.0, Font::Bold, text);
        self.canvas.fill_rect(MARGIN, self.cursor - 26.0, 60.0, 3.0, Rgb::ACCENT);
        self.cursor -= 40.0;
        Ok(())
    }

    pub fn heading(&mut self, text: &str) -> Result<(), PdfError> {
        self.ensure_space(30.0)?;
        self.canvas.text(MARGIN, self.cursor - 13.0, 12.5, Font::Bold, text);
        self.cursor -= 24.0;
        Ok(())
    }

    pub fn paragraph(&mut self, text: &str) -> Result<(), PdfError> {
        for source_line in text.lines() {
            if source_line.trim().is_empty() {
                self.cursor -= LINE_HEIGHT / 2.0;
                continue;
            }
            for line in wrap_text(source_line, CONTENT_WIDTH, BODY_SIZE) {
                self.ensure_space(LINE_HEIGHT)?;
                self.canvas.text(MARGIN, self.cursor - BODY_SIZE, BODY_SIZE, Font::Regular, &line);
                self.cursor -= LINE_HEIGHT;
            }
        }
        Ok(())
    }

    /// Label on the left, value right-aligned at the content edge.
    pub fn key_value(&mut self, label: &str, value: &str, bold: bool) -> Result<(), PdfError> {
        self.ensure_space(LINE_HEIGHT)?;
        let font = if bold { Font::Bold } else { Font::Regular };
        let baseline = self.cursor - BODY_SIZE;
        self.canvas.text(MARGIN, baseline, BODY_SIZE, font, label);
        self.canvas.text_right(MARGIN + CONTENT_WIDTH, baseline, BODY_SIZE, font, value);
        self.cursor -= LINE_HEIGHT;
        Ok(())
    }

    /// Renders a table; rows whose index is in `highlighted` get a tinted
    /// background. The header repeats after a page break.
    pub fn table(
        &mut self,
        columns: &[Column],
        rows: &[Vec<String>],
        highlighted: &[usize],
    ) -> Result<(), PdfError> {
        let row_height = LINE_HEIGHT + 2.0;
        self.ensure_space(row_height * 2.0)?;
        self.table_header(columns, row_height);

        for (index, row) in rows.iter().enumerate() {
            if self.cursor - row_height < BOTTOM {
                self.new_page()?;
                self.table_header(columns, row_height);
            }
            if highlighted.contains(&index) {
                self.canvas.fill_rect(
                    MARGIN,
                    self.cursor - row_height,
                    CONTENT_WIDTH,
                    row_height,
                    Rgb::HIGHLIGHT,
                );
            }
            let font = if highlighted.contains(&index) { Font::Bold } else { Font::Regular };
            self.table_cells(columns, row, font, row_height);
        }
        self.cursor -= 6.0;
        Ok(())
    }

    fn table_header(&mut self, columns: &[Column], row_height: f32) {
        self.canvas.fill_rect(MARGIN, self.cursor - row_height, CONTENT_WIDTH, row_height, Rgb::LIGHT);
        let headers: Vec<String> = columns.iter().map(|column| column.header.clone()).collect();
        self.table_cells(columns, &headers, Font::Bold, row_height);
    }

    fn table_cells(&mut self, columns: &[Column], cells: &[String], font: Font, row_height: f32) {
        let size = BODY_SIZE - 1.0;
        let baseline = self.cursor - row_height + 4.5;
        let mut x = MARGIN;
        for (column, cell) in columns.iter().zip(cells) {
            match column.align {
                Align::Left => self.canvas.text(x + 3.0, baseline, size, font, cell),
                Align::Right => self.canvas.text_right(x + column.width - 3.0, baseline, size, font, cell),
            }
            x += column.width;
        }
        self.cursor -= row_height;
    }

    /// Closes the last page and returns the document bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        if !self.canvas.is_empty() || self.writer.page_count() == 0 {
            self.new_page()?;
        }
        self.writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use lopdf::Document;

    use super::{Column, FlowDocument};

    #[test]
    fn long_tables_spill_onto_new_pages() {
        let mut flow = FlowDocument::new("Testfirma");
        flow.title("Tilgungsplan").expect("title");
        let rows: Vec<Vec<String>> =
            (1..=120).map(|year| vec![year.to_string(), format!("{year},00 €")]).collect();
        flow.table(&[Column::left("Jahr", 100.0), Column::right("Betrag", 150.0)], &rows, &[9])
            .expect("table");

        let bytes = flow.finish().expect("finish");
        let pages = Document::load_mem(&bytes).expect("load").get_pages().len();

        assert!(pages >= 3, "expected several pages, got {pages}");
    }
}
