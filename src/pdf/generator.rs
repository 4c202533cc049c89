//! Draws a form as an A4 PDF document.

use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
    image_crate::{self, DynamicImage, GenericImageView},
};
use time::UtcOffset;

use crate::{
    Error,
    form::FormGraph,
    html::format_currency,
    pdf::merge::append_pdf_pages,
    receipt::{Receipt, decode_receipt_content, strip_data_url_prefix},
    timezone::format_local_timestamp,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const RIGHT_COLUMN_X: f32 = 110.0;
/// The widest an embedded receipt image may be drawn.
const MAX_IMAGE_WIDTH: f32 = 140.0;
const MAX_IMAGE_HEIGHT: f32 = 180.0;
/// Images are drawn at this resolution unless that would make them too large.
const DEFAULT_IMAGE_DPI: f32 = 96.0;
/// Millimetres per typographic point.
const MM_PER_PT: f32 = 0.3528;
const LINE_SPACING: f32 = 1.5;
/// Wrap body text after this many characters.
const WRAP_WIDTH: usize = 95;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const SUBHEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;

/// The left edge and character limit of each column of the transaction table.
const TABLE_COLUMNS: [(f32, usize); 5] = [
    (MARGIN, 12),
    (48.0, 16),
    (84.0, 14),
    (114.0, 28),
    (170.0, 12),
];
const TABLE_HEADERS: [&str; 5] = ["Date", "Account Line", "Department", "Place/Vendor", "Amount"];

/// A rendered form and the PDF receipts to append after it.
struct RenderedForm {
    document: Vec<u8>,
    attachments: Vec<Vec<u8>>,
}

/// Tracks the current page and the vertical position of the next line.
struct PdfWriter {
    document: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    /// Distance from the bottom of the page in millimetres.
    y: f32,
}

fn pdf_error(error: impl std::fmt::Display) -> Error {
    tracing::error!("could not build PDF: {error}");
    Error::PdfError(error.to_string())
}

fn line_height(font_size: f32) -> f32 {
    font_size * MM_PER_PT * LINE_SPACING
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, Error> {
        let (document, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = document
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = document
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = document.get_page(page).get_layer(layer);

        Ok(Self {
            document,
            regular,
            bold,
            layer,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    /// Start a new page if less than `height` millimetres are left on this one.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }

        let (page, layer) = self
            .document
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.document.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold { &self.bold } else { &self.regular }
    }

    /// Write `text` at `x` on the current line without moving down.
    fn text_at(&self, text: &str, font_size: f32, bold: bool, x: f32) {
        self.layer
            .use_text(text, font_size, Mm(x), Mm(self.y), self.font(bold));
    }

    fn line(&mut self, text: &str, font_size: f32, bold: bool) {
        let height = line_height(font_size);
        self.ensure_space(height);
        self.y -= height;
        self.text_at(text, font_size, bold, MARGIN);
    }

    fn wrapped(&mut self, text: &str, font_size: f32) {
        for line in wrap_text(text, WRAP_WIDTH) {
            self.line(&line, font_size, false);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    /// Write two labelled values side by side.
    fn detail_row(&mut self, left: (&str, &str), right: (&str, &str)) {
        let height = line_height(BODY_SIZE);
        self.ensure_space(height);
        self.y -= height;
        self.text_at(&format!("{}: {}", left.0, left.1), BODY_SIZE, false, MARGIN);
        self.text_at(
            &format!("{}: {}", right.0, right.1),
            BODY_SIZE,
            false,
            RIGHT_COLUMN_X,
        );
    }

    fn table_row(&mut self, cells: [&str; 5], bold: bool) {
        let height = line_height(TABLE_SIZE);
        self.ensure_space(height);
        self.y -= height;

        for ((x, max_chars), cell) in TABLE_COLUMNS.iter().zip(cells) {
            self.text_at(&truncate(cell, *max_chars), TABLE_SIZE, bold, *x);
        }
    }

    fn separator(&mut self) {
        self.ensure_space(6.0);
        self.gap(3.0);
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.8, 0.8, 0.8, None)));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.gap(3.0);
    }

    /// Draw `image` at most [MAX_IMAGE_WIDTH] wide, keeping its aspect ratio.
    fn image(&mut self, image: &DynamicImage) {
        let (width_px, height_px) = image.dimensions();
        if width_px == 0 || height_px == 0 {
            return;
        }

        let (width, height) = image_size(width_px, height_px);
        self.ensure_space(height + 2.0);
        self.y -= height;

        // Alpha channels are not drawn correctly, so flatten to RGB first.
        let image = DynamicImage::ImageRgb8(image.to_rgb8());
        let dpi = width_px as f32 * 25.4 / width;
        Image::from_dynamic_image(&image).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.gap(2.0);
    }

    fn finish(self) -> Result<Vec<u8>, Error> {
        self.document.save_to_bytes().map_err(pdf_error)
    }
}

/// The size in millimetres to draw an image of `width_px` by `height_px` pixels.
fn image_size(width_px: u32, height_px: u32) -> (f32, f32) {
    let natural_width = width_px as f32 * 25.4 / DEFAULT_IMAGE_DPI;
    let aspect_ratio = height_px as f32 / width_px as f32;

    let mut width = natural_width.min(MAX_IMAGE_WIDTH);
    if width * aspect_ratio > MAX_IMAGE_HEIGHT {
        width = MAX_IMAGE_HEIGHT / aspect_ratio;
    }

    (width, width * aspect_ratio)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Split `text` into lines of at most `width` characters, breaking on whitespace where possible.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_length = word.chars().count();
        let current_length = current.chars().count();

        if current_length > 0 && current_length + 1 + word_length > width {
            lines.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        while current.chars().count() > width {
            let head: String = current.chars().take(width).collect();
            let tail: String = current.chars().skip(width).collect();
            lines.push(head);
            current = tail;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

fn write_receipt(writer: &mut PdfWriter, receipt: &Receipt, attachments: &mut Vec<Vec<u8>>) {
    let name = &receipt.name;

    if strip_data_url_prefix(&receipt.base64_content).trim().is_empty() {
        writer.line(&format!("{name} (Content not available)"), BODY_SIZE, false);
        return;
    }

    let is_image = receipt.file_type.starts_with("image/");
    let is_pdf = receipt.file_type == "application/pdf";

    if !is_image && !is_pdf {
        writer.line(
            &format!("Receipt ({}): {name}", receipt.file_type),
            BODY_SIZE,
            false,
        );
        return;
    }

    let bytes = match decode_receipt_content(&receipt.base64_content) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("could not decode receipt {}: {error}", receipt.id);
            writer.line(&format!("{name} (Error processing image)"), BODY_SIZE, false);
            return;
        }
    };

    if is_pdf {
        writer.line(
            &format!("{name} (PDF attached at the end of this document)"),
            BODY_SIZE,
            false,
        );
        attachments.push(bytes);
        return;
    }

    match image_crate::load_from_memory(&bytes) {
        Ok(image) => {
            writer.line(name, BODY_SIZE, false);
            writer.image(&image);
        }
        Err(error) => {
            tracing::warn!("could not read image for receipt {}: {error}", receipt.id);
            writer.line(&format!("{name} (Error processing image)"), BODY_SIZE, false);
        }
    }
}

/// Draw `graph` as a PDF, collecting the PDF receipts to append after it.
fn render_form(graph: &FormGraph, local_offset: UtcOffset) -> Result<RenderedForm, Error> {
    let form = &graph.form;
    let title = format!("{} Form", form.form_type);
    let mut writer = PdfWriter::new(&title)?;
    let mut attachments = Vec::new();

    writer.line(&title, TITLE_SIZE, true);
    writer.gap(4.0);

    writer.line("Form Details", HEADING_SIZE, true);
    writer.detail_row(
        ("Form ID", &form.id.to_string()),
        ("Submitted By", &form.submitter_name),
    );
    writer.detail_row(
        (
            "Created",
            &format_local_timestamp(form.created_at, local_offset),
        ),
        ("Submitter Email", &form.submitter_email),
    );
    writer.detail_row(
        (
            "Updated",
            &format_local_timestamp(form.updated_at, local_offset),
        ),
        ("Total Amount", &format_currency(graph.total_amount())),
    );
    writer.gap(4.0);

    writer.line("Reimbursement Information", HEADING_SIZE, true);
    writer.detail_row(
        ("Reimbursed To", &form.reimbursed_name),
        ("Reimbursed Email", &form.reimbursed_email),
    );
    writer.gap(4.0);

    writer.line("Transactions", HEADING_SIZE, true);

    for (index, entry) in graph.transactions.iter().enumerate() {
        let number = index + 1;
        let transaction = &entry.transaction;

        if index > 0 {
            writer.separator();
        }

        // Keep the heading with the table.
        writer.ensure_space(line_height(SUBHEADING_SIZE) + 2.0 * line_height(TABLE_SIZE));
        writer.line(&format!("Transaction #{number}"), SUBHEADING_SIZE, true);
        writer.table_row(TABLE_HEADERS, true);
        writer.table_row(
            [
                &transaction.date.to_string(),
                &transaction.account_line.to_string(),
                &transaction.department.to_string(),
                &transaction.place_vendor,
                &format_currency(transaction.amount),
            ],
            false,
        );
        writer.wrapped(&format!("Description: {}", transaction.description), BODY_SIZE);

        if !entry.receipts.is_empty() {
            writer.gap(2.0);
            writer.line(&format!("Receipts for Transaction #{number}:"), BODY_SIZE, true);

            for stored in &entry.receipts {
                write_receipt(&mut writer, stored, &mut attachments);
            }
        }
    }

    Ok(RenderedForm {
        document: writer.finish()?,
        attachments,
    })
}

/// Render `graph` as an A4 PDF with the pages of its PDF receipts appended at the end.
///
/// Times are shown in `local_offset`.
///
/// # Errors
/// Returns [Error::PdfError] if the document cannot be built.
pub fn generate_form_pdf(graph: &FormGraph, local_offset: UtcOffset) -> Result<Vec<u8>, Error> {
    let rendered = render_form(graph, local_offset)?;

    append_pdf_pages(&rendered.document, &rendered.attachments)
}


#[cfg(test)]
mod tests {
    use super::{MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH, image_size, truncate, wrap_text};

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("pizza for the youth group", 10),
            ["pizza for", "the youth", "group"]
        );
    }

    #[test]
    fn breaks_words_longer_than_a_line() {
        assert_eq!(wrap_text("abcdefghij", 4), ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 10), [""]);
    }

    #[test]
    fn truncates_long_cells() {
        assert_eq!(truncate("Guitar Center", 20), "Guitar Center");
        assert_eq!(truncate("Guitar Center", 10), "Guitar ...");
    }

    #[test]
    fn wide_images_are_limited_to_max_width() {
        let (width, height) = image_size(4000, 2000);

        assert_eq!(width, MAX_IMAGE_WIDTH);
        assert_eq!(height, MAX_IMAGE_WIDTH / 2.0);
    }

    #[test]
    fn tall_images_are_limited_to_max_height() {
        let (width, height) = image_size(1000, 4000);

        assert!((height - MAX_IMAGE_HEIGHT).abs() < 0.001);
        assert!((width - MAX_IMAGE_HEIGHT / 4.0).abs() < 0.001);
    }

    #[test]
    fn small_images_keep_natural_size() {
        let (width, height) = image_size(96, 48);

        assert!((width - 25.4).abs() < 0.001);
        assert!((height - 12.7).abs() < 0.001);
    }
}
