//! Sample files for PDF tests.

use std::io::Cursor;

use printpdf::{
    Mm, PdfDocument,
    image_crate::{DynamicImage, ImageFormat, Rgb, RgbImage},
};

/// A PDF with `pages` empty A4 pages.
pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
    let (document, _, _) = PdfDocument::new("Receipt", Mm(210.0), Mm(297.0), "Layer 1");
    for _ in 1..pages {
        document.add_page(Mm(210.0), Mm(297.0), "Layer 1");
    }

    document.save_to_bytes().unwrap()
}

/// A small red PNG image.
pub(crate) fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(4, 2, Rgb([200, 30, 30]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    bytes
}
