use printpdf::{BuiltinFont, Line, Mm, PdfDocument, Point, Pt};

use super::{DrawOp, Font, PAGE_HEIGHT, PAGE_WIDTH, Page};

const LAYER: &str = "Layer 1";

fn point(x: f32, y: f32) -> Point {
    Point::new(Mm::from(Pt(x)), Mm::from(Pt(y)))
}

/// Renders `pages` into a PDF. An empty slice still produces a document with one blank page.
///
/// # Errors
/// Fails if `printpdf` can't embed the builtin fonts or serialize the document.
pub fn render(title: &str, pages: &[Page]) -> Result<Vec<u8>, printpdf::Error> {
    let width = Mm::from(Pt(PAGE_WIDTH));
    let height = Mm::from(Pt(PAGE_HEIGHT));

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, LAYER);

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (i, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, LAYER)
        };

        let layer = doc.get_page(page_index).get_layer(layer_index);

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    text,
                } => {
                    let font = match font {
                        Font::Regular => &regular,
                        Font::Bold => &bold,
                    };

                    layer.use_text(
                        text.as_str(),
                        *size,
                        Mm::from(Pt(*x)),
                        Mm::from(Pt(*y)),
                        font,
                    );
                }
                DrawOp::Line { from, to } => {
                    layer.add_line(Line {
                        points: vec![(point(from.0, from.1), false), (point(to.0, to.1), false)],
                        is_closed: false,
                    });
                }
            }
        }
    }

    doc.save_to_bytes()
}
