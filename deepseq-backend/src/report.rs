//! The request report: a summary page with the request's metadata and the owner's contact
//! details, followed by a page listing every attached library and sample.
//!
//! Layout is computed here in PDF points (origin bottom left, A4) and rendered by [`pdf`].

use chrono::NaiveDate;
use deepseq_core::model::{
    request::{DATE_FORMAT, RequestItem},
    researcher::ResearcherContact,
};

pub mod pdf;

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
const INCH: f32 = 72.0;

/// Rows beyond this don't fit on the item page and are left out.
pub const MAX_ITEMS: usize = 55;

const TITLE: &str = "Deep Sequencing Request";
const HEADER_FONT_SIZE: f32 = 14.0;
const DEFAULT_FONT_SIZE: f32 = 12.0;
const SMALL_FONT_SIZE: f32 = 10.0;
const LINE_SPACING: f32 = 20.0;
const ROW_HEIGHT: f32 = 10.0;

const LEFT: f32 = INCH;
const VALUE_LEFT: f32 = LEFT + 150.0;
const TOP: f32 = 10.0 * INCH + 25.0;
const TABLE_COLUMNS: [f32; 4] = [LEFT, LEFT + 25.0, LEFT + 325.0, LEFT + 395.0];

// Average advance of a Helvetica Bold glyph relative to the font size, close enough to
// centre a title without font metrics.
const BOLD_GLYPH_WIDTH: f32 = 0.58;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        text: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: impl ToString) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            font,
            size,
            text: text.to_string(),
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.ops.push(DrawOp::Line { from, to });
    }

    fn title(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let width = TITLE.len() as f32 * HEADER_FONT_SIZE * BOLD_GLYPH_WIDTH;

        self.text(
            (PAGE_WIDTH - width) / 2.0,
            PAGE_HEIGHT - 75.0,
            Font::Bold,
            HEADER_FONT_SIZE,
            TITLE,
        );
    }

    fn labelled(&mut self, y: f32, label: &str, value: &str) {
        self.text(LEFT, y, Font::Bold, DEFAULT_FONT_SIZE, label);
        self.text(VALUE_LEFT, y, Font::Regular, DEFAULT_FONT_SIZE, value);
    }

    fn table_row(&mut self, y: f32, font: Font, cells: [&str; 4]) {
        for (x, cell) in TABLE_COLUMNS.into_iter().zip(cells) {
            self.text(x, y, font, SMALL_FONT_SIZE, cell);
        }
    }

    fn page_counter(&mut self, n: usize, of: usize) {
        self.text(
            LEFT * 6.5,
            INCH,
            Font::Regular,
            SMALL_FONT_SIZE,
            format!("Page {n} of {of}"),
        );
    }

    /// The texts on this page, top to bottom in drawing order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                DrawOp::Line { .. } => None,
            })
            .collect()
    }
}

/// Everything printed on a request's report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData {
    pub request_name: String,
    pub description: String,
    pub contact: ResearcherContact,
    /// Ordered by barcode.
    pub items: Vec<RequestItem>,
}

impl ReportData {
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}_Deep_Sequencing_Request.pdf", self.request_name)
    }

    #[must_use]
    pub fn layout(&self, date: NaiveDate) -> Vec<Page> {
        vec![self.summary_page(date), self.item_page()]
    }

    fn summary_page(&self, date: NaiveDate) -> Page {
        let Self {
            request_name,
            description,
            contact,
            ..
        } = self;

        let mut page = Page::default();
        page.title();

        let date = date.format(DATE_FORMAT).to_string();
        let cost_units = contact.cost_units_display();

        let mut y = TOP - 10.0;
        let rows: [(&str, &str, f32); 11] = [
            ("Request Name:", request_name.as_str(), 1.0),
            ("Date:", &date, 1.0),
            ("Request Number:", "", 1.0),
            ("Provider:", "", 1.5),
            ("User:", &contact.name, 1.0),
            ("Phone:", &contact.phone, 1.0),
            ("Email:", &contact.email, 1.0),
            ("Organization:", &contact.organization, 1.0),
            (
                "Principal Investigator:",
                &contact.principal_investigator,
                1.0,
            ),
            ("Cost Unit(s):", &cost_units, 1.5),
            ("Description:", description, 1.0),
        ];

        for (label, value, spacing) in rows {
            page.labelled(y, label, value);
            y -= LINE_SPACING * spacing;
        }

        let signature_y = 1.5 * INCH;
        let signature_size = SMALL_FONT_SIZE - 1.0;
        page.line((LEFT, signature_y + 10.0), (LEFT + 125.0, signature_y + 10.0));
        page.text(
            LEFT + 30.0,
            signature_y,
            Font::Regular,
            signature_size,
            "(Date, Signature)",
        );
        page.line(
            (LEFT + 150.0, signature_y + 10.0),
            (LEFT + 300.0, signature_y + 10.0),
        );
        page.text(
            LEFT + 180.0,
            signature_y,
            Font::Regular,
            signature_size,
            "(Principal Investigator)",
        );

        page.page_counter(1, 2);

        page
    }

    fn item_page(&self) -> Page {
        let mut page = Page::default();
        page.title();

        page.text(
            LEFT,
            TOP - 10.0,
            Font::Bold,
            DEFAULT_FONT_SIZE,
            "List of samples/libraries to be submitted for sequencing:",
        );

        let table_top = TOP - 40.0;
        page.table_row(table_top, Font::Bold, ["#", "Name", "Type", "Barcode"]);

        let mut y = table_top - 5.0;
        for (i, item) in self.items.iter().take(MAX_ITEMS).enumerate() {
            y -= ROW_HEIGHT;

            let number = (i + 1).to_string();
            page.table_row(
                y,
                Font::Regular,
                [
                    &number,
                    &item.name,
                    item.record_type.display_name(),
                    &item.barcode,
                ],
            );
        }

        page.page_counter(2, 2);

        page
    }
}

/// What is rendered when the report's data couldn't be gathered.
#[must_use]
pub fn empty_layout() -> Vec<Page> {
    vec![Page::default()]
}
