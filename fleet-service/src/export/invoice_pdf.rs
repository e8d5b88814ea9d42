//! A4 invoice rendering with printpdf's builtin Helvetica.

use super::{ExportError, ExportFile};
use crate::billing::format_german;
use crate::models::{Bill, LineItem, OwnFirm};
use chrono::{Datelike, NaiveDate};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use rust_decimal::Decimal;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 20.0;
const RIGHT: f32 = 190.0;
const TOP: f32 = 280.0;
/// Rows stop above this line; the footer lives below it.
const BODY_BOTTOM: f32 = 40.0;
const ROW_HEIGHT: f32 = 6.0;
/// Extra line height for each wrapped description line.
const WRAP_HEIGHT: f32 = 4.0;
/// Characters of a description that fit between its column and the quantity.
const DESCRIPTION_WIDTH: usize = 42;

const COL_POS: f32 = LEFT;
const COL_DESCRIPTION: f32 = 30.0;
const COL_QUANTITY: f32 = 112.0;
const COL_UNIT: f32 = 130.0;
const COL_UNIT_PRICE: f32 = 148.0;
const COL_LINE_SUM: f32 = 172.0;

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    footer: Vec<String>,
    y: f32,
}

impl<'a> PageWriter<'a> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn draw_footer(&mut self) {
        let saved = self.y;
        self.y = 28.0;
        self.rule();
        for line in &self.footer {
            self.y -= 4.5;
            self.layer.use_text(line.as_str(), 7.5, Mm(LEFT), Mm(self.y), &self.regular);
        }
        self.y = saved;
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.draw_footer();
    }

    /// Starts a new page with a repeated table header when `needed` mm do
    /// not fit above the footer.
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BODY_BOTTOM {
            self.new_page();
            self.table_header();
        }
    }

    fn table_header(&mut self) {
        self.text("Pos.", 9.0, COL_POS, true);
        self.text("Beschreibung", 9.0, COL_DESCRIPTION, true);
        self.text("Menge", 9.0, COL_QUANTITY, true);
        self.text("Einheit", 9.0, COL_UNIT, true);
        self.text("Einzelpreis", 9.0, COL_UNIT_PRICE, true);
        self.text("Gesamt", 9.0, COL_LINE_SUM, true);
        self.advance(2.5);
        self.rule();
        self.advance(ROW_HEIGHT);
    }

    fn line_item(&mut self, item: &LineItem) {
        let description = wrap_description(&item.description, DESCRIPTION_WIDTH);
        let extra = description.len().saturating_sub(1) as f32 * WRAP_HEIGHT;
        self.ensure_room(ROW_HEIGHT + extra);
        self.text(&item.position.to_string(), 9.0, COL_POS, false);
        self.text(&format_quantity(item.quantity), 9.0, COL_QUANTITY, false);
        self.text(&item.unit, 9.0, COL_UNIT, false);
        self.text(&format!("{} €", format_german(item.unit_price)), 9.0, COL_UNIT_PRICE, false);
        self.text(&format!("{} €", format_german(item.line_sum)), 9.0, COL_LINE_SUM, false);
        for (index, line) in description.iter().enumerate() {
            if index > 0 {
                self.advance(WRAP_HEIGHT);
            }
            self.text(line, 9.0, COL_DESCRIPTION, false);
        }
        self.advance(ROW_HEIGHT);
    }
}

/// Renders `bill` (with its line items loaded) on the letterhead of `firm`.
pub fn render_invoice(firm: &OwnFirm, bill: &Bill) -> Result<ExportFile, ExportError> {
    let name = bill.pdf_name(&firm.name);
    let (doc, page, layer) = PdfDocument::new(
        name.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let mut writer = PageWriter {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        regular,
        bold,
        footer: footer_lines(firm),
        y: TOP,
    };
    writer.draw_footer();

    // Letterhead
    writer.text(&firm.name, 16.0, LEFT, true);
    writer.advance(6.0);
    for line in firm.address.lines().filter(|l| !l.trim().is_empty()) {
        writer.text(line.trim(), 9.0, LEFT, false);
        writer.advance(4.5);
    }
    if !firm.phone.is_empty() {
        writer.text(&format!("Tel.: {}", firm.phone), 9.0, LEFT, false);
        writer.advance(4.5);
    }
    if !firm.mail.is_empty() {
        writer.text(&firm.mail, 9.0, LEFT, false);
        writer.advance(4.5);
    }

    // Customer block and document data
    writer.y = 235.0;
    writer.text(&bill.customer_name, 11.0, LEFT, true);
    writer.text("RECHNUNG", 18.0, 130.0, true);
    writer.advance(5.0);
    let mut customer_lines: Vec<String> = bill
        .address
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if !bill.vat_id.is_empty() {
        customer_lines.push(format!("USt-IdNr.: {}", bill.vat_id));
    }
    let mut details = vec![
        format!("Rechnungsnummer: {}", bill.number),
        format!("Rechnungsdatum: {}", bill.creation_date.format("%d.%m.%Y")),
    ];
    if let Some(window) = payment_window(bill.pay_start, bill.pay_end) {
        details.push(window);
    }
    for row in 0..customer_lines.len().max(details.len()) {
        if let Some(line) = customer_lines.get(row) {
            writer.text(line, 9.0, LEFT, false);
        }
        if let Some(line) = details.get(row) {
            writer.text(line, 9.0, 130.0, false);
        }
        writer.advance(4.5);
    }

    writer.advance(10.0);
    writer.table_header();
    for item in &bill.items {
        writer.line_item(item);
    }

    // Totals
    let tax = bill.total - bill.sum;
    writer.ensure_room(24.0);
    writer.rule();
    writer.advance(6.0);
    writer.text("Zwischensumme", 9.0, 130.0, false);
    writer.text(&format!("{} €", format_german(bill.sum)), 9.0, COL_LINE_SUM, false);
    writer.advance(5.0);
    writer.text(&format!("MwSt. {} %", format_rate(bill.tax_rate)), 9.0, 130.0, false);
    writer.text(&format!("{} €", format_german(tax)), 9.0, COL_LINE_SUM, false);
    writer.advance(6.0);
    writer.text("Gesamtbetrag", 10.0, 130.0, true);
    writer.text(&format!("{} €", format_german(bill.total)), 10.0, COL_LINE_SUM, true);

    let mut buffer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bytes = buffer
        .into_inner()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    Ok(ExportFile { name, bytes })
}

/// Bank and register data printed at the bottom of every page.
fn footer_lines(firm: &OwnFirm) -> Vec<String> {
    let join = |parts: &[(&str, &str)]| {
        parts
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(label, value)| format!("{}{}", label, value))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    [
        join(&[
            ("", firm.name.as_str()),
            ("Geschäftsführer: ", firm.chairman.as_str()),
            ("Sitz: ", firm.company_place.as_str()),
        ]),
        join(&[
            ("Registergericht: ", firm.register_court.as_str()),
            ("Steuernummer: ", firm.tax_nr.as_str()),
            ("USt-IdNr.: ", firm.vat_id.as_str()),
        ]),
        join(&[
            ("", firm.bank_name.as_str()),
            ("IBAN: ", firm.iban.as_str()),
            ("BIC: ", firm.bic.as_str()),
        ]),
    ]
    .into_iter()
    .filter(|line| !line.is_empty())
    .collect()
}

/// Payment window line; the start drops its year when it matches the end's.
fn payment_window(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = if start.year() == end.year() {
                start.format("%d.%m").to_string()
            } else {
                start.format("%d.%m.%Y").to_string()
            };
            Some(format!("Zahlungszeitraum: {} - {}", start, end.format("%d.%m.%Y")))
        }
        (None, Some(end)) => Some(format!("Zahlbar bis: {}", end.format("%d.%m.%Y"))),
        (Some(start), None) => Some(format!("Zahlbar ab: {}", start.format("%d.%m.%Y"))),
        (None, None) => None,
    }
}

/// Breaks `text` into lines of at most `width` characters, at spaces where
/// possible. Words longer than a line are split.
fn wrap_description(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.len();
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn format_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string().replace('.', ",")
}

fn format_rate(rate: Decimal) -> String {
    rate.normalize().to_string().replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn firm() -> OwnFirm {
        OwnFirm {
            id: 1,
            name: "Harby Logistik".into(),
            address: "Hafenstr. 1\n20457 Hamburg".into(),
            phone: "040 123".into(),
            mail: "info@harby.example".into(),
            chairman: "M. Harby".into(),
            company_place: "Hamburg".into(),
            register_court: "AG Hamburg HRB 1".into(),
            tax_nr: "12/345".into(),
            vat_id: "DE999".into(),
            contact_name: String::new(),
            contact_phone: String::new(),
            contact_fax: String::new(),
            bank_name: "Hamburger Sparkasse".into(),
            iban: "DE00 2005 0550 0000 0000 00".into(),
            bic: "HASPDEHHXXX".into(),
            logo_path: None,
            created_utc: Utc::now(),
        }
    }

    fn bill(item_count: usize) -> Bill {
        let items = (0..item_count)
            .map(|i| LineItem {
                id: i as i64 + 1,
                bill_id: 1,
                position: i as i32 + 1,
                description: format!("Transport {}", i + 1),
                quantity: d("2"),
                unit: "Stk".into(),
                unit_price: d("50.00"),
                line_sum: d("100.00"),
            })
            .collect();
        Bill {
            id: 1,
            own_firm_id: 1,
            customer_id: 2,
            customer_name: "Spedition Nord".into(),
            vat_id: "DE123".into(),
            address: "Kai 5\n28195 Bremen".into(),
            number_seq: 1,
            number_year: 2024,
            number: "001/2024".into(),
            creation_date: date(2024, 3, 1),
            pay_start: Some(date(2024, 3, 1)),
            pay_end: Some(date(2024, 3, 15)),
            sum: d("125.00"),
            tax_rate: d("19"),
            total: d("148.75"),
            document_path: None,
            created_utc: Utc::now(),
            items,
        }
    }

    #[test]
    fn renders_a_pdf_named_after_firm_and_number() {
        let export = render_invoice(&firm(), &bill(2)).unwrap();
        assert_eq!(export.name, "Rechnung -- Harby Logistik -- 001/2024.pdf");
        assert!(export.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_invoices_continue_on_further_pages() {
        let short = render_invoice(&firm(), &bill(1)).unwrap();
        let long = render_invoice(&firm(), &bill(80)).unwrap();
        assert!(long.bytes.starts_with(b"%PDF"));
        assert!(long.bytes.len() > short.bytes.len());
    }

    #[test]
    fn descriptions_wrap_at_word_boundaries() {
        let lines = wrap_description(
            "Nahverkehr Hamburg Altona - Bremen Überseestadt inklusive Wartezeit am Terminal",
            DESCRIPTION_WIDTH,
        );
        assert_eq!(
            lines,
            vec![
                "Nahverkehr Hamburg Altona - Bremen",
                "Überseestadt inklusive Wartezeit am",
                "Terminal",
            ]
        );
        assert!(lines.iter().all(|l| l.chars().count() <= DESCRIPTION_WIDTH));
        assert_eq!(wrap_description("Standzeit", DESCRIPTION_WIDTH), vec!["Standzeit"]);
        assert_eq!(wrap_description("", DESCRIPTION_WIDTH), vec![""]);
    }

    #[test]
    fn overlong_words_are_split() {
        let word = "x".repeat(50);
        let lines = wrap_description(&format!("Kühlfracht {}", word), 42);
        assert_eq!(lines, vec!["Kühlfracht".to_string(), "x".repeat(42), "x".repeat(8)]);
    }

    #[test]
    fn long_descriptions_still_render() {
        let mut bill = bill(40);
        for item in &mut bill.items {
            item.description = "Sammeltransport Paletten Lager Billbrook nach Umschlag Hafen Hamburg Waltershof".into();
        }
        let export = render_invoice(&firm(), &bill).unwrap();
        assert!(export.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn payment_window_drops_start_year_within_one_year() {
        assert_eq!(
            payment_window(Some(date(2024, 3, 1)), Some(date(2024, 3, 15))).as_deref(),
            Some("Zahlungszeitraum: 01.03 - 15.03.2024")
        );
        assert_eq!(
            payment_window(Some(date(2023, 12, 20)), Some(date(2024, 1, 10))).as_deref(),
            Some("Zahlungszeitraum: 20.12.2023 - 10.01.2024")
        );
        assert_eq!(
            payment_window(None, Some(date(2024, 1, 10))).as_deref(),
            Some("Zahlbar bis: 10.01.2024")
        );
        assert_eq!(payment_window(None, None), None);
    }

    #[test]
    fn footer_skips_empty_fields() {
        let mut firm = firm();
        firm.chairman.clear();
        firm.company_place.clear();
        let lines = footer_lines(&firm);
        assert_eq!(lines[0], "Harby Logistik");
        assert!(lines[2].contains("IBAN: DE00"));
    }

    #[test]
    fn quantities_use_decimal_comma() {
        assert_eq!(format_quantity(d("2.50")), "2,5");
        assert_eq!(format_rate(d("19.00")), "19");
    }
}
