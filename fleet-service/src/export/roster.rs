//! Worker roster ("Arbeiterliste") spreadsheet.

use super::{ExportError, ExportFile};
use crate::billing::to_cents;
use crate::models::Worker;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, Workbook};

const HEADERS: [&str; 9] = [
    "index",
    "Personalnr.",
    "Name",
    "Eintritt",
    "Brutto",
    "Urlaubsanspruch",
    "Rest",
    "Spesen",
    "Bemerkung",
];

const COL_NAME: u16 = 2;
const COL_SALARY: u16 = 4;
const COL_DAILY_EXPENSE: u16 = 7;
const COL_NOTE: u16 = 8;

fn number(amount: Decimal) -> f64 {
    to_cents(amount).to_f64().unwrap_or_default()
}

/// One row per worker in the given order, a blank row and a `Total` row
/// summing salary and daily expense.
pub fn render_roster(
    own_firm_name: &str,
    workers: &[Worker],
    today: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_background_color(Color::Black)
        .set_font_color(Color::White)
        .set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Arbeiterliste")?;
    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    sheet.set_column_width(COL_NAME, 30)?;
    sheet.set_column_width(COL_NOTE, 30)?;

    let mut salary_total = Decimal::ZERO;
    let mut expense_total = Decimal::ZERO;
    for (index, worker) in workers.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_number(row, 0, row)?;
        sheet.write_string(row, 1, &worker.worker_nr)?;
        sheet.write_string(row, COL_NAME, &worker.name)?;
        if let Some(start) = worker.start_date {
            sheet.write_string(row, 3, start.format("%d.%m.%Y").to_string())?;
        }
        sheet.write_number(row, COL_SALARY, number(worker.salary))?;
        sheet.write_number(row, 5, worker.holidays)?;
        sheet.write_number(row, 6, worker.holidays_left())?;
        sheet.write_number(row, COL_DAILY_EXPENSE, number(worker.daily_expense))?;
        sheet.write_string(row, COL_NOTE, &worker.note)?;
        salary_total += worker.salary;
        expense_total += worker.daily_expense;
    }

    let total_row = workers.len() as u32 + 2;
    sheet.write_string(total_row, 0, "Total")?;
    sheet.write_number(total_row, COL_SALARY, number(salary_total))?;
    sheet.write_number(total_row, COL_DAILY_EXPENSE, number(expense_total))?;

    let bytes = workbook.save_to_buffer()?;
    Ok(ExportFile {
        name: format!("{} Arbeiterliste {}.xlsx", own_firm_name, today.format("%m-%Y")),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn worker(id: i64, name: &str, salary: i64) -> Worker {
        Worker {
            id,
            own_firm_id: 1,
            worker_nr: format!("P-{}", id),
            name: name.into(),
            position: "Fahrer".into(),
            is_driver: true,
            salary: Decimal::new(salary, 0),
            daily_expense: Decimal::new(1450, 2),
            holidays: 25,
            remaining_holidays: Some(10),
            start_date: NaiveDate::from_ymd_opt(2022, 4, 1),
            quit_date: None,
            note: String::new(),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn roster_is_an_xlsx_named_by_month() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let export = render_roster(
            "Harby Logistik",
            &[worker(1, "Jan", 2800), worker(2, "Ole", 3100)],
            today,
        )
        .unwrap();
        assert_eq!(export.name, "Harby Logistik Arbeiterliste 03-2024.xlsx");
        assert!(export.bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_roster_still_renders() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let export = render_roster("Harby Logistik", &[], today).unwrap();
        assert!(export.bytes.starts_with(b"PK"));
    }
}
