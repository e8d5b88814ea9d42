//! Numbering, totals and balance rules for invoices and credit notes.

pub mod balance;
pub mod invoice;
pub mod money;
pub mod numbering;
pub mod sales;

pub use balance::CreditNoteBalance;
pub use invoice::{line_sum, InvoiceTotals};
pub use money::{format_german, tax_inclusive, to_cents, AmountOverflow};
pub use numbering::DocumentNumber;
pub use sales::{sales_report, MonthlySales, SalesReport};
