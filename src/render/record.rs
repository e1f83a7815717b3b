//! The renderable record seam, and its implementations for invoices and
//! purchase orders.

use crate::layout::{CellAlign, ColumnSpec};
use crate::model::{Invoice, Party, PurchaseOrder};

use super::pricing::{applied_discount, distribute_discount, LineAmount};
use super::words::amount_in_words;

/// A labelled value in the meta or totals block.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
    pub emphasized: bool,
}

impl LabeledValue {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
            emphasized: false,
        }
    }

    pub fn emphasized(mut self) -> Self {
        self.emphasized = true;
        self
    }
}

/// The items table of a record, rows already priced and formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
}

/// Anything the page composer can draw as a single-page document.
pub trait DocumentRecord {
    /// Heading printed above the meta lines, e.g. `INVOICE`.
    fn title(&self) -> String;
    /// PDF document title.
    fn document_name(&self) -> String;
    /// Heading of the party block, e.g. `Bill To:`.
    fn party_heading(&self) -> &str;
    fn party(&self) -> &Party;
    fn meta(&self) -> Vec<LabeledValue>;
    /// Number of item rows, header and footer rows excluded.
    fn row_count(&self) -> usize;
    fn table(&self) -> RecordTable;
    fn totals(&self) -> Vec<LabeledValue>;
    /// Amount in words for the payable total.
    fn amount_in_words(&self) -> Option<String>;
    fn notes(&self) -> Option<String> {
        None
    }
}

/// `1234567.5` → `12,34,567.50` (Indian digit grouping).
pub fn format_amount(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let negative = value < 0.0 && (value * 100.0).round() != 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::new();
    let head_len = digits.len().saturating_sub(3);
    for (i, ch) in digits[..head_len].iter().enumerate() {
        if i > 0 && (head_len - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    if head_len > 0 {
        grouped.push(',');
    }
    grouped.extend(&digits[head_len..]);

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Amount with the currency prefix. Helvetica has no rupee glyph.
pub fn format_money(value: f64) -> String {
    format!("Rs. {}", format_amount(value))
}

fn item_columns(rate_header: &str, amount_header: &str) -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("#", 0.6, CellAlign::Right),
        ColumnSpec::new("Item", 4.0, CellAlign::Left),
        ColumnSpec::new("SKU", 1.8, CellAlign::Left),
        ColumnSpec::new("Qty", 0.9, CellAlign::Right),
        ColumnSpec::new(rate_header, 1.5, CellAlign::Right),
        ColumnSpec::new(amount_header, 1.7, CellAlign::Right),
    ]
}

fn words_line(amount: f64) -> String {
    format!("Rupees {} Only", amount_in_words(amount))
}

impl Invoice {
    fn lines(&self) -> Vec<LineAmount> {
        self.items
            .iter()
            .map(|i| LineAmount {
                quantity: i.quantity as f64,
                unit_price: i.unit_price,
                discount: i.discount,
            })
            .collect()
    }

    fn has_gst_split(&self) -> bool {
        [self.cgst_amount, self.sgst_amount, self.igst_amount]
            .iter()
            .any(|v| v.is_some_and(|a| a > 0.0))
    }

    pub fn gross_total(&self) -> f64 {
        self.lines().iter().map(LineAmount::gross).sum()
    }

    /// Sum of the row totals after discounts.
    pub fn net_total(&self) -> f64 {
        distribute_discount(&self.lines(), self.discount_amount)
            .iter()
            .map(|r| r.total)
            .sum()
    }

    pub fn tax_total(&self) -> f64 {
        if self.has_gst_split() {
            [self.cgst_amount, self.sgst_amount, self.igst_amount]
                .iter()
                .flatten()
                .sum()
        } else {
            self.tax_amount.max(0.0)
        }
    }

    pub fn grand_total(&self) -> f64 {
        self.net_total() + self.tax_total()
    }
}

impl DocumentRecord for Invoice {
    fn title(&self) -> String {
        if self.has_gst_split() {
            "TAX INVOICE".to_string()
        } else {
            "INVOICE".to_string()
        }
    }

    fn document_name(&self) -> String {
        format!("Invoice {}", self.invoice_number)
    }

    fn party_heading(&self) -> &str {
        "Bill To:"
    }

    fn party(&self) -> &Party {
        &self.customer
    }

    fn meta(&self) -> Vec<LabeledValue> {
        let mut meta = vec![
            LabeledValue::new("Invoice No:", self.invoice_number.clone()),
            LabeledValue::new("Date:", self.created_at.clone()),
        ];
        if let Some(method) = self.payment_method.as_deref().filter(|m| !m.trim().is_empty()) {
            meta.push(LabeledValue::new("Payment:", method));
        }
        if let Some(fy) = self.fy_year.as_deref().filter(|f| !f.trim().is_empty()) {
            meta.push(LabeledValue::new("FY:", fy));
        }
        meta
    }

    fn row_count(&self) -> usize {
        self.items.len()
    }

    fn table(&self) -> RecordTable {
        let priced = distribute_discount(&self.lines(), self.discount_amount);
        let rows = self
            .items
            .iter()
            .zip(&priced)
            .enumerate()
            .map(|(i, (item, row))| {
                vec![
                    (i + 1).to_string(),
                    item.product_name.clone(),
                    item.sku.clone(),
                    item.quantity.to_string(),
                    format_amount(row.unit_price),
                    format_amount(row.total),
                ]
            })
            .collect();
        let quantity: u64 = self.items.iter().map(|i| i.quantity as u64).sum();
        let total: f64 = priced.iter().map(|r| r.total).sum();
        RecordTable {
            columns: item_columns("Rate", "Amount"),
            rows,
            footer: vec![
                String::new(),
                "Total".to_string(),
                String::new(),
                quantity.to_string(),
                String::new(),
                format_amount(total),
            ],
        }
    }

    fn totals(&self) -> Vec<LabeledValue> {
        let priced = distribute_discount(&self.lines(), self.discount_amount);
        let discount = applied_discount(&priced);
        let mut totals = vec![LabeledValue::new("Subtotal:", format_money(self.gross_total()))];
        if discount > 0.0 {
            totals.push(LabeledValue::new("Discount:", format!("- {}", format_money(discount))));
        }
        if self.has_gst_split() {
            let half_rate = self.gst_rate.map(|r| r / 2.0);
            for (name, amount, rate) in [
                ("CGST", self.cgst_amount, half_rate),
                ("SGST", self.sgst_amount, half_rate),
                ("IGST", self.igst_amount, self.gst_rate),
            ] {
                if let Some(amount) = amount.filter(|a| *a > 0.0) {
                    let label = match rate {
                        Some(rate) => format!("{} ({}%):", name, rate),
                        None => format!("{}:", name),
                    };
                    totals.push(LabeledValue::new(&label, format_money(amount)));
                }
            }
        } else if self.tax_amount > 0.0 {
            totals.push(LabeledValue::new("Tax:", format_money(self.tax_amount)));
        }
        totals.push(LabeledValue::new("Grand Total:", format_money(self.grand_total())).emphasized());
        totals
    }

    fn amount_in_words(&self) -> Option<String> {
        Some(words_line(self.grand_total()))
    }
}

impl DocumentRecord for PurchaseOrder {
    fn title(&self) -> String {
        "PURCHASE ORDER".to_string()
    }

    fn document_name(&self) -> String {
        format!("Purchase Order {}", self.po_number)
    }

    fn party_heading(&self) -> &str {
        "Supplier:"
    }

    fn party(&self) -> &Party {
        &self.supplier
    }

    fn meta(&self) -> Vec<LabeledValue> {
        let mut meta = vec![
            LabeledValue::new("PO No:", self.po_number.clone()),
            LabeledValue::new("Order Date:", self.order_date.clone()),
        ];
        if let Some(date) = self.expected_delivery_date.as_deref().filter(|d| !d.trim().is_empty()) {
            meta.push(LabeledValue::new("Expected:", date));
        }
        meta.push(LabeledValue::new("Status:", self.status.label()));
        meta
    }

    fn row_count(&self) -> usize {
        self.items.len()
    }

    fn table(&self) -> RecordTable {
        let rows = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                vec![
                    (i + 1).to_string(),
                    item.product_name.clone(),
                    item.sku.clone(),
                    item.quantity.to_string(),
                    format_amount(item.unit_cost),
                    format_amount(item.total_cost()),
                ]
            })
            .collect();
        let quantity: u64 = self.items.iter().map(|i| i.quantity as u64).sum();
        RecordTable {
            columns: item_columns("Unit Cost", "Total"),
            rows,
            footer: vec![
                String::new(),
                "Total".to_string(),
                String::new(),
                quantity.to_string(),
                String::new(),
                format_amount(self.total_amount()),
            ],
        }
    }

    fn totals(&self) -> Vec<LabeledValue> {
        vec![
            LabeledValue::new("Total Amount:", format_money(self.total_amount())).emphasized(),
            LabeledValue::new("Paid:", format_money(self.total_paid)),
            LabeledValue::new("Pending:", format_money(self.total_pending())),
        ]
    }

    fn amount_in_words(&self) -> Option<String> {
        Some(words_line(self.total_amount()))
    }

    fn notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("Notes: {}", n))
    }
}
