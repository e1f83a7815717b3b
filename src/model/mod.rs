//! # Document Records
//!
//! The business records the renderer turns into pages. These are plain
//! serde structs, deserialized from whatever JSON the host hands over
//! (snake_case keys, missing optional fields default to empty).

use serde::{Deserialize, Serialize};

use crate::layout::{CellAlign, ColumnSpec};

/// A customer or supplier block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Town or place line.
    pub place: Option<String>,
}

impl Party {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Non-empty lines of the block, name first.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.trim().to_string()];
        for value in [&self.address, &self.place] {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                lines.push(v.to_string());
            }
        }
        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            lines.push(format!("Phone: {}", phone));
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            lines.push(format!("Email: {}", email));
        }
        lines.retain(|l| !l.is_empty());
        lines
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceItem {
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// Per-item discount amount. When any item carries one, the invoice's
    /// document-level discount is not distributed.
    pub discount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invoice {
    pub invoice_number: String,
    pub created_at: String,
    pub customer: Party,
    pub items: Vec<InvoiceItem>,
    /// Document-level discount amount.
    pub discount_amount: f64,
    /// Tax total, used when no GST split is given.
    pub tax_amount: f64,
    pub gst_rate: Option<f64>,
    pub cgst_amount: Option<f64>,
    pub sgst_amount: Option<f64>,
    pub igst_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub fy_year: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    #[default]
    Draft,
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Ordered => "Ordered",
            Self::Received => "Received",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderItem {
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_cost: f64,
}

impl PurchaseOrderItem {
    pub fn total_cost(&self) -> f64 {
        self.quantity as f64 * self.unit_cost
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrder {
    pub po_number: String,
    pub supplier: Party,
    pub order_date: String,
    pub expected_delivery_date: Option<String>,
    pub received_date: Option<String>,
    pub status: PurchaseOrderStatus,
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderItem>,
    pub total_paid: f64,
}

impl PurchaseOrder {
    pub fn total_amount(&self) -> f64 {
        self.items.iter().map(PurchaseOrderItem::total_cost).sum()
    }

    pub fn total_pending(&self) -> f64 {
        (self.total_amount() - self.total_paid).max(0.0)
    }
}

/// A titled multi-column listing (customers, stock, sales...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListReport {
    pub title: String,
    pub subtitle: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<String>>,
}

impl ListReport {
    pub fn new(title: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            title: title.to_string(),
            columns,
            ..Default::default()
        }
    }

    pub fn push_row<I, T>(&mut self, cells: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }
}

/// The invoice the designer previews: `rows` placeholder items and a small
/// document-level discount.
pub fn sample_invoice(rows: usize) -> Invoice {
    let items = (0..rows)
        .map(|i| InvoiceItem {
            product_name: format!("Sample Product {}", i + 1),
            sku: format!("SKU-{:03}", i + 1),
            quantity: (i % 4 + 1) as u32,
            unit_price: 100.0 + 25.0 * i as f64,
            discount: 0.0,
        })
        .collect();
    Invoice {
        invoice_number: "INV-0001".to_string(),
        created_at: "2024-01-01".to_string(),
        customer: Party {
            name: "Sample Customer".to_string(),
            address: Some("12 Market Road".to_string()),
            phone: Some("98765 43210".to_string()),
            email: None,
            place: Some("Pune".to_string()),
        },
        items,
        discount_amount: if rows > 0 { 50.0 } else { 0.0 },
        payment_method: Some("Cash".to_string()),
        ..Default::default()
    }
}

/// Sample purchase order for the CLI `--example` flag.
pub fn sample_purchase_order(rows: usize) -> PurchaseOrder {
    PurchaseOrder {
        po_number: "PO-0001".to_string(),
        supplier: Party {
            name: "Sample Supplier".to_string(),
            address: Some("Plot 4, Industrial Area".to_string()),
            phone: Some("020 2555 0101".to_string()),
            ..Default::default()
        },
        order_date: "2024-01-01".to_string(),
        expected_delivery_date: Some("2024-01-10".to_string()),
        status: PurchaseOrderStatus::Ordered,
        items: (0..rows)
            .map(|i| PurchaseOrderItem {
                product_name: format!("Raw Material {}", i + 1),
                sku: format!("RM-{:03}", i + 1),
                quantity: 10 * (i as u32 + 1),
                unit_cost: 12.5,
            })
            .collect(),
        total_paid: 100.0,
        ..Default::default()
    }
}

/// Sample listing for the CLI `--example` flag.
pub fn sample_list_report(rows: usize) -> ListReport {
    let mut report = ListReport::new(
        "Customer List",
        vec![
            ColumnSpec::new("#", 0.6, CellAlign::Right),
            ColumnSpec::new("Name", 3.0, CellAlign::Left),
            ColumnSpec::new("Phone", 2.0, CellAlign::Left),
            ColumnSpec::new("Place", 2.0, CellAlign::Left),
            ColumnSpec::new("Balance", 1.6, CellAlign::Right),
        ],
    );
    for i in 0..rows {
        report.push_row([
            (i + 1).to_string(),
            format!("Customer {}", i + 1),
            format!("98{:08}", i * 7919),
            "Nashik".to_string(),
            format!("{:.2}", 150.0 * i as f64),
        ]);
    }
    report
}
