//! Table row pricing: per-item discounts, or one document-level discount
//! spread over the rows in proportion to their gross value.

/// One line before discounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmount {
    pub quantity: f64,
    pub unit_price: f64,
    /// Per-item discount amount.
    pub discount: f64,
}

impl LineAmount {
    pub fn gross(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// A priced table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedRow {
    pub gross: f64,
    pub discount: f64,
    pub total: f64,
    /// `total / quantity`; the gross unit price for zero quantity.
    pub unit_price: f64,
}

/// Price the rows.
///
/// If any line carries a non-zero discount, every line uses its own
/// discount and `global_discount` is ignored. Otherwise `global_discount`,
/// clamped to `[0, total gross]`, is split as
/// `row_gross / total_gross * global_discount`.
pub fn distribute_discount(lines: &[LineAmount], global_discount: f64) -> Vec<PricedRow> {
    let per_item = lines.iter().any(|l| l.discount != 0.0);
    let total_gross: f64 = lines.iter().map(LineAmount::gross).sum();
    let global = if global_discount.is_finite() {
        global_discount.clamp(0.0, total_gross.max(0.0))
    } else {
        0.0
    };

    lines
        .iter()
        .map(|line| {
            let gross = line.gross();
            let discount = if per_item {
                line.discount
            } else if total_gross > 0.0 {
                gross / total_gross * global
            } else {
                0.0
            };
            let total = gross - discount;
            let unit_price = if line.quantity != 0.0 {
                total / line.quantity
            } else {
                line.unit_price
            };
            PricedRow {
                gross,
                discount,
                total,
                unit_price,
            }
        })
        .collect()
}

/// Sum of the row discounts actually applied.
pub fn applied_discount(rows: &[PricedRow]) -> f64 {
    rows.iter().map(|r| r.discount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: f64, unit_price: f64, discount: f64) -> LineAmount {
        LineAmount {
            quantity,
            unit_price,
            discount,
        }
    }

    #[test]
    fn test_proportional_split() {
        let rows = distribute_discount(&[line(1.0, 300.0, 0.0), line(2.0, 50.0, 0.0)], 40.0);
        assert!((rows[0].discount - 30.0).abs() < 1e-9);
        assert!((rows[1].discount - 10.0).abs() < 1e-9);
        assert!((rows[1].total - 90.0).abs() < 1e-9);
        assert!((rows[1].unit_price - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_item_discounts_win() {
        let rows = distribute_discount(&[line(1.0, 100.0, 5.0), line(1.0, 100.0, 0.0)], 50.0);
        assert_eq!(rows[0].total, 95.0);
        assert_eq!(rows[1].total, 100.0);
    }

    #[test]
    fn test_global_discount_clamped() {
        let rows = distribute_discount(&[line(1.0, 10.0, 0.0)], 25.0);
        assert_eq!(rows[0].total, 0.0);
        let rows = distribute_discount(&[line(1.0, 10.0, 0.0)], -5.0);
        assert_eq!(rows[0].total, 10.0);
    }

    #[test]
    fn test_zero_quantity_and_empty() {
        let rows = distribute_discount(&[line(0.0, 10.0, 0.0)], 5.0);
        assert_eq!(rows[0].total, 0.0);
        assert_eq!(rows[0].unit_price, 10.0);
        assert!(distribute_discount(&[], 10.0).is_empty());
    }
}
