//! Order arithmetic. Everything here is pure so it can be tested without a database.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Product facts copied into an order line at placement time
#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTotals {
    pub line_sub_total: Decimal,
    pub line_discount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTotals {
    pub lines: Vec<LineTotals>,
    pub sub_total: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// Round to paise, halves away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn compute_line(line: &LineInput) -> LineTotals {
    let line_sub_total = round2(line.unit_price * Decimal::from(line.quantity));
    let line_discount = round2(line_sub_total * line.discount_percent / Decimal::ONE_HUNDRED);
    LineTotals {
        line_sub_total,
        line_discount,
        line_total: line_sub_total - line_discount,
    }
}

pub fn compute_order_totals(lines: &[LineInput]) -> OrderTotals {
    let lines: Vec<LineTotals> = lines.iter().map(compute_line).collect();
    let sub_total: Decimal = lines.iter().map(|l| l.line_sub_total).sum();
    let discount_amount: Decimal = lines.iter().map(|l| l.line_discount).sum();
    OrderTotals {
        lines,
        sub_total,
        discount_amount,
        total_amount: sub_total - discount_amount,
    }
}

/// What may still be claimed against an order: total less approved and pending payments
pub fn outstanding(total: Decimal, paid: Decimal, pending: Decimal) -> Decimal {
    (total - paid - pending).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(price: &str, pct: &str, qty: i32) -> LineInput {
        LineInput {
            unit_price: d(price),
            discount_percent: d(pct),
            quantity: qty,
        }
    }

    #[test]
    fn single_line_with_discount() {
        let totals = compute_line(&line("120.00", "10", 5));
        assert_eq!(totals.line_sub_total, d("600.00"));
        assert_eq!(totals.line_discount, d("60.00"));
        assert_eq!(totals.line_total, d("540.00"));
    }

    #[test]
    fn discount_rounds_half_away_from_zero() {
        // 10.05 * 1 * 5% = 0.5025 -> 0.50; 0.10 * 5 * 25% = 0.125 -> 0.13
        assert_eq!(compute_line(&line("10.05", "5", 1)).line_discount, d("0.50"));
        assert_eq!(compute_line(&line("0.10", "25", 5)).line_discount, d("0.13"));
    }

    #[test]
    fn order_totals_sum_lines() {
        let totals = compute_order_totals(&[line("100.00", "0", 2), line("45.50", "12.5", 4)]);
        assert_eq!(totals.sub_total, d("382.00"));
        assert_eq!(totals.discount_amount, d("22.75"));
        assert_eq!(totals.total_amount, d("359.25"));
        assert_eq!(totals.lines.len(), 2);
        assert_eq!(totals.lines[1].line_total, d("159.25"));
    }

    #[test]
    fn full_discount_gives_zero_total() {
        let totals = compute_order_totals(&[line("99.99", "100", 3)]);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn outstanding_never_negative() {
        assert_eq!(outstanding(d("500"), d("200"), d("100")), d("200"));
        assert_eq!(outstanding(d("500"), d("400"), d("200")), Decimal::ZERO);
    }
}
