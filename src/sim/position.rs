//! Position and P&L accounting

use crate::data::Side;
use serde::Serialize;

/// Signed net position with average-cost P&L accounting.
///
/// Mutated only by the matching engine on fills; the strategy and metrics
/// read copies.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Position {
    /// Signed net quantity (positive long)
    pub qty: f64,
    /// Average entry price of the open quantity
    pub avg_price: f64,
    /// P&L realized by reducing fills, before fees
    pub realized_pnl: f64,
    /// Total fees paid
    pub fees_paid: f64,
}

impl Position {
    /// Apply one fill.
    ///
    /// Same-direction fills extend the position at a blended average price;
    /// opposite-direction fills realize P&L against the average cost and may
    /// flip the position, re-opening the surplus at the fill price.
    pub fn apply_fill(&mut self, side: Side, price: f64, qty: f64, fee: f64) {
        let signed = qty * side.sign();
        self.fees_paid += fee;

        if self.qty == 0.0 || self.qty.signum() == signed.signum() {
            let total = self.qty.abs() + qty;
            self.avg_price = (self.avg_price * self.qty.abs() + price * qty) / total;
            self.qty += signed;
            return;
        }

        let closed = qty.min(self.qty.abs());
        self.realized_pnl += (price - self.avg_price) * closed * self.qty.signum();
        self.qty += signed;
        if self.qty == 0.0 {
            self.avg_price = 0.0;
        } else if self.qty.signum() == signed.signum() {
            // Flipped through zero; the remainder opens at the fill price
            self.avg_price = price;
        }
    }

    /// Mark-to-market P&L of the open quantity.
    pub fn unrealized(&self, mark: f64) -> f64 {
        (mark - self.avg_price) * self.qty
    }

    /// Realized plus unrealized, net of fees.
    pub fn equity(&self, mark: f64) -> f64 {
        self.realized_pnl - self.fees_paid + self.unrealized(mark)
    }
}
