//! Report generation for computed splits.
//!
//! Amounts are carried unrounded through the allocator; this is the only place
//! they are rounded, to two decimals, for display. All functions are
//! framework-agnostic and return plain strings or structured data.

use crate::{
    core::allocation::{self, FriendCost, ReceiptSnapshot},
    errors::Result,
};
use std::fmt::Write;

/// Receipt-level figures shown above the per-participant split.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptSummary {
    /// Sum of item line prices
    pub items_subtotal: f64,
    /// Each fee line as (name, price), in receipt order
    pub fees: Vec<(String, f64)>,
    /// The receipt's stored grand total
    pub total: f64,
}

/// Collects the receipt-level figures for display.
#[must_use]
pub fn summarize_receipt(snapshot: &ReceiptSnapshot) -> ReceiptSummary {
    ReceiptSummary {
        items_subtotal: allocation::items_subtotal(&snapshot.lines),
        fees: snapshot
            .lines
            .iter()
            .filter(|l| !l.is_item())
            .map(|l| (l.name.clone(), l.price))
            .collect(),
        total: snapshot.receipt.total,
    }
}

/// Formats an amount as currency with two decimals and thousands separators.
///
/// Examples: `$1,234.50`, `-$3.10`, `€0.00`.
#[must_use]
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = amount < 0.0 && fixed != "0.00";
    let sign = if negative { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{cents}")
}

/// Renders the receipt summary, the split summary and each participant's detail.
///
/// # Errors
/// Returns an error only if writing to the output buffer fails.
pub fn format_split_report(
    snapshot: &ReceiptSnapshot,
    costs: &[FriendCost],
    symbol: &str,
) -> Result<String> {
    let money = |amount: f64| format_currency(amount, symbol);
    let summary = summarize_receipt(snapshot);
    let mut out = String::new();

    writeln!(out, "Receipt: {}", snapshot.receipt.name)?;
    writeln!(out, "  Subtotal: {}", money(summary.items_subtotal))?;
    for (name, price) in &summary.fees {
        writeln!(out, "  {name}: {}", money(*price))?;
    }
    writeln!(out, "  Total: {}", money(summary.total))?;

    writeln!(out, "\nSplit summary")?;
    if costs.is_empty() {
        writeln!(out, "  No participants yet")?;
    }
    for cost in costs {
        writeln!(out, "  {}: {}", cost.participant.name, money(cost.total))?;
    }

    for cost in costs {
        writeln!(out, "\n{}'s share", cost.participant.name)?;
        if cost.items.is_empty() {
            writeln!(out, "  No items assigned")?;
        }
        for item in &cost.items {
            writeln!(out, "  {}: {}", item.name, money(item.price))?;
        }
        writeln!(out, "  Items subtotal: {}", money(cost.items_subtotal))?;
        writeln!(out, "  Fees: {}", money(cost.fees))?;
        writeln!(out, "  Total: {}", money(cost.total))?;
    }

    Ok(out)
}
