//! Cost allocation - computes what each participant owes on a receipt.
//!
//! This is a pure computation over a [`ReceiptSnapshot`]: no I/O, no shared state,
//! same input gives the same output. Item lines are split equally among the
//! participants assigned to them. Fee lines are never assigned; instead every
//! participant pays `total_fees × (items_subtotal / item_base)`.
//!
//! No rounding is applied. Amounts stay in `f64` currency units and are only
//! formatted at display time (see [`crate::core::report`]), so the sum of all
//! participant totals can drift from the receipt total by a rounding epsilon.
//! An item nobody is assigned to is never charged to anyone.

use crate::entities::{assignment, line, participant, receipt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which figure is the denominator when prorating fees.
///
/// The receipt total and the sum of its lines can disagree (OCR mistakes,
/// manual edits), so the rule is chosen explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemBase {
    /// `receipt.total − total_fees`; the total is what the user sees and edits
    #[default]
    ReceiptTotal,
    /// Sum of the item line prices, ignoring the stored total
    ItemLines,
}

/// Everything the allocator needs to know about one receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptSnapshot {
    /// The receipt itself (only `total` is read by the allocator)
    pub receipt: receipt::Model,
    /// Lines in receipt order
    pub lines: Vec<line::Model>,
    /// Participants in the order their costs should be reported
    pub participants: Vec<participant::Model>,
    /// Which participants share which item lines
    pub assignments: Vec<assignment::Model>,
}

/// One participant's share of a single item line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitItem {
    /// Line this share comes from
    pub line_id: i64,
    /// Line name as printed
    pub name: String,
    /// `line.price / number of co-assignees`
    pub price: f64,
}

/// Computed breakdown for one participant. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendCost {
    /// Who this breakdown is for
    pub participant: participant::Model,
    /// Shares of each item line assigned to them, in line order
    pub items: Vec<SplitItem>,
    /// Sum of `items[*].price`
    pub items_subtotal: f64,
    /// Their share of all fee lines
    pub fees: f64,
    /// `items_subtotal + fees`
    pub total: f64,
}

/// Sum of all FEE line prices.
#[must_use]
pub fn total_fees(lines: &[line::Model]) -> f64 {
    lines
        .iter()
        .filter(|l| l.category == line::LineCategory::Fee)
        .map(|l| l.price)
        .sum()
}

/// Sum of all ITEM line prices.
#[must_use]
pub fn items_subtotal(lines: &[line::Model]) -> f64 {
    lines.iter().filter(|l| l.is_item()).map(|l| l.price).sum()
}

/// The portion of the receipt attributable to items under the given rule.
#[must_use]
pub fn item_base(snapshot: &ReceiptSnapshot, rule: ItemBase) -> f64 {
    match rule {
        ItemBase::ReceiptTotal => snapshot.receipt.total - total_fees(&snapshot.lines),
        ItemBase::ItemLines => items_subtotal(&snapshot.lines),
    }
}

/// `part / base`, or 0 when the base is zero so totals never turn into NaN.
#[must_use]
pub fn proportion_of(part: f64, base: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    part / base
}

/// Maps every item line id to the distinct participant ids assigned to it.
///
/// Assignments naming a line that is not an item line of the snapshot are
/// ignored. Participant ids are kept even when the participant is unknown,
/// so they still count as a co-assignee.
fn assignees_by_line(snapshot: &ReceiptSnapshot) -> HashMap<i64, Vec<i64>> {
    let mut assignees: HashMap<i64, Vec<i64>> = snapshot
        .lines
        .iter()
        .filter(|l| l.is_item())
        .map(|l| (l.id, Vec::new()))
        .collect();

    for a in &snapshot.assignments {
        if let Some(ids) = assignees.get_mut(&a.line_id) {
            if !ids.contains(&a.participant_id) {
                ids.push(a.participant_id);
            }
        }
    }
    assignees
}

/// Computes one [`FriendCost`] per participant, in participant order.
///
/// Never fails: dangling references are skipped and an empty item base gives
/// every participant a zero fee share.
#[must_use]
pub fn calculate_friend_costs(snapshot: &ReceiptSnapshot, rule: ItemBase) -> Vec<FriendCost> {
    let fees_total = total_fees(&snapshot.lines);
    let base = item_base(snapshot, rule);
    let assignees = assignees_by_line(snapshot);

    tracing::trace!(
        receipt_id = snapshot.receipt.id,
        fees_total,
        base,
        "allocating receipt"
    );

    snapshot
        .participants
        .iter()
        .map(|p| {
            let mut items = Vec::new();
            let mut subtotal = 0.0;

            for l in snapshot.lines.iter().filter(|l| l.is_item()) {
                let Some(ids) = assignees.get(&l.id) else {
                    continue;
                };
                if !ids.contains(&p.id) {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)] // co-assignee counts are tiny
                let split_price = l.price / ids.len() as f64;
                subtotal += split_price;
                items.push(SplitItem {
                    line_id: l.id,
                    name: l.name.clone(),
                    price: split_price,
                });
            }

            let fees = fees_total * proportion_of(subtotal, base);

            FriendCost {
                participant: p.clone(),
                items,
                items_subtotal: subtotal,
                fees,
                total: subtotal + fees,
            }
        })
        .collect()
}
