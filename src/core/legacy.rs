//! Adapter for receipts from the older relational schema.
//!
//! Those receipts kept tax and tip as two numeric columns next to a stored
//! subtotal instead of fee lines, and used integer ids for items and friends.
//! Here they are converted into the generic fee-line model: every item becomes
//! an ITEM line and the tax and tip become two FEE lines named "Tax" and "Tip".
//! The converted total is `subtotal + tax + tip`, so `total − fees` equals the
//! old subtotal and the allocator reproduces the old per-friend amounts.

use crate::{
    core::{
        allocation::ReceiptSnapshot,
        assignment::insert_assignment,
        line::{self, NewLine},
        participant::insert_participant,
    },
    entities::{assignment, participant, receipt},
    errors::{Result, validate_amount},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Name of the fee line synthesized from the legacy tax column.
pub const TAX_LINE_NAME: &str = "Tax";
/// Name of the fee line synthesized from the legacy tip column.
pub const TIP_LINE_NAME: &str = "Tip";

const TOTAL_MISMATCH_TOLERANCE: f64 = 0.005;

/// A receipt row from the legacy schema, with its related rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReceipt {
    /// Legacy receipt id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Sum of the items as stored
    pub subtotal: f64,
    /// Tax amount
    pub tax: f64,
    /// Tip amount
    pub tip: f64,
    /// Grand total as stored
    pub total: f64,
    /// When the receipt was created
    pub created_at: DateTime<Utc>,
    /// Item rows
    #[serde(default)]
    pub items: Vec<LegacyItem>,
    /// Friends splitting this receipt
    #[serde(default)]
    pub friends: Vec<LegacyFriend>,
    /// Item/friend links
    #[serde(default)]
    pub assignments: Vec<LegacyAssignment>,
}

/// Legacy item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyItem {
    /// Legacy item id
    pub id: i64,
    /// Item name
    pub name: String,
    /// Item price
    pub price: f64,
}

/// Legacy friend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFriend {
    /// Legacy friend id
    pub id: i64,
    /// Friend name
    pub name: String,
}

/// Legacy assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAssignment {
    /// Legacy item id
    pub item_id: i64,
    /// Legacy friend id
    pub friend_id: i64,
}

impl LegacyReceipt {
    /// Total implied by the stored columns. Used as the converted receipt's total.
    #[must_use]
    pub fn reconciled_total(&self) -> f64 {
        self.subtotal + self.tax + self.tip
    }

    fn warn_on_total_mismatch(&self) {
        let reconciled = self.reconciled_total();
        if (reconciled - self.total).abs() > TOTAL_MISMATCH_TOLERANCE {
            warn!(
                legacy_id = self.id,
                stored_total = self.total,
                reconciled,
                "Legacy total disagrees with subtotal + tax + tip; using the latter"
            );
        }
    }

    /// Item lines followed by the synthesized Tax and Tip fee lines.
    #[must_use]
    pub fn to_new_lines(&self) -> Vec<NewLine> {
        self.items
            .iter()
            .map(|item| NewLine::item(item.name.clone(), item.price))
            .chain([
                NewLine::fee(TAX_LINE_NAME, self.tax),
                NewLine::fee(TIP_LINE_NAME, self.tip),
            ])
            .collect()
    }

    /// Converts to an in-memory snapshot without touching the database.
    ///
    /// Item and friend ids are kept. The two fee lines get ids just above the
    /// largest item id.
    #[must_use]
    pub fn to_snapshot(&self) -> ReceiptSnapshot {
        self.warn_on_total_mismatch();

        let next_id = self.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        let fee_ids = [next_id, next_id + 1];

        let line_ids = self.items.iter().map(|i| i.id).chain(fee_ids);
        let lines = (0..)
            .zip(line_ids.zip(self.to_new_lines()))
            .map(|(position, (id, new_line))| crate::entities::line::Model {
                id,
                receipt_id: self.id,
                position,
                name: new_line.name,
                price: new_line.price,
                category: new_line.category,
            })
            .collect();

        let participants = self
            .friends
            .iter()
            .map(|f| participant::Model {
                id: f.id,
                receipt_id: self.id,
                name: f.name.clone(),
                created_at: self.created_at,
            })
            .collect();

        let assignments = (1..)
            .zip(&self.assignments)
            .map(|(id, a)| assignment::Model {
                id,
                receipt_id: self.id,
                line_id: a.item_id,
                participant_id: a.friend_id,
            })
            .collect();

        ReceiptSnapshot {
            receipt: receipt::Model {
                id: self.id,
                name: self.name.clone(),
                total: self.reconciled_total(),
                created_at: self.created_at,
            },
            lines,
            participants,
            assignments,
        }
    }
}

/// Persists a legacy receipt in the current store, remapping its ids.
///
/// Friends with the same name collapse into one participant. Assignments that
/// reference unknown items or friends are skipped with a warning.
///
/// # Errors
/// Returns an error if an amount is invalid or a database operation fails.
#[instrument(skip(db, legacy), fields(legacy_id = legacy.id))]
pub async fn import_legacy_receipt(
    db: &DatabaseConnection,
    legacy: &LegacyReceipt,
) -> Result<receipt::Model> {
    let new_lines = legacy.to_new_lines();
    line::validate_lines(&new_lines)?;
    let total = validate_amount(legacy.reconciled_total())?;
    legacy.warn_on_total_mismatch();

    let txn = db.begin().await?;

    let receipt = receipt::ActiveModel {
        name: Set(crate::core::receipt::normalize_receipt_name(&legacy.name)),
        total: Set(total),
        created_at: Set(legacy.created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let stored_lines = line::insert_lines(&txn, receipt.id, 0, new_lines).await?;
    let line_map: HashMap<i64, i64> = legacy
        .items
        .iter()
        .zip(&stored_lines)
        .map(|(item, stored)| (item.id, stored.id))
        .collect();

    let mut friend_map = HashMap::new();
    for friend in &legacy.friends {
        let stored = insert_participant(&txn, receipt.id, &friend.name).await?;
        friend_map.insert(friend.id, stored.id);
    }

    let mut seen = HashSet::new();
    for a in &legacy.assignments {
        let (Some(&line_id), Some(&participant_id)) =
            (line_map.get(&a.item_id), friend_map.get(&a.friend_id))
        else {
            warn!(
                item_id = a.item_id,
                friend_id = a.friend_id,
                "Skipping legacy assignment with unknown item or friend"
            );
            continue;
        };
        if seen.insert((line_id, participant_id)) {
            insert_assignment(&txn, receipt.id, line_id, participant_id).await?;
        }
    }

    txn.commit().await?;
    info!(receipt_id = receipt.id, "Imported legacy receipt");
    Ok(receipt)
}
