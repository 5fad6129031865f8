//! Line business logic - the rows printed on a receipt.
//!
//! Lines keep the order they appear in on the receipt through a `position`
//! column. Only ITEM lines can carry assignments, so any edit that removes an
//! item (deleting it, turning it into a fee, replacing the whole set) also drops
//! the assignments pointing at it.

use crate::{
    core::receipt::require_receipt,
    entities::{Assignment, Line, LineCategory, assignment, line},
    errors::{Error, Result, validate_amount},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A line that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    /// Text as printed
    pub name: String,
    /// Price in currency units
    pub price: f64,
    /// Item or fee; items are the default
    #[serde(default, alias = "lineType")]
    pub category: LineCategory,
}

impl NewLine {
    /// An ITEM line.
    pub fn item(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            category: LineCategory::Item,
        }
    }

    /// A FEE line.
    pub fn fee(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            category: LineCategory::Fee,
        }
    }
}

fn validate_line(name: &str, price: f64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Line name cannot be empty".to_string(),
        });
    }
    validate_amount(price)?;
    Ok(())
}

/// Inserts already-validated lines starting at `first_position`.
pub(crate) async fn insert_lines<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
    first_position: i32,
    lines: Vec<NewLine>,
) -> Result<Vec<line::Model>> {
    let mut created = Vec::with_capacity(lines.len());
    for (position, new_line) in (first_position..).zip(lines) {
        let model = line::ActiveModel {
            receipt_id: Set(receipt_id),
            position: Set(position),
            name: Set(new_line.name.trim().to_string()),
            price: Set(new_line.price),
            category: Set(new_line.category),
            ..Default::default()
        };
        created.push(model.insert(db).await?);
    }
    Ok(created)
}

/// Checks every line before anything is written.
pub(crate) fn validate_lines(lines: &[NewLine]) -> Result<()> {
    lines
        .iter()
        .try_for_each(|l| validate_line(&l.name, l.price))
}

async fn next_position<C: ConnectionTrait>(db: &C, receipt_id: i64) -> Result<i32> {
    let last = Line::find()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .order_by_desc(line::Column::Position)
        .one(db)
        .await?;
    Ok(last.map_or(0, |l| l.position + 1))
}

async fn require_line<C: ConnectionTrait>(db: &C, line_id: i64) -> Result<line::Model> {
    Line::find_by_id(line_id)
        .one(db)
        .await?
        .ok_or(Error::LineNotFound { id: line_id })
}

/// Appends lines to the end of a receipt, preserving their order.
///
/// An empty list returns immediately without touching the database.
///
/// # Errors
/// Returns an error if:
/// - A line name is blank or a price is negative or not finite
/// - The receipt does not exist
/// - A database operation fails
#[instrument(skip(db, lines), fields(count = lines.len()))]
pub async fn create_lines(
    db: &DatabaseConnection,
    receipt_id: i64,
    lines: Vec<NewLine>,
) -> Result<Vec<line::Model>> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    validate_lines(&lines)?;

    let txn = db.begin().await?;
    require_receipt(&txn, receipt_id).await?;
    let first = next_position(&txn, receipt_id).await?;
    let created = insert_lines(&txn, receipt_id, first, lines).await?;
    txn.commit().await?;

    debug!(receipt_id, count = created.len(), "Appended lines");
    Ok(created)
}

/// Retrieves all lines of a receipt in receipt order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_lines_for_receipt(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Vec<line::Model>> {
    Line::find()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(line::Column::Position)
        .order_by_asc(line::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a line by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_line_by_id(db: &DatabaseConnection, line_id: i64) -> Result<Option<line::Model>> {
    Line::find_by_id(line_id).one(db).await.map_err(Into::into)
}

/// Edits a line's name, price and category.
///
/// Turning an item into a fee removes its assignments, since fees are spread
/// over everyone instead.
///
/// # Errors
/// Returns an error if the input is invalid, the line does not exist, or a database operation fails.
#[instrument(skip(db))]
pub async fn update_line(
    db: &DatabaseConnection,
    line_id: i64,
    name: &str,
    price: f64,
    category: LineCategory,
) -> Result<line::Model> {
    validate_line(name, price)?;

    let txn = db.begin().await?;
    let existing = require_line(&txn, line_id).await?;

    if existing.is_item() && category == LineCategory::Fee {
        let removed = Assignment::delete_many()
            .filter(assignment::Column::LineId.eq(line_id))
            .exec(&txn)
            .await?;
        debug!(
            line_id,
            removed = removed.rows_affected,
            "Line became a fee, dropped its assignments"
        );
    }

    let mut active: line::ActiveModel = existing.into();
    active.name = Set(name.trim().to_string());
    active.price = Set(price);
    active.category = Set(category);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a line and any assignments to it.
///
/// # Errors
/// Returns [`Error::LineNotFound`] if the line does not exist, or a database error.
#[instrument(skip(db))]
pub async fn delete_line(db: &DatabaseConnection, line_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = require_line(&txn, line_id).await?;

    Assignment::delete_many()
        .filter(assignment::Column::LineId.eq(line_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Replaces every line of a receipt with a new ordered set.
///
/// This is what saving the line editor does. Old line ids disappear, so all
/// of the receipt's assignments are dropped with them.
///
/// # Errors
/// Returns an error if a line is invalid, the receipt does not exist, or a database operation fails.
#[instrument(skip(db, lines), fields(count = lines.len()))]
pub async fn replace_lines(
    db: &DatabaseConnection,
    receipt_id: i64,
    lines: Vec<NewLine>,
) -> Result<Vec<line::Model>> {
    validate_lines(&lines)?;

    let txn = db.begin().await?;
    require_receipt(&txn, receipt_id).await?;

    Assignment::delete_many()
        .filter(assignment::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    Line::delete_many()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    let created = insert_lines(&txn, receipt_id, 0, lines).await?;

    txn.commit().await?;
    info!(receipt_id, count = created.len(), "Replaced receipt lines");
    Ok(created)
}
