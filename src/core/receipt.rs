//! Receipt business logic - the store behind the allocator.
//!
//! This module creates, looks up, edits and deletes receipts, and assembles the
//! [`ReceiptSnapshot`] the cost allocator consumes. A receipt exclusively owns its
//! lines, participants, assignments and images, so deleting it removes all of them
//! inside one database transaction.

use crate::{
    core::allocation::{self, FriendCost, ItemBase, ReceiptSnapshot},
    entities::{
        Assignment, Line, Participant, Receipt, ReceiptImage, assignment, line, participant,
        receipt, receipt_image,
    },
    errors::{Error, Result, validate_amount},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Name given to receipts created without one.
pub const UNNAMED_RECEIPT: &str = "Unnamed Receipt";

/// Trims a receipt name, substituting [`UNNAMED_RECEIPT`] when it is blank.
#[must_use]
pub fn normalize_receipt_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNNAMED_RECEIPT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fetches a receipt or fails with [`Error::ReceiptNotFound`].
///
/// Generic over the connection so it can run inside a transaction.
pub(crate) async fn require_receipt<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
) -> Result<receipt::Model> {
    Receipt::find_by_id(receipt_id)
        .one(db)
        .await?
        .ok_or(Error::ReceiptNotFound { id: receipt_id })
}

/// Inserts a receipt row. Shared by [`create_receipt`] and the import paths.
pub(crate) async fn insert_receipt<C: ConnectionTrait>(
    db: &C,
    name: &str,
    total: f64,
) -> Result<receipt::Model> {
    let total = validate_amount(total)?;
    let receipt = receipt::ActiveModel {
        name: Set(normalize_receipt_name(name)),
        total: Set(total),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    receipt.insert(db).await.map_err(Into::into)
}

/// Creates a new, empty receipt.
///
/// A blank name becomes "Unnamed Receipt".
///
/// # Errors
/// Returns an error if:
/// - The total is negative or not finite
/// - The database insert fails
#[instrument(skip(db))]
pub async fn create_receipt(
    db: &DatabaseConnection,
    name: &str,
    total: f64,
) -> Result<receipt::Model> {
    let receipt = insert_receipt(db, name, total).await?;
    info!(receipt_id = receipt.id, "Created receipt '{}'", receipt.name);
    Ok(receipt)
}

/// Retrieves a receipt by its unique ID, or `None` if it does not exist.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_receipt_by_id(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Option<receipt::Model>> {
    Receipt::find_by_id(receipt_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all receipts, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_receipts(db: &DatabaseConnection) -> Result<Vec<receipt::Model>> {
    Receipt::find()
        .order_by_desc(receipt::Column::CreatedAt)
        .order_by_desc(receipt::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a receipt. A blank name becomes "Unnamed Receipt".
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
pub async fn rename_receipt(
    db: &DatabaseConnection,
    receipt_id: i64,
    new_name: &str,
) -> Result<receipt::Model> {
    let mut receipt: receipt::ActiveModel = require_receipt(db, receipt_id).await?.into();
    receipt.name = Set(normalize_receipt_name(new_name));
    receipt.update(db).await.map_err(Into::into)
}

/// Replaces the grand total, e.g. after correcting an extraction mistake.
///
/// # Errors
/// Returns an error if the total is invalid, the receipt does not exist, or the update fails.
pub async fn update_receipt_total(
    db: &DatabaseConnection,
    receipt_id: i64,
    total: f64,
) -> Result<receipt::Model> {
    let total = validate_amount(total)?;
    let mut receipt: receipt::ActiveModel = require_receipt(db, receipt_id).await?.into();
    receipt.total = Set(total);
    receipt.update(db).await.map_err(Into::into)
}

/// Deletes a receipt along with everything it owns.
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
#[instrument(skip(db))]
pub async fn delete_receipt(db: &DatabaseConnection, receipt_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let receipt = require_receipt(&txn, receipt_id).await?;

    // Children first so foreign keys stay satisfied
    Assignment::delete_many()
        .filter(assignment::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    Line::delete_many()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    Participant::delete_many()
        .filter(participant::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    ReceiptImage::delete_many()
        .filter(receipt_image::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;
    receipt.delete(&txn).await?;

    txn.commit().await?;
    info!(receipt_id, "Deleted receipt");
    Ok(())
}

/// Loads the receipt with its lines (in receipt order), participants (in the
/// order they were added) and assignments.
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
pub async fn load_snapshot(db: &DatabaseConnection, receipt_id: i64) -> Result<ReceiptSnapshot> {
    let receipt = require_receipt(db, receipt_id).await?;

    let lines = Line::find()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(line::Column::Position)
        .order_by_asc(line::Column::Id)
        .all(db)
        .await?;

    let participants = Participant::find()
        .filter(participant::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(participant::Column::Id)
        .all(db)
        .await?;

    let assignments = Assignment::find()
        .filter(assignment::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(assignment::Column::Id)
        .all(db)
        .await?;

    debug!(
        receipt_id,
        lines = lines.len(),
        participants = participants.len(),
        assignments = assignments.len(),
        "Loaded receipt snapshot"
    );

    Ok(ReceiptSnapshot {
        receipt,
        lines,
        participants,
        assignments,
    })
}

/// Loads a receipt and computes every participant's share of it.
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
pub async fn calculate_receipt_split(
    db: &DatabaseConnection,
    receipt_id: i64,
    rule: ItemBase,
) -> Result<Vec<FriendCost>> {
    let snapshot = load_snapshot(db, receipt_id).await?;
    Ok(allocation::calculate_friend_costs(&snapshot, rule))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{assignment as assignments, image, line as lines, participant as people};
    use crate::entities::LineCategory;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_receipt_defaults_name() -> Result<()> {
        let db = setup_test_db().await?;

        let receipt = create_receipt(&db, "   ", 12.5).await?;
        assert_eq!(receipt.name, UNNAMED_RECEIPT);
        assert_eq!(receipt.total, 12.5);

        let named = create_receipt(&db, "  Taco night ", 0.0).await?;
        assert_eq!(named.name, "Taco night");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_receipt_rejects_bad_total() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_receipt(&db, "Lunch", -1.0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = create_receipt(&db, "Lunch", f64::NAN).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_receipt() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<receipt::Model>::new()])
            .into_connection();

        let result = load_snapshot(&db, 404).await;
        assert!(matches!(result, Err(Error::ReceiptNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_rename_and_retotal() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_receipt(&db, "First").await?;
        let second = create_test_receipt(&db, "Second").await?;

        let all = list_receipts(&db).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);

        let renamed = rename_receipt(&db, first.id, "Brunch").await?;
        assert_eq!(renamed.name, "Brunch");

        let retotaled = update_receipt_total(&db, first.id, 99.95).await?;
        assert_eq!(retotaled.total, 99.95);

        let fetched = get_receipt_by_id(&db, first.id).await?.unwrap();
        assert_eq!(fetched.name, "Brunch");
        assert_eq!(fetched.total, 99.95);

        assert!(matches!(
            rename_receipt(&db, 9999, "x").await,
            Err(Error::ReceiptNotFound { id: 9999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_preserves_order() -> Result<()> {
        let db = setup_test_db().await?;
        let receipt = create_test_receipt(&db, "Dinner").await?;

        lines::create_lines(
            &db,
            receipt.id,
            vec![
                lines::NewLine::item("Soup", 6.0),
                lines::NewLine::item("Bread", 3.0),
            ],
        )
        .await?;
        lines::create_lines(&db, receipt.id, vec![lines::NewLine::fee("Tax", 0.9)]).await?;

        people::add_participant(&db, receipt.id, "Zoe").await?;
        people::add_participant(&db, receipt.id, "Adam").await?;

        let snapshot = load_snapshot(&db, receipt.id).await?;
        let names: Vec<&str> = snapshot.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Soup", "Bread", "Tax"]);
        assert_eq!(snapshot.lines[2].category, LineCategory::Fee);

        let friends: Vec<&str> = snapshot
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(friends, ["Zoe", "Adam"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_calculate_receipt_split_end_to_end() -> Result<()> {
        let db = setup_test_db().await?;
        let receipt = create_receipt(&db, "Pub", 48.0).await?;
        let created = lines::create_lines(
            &db,
            receipt.id,
            vec![
                lines::NewLine::item("Steak", 30.0),
                lines::NewLine::item("Soup", 10.0),
                lines::NewLine::fee("Tip", 8.0),
            ],
        )
        .await?;
        let a = people::add_participant(&db, receipt.id, "A").await?;
        let b = people::add_participant(&db, receipt.id, "B").await?;
        assignments::add_assignment(&db, created[0].id, a.id).await?;
        assignments::add_assignment(&db, created[1].id, b.id).await?;

        let costs = calculate_receipt_split(&db, receipt.id, ItemBase::ReceiptTotal).await?;
        assert_eq!(costs.len(), 2);
        assert!((costs[0].total - 36.0).abs() < 1e-9);
        assert!((costs[1].total - 12.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_receipt_removes_children() -> Result<()> {
        let db = setup_test_db().await?;
        let (receipt, created, friend) = setup_with_assignment(&db).await?;
        image::add_receipt_image(&db, receipt.id, "https://blob.example/r.jpg").await?;
        assert_eq!(created.len(), 2);
        assert_eq!(friend.receipt_id, receipt.id);

        delete_receipt(&db, receipt.id).await?;

        assert!(get_receipt_by_id(&db, receipt.id).await?.is_none());
        assert!(Line::find().all(&db).await?.is_empty());
        assert!(Participant::find().all(&db).await?.is_empty());
        assert!(Assignment::find().all(&db).await?.is_empty());
        assert!(ReceiptImage::find().all(&db).await?.is_empty());

        assert!(matches!(
            delete_receipt(&db, receipt.id).await,
            Err(Error::ReceiptNotFound { .. })
        ));
        Ok(())
    }
}
