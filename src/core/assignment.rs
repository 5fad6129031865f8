//! Assignment business logic - who shared which item.
//!
//! An assignment links one ITEM line to one participant of the same receipt.
//! Each pair is stored at most once: adding an existing pair returns it
//! unchanged. Saving the whole assignment grid goes through
//! [`replace_assignments`], where the last write wins.

use crate::{
    core::receipt::require_receipt,
    entities::{Assignment, Line, Participant, assignment, line, participant},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

async fn find_pair<C: ConnectionTrait>(
    db: &C,
    line_id: i64,
    participant_id: i64,
) -> Result<Option<assignment::Model>> {
    Assignment::find()
        .filter(assignment::Column::LineId.eq(line_id))
        .filter(assignment::Column::ParticipantId.eq(participant_id))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn insert_assignment<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
    line_id: i64,
    participant_id: i64,
) -> Result<assignment::Model> {
    let model = assignment::ActiveModel {
        receipt_id: Set(receipt_id),
        line_id: Set(line_id),
        participant_id: Set(participant_id),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Assigns an item line to a participant.
///
/// Adding a pair that already exists is a no-op that returns the stored row.
///
/// # Errors
/// Returns an error if:
/// - The line does not exist ([`Error::LineNotFound`])
/// - The line is a fee ([`Error::FeeLineNotAssignable`])
/// - The participant does not exist ([`Error::ParticipantNotFound`])
/// - Line and participant belong to different receipts
#[instrument(skip(db))]
pub async fn add_assignment(
    db: &DatabaseConnection,
    line_id: i64,
    participant_id: i64,
) -> Result<assignment::Model> {
    let line = Line::find_by_id(line_id)
        .one(db)
        .await?
        .ok_or(Error::LineNotFound { id: line_id })?;
    if !line.is_item() {
        return Err(Error::FeeLineNotAssignable { line_id });
    }

    let participant = Participant::find_by_id(participant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ParticipantNotFound {
            name: participant_id.to_string(),
        })?;
    if participant.receipt_id != line.receipt_id {
        return Err(Error::InvalidInput {
            message: format!(
                "Line {line_id} and participant {participant_id} are on different receipts"
            ),
        });
    }

    if let Some(existing) = find_pair(db, line_id, participant_id).await? {
        return Ok(existing);
    }
    insert_assignment(db, line.receipt_id, line_id, participant_id).await
}

/// Removes an assignment. Returns whether a row was actually deleted.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn remove_assignment(
    db: &DatabaseConnection,
    line_id: i64,
    participant_id: i64,
) -> Result<bool> {
    let result = Assignment::delete_many()
        .filter(assignment::Column::LineId.eq(line_id))
        .filter(assignment::Column::ParticipantId.eq(participant_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Flips a single checkbox in the assignment grid.
///
/// Returns `true` when the participant is now assigned to the line.
///
/// # Errors
/// Same as [`add_assignment`] when assigning, or a database error when removing.
pub async fn toggle_assignment(
    db: &DatabaseConnection,
    line_id: i64,
    participant_id: i64,
) -> Result<bool> {
    if remove_assignment(db, line_id, participant_id).await? {
        return Ok(false);
    }
    add_assignment(db, line_id, participant_id).await?;
    Ok(true)
}

/// Retrieves all assignments on a receipt.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_assignments_for_receipt(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Vec<assignment::Model>> {
    Assignment::find()
        .filter(assignment::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(assignment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces every assignment on a receipt with `pairs` of (`line_id`, `participant_id`).
///
/// Duplicate pairs are stored once. Pairs naming a fee line, or a line or
/// participant that is not on this receipt, are skipped with a warning.
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
#[instrument(skip(db, pairs), fields(count = pairs.len()))]
pub async fn replace_assignments(
    db: &DatabaseConnection,
    receipt_id: i64,
    pairs: &[(i64, i64)],
) -> Result<Vec<assignment::Model>> {
    let txn = db.begin().await?;
    require_receipt(&txn, receipt_id).await?;

    let item_lines: HashSet<i64> = Line::find()
        .filter(line::Column::ReceiptId.eq(receipt_id))
        .all(&txn)
        .await?
        .into_iter()
        .filter(line::Model::is_item)
        .map(|l| l.id)
        .collect();
    let participants: HashSet<i64> = Participant::find()
        .filter(participant::Column::ReceiptId.eq(receipt_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    Assignment::delete_many()
        .filter(assignment::Column::ReceiptId.eq(receipt_id))
        .exec(&txn)
        .await?;

    let mut seen = HashSet::new();
    let mut stored = Vec::new();
    for &(line_id, participant_id) in pairs {
        if !item_lines.contains(&line_id) || !participants.contains(&participant_id) {
            warn!(
                receipt_id,
                line_id, participant_id, "Skipping assignment that does not fit this receipt"
            );
            continue;
        }
        if !seen.insert((line_id, participant_id)) {
            continue;
        }
        stored.push(insert_assignment(&txn, receipt_id, line_id, participant_id).await?);
    }

    txn.commit().await?;
    info!(receipt_id, stored = stored.len(), "Replaced assignments");
    Ok(stored)
}

/// Assigns a line to the participant with this display name.
///
/// # Errors
/// Returns [`Error::ParticipantNotFound`] if nobody on the receipt has that name,
/// otherwise the same errors as [`add_assignment`].
pub async fn assign_by_name(
    db: &DatabaseConnection,
    receipt_id: i64,
    line_id: i64,
    participant_name: &str,
) -> Result<assignment::Model> {
    let participant =
        crate::core::participant::get_participant_by_name(db, receipt_id, participant_name)
            .await?
            .ok_or_else(|| Error::ParticipantNotFound {
                name: participant_name.to_string(),
            })?;
    add_assignment(db, line_id, participant.id).await
}

/// [`replace_assignments`] for callers that only know display names.
///
/// Names that match nobody on the receipt are skipped with a warning.
///
/// # Errors
/// Returns [`Error::ReceiptNotFound`] if the receipt does not exist, or a database error.
pub async fn replace_assignments_by_name(
    db: &DatabaseConnection,
    receipt_id: i64,
    pairs: &[(i64, String)],
) -> Result<Vec<assignment::Model>> {
    let participants =
        crate::core::participant::get_participants_for_receipt(db, receipt_id).await?;

    let resolved: Vec<(i64, i64)> = pairs
        .iter()
        .filter_map(|(line_id, name)| {
            let found = participants.iter().find(|p| p.name == *name);
            if found.is_none() {
                warn!(receipt_id, line_id, name = %name, "No participant with this name");
            }
            found.map(|p| (*line_id, p.id))
        })
        .collect();
    debug!(
        receipt_id,
        requested = pairs.len(),
        resolved = resolved.len(),
        "Resolved named assignments"
    );

    replace_assignments(db, receipt_id, &resolved).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{line as lines, participant as people};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_assignment_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let (receipt, created, friend) = setup_with_assignment(&db).await?;

        let again = add_assignment(&db, created[0].id, friend.id).await?;
        let all = get_assignments_for_receipt(&db, receipt.id).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, again.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_fee_lines_cannot_be_assigned() -> Result<()> {
        let db = setup_test_db().await?;
        let (_receipt, created, friend) = setup_with_assignment(&db).await?;

        let result = add_assignment(&db, created[1].id, friend.id).await;
        assert!(matches!(
            result,
            Err(Error::FeeLineNotAssignable { line_id }) if line_id == created[1].id
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_assignment_missing_refs() -> Result<()> {
        let db = setup_test_db().await?;
        let (_receipt, created, friend) = setup_with_assignment(&db).await?;

        assert!(matches!(
            add_assignment(&db, 12345, friend.id).await,
            Err(Error::LineNotFound { id: 12345 })
        ));
        assert!(matches!(
            add_assignment(&db, created[0].id, 12345).await,
            Err(Error::ParticipantNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_assignment_across_receipts() -> Result<()> {
        let db = setup_test_db().await?;
        let (_receipt, created, _friend) = setup_with_assignment(&db).await?;
        let other = create_test_receipt(&db, "Other").await?;
        let stranger = people::add_participant(&db, other.id, "Stranger").await?;

        let result = add_assignment(&db, created[0].id, stranger.id).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_assignment() -> Result<()> {
        let db = setup_test_db().await?;
        let (receipt, created, friend) = setup_with_assignment(&db).await?;

        assert!(!toggle_assignment(&db, created[0].id, friend.id).await?);
        assert!(get_assignments_for_receipt(&db, receipt.id).await?.is_empty());

        assert!(toggle_assignment(&db, created[0].id, friend.id).await?);
        assert_eq!(get_assignments_for_receipt(&db, receipt.id).await?.len(), 1);

        assert!(!remove_assignment(&db, created[0].id, 999).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_assignments_last_write_wins() -> Result<()> {
        let db = setup_test_db().await?;
        let receipt = create_test_receipt(&db, "Brunch").await?;
        let created = lines::create_lines(
            &db,
            receipt.id,
            vec![
                lines::NewLine::item("Eggs", 9.0),
                lines::NewLine::item("Toast", 4.0),
                lines::NewLine::fee("Tip", 2.6),
            ],
        )
        .await?;
        let ana = people::add_participant(&db, receipt.id, "Ana").await?;
        let ben = people::add_participant(&db, receipt.id, "Ben").await?;

        replace_assignments(&db, receipt.id, &[(created[0].id, ana.id)]).await?;

        let stored = replace_assignments(
            &db,
            receipt.id,
            &[
                (created[0].id, ben.id),
                (created[1].id, ana.id),
                (created[1].id, ana.id), // duplicate
                (created[2].id, ana.id), // fee line
                (created[0].id, 999),    // unknown participant
            ],
        )
        .await?;
        assert_eq!(stored.len(), 2);

        let all = get_assignments_for_receipt(&db, receipt.id).await?;
        let pairs: Vec<(i64, i64)> = all.iter().map(|a| (a.line_id, a.participant_id)).collect();
        assert_eq!(pairs, [(created[0].id, ben.id), (created[1].id, ana.id)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_assignments_unknown_receipt() -> Result<()> {
        let db = setup_test_db().await?;
        let result = replace_assignments(&db, 31, &[]).await;
        assert!(matches!(result, Err(Error::ReceiptNotFound { id: 31 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_name_based_boundary() -> Result<()> {
        let db = setup_test_db().await?;
        let (receipt, created, friend) = setup_with_assignment(&db).await?;
        let other = people::add_participant(&db, receipt.id, "Other Friend").await?;

        let by_name = assign_by_name(&db, receipt.id, created[0].id, "Other Friend").await?;
        assert_eq!(by_name.participant_id, other.id);

        let missing = assign_by_name(&db, receipt.id, created[0].id, "Nobody").await;
        assert!(matches!(missing, Err(Error::ParticipantNotFound { .. })));

        let stored = replace_assignments_by_name(
            &db,
            receipt.id,
            &[
                (created[0].id, "Test Friend".to_string()),
                (created[0].id, "Nobody".to_string()),
            ],
        )
        .await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].participant_id, friend.id);
        Ok(())
    }
}
