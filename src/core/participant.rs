//! Participant business logic - the people splitting a receipt.
//!
//! Participants belong to exactly one receipt and their names are unique on it.
//! Adding a name that is already present returns the existing participant.
//! Deleting a participant removes their assignments in the same transaction.

use crate::{
    core::receipt::require_receipt,
    entities::{Assignment, Participant, assignment, participant},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::{info, instrument, trace};

/// Upper bound on name suggestions returned at once.
pub const MAX_SUGGESTIONS: usize = 25;

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            message: "Participant name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
    name: &str,
) -> Result<Option<participant::Model>> {
    Participant::find()
        .filter(participant::Column::ReceiptId.eq(receipt_id))
        .filter(participant::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts a participant unless one with the same name is already on the receipt.
pub(crate) async fn insert_participant<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
    name: &str,
) -> Result<participant::Model> {
    let name = normalize_name(name)?;
    if let Some(existing) = find_by_name(db, receipt_id, &name).await? {
        trace!(receipt_id, participant_id = existing.id, "Participant already present");
        return Ok(existing);
    }

    let model = participant::ActiveModel {
        receipt_id: Set(receipt_id),
        name: Set(name),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Adds a participant to a receipt, or returns the one already using that name.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The receipt does not exist
/// - The database insert fails
#[instrument(skip(db))]
pub async fn add_participant(
    db: &DatabaseConnection,
    receipt_id: i64,
    name: &str,
) -> Result<participant::Model> {
    let name = normalize_name(name)?;
    require_receipt(db, receipt_id).await?;
    insert_participant(db, receipt_id, &name).await
}

/// Retrieves a receipt's participants in the order they were added.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_participants_for_receipt(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Vec<participant::Model>> {
    Participant::find()
        .filter(participant::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(participant::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks a participant up by display name on one receipt.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_participant_by_name(
    db: &DatabaseConnection,
    receipt_id: i64,
    name: &str,
) -> Result<Option<participant::Model>> {
    find_by_name(db, receipt_id, name.trim()).await
}

/// Renames a participant. Their assignments follow automatically since they
/// reference the participant by id.
///
/// # Errors
/// Returns an error if:
/// - The new name is empty
/// - The participant does not exist
/// - Another participant on the same receipt already has that name
#[instrument(skip(db))]
pub async fn rename_participant(
    db: &DatabaseConnection,
    participant_id: i64,
    new_name: &str,
) -> Result<participant::Model> {
    let new_name = normalize_name(new_name)?;

    let existing = Participant::find_by_id(participant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ParticipantNotFound {
            name: participant_id.to_string(),
        })?;

    if let Some(clash) = find_by_name(db, existing.receipt_id, &new_name).await? {
        if clash.id != participant_id {
            return Err(Error::InvalidInput {
                message: format!("'{new_name}' is already on this receipt"),
            });
        }
    }

    let mut active: participant::ActiveModel = existing.into();
    active.name = Set(new_name);
    active.update(db).await.map_err(Into::into)
}

async fn delete_with_assignments(
    db: &DatabaseConnection,
    existing: participant::Model,
) -> Result<()> {
    let txn = db.begin().await?;
    let participant_id = existing.id;

    let removed = Assignment::delete_many()
        .filter(assignment::Column::ParticipantId.eq(participant_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!(
        participant_id,
        assignments_removed = removed.rows_affected,
        "Deleted participant"
    );
    Ok(())
}

/// Deletes a participant and all of their assignments.
///
/// # Errors
/// Returns [`Error::ParticipantNotFound`] if the participant does not exist, or a database error.
#[instrument(skip(db))]
pub async fn delete_participant(db: &DatabaseConnection, participant_id: i64) -> Result<()> {
    let existing = Participant::find_by_id(participant_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ParticipantNotFound {
            name: participant_id.to_string(),
        })?;
    delete_with_assignments(db, existing).await
}

/// Deletes the participant with this name from one receipt.
///
/// # Errors
/// Returns [`Error::ParticipantNotFound`] if nobody on the receipt has that name, or a database error.
#[instrument(skip(db))]
pub async fn delete_participant_by_name(
    db: &DatabaseConnection,
    receipt_id: i64,
    name: &str,
) -> Result<()> {
    let existing = get_participant_by_name(db, receipt_id, name)
        .await?
        .ok_or_else(|| Error::ParticipantNotFound {
            name: name.to_string(),
        })?;
    delete_with_assignments(db, existing).await
}

/// Every distinct participant name used on any receipt, sorted.
///
/// Used to offer previously seen friends when setting up a new receipt.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_known_participant_names(db: &DatabaseConnection) -> Result<Vec<String>> {
    let names: BTreeSet<String> = Participant::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    Ok(names.into_iter().collect())
}

/// Known names containing `partial` (case-insensitive), at most [`MAX_SUGGESTIONS`].
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn suggest_participant_names(
    db: &DatabaseConnection,
    partial: &str,
) -> Result<Vec<String>> {
    let needle = partial.trim().to_lowercase();
    let names: Vec<String> = list_known_participant_names(db)
        .await?
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect();
    trace!("Suggested participant names for '{}': {:?}", partial, names);
    Ok(names)
}
