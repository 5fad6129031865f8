//! Shared test utilities for the receipt splitter.
//!
//! This module provides helpers for setting up in-memory test databases,
//! creating stored fixtures with sensible defaults, and building detached
//! entity models for pure allocator tests.

use crate::{
    core::{assignment, line, participant, receipt},
    entities::{self, LineCategory},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all store tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a stored receipt with a total of 100.0.
pub async fn create_test_receipt(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::receipt::Model> {
    receipt::create_receipt(db, name, 100.0).await
}

/// Sets up a receipt with one item, one fee, one participant and one assignment.
///
/// # Defaults
/// * receipt: "Test Receipt", total 22.0
/// * lines: "Test Item" (ITEM, 20.0) and "Tax" (FEE, 2.0)
/// * participant: "Test Friend", assigned to "Test Item"
///
/// Returns (receipt, lines, participant).
pub async fn setup_with_assignment(
    db: &DatabaseConnection,
) -> Result<(
    entities::receipt::Model,
    Vec<entities::line::Model>,
    entities::participant::Model,
)> {
    let receipt = receipt::create_receipt(db, "Test Receipt", 22.0).await?;
    let lines = line::create_lines(
        db,
        receipt.id,
        vec![
            line::NewLine::item("Test Item", 20.0),
            line::NewLine::fee("Tax", 2.0),
        ],
    )
    .await?;
    let friend = participant::add_participant(db, receipt.id, "Test Friend").await?;
    assignment::add_assignment(db, lines[0].id, friend.id).await?;
    Ok((receipt, lines, friend))
}

fn fixed_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Detached receipt model with id 1 and the given total.
#[must_use]
pub fn snapshot_receipt(total: f64) -> entities::receipt::Model {
    entities::receipt::Model {
        id: 1,
        name: "Snapshot".to_string(),
        total,
        created_at: fixed_time(),
    }
}

/// Detached line model on receipt 1.
#[must_use]
pub fn snapshot_line(
    id: i64,
    name: &str,
    price: f64,
    category: LineCategory,
) -> entities::line::Model {
    entities::line::Model {
        id,
        receipt_id: 1,
        position: 0,
        name: name.to_string(),
        price,
        category,
    }
}

/// Detached participant model on receipt 1.
#[must_use]
pub fn snapshot_participant(id: i64, name: &str) -> entities::participant::Model {
    entities::participant::Model {
        id,
        receipt_id: 1,
        name: name.to_string(),
        created_at: fixed_time(),
    }
}

/// Detached assignment model on receipt 1.
#[must_use]
pub const fn snapshot_assignment(
    id: i64,
    line_id: i64,
    participant_id: i64,
) -> entities::assignment::Model {
    entities::assignment::Model {
        id,
        receipt_id: 1,
        line_id,
        participant_id,
    }
}
