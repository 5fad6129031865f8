//! Participant entity - A person splitting the bill.
//!
//! Names are unique within a receipt. Assignments reference participants by
//! `id`, so renaming a participant never breaks their assignments.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Participant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    /// Unique identifier for the participant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Receipt this participant is splitting
    pub receipt_id: i64,
    /// Display name
    pub name: String,
    /// When the participant was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Participant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each participant belongs to one receipt
    #[sea_orm(
        belongs_to = "super::receipt::Entity",
        from = "Column::ReceiptId",
        to = "super::receipt::Column::Id"
    )]
    Receipt,
    /// One participant has many assignments
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
