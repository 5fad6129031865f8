//! Receipt entity - The aggregate root of a bill split.
//!
//! A receipt owns its lines, participants, assignments and images. None of
//! those rows outlive the receipt they belong to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Receipt database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    /// Unique identifier for the receipt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Friday dinner")
    pub name: String,
    /// Grand total as extracted or entered by the user
    pub total: f64,
    /// When the receipt was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Receipt and its owned rows
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One receipt has many lines
    #[sea_orm(has_many = "super::line::Entity")]
    Lines,
    /// One receipt has many participants
    #[sea_orm(has_many = "super::participant::Entity")]
    Participants,
    /// One receipt has many assignments
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
    /// One receipt has many uploaded images
    #[sea_orm(has_many = "super::receipt_image::Entity")]
    Images,
}

impl Related<super::line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::receipt_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
