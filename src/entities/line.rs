//! Line entity - One row printed on a receipt.
//!
//! A line is either an [`LineCategory::Item`], split among whoever consumed it,
//! or a [`LineCategory::Fee`] (tax, tip, service charge) that is spread over all
//! participants in proportion to their item spend.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a line is a purchasable item or a proportional fee.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum LineCategory {
    /// A good or service consumed by one or more participants
    #[default]
    #[sea_orm(string_value = "ITEM")]
    #[serde(rename = "ITEM")]
    Item,
    /// Tax, tip, service charge, delivery fee
    #[sea_orm(string_value = "FEE")]
    #[serde(rename = "FEE")]
    Fee,
}

/// Line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lines")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Receipt this line was printed on
    pub receipt_id: i64,
    /// Zero-based position on the receipt
    pub position: i32,
    /// Text as printed (e.g., "Pad Thai", "Sales Tax")
    pub name: String,
    /// Price in currency units, never negative
    pub price: f64,
    /// Item or fee; fixed at creation unless edited explicitly
    pub category: LineCategory,
}

impl Model {
    /// Returns true for lines that can be assigned to participants.
    #[must_use]
    pub fn is_item(&self) -> bool {
        self.category == LineCategory::Item
    }
}

/// Defines relationships between Line and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one receipt
    #[sea_orm(
        belongs_to = "super::receipt::Entity",
        from = "Column::ReceiptId",
        to = "super::receipt::Column::Id"
    )]
    Receipt,
    /// One item line has many assignments
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
