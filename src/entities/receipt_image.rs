//! Receipt image entity - URL of an uploaded photo of the receipt.
//! The blob itself lives in external storage; only its URL is kept here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Receipt image database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_images")]
pub struct Model {
    /// Unique identifier for the image record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Receipt the photo belongs to
    pub receipt_id: i64,
    /// Public URL of the stored image
    pub image_url: String,
    /// When the image was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ReceiptImage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each image belongs to one receipt
    #[sea_orm(
        belongs_to = "super::receipt::Entity",
        from = "Column::ReceiptId",
        to = "super::receipt::Column::Id"
    )]
    Receipt,
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
