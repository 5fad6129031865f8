//! Receipt image records.
//!
//! Uploaded photos live in external blob storage; the store only remembers
//! their URLs, in upload order.

use crate::{
    core::receipt::require_receipt,
    entities::{ReceiptImage, receipt_image},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};

pub(crate) async fn insert_image<C: ConnectionTrait>(
    db: &C,
    receipt_id: i64,
    image_url: &str,
) -> Result<receipt_image::Model> {
    let url = image_url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput {
            message: "Image URL cannot be empty".to_string(),
        });
    }
    let model = receipt_image::ActiveModel {
        receipt_id: Set(receipt_id),
        image_url: Set(url.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Records the URL of an uploaded receipt photo.
///
/// # Errors
/// Returns an error if the URL is blank, the receipt does not exist, or the insert fails.
pub async fn add_receipt_image(
    db: &DatabaseConnection,
    receipt_id: i64,
    image_url: &str,
) -> Result<receipt_image::Model> {
    require_receipt(db, receipt_id).await?;
    insert_image(db, receipt_id, image_url).await
}

/// Retrieves a receipt's images in upload order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_receipt_images(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Vec<receipt_image::Model>> {
    ReceiptImage::find()
        .filter(receipt_image::Column::ReceiptId.eq(receipt_id))
        .order_by_asc(receipt_image::Column::CreatedAt)
        .order_by_asc(receipt_image::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
