//! Extraction oracle boundary.
//!
//! An external vision model reads the receipt photos and answers with JSON,
//! either `{ "lines": [{ "name", "price", "lineType" }], "total" }` or
//! `{ "error": "..." }`. The reply often arrives wrapped in a markdown fence.
//! This module turns that text into an [`ExtractedReceipt`] and stores it as a
//! new receipt. Calling the model itself happens elsewhere.

use crate::{
    core::{image::insert_image, line, receipt::insert_receipt},
    entities::receipt,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Difference between the extracted total and the line sum worth flagging.
const TOTAL_MISMATCH_TOLERANCE: f64 = 0.005;

/// Structured content of one or more receipt photos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    /// Every printed line, items and fees, in receipt order
    pub lines: Vec<line::NewLine>,
    /// Grand total printed on the receipt
    pub total: f64,
}

impl ExtractedReceipt {
    /// Sum of all extracted line prices, fees included.
    #[must_use]
    pub fn line_sum(&self) -> f64 {
        self.lines.iter().map(|l| l.price).sum()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OracleReply {
    Failure { error: String },
    Success(ExtractedReceipt),
}

/// Finds the JSON object inside the oracle's reply.
fn locate_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Parses the oracle's textual reply.
///
/// # Errors
/// Returns [`Error::Extraction`] if the oracle reported an error or the reply
/// is not one of the two expected JSON shapes.
pub fn parse_extraction_response(text: &str) -> Result<ExtractedReceipt> {
    let json = locate_json(text);
    let reply: OracleReply = serde_json::from_str(json).map_err(|e| Error::Extraction {
        message: format!("Unrecognized extraction reply: {e}"),
    })?;

    match reply {
        OracleReply::Failure { error } => Err(Error::Extraction { message: error }),
        OracleReply::Success(extracted) => Ok(extracted),
    }
}

/// Stores an extracted receipt together with the URLs of its source photos.
///
/// Receipt, lines and image records are written in one transaction.
///
/// # Errors
/// Returns an error if:
/// - A line name is blank or a price/total is negative or not finite
/// - A database operation fails
#[instrument(skip(db, extracted, image_urls), fields(lines = extracted.lines.len(), images = image_urls.len()))]
pub async fn create_receipt_from_extraction(
    db: &DatabaseConnection,
    name: &str,
    extracted: ExtractedReceipt,
    image_urls: &[String],
) -> Result<receipt::Model> {
    line::validate_lines(&extracted.lines)?;

    let line_sum = extracted.line_sum();
    if (line_sum - extracted.total).abs() > TOTAL_MISMATCH_TOLERANCE {
        warn!(
            line_sum,
            total = extracted.total,
            "Extracted total disagrees with the sum of its lines"
        );
    }

    let txn = db.begin().await?;
    let receipt = insert_receipt(&txn, name, extracted.total).await?;
    line::insert_lines(&txn, receipt.id, 0, extracted.lines).await?;
    for url in image_urls {
        insert_image(&txn, receipt.id, url).await?;
    }
    txn.commit().await?;

    info!(receipt_id = receipt.id, "Created receipt from extraction");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{image::get_receipt_images, receipt::load_snapshot};
    use crate::entities::LineCategory;
    use crate::test_utils::*;

    const FENCED_REPLY: &str = r#"Here is the receipt:
```json
{
  "lines": [
    { "name": "Pad Thai", "price": 14.5, "lineType": "ITEM" },
    { "name": "Spring Rolls", "price": 6.0, "lineType": "ITEM" },
    { "name": "Tax", "price": 1.85, "lineType": "FEE" }
  ],
  "total": 22.35
}
```"#;

    #[test]
    fn test_parse_fenced_reply() {
        let extracted = parse_extraction_response(FENCED_REPLY).unwrap();
        assert_eq!(extracted.lines.len(), 3);
        assert_eq!(extracted.lines[0].name, "Pad Thai");
        assert_eq!(extracted.lines[2].category, LineCategory::Fee);
        assert_eq!(extracted.total, 22.35);
    }

    #[test]
    fn test_parse_bare_reply_defaults_to_item() {
        let reply = r#"Sure! {"lines": [{"name": "Coffee", "price": 3.5}], "total": 3.5} Enjoy."#;
        let extracted = parse_extraction_response(reply).unwrap();
        assert_eq!(extracted.lines[0].category, LineCategory::Item);
        assert!((extracted.line_sum() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_error_reply() {
        let reply = r#"{"error": "Unable to process image. Please upload a valid receipt."}"#;
        let result = parse_extraction_response(reply);
        assert!(matches!(
            result,
            Err(Error::Extraction { message }) if message.starts_with("Unable to process image")
        ));
    }

    #[test]
    fn test_parse_garbage_reply() {
        assert!(matches!(
            parse_extraction_response("I could not read that."),
            Err(Error::Extraction { .. })
        ));
        assert!(matches!(
            parse_extraction_response(r#"{"lines": [{"name": "X", "price": 1, "lineType": "BOGUS"}], "total": 1}"#),
            Err(Error::Extraction { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_receipt_from_extraction() -> Result<()> {
        let db = setup_test_db().await?;
        let extracted = parse_extraction_response(FENCED_REPLY)?;
        let urls = vec![
            "https://blob.example/receipt-1.jpg".to_string(),
            "https://blob.example/receipt-2.jpg".to_string(),
        ];

        let receipt = create_receipt_from_extraction(&db, "", extracted, &urls).await?;
        assert_eq!(receipt.name, "Unnamed Receipt");
        assert_eq!(receipt.total, 22.35);

        let snapshot = load_snapshot(&db, receipt.id).await?;
        let names: Vec<&str> = snapshot.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Pad Thai", "Spring Rolls", "Tax"]);
        assert!(snapshot.participants.is_empty());
        assert!(snapshot.assignments.is_empty());

        assert_eq!(get_receipt_images(&db, receipt.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_receipt_from_extraction_rejects_bad_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let extracted = ExtractedReceipt {
            lines: vec![line::NewLine::item("Refund", -4.0)],
            total: 0.0,
        };

        let result = create_receipt_from_extraction(&db, "Bad", extracted, &[]).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        assert!(crate::core::receipt::list_receipts(&db).await?.is_empty());
        Ok(())
    }
}
