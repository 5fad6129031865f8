//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod assignment;
pub mod line;
pub mod participant;
pub mod receipt;
pub mod receipt_image;

// Re-export specific types to avoid conflicts
pub use assignment::{
    Column as AssignmentColumn, Entity as Assignment, Model as AssignmentModel,
};
pub use line::{Column as LineColumn, Entity as Line, LineCategory, Model as LineModel};
pub use participant::{
    Column as ParticipantColumn, Entity as Participant, Model as ParticipantModel,
};
pub use receipt::{Column as ReceiptColumn, Entity as Receipt, Model as ReceiptModel};
pub use receipt_image::{
    Column as ReceiptImageColumn, Entity as ReceiptImage, Model as ReceiptImageModel,
};
