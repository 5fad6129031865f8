//! Core business logic - framework-agnostic receipt, line, participant and
//! assignment operations, plus the cost allocator they feed.

/// Per-participant cost allocation (pure)
pub mod allocation;
/// Assignment operations
pub mod assignment;
/// Extraction oracle reply parsing and receipt creation
pub mod extraction;
/// Receipt image URL records
pub mod image;
/// Legacy tax/tip schema adapter
pub mod legacy;
/// Line operations
pub mod line;
/// Participant operations
pub mod participant;
/// Receipt store operations and snapshot loading
pub mod receipt;
/// Currency formatting and text reports
pub mod report;
