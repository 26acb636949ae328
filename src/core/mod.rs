/// Aggregate maintenance for the singleton stats row
pub mod stats;
/// Ticket lifecycle operations
pub mod ticket;
/// Verification operations
pub mod verification;
/// Vouch operations and rating formatting
pub mod vouch;

pub use ticket::CloseOutcome;
pub use verification::VerificationOutcome;
