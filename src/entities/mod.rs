//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities mirror the four record collections: tickets, vouches,
//! verifications, and the singleton stats row.

pub mod stats;
pub mod ticket;
pub mod verification;
pub mod vouch;

// Re-export specific types to avoid conflicts
pub use stats::{Column as StatsColumn, Entity as StatsEntity, Model as StatsModel};
pub use ticket::{Column as TicketColumn, Entity as Ticket, Model as TicketModel};
pub use verification::{
    Column as VerificationColumn, Entity as Verification, Model as VerificationModel,
};
pub use vouch::{Column as VouchColumn, Entity as Vouch, Model as VouchModel};
