#![warn(clippy::all, missing_docs)]

//! Core domain logic for the fleetdesk transport portal.
//!
//! This crate hosts the fleet records, configuration handling, the CSV
//! record store with its rollback journal, and the ledger operations used
//! by the terminal UI.

pub mod config;
pub mod error;
pub mod ledger;
#[allow(missing_docs)]
pub mod models;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::FleetLedger;
pub use models::{Booking, BookingView, Client, Vehicle, VehicleStatus};
pub use session::ClientSession;
pub use store::{Changeset, RecordKind, RecordStore};
