//! apivcs core library: domain types, revision ledger persistence, errors.
//!
//! - [`types`]: project keys, outcomes and ledger documents
//! - [`error`]: [`LedgerError`]
//! - [`ledger`]: load / save / init / baseline / record

pub mod error;
pub mod ledger;
pub mod types;

pub use error::LedgerError;
pub use types::{
    EnvironmentLedger, EnvironmentName, Ledger, LedgerEntry, ProjectKey, ProjectOutcome,
    ProjectTable, ProjectType, RepositoryIdentity, RevType,
};
