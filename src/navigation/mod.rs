//! Navigation authority and per-display-unit bookkeeping.

pub mod guard;
pub mod records;

pub use guard::{Decision, NavigationGuard};
pub use records::NavigationTable;
