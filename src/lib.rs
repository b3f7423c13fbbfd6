//! Payment Registration System provisioner.
//!
//! Creates the application's MongoDB account with a single `readWrite` grant
//! on its database, as a fixed pipeline of steps run against a
//! [`prs_kernel::UserAdmin`] backend.

pub mod pipeline;
pub mod provisioner;
pub mod steps;

pub use provisioner::{ProvisionOutcome, Provisioner, CONFIRMATION};
