pub mod config;
pub mod core;
pub mod domain;
#[cfg(any(test, feature = "integration-tests"))]
pub mod fakes;
pub mod issuance;
pub mod providers;

pub use crate::config::ProvisionerConfig;
pub use crate::core::ProvisioningOrchestrator;
pub use crate::core::errors::{ProvisionError, RequestError};
pub use crate::core::types::{Disposition, ProvisioningOutcome, ProvisioningRequest};
pub use crate::providers::Collaborators;
