pub mod errors;
mod orchestrator;
pub mod types;
mod update;

pub use orchestrator::ProvisioningOrchestrator;
pub use update::{UPDATE_REJECTED_REASON, reject_update};
