mod deprovision;
mod poller;
mod records;
mod requester;
pub mod retry;

pub use deprovision::Deprovisioner;
pub use poller::{ValidationPoller, ValidationState};
pub use records::DnsRecordManager;
pub use requester::CertificateRequester;
