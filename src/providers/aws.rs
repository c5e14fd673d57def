use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_acm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::runtime::Runtime;

use crate::core::errors::ProviderError;

/// Shared AWS configuration plus the runtime that drives the async SDK clients.
///
/// The provisioner itself is synchronous; every SDK call is a `block_on` on this runtime.
#[derive(Clone)]
pub struct AwsRuntime {
    runtime: Arc<Runtime>,
    config: SdkConfig,
}

impl AwsRuntime {
    /// Loads region and credentials from the default provider chain.
    pub fn load() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;
        let config = runtime.block_on(aws_config::defaults(BehaviorVersion::latest()).load());
        Ok(Self {
            runtime: Arc::new(runtime),
            config,
        })
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Maps an SDK failure onto the provider error model.
///
/// The service error code drives classification. Failures without one (dispatch,
/// timeouts, unparseable responses) become transport errors carrying the full chain.
pub(crate) fn sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let code = err.code().map(str::to_string);
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    ProviderError::from_service(code.as_deref(), message)
}
