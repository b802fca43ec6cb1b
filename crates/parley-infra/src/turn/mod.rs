//! Turn transports.
//!
//! - [`http::HttpTurnTransport`] streams a turn from an external SSE endpoint.
//! - [`echo::EchoTransport`] answers locally by echoing the user's text; used
//!   when no endpoint is configured.

pub mod echo;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use parley_core::turn::transport::TurnTransport;
use parley_types::config::TurnConfig;
use parley_types::error::TurnError;
use secrecy::SecretString;

/// Pick the transport for this process from configuration.
pub fn transport_from_config(
    config: &TurnConfig,
    api_key: Option<SecretString>,
) -> Result<Arc<dyn TurnTransport>, TurnError> {
    match &config.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "using HTTP turn transport");
            let transport = http::HttpTurnTransport::new(
                endpoint.clone(),
                api_key,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(transport))
        }
        None => {
            tracing::info!("no turn endpoint configured, using echo transport");
            Ok(Arc::new(echo::EchoTransport::default()))
        }
    }
}
