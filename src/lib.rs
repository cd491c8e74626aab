//! Relays appointment requests received over HTTP to the business owner,
//! and optionally the client, as text messages.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod models;
pub mod server;
pub mod sms;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use config::Config;
use dispatcher::Dispatcher;
use sms::TwilioClient;

/// Wires the Twilio client into a dispatcher for the configured mode.
pub fn build_dispatcher(config: &Config) -> Arc<Dispatcher> {
    let gateway = Arc::new(TwilioClient::new(&config.gateway, config.api_base_url.clone()));
    Arc::new(Dispatcher::new(gateway, config.gateway.clone(), config.mode))
}
