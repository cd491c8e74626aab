use std::net::SocketAddr;
use std::process::ExitCode;

use appointment_sms_relay::config::{Config, REQUIRED_VARS};
use appointment_sms_relay::{build_dispatcher, server, telemetry};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Critical Error: {}", e);
            error!("Required: {}", REQUIRED_VARS.join(", "));
            return ExitCode::FAILURE;
        }
    };

    info!(mode = ?config.mode, "Appointment SMS relay starting...");

    let dispatcher = build_dispatcher(&config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("SMS server running on port {}", config.port);
    server::serve(listener, dispatcher, server::shutdown_signal()).await;

    ExitCode::SUCCESS
}
