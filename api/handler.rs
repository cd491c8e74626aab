use std::sync::Arc;

use appointment_sms_relay::config::{Config, REQUIRED_VARS};
use appointment_sms_relay::{build_dispatcher, telemetry};
use tracing::{error, info};
use vercel_runtime::{run, Error};

mod api {
    use std::sync::Arc;

    use appointment_sms_relay::api;
    use appointment_sms_relay::dispatcher::Dispatcher;
    use tracing::{debug, info, info_span, Instrument};
    pub use vercel_runtime::{Body, Error, Request, Response};

    /// Flattens the platform's body variants into raw bytes.
    pub fn body_bytes(body: Body) -> Vec<u8> {
        match body {
            Body::Binary(bytes) => {
                debug!("Received binary body with {} bytes", bytes.len());
                bytes
            }
            Body::Text(text) => {
                debug!("Received text body with {} characters", text.len());
                text.into_bytes()
            }
            Body::Empty => {
                debug!("Received empty body");
                Vec::new()
            }
        }
    }

    /// Serverless entry point; the platform routes the endpoint path here.
    pub async fn handler(req: Request, dispatcher: Arc<Dispatcher>) -> Result<Response<Body>, Error> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().clone();
        let span = info_span!("request", %trace_id, %method, path = %req.uri().path());

        async move {
            info!("Starting request processing");

            let bytes = body_bytes(req.into_body());
            let reply = api::notify(&dispatcher, &method, &bytes).await;
            info!(status = reply.status.as_u16(), "Request processing completed");

            Ok(api::into_response(reply, &trace_id))
        }
        .instrument(span)
        .await
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    telemetry::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Critical Error: {}", e);
            error!("Required: {}", REQUIRED_VARS.join(", "));
            std::process::exit(1);
        }
    };

    info!(mode = ?config.mode, "Appointment SMS handler initiated...");
    let dispatcher = build_dispatcher(&config);

    match run(move |req| api::handler(req, Arc::clone(&dispatcher))).await {
        Ok(_) => {
            info!("Handler shutdown gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Handler error: {}", e);
            Err(e)
        }
    }
}
