//! Transport-independent request handling for the notification endpoint.
//!
//! Both the standalone server and the serverless handler funnel raw request
//! parts through [`route`] / [`notify`] and turn the resulting [`Reply`] into
//! an `http::Response` with [`into_response`].

use std::sync::Arc;

use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use http::{Method, Response, StatusCode};
use tracing::{debug, error, warn, Instrument};

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::models::{AppointmentRequest, NotificationOutcome};

pub const NOTIFY_PATH: &str = "/send-appointment-sms";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Status plus serialized JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn outcome(status: StatusCode, outcome: &NotificationOutcome) -> Self {
        let body = match serde_json::to_string(outcome) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                r#"{"success":false,"message":"Internal server error."}"#.to_string()
            }
        };
        Self { status, body }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Routes a request by path, then hands it to [`notify`].
pub async fn route(dispatcher: &Arc<Dispatcher>, method: &Method, path: &str, body: &[u8]) -> Reply {
    if path != NOTIFY_PATH {
        debug!("No route for path: {}", path);
        return Reply::outcome(StatusCode::NOT_FOUND, &NotificationOutcome::failure("Not found."));
    }
    notify(dispatcher, method, body).await
}

/// Handles a request already known to target the notification endpoint.
pub async fn notify(dispatcher: &Arc<Dispatcher>, method: &Method, body: &[u8]) -> Reply {
    if *method == Method::OPTIONS {
        return Reply::empty(StatusCode::NO_CONTENT);
    }
    if *method != Method::POST {
        return Reply::outcome(
            StatusCode::METHOD_NOT_ALLOWED,
            &NotificationOutcome::failure("Method not allowed."),
        );
    }

    let request = match parse_body(body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Failed to parse JSON body: {}", e);
            return Reply::outcome(
                StatusCode::BAD_REQUEST,
                &NotificationOutcome::failure("Invalid JSON body."),
            );
        }
    };
    debug!("Parsed request data: {:?}", request);

    let mode = dispatcher.mode();

    // Run the sends on their own task so a dropped connection cannot cancel them.
    // The task stays inside the request span so its logs keep the trace id.
    let task_dispatcher = Arc::clone(dispatcher);
    let joined = tokio::spawn(
        async move { task_dispatcher.handle_appointment_notification(request).await }
            .in_current_span(),
    )
    .await;

    match joined {
        Ok(Ok(_)) => Reply::outcome(
            StatusCode::OK,
            &NotificationOutcome::success(mode.success_message()),
        ),
        Ok(Err(DispatchError::Validation(err))) => Reply::outcome(
            StatusCode::BAD_REQUEST,
            &NotificationOutcome::failure(err.to_string()),
        ),
        Ok(Err(DispatchError::Gateway { source, .. })) => Reply::outcome(
            StatusCode::INTERNAL_SERVER_ERROR,
            &NotificationOutcome::failure(mode.failure_message()).with_error(source.message),
        ),
        Err(e) => {
            error!("Dispatch task failed: {}", e);
            Reply::outcome(
                StatusCode::INTERNAL_SERVER_ERROR,
                &NotificationOutcome::failure(mode.failure_message()),
            )
        }
    }
}

fn parse_body(body: &[u8]) -> Result<AppointmentRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AppointmentRequest::default());
    }
    serde_json::from_slice(body)
}

/// Builds the outgoing response with JSON, CORS and trace headers applied.
pub fn into_response<B: From<String>>(reply: Reply, trace_id: &str) -> Response<B> {
    let mut response = Response::new(B::from(reply.body));
    *response.status_mut() = reply.status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        headers.insert(TRACE_ID_HEADER, value);
    }

    response
}
