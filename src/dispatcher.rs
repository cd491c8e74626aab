//! Validates appointment requests and relays them as text messages.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::GatewayConfig;
use crate::models::{AppointmentRequest, MessageId};
use crate::sms::{GatewayError, SmsGateway};

const CLIENT_NAME: &str = "clientName";
const APPOINTMENT_DATE: &str = "appointmentDate";
const APPOINTMENT_TIME: &str = "appointmentTime";
const CLIENT_PHONE_NUMBER: &str = "clientPhoneNumber";

/// Who receives messages for an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationMode {
    /// Owner gets the details, client gets an acknowledgment.
    #[default]
    Dual,
    /// Only the owner is notified.
    Single,
}

impl NotificationMode {
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            NotificationMode::Dual => &[
                CLIENT_NAME,
                APPOINTMENT_DATE,
                APPOINTMENT_TIME,
                CLIENT_PHONE_NUMBER,
            ],
            NotificationMode::Single => &[CLIENT_NAME, APPOINTMENT_DATE, APPOINTMENT_TIME],
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            NotificationMode::Dual => "SMS notifications sent.",
            NotificationMode::Single => "SMS notification sent.",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            NotificationMode::Dual => "Failed to send SMS notifications.",
            NotificationMode::Single => "Failed to send SMS notification.",
        }
    }

    /// Checks the request against this mode's required fields.
    pub fn validate(self, request: AppointmentRequest) -> Result<Appointment, ValidationError> {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }

        let missing: Vec<&'static str> = self
            .required_fields()
            .iter()
            .copied()
            .filter(|field| {
                let value = match *field {
                    CLIENT_NAME => &request.client_name,
                    APPOINTMENT_DATE => &request.appointment_date,
                    APPOINTMENT_TIME => &request.appointment_time,
                    _ => &request.client_phone_number,
                };
                !present(value)
            })
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError {
                required: self.required_fields(),
                missing,
            });
        }

        Ok(Appointment {
            client_name: request.client_name.unwrap_or_default(),
            appointment_date: request.appointment_date.unwrap_or_default(),
            appointment_time: request.appointment_time.unwrap_or_default(),
            client_phone_number: match self {
                NotificationMode::Dual => request.client_phone_number,
                NotificationMode::Single => None,
            },
        })
    }

    /// Lays out the messages to send, in send order.
    pub fn compose(self, appointment: &Appointment, owner_number: &str) -> Vec<Notice> {
        let Appointment {
            client_name,
            appointment_date,
            appointment_time,
            client_phone_number,
        } = appointment;

        match (self, client_phone_number) {
            (NotificationMode::Dual, Some(client_phone)) => vec![
                Notice {
                    recipient: Recipient::Owner,
                    to: owner_number.to_string(),
                    body: format!(
                        "New Appointment Request! Client: {client_name}, Phone: {client_phone}, Date: {appointment_date}, Time: {appointment_time}."
                    ),
                },
                Notice {
                    recipient: Recipient::Client,
                    to: client_phone.clone(),
                    body: format!(
                        "Hello {client_name}, your appointment request has been received. Please wait for an approved text message confirmation for your appointment."
                    ),
                },
            ],
            _ => vec![Notice {
                recipient: Recipient::Owner,
                to: owner_number.to_string(),
                body: format!(
                    "New Appointment Request! Client: {client_name}, Date: {appointment_date}, Time: {appointment_time}."
                ),
            }],
        }
    }
}

impl FromStr for NotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dual" => Ok(NotificationMode::Dual),
            "single" => Ok(NotificationMode::Single),
            other => Err(other.to_string()),
        }
    }
}

/// A request that passed validation for the active mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub client_name: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub client_phone_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Owner,
    Client,
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Owner => f.write_str("owner"),
            Recipient::Client => f.write_str("client"),
        }
    }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: Recipient,
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Missing required parameters ({}).", .required.join(", "))]
pub struct ValidationError {
    pub required: &'static [&'static str],
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to notify {recipient}: {source}")]
    Gateway {
        recipient: Recipient,
        #[source]
        source: GatewayError,
    },
}

pub struct Dispatcher {
    gateway: Arc<dyn SmsGateway>,
    config: GatewayConfig,
    mode: NotificationMode,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn SmsGateway>, config: GatewayConfig, mode: NotificationMode) -> Self {
        Self {
            gateway,
            config,
            mode,
        }
    }

    pub fn mode(&self) -> NotificationMode {
        self.mode
    }

    /// Validates the request and sends every message for the active mode.
    ///
    /// Sends go out one at a time, owner first. The first gateway failure
    /// abandons the remaining sends. Nothing is deduplicated: the same
    /// request submitted twice is delivered twice.
    #[instrument(skip(self, request), fields(mode = ?self.mode))]
    pub async fn handle_appointment_notification(
        &self,
        request: AppointmentRequest,
    ) -> Result<Vec<MessageId>, DispatchError> {
        let appointment = self.mode.validate(request).map_err(|err| {
            info!(missing = ?err.missing, "Rejecting appointment request");
            err
        })?;

        let notices = self.mode.compose(&appointment, &self.config.owner_number);
        let mut sent = Vec::with_capacity(notices.len());

        for notice in notices {
            match self
                .gateway
                .send(&notice.body, &notice.to, &self.config.sender_number)
                .await
            {
                Ok(id) => {
                    info!(recipient = %notice.recipient, sid = %id, "SMS sent");
                    sent.push(id);
                }
                Err(err) => {
                    error!(recipient = %notice.recipient, "Error sending SMS: {}", err);
                    if let Some(code) = err.code {
                        error!("Gateway error code: {}", code);
                    }
                    return Err(DispatchError::Gateway {
                        recipient: notice.recipient,
                        source: err,
                    });
                }
            }
        }

        info!("{} SMS notification(s) sent successfully", sent.len());
        Ok(sent)
    }
}
