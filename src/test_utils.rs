use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::MessageId;
use crate::sms::{GatewayError, SmsGateway};

/// A send as observed by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub body: String,
    pub to: String,
    pub from: String,
}

/// Fake gateway that records every send.
///
/// Outcomes are scripted in order; once the script runs out every send succeeds.
/// A send is recorded only after the configured delay has elapsed.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<SentMessage>>,
    script: Mutex<VecDeque<Option<GatewayError>>>,
    next_id: AtomicUsize,
    delay: Option<Duration>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send take `delay` before it completes.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn succeed_next(&self) {
        self.script.lock().unwrap().push_back(None);
    }

    pub fn fail_next(&self, error: GatewayError) {
        self.script.lock().unwrap().push_back(Some(error));
    }

    pub fn calls(&self) -> Vec<SentMessage> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, body: &str, to: &str, from: &str) -> Result<MessageId, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(SentMessage {
            body: body.to_string(),
            to: to.to_string(),
            from: from.to_string(),
        });

        match self.script.lock().unwrap().pop_front().flatten() {
            Some(error) => Err(error),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(MessageId(format!("SM{n:032}")))
            }
        }
    }
}
