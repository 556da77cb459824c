//! Scripted transport doubles shared by the client, service and route tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{GenerateContentRequest, LlmError, Transport};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Successful transport response with this JSON body.
    Respond(Value),
    /// Non-success HTTP status.
    Fail(u16),
    /// Never completes; only cancellation ends the attempt.
    Hang,
    /// Waits for the notify, then responds.
    Gate(Arc<Notify>, Value),
}

/// Plays back a fixed list of steps, one per attempt. Attempts past the end of
/// the script fail with a 500.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            attempts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Milliseconds between consecutive attempts.
    pub(crate) fn gaps_ms(&self) -> Vec<u128> {
        let attempts = self.attempts.lock().unwrap();
        attempts
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }

    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &GenerateContentRequest<'_>) -> Result<Value, LlmError> {
        self.attempts.lock().unwrap().push(Instant::now());
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Fail(500));

        match step {
            Step::Respond(body) => Ok(body),
            Step::Fail(status) => Err(LlmError::Api {
                status,
                message: format!("scripted failure {status}"),
            }),
            Step::Hang => std::future::pending().await,
            Step::Gate(notify, body) => {
                notify.notified().await;
                Ok(body)
            }
        }
    }
}

/// A well-formed `generateContent` envelope carrying `text` in the first part.
pub(crate) fn candidate_envelope(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": text}]
            },
            "finishReason": "STOP"
        }]
    })
}
