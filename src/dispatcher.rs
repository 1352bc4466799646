//! Quota-aware dispatch over the rotating key set.
//!
//! [`Dispatcher::dispatch`] is a bounded loop over the credential set:
//! each quota-exceeded answer retires the key that produced it and retries
//! the same request on the next key. Every other failure returns at once.
//! The loop runs at most once per configured key, so it terminates even
//! when every key is spent.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::credentials::CredentialRotator;
use crate::endpoint::{CallOutcome, EndpointClient, Resource};
use crate::error::{DispatchError, Result};

pub struct Dispatcher {
    client: Arc<dyn EndpointClient>,
    rotator: Arc<CredentialRotator>,
    units_consumed: AtomicU64,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn EndpointClient>, rotator: Arc<CredentialRotator>) -> Self {
        Self {
            client,
            rotator,
            units_consumed: AtomicU64::new(0),
        }
    }

    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    /// Quota units charged by successful calls since construction.
    pub fn units_consumed(&self) -> u64 {
        self.units_consumed.load(Ordering::Relaxed)
    }

    pub async fn dispatch(&self, resource: Resource, params: &[(String, String)]) -> Result<Value> {
        for _ in 0..self.rotator.len() {
            let credential = self.rotator.select_active()?;

            match self.client.call(resource, params, &credential).await {
                CallOutcome::Ok(body) => {
                    self.units_consumed
                        .fetch_add(resource.quota_cost(), Ordering::Relaxed);
                    debug!(resource = resource.path(), key = %credential, "dispatch succeeded");
                    return Ok(body);
                }
                CallOutcome::QuotaExceeded => {
                    self.rotator.mark_exhausted(&credential);
                }
                CallOutcome::OtherApiError(message) => {
                    warn!(resource = resource.path(), %message, "YouTube API error");
                    return Err(DispatchError::Api(message));
                }
                CallOutcome::MalformedBody(detail) => {
                    warn!(resource = resource.path(), %detail, "malformed YouTube API response");
                    return Err(DispatchError::MalformedResponse(format!(
                        "{}: {}",
                        resource.path(),
                        detail
                    )));
                }
                CallOutcome::TransportError(cause) => {
                    warn!(resource = resource.path(), %cause, "YouTube API transport error");
                    return Err(DispatchError::Transport(cause));
                }
            }
        }

        Err(DispatchError::AllCredentialsExhausted)
    }
}
