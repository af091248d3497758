//! Timing decorator for external service clients

use super::builtins::ClientTimerFields;
use super::timer::{millis, Outcome};
use super::Monitor;
use async_trait::async_trait;
use std::time::Instant;

/// A client of an external service that dispatches named operations
///
/// Implement this for an SDK client (or a thin adapter over one) and wrap it
/// with [`Monitor::instrument_client`] to time every call.
#[async_trait]
pub trait ExternalClient: Send + Sync {
    type Request: Send;
    type Response: Send;

    /// Identifier of the remote service, e.g. `s3`
    fn service_identifier(&self) -> &str;

    fn region(&self) -> Option<&str> {
        None
    }

    /// Send one request; the returned future resolves when it completes
    async fn dispatch(&self, operation: &str, request: Self::Request) -> Self::Response;
}

/// An [`ExternalClient`] that emits a `monitor.clientTimer` record each
/// time a dispatched call completes
///
/// Requests and responses pass through untouched.
pub struct TimedClient<C> {
    client: C,
    monitor: Monitor,
}

impl<C> TimedClient<C> {
    pub fn get_ref(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }
}

#[async_trait]
impl<C: ExternalClient> ExternalClient for TimedClient<C> {
    type Request = C::Request;
    type Response = C::Response;

    fn service_identifier(&self) -> &str {
        self.client.service_identifier()
    }

    fn region(&self) -> Option<&str> {
        self.client.region()
    }

    async fn dispatch(&self, operation: &str, request: Self::Request) -> Self::Response {
        let start = Instant::now();
        let outcome = Outcome::observe_future(self.client.dispatch(operation, request)).await;
        self.monitor.emit_builtin(
            &ClientTimerFields {
                service: self.client.service_identifier(),
                operation,
                duration: millis(start.elapsed()),
                region: self.client.region(),
            },
            None,
        );
        outcome.forward()
    }
}

impl Monitor {
    pub fn instrument_client<C: ExternalClient>(&self, client: C) -> TimedClient<C> {
        TimedClient {
            client,
            monitor: self.clone(),
        }
    }
}
