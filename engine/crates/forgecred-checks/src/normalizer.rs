//! Result normalizer - runs one check and always hands back a well-formed `Outcome`

use crate::loader::panic_message;
use crate::registry::Catalog;
use forgecred_core::{AuthResult, CheckDescriptor, Outcome, RawInputs};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, instrument};

/// Message used when a check returns a verdict without a message
pub const MALFORMED_RESULT: &str = "malformed check result";

/// Invokes checks behind an isolation boundary, optionally under a time budget
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoker {
    budget: Option<Duration>,
}

impl Invoker {
    /// Invoker without a time budget
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Look up a check and invoke it
    pub async fn invoke_by_id(&self, catalog: &Catalog, id: &str, raw: &RawInputs) -> Outcome {
        match catalog.get(id) {
            Ok(descriptor) => self.invoke(&descriptor, raw).await,
            Err(e) => {
                info!("Cannot invoke {}: {}", id, e);
                Outcome::unavailable(e.to_string())
            }
        }
    }

    /// Resolve inputs, run the check and normalize whatever it produced.
    ///
    /// Never returns an error and never propagates a panic.
    #[instrument(skip_all, fields(check = descriptor.identifier()))]
    pub async fn invoke(&self, descriptor: &Arc<CheckDescriptor>, raw: &RawInputs) -> Outcome {
        let inputs = match descriptor.resolve(raw) {
            Ok(inputs) => inputs,
            Err(e) => {
                info!("Input resolution failed: {}", e);
                return Outcome::configuration(format!("configuration error: {}", e));
            }
        };
        debug!("Resolved inputs: {:?}", inputs);

        let check = Arc::clone(descriptor);
        let mut task = AbortOnDrop(tokio::spawn(async move { check.invoke(&inputs).await }));

        let joined = match self.budget {
            Some(budget) => match tokio::time::timeout(budget, &mut task.0).await {
                Ok(joined) => joined,
                Err(_) => {
                    info!("Check exceeded budget of {:?}", budget);
                    return Outcome::timed_out(format!(
                        "check exceeded time budget of {}",
                        seconds(budget)
                    ));
                }
            },
            None => (&mut task.0).await,
        };

        let outcome = match joined {
            Ok(result) => normalize(result),
            Err(e) => join_failure(e),
        };
        debug!("Outcome: {}", outcome);
        outcome
    }
}

/// Aborts the check task when the invoking future goes away first
struct AbortOnDrop(JoinHandle<AuthResult>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Invoke a check without a time budget
pub async fn invoke_safely(descriptor: &Arc<CheckDescriptor>, raw: &RawInputs) -> Outcome {
    Invoker::new().invoke(descriptor, raw).await
}

fn normalize(result: AuthResult) -> Outcome {
    match result {
        Ok(verdict) if !verdict.is_well_formed() => {
            error!(
                "Check returned a verdict without a message (success = {})",
                verdict.success
            );
            Outcome::contract_violation(MALFORMED_RESULT)
        }
        Ok(verdict) if verdict.success => Outcome::verified(verdict.message),
        Ok(verdict) => Outcome::rejected(verdict.message),
        Err(e) => {
            info!("Check returned an error: {:#}", e);
            Outcome::error(describe_error(&e))
        }
    }
}

fn join_failure(err: JoinError) -> Outcome {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = panic_message(payload.as_ref());
        error!("Check panicked: {}", message);
        Outcome::contract_violation(format!("check panicked: {}", message))
    } else {
        error!("Check task was cancelled: {}", err);
        Outcome::contract_violation(format!("check task failed: {}", err))
    }
}

/// Error chain as one line, naming timeouts and refusals from the socket layer
fn describe_error(err: &anyhow::Error) -> String {
    let chain = format!("{:#}", err);
    let io_kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<io::Error>())
        .map(io::Error::kind);

    match io_kind {
        Some(io::ErrorKind::TimedOut) => format!("Connection timed out: {}", chain),
        Some(io::ErrorKind::ConnectionRefused) => format!("Connection refused: {}", chain),
        _ => chain,
    }
}

fn seconds(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}s", secs as u64)
    } else {
        format!("{:.1}s", secs)
    }
}
