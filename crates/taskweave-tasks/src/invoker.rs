//! Leaf invocation
//!
//! Every calling convention (direct return, future, completion signal,
//! capability object) is driven to exactly one outcome here, so the
//! scheduler only ever awaits a single future per leaf.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::error::TaskError;
use crate::task::{Call, CallableKind, Completion, Receiver, TaskDefinition};

/// Runs one leaf definition against the shared data value
#[derive(Clone, Default)]
pub struct Invoker {
    receiver: Option<Receiver>,
}

impl Invoker {
    /// Create an invoker, optionally binding callables to a receiver
    pub fn new(receiver: Option<Receiver>) -> Self {
        Self { receiver }
    }

    /// Whether callables are invoked with a binding target
    pub fn is_bound(&self) -> bool {
        self.receiver.is_some()
    }

    /// Invoke a leaf and wait for its outcome.
    ///
    /// A panic inside the leaf becomes [`TaskError::Panicked`]; aliases are
    /// rejected with [`TaskError::NotInvocable`].
    pub async fn invoke<D>(
        &self,
        name: &str,
        definition: &TaskDefinition<D>,
        data: &Arc<D>,
    ) -> Result<Value, TaskError>
    where
        D: Send + Sync + 'static,
    {
        let outcome = match definition {
            TaskDefinition::Callable(callable) => {
                let call = Call::new(name, Arc::clone(data), self.receiver.clone());
                let kind = &callable.kind;
                debug!(task = name, convention = callable.convention(), "invoking callable");
                AssertUnwindSafe(async move {
                    match kind {
                        CallableKind::Sync(f) => f(call),
                        CallableKind::Async(f) => f(call).await,
                        CallableKind::Signal(f) => {
                            let (completion, rx) = Completion::channel();
                            f(call, completion);
                            rx.await.unwrap_or_else(|_| {
                                Err(anyhow::anyhow!(
                                    "completion signal dropped without a result"
                                ))
                            })
                        }
                    }
                })
                .catch_unwind()
                .await
            }
            TaskDefinition::Capability(executable) => {
                debug!(task = name, "invoking capability object");
                AssertUnwindSafe(executable.execute(Arc::clone(data)))
                    .catch_unwind()
                    .await
            }
            TaskDefinition::Alias(_) => return Err(TaskError::NotInvocable(name.to_string())),
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => Err(TaskError::leaf(name, cause)),
            Err(payload) => Err(TaskError::Panicked {
                task: name.to_string(),
                message: panic_message(&*payload),
            }),
        }
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
