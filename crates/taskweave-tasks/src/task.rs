//! Task definitions and the leaf calling conventions

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::oneshot;

use taskweave_core::TaskRef;

/// What a leaf produces: its own result value, or its failure
pub type LeafResult = anyhow::Result<Value>;

/// A binding target handed to plain callables as their receiver
pub type Receiver = Arc<dyn Any + Send + Sync>;

/// Arguments of one callable invocation
pub struct Call<D> {
    name: String,
    data: Arc<D>,
    receiver: Option<Receiver>,
}

impl<D> Call<D> {
    pub(crate) fn new(name: impl Into<String>, data: Arc<D>, receiver: Option<Receiver>) -> Self {
        Self {
            name: name.into(),
            data,
            receiver,
        }
    }

    /// Name the leaf was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The run's shared data value
    pub fn data(&self) -> &D {
        &self.data
    }

    /// A handle to the shared data value that can outlive this call
    pub fn shared_data(&self) -> Arc<D> {
        Arc::clone(&self.data)
    }

    /// The engine's binding target, if one was configured and has type `T`
    pub fn receiver<T: Any>(&self) -> Option<&T> {
        self.receiver.as_deref()?.downcast_ref::<T>()
    }
}

impl<D> Clone for Call<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            data: Arc::clone(&self.data),
            receiver: self.receiver.clone(),
        }
    }
}

impl<D> fmt::Debug for Call<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("name", &self.name)
            .field("bound", &self.receiver.is_some())
            .finish()
    }
}

/// Explicit completion signal for callback-style leaves.
///
/// Dropping it without calling [`Completion::complete`] fails the leaf.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<LeafResult>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<LeafResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report the leaf's outcome
    pub fn complete(self, result: LeafResult) {
        // The receiver is gone only if the run itself was dropped.
        let _ = self.tx.send(result);
    }

    /// Report success with a result value
    pub fn succeed(self, value: Value) {
        self.complete(Ok(value));
    }

    /// Report failure
    pub fn fail(self, error: impl Into<anyhow::Error>) {
        self.complete(Err(error.into()));
    }
}

/// An object exposing an `execute` capability.
///
/// Capability objects own their receiver and are never rebound by the engine.
#[async_trait]
pub trait Executable<D>: Send + Sync {
    /// Run against the shared data value
    async fn execute(&self, data: Arc<D>) -> LeafResult;
}

type SyncFn<D> = dyn Fn(Call<D>) -> LeafResult + Send + Sync;
type AsyncFn<D> = dyn Fn(Call<D>) -> BoxFuture<'static, LeafResult> + Send + Sync;
type SignalFn<D> = dyn Fn(Call<D>, Completion) + Send + Sync;

/// A plain callable leaf in one of its calling conventions
pub struct Callable<D> {
    pub(crate) kind: CallableKind<D>,
}

pub(crate) enum CallableKind<D> {
    /// Returns its result directly
    Sync(Arc<SyncFn<D>>),
    /// Returns a future
    Async(Arc<AsyncFn<D>>),
    /// Signals completion through a [`Completion`]
    Signal(Arc<SignalFn<D>>),
}

impl<D> Callable<D> {
    /// Calling convention name, for logs and plan outlines
    pub fn convention(&self) -> &'static str {
        match self.kind {
            CallableKind::Sync(_) => "sync",
            CallableKind::Async(_) => "async",
            CallableKind::Signal(_) => "callback",
        }
    }
}

impl<D> Clone for Callable<D> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            CallableKind::Sync(f) => CallableKind::Sync(Arc::clone(f)),
            CallableKind::Async(f) => CallableKind::Async(Arc::clone(f)),
            CallableKind::Signal(f) => CallableKind::Signal(Arc::clone(f)),
        };
        Self { kind }
    }
}

/// A registry entry
pub enum TaskDefinition<D> {
    /// A plain callable
    Callable(Callable<D>),
    /// An object with an `execute` capability
    Capability(Arc<dyn Executable<D>>),
    /// A named group of task references
    Alias(Vec<TaskRef>),
}

impl<D: 'static> TaskDefinition<D> {
    /// A callable that returns its result directly
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Call<D>) -> LeafResult + Send + Sync + 'static,
    {
        Self::Callable(Callable {
            kind: CallableKind::Sync(Arc::new(f)),
        })
    }

    /// A callable that returns a future
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Call<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LeafResult> + Send + 'static,
    {
        Self::Callable(Callable {
            kind: CallableKind::Async(Arc::new(move |call| f(call).boxed())),
        })
    }

    /// A callable that reports its outcome through a [`Completion`] signal
    pub fn from_callback<F>(f: F) -> Self
    where
        F: Fn(Call<D>, Completion) + Send + Sync + 'static,
    {
        Self::Callable(Callable {
            kind: CallableKind::Signal(Arc::new(f)),
        })
    }

    /// A capability object
    pub fn capability<E>(executable: E) -> Self
    where
        E: Executable<D> + 'static,
    {
        Self::Capability(Arc::new(executable))
    }
}

impl<D> TaskDefinition<D> {
    /// An alias over the given references
    pub fn alias<I, T>(references: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskRef>,
    {
        Self::Alias(references.into_iter().map(Into::into).collect())
    }

    /// Whether this entry is an alias rather than a leaf
    pub fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }

    /// The alias body, if this entry is an alias
    pub fn alias_body(&self) -> Option<&[TaskRef]> {
        match self {
            Self::Alias(body) => Some(body),
            _ => None,
        }
    }

    /// Short description of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Callable(_) => "callable",
            Self::Capability(_) => "capability",
            Self::Alias(_) => "alias",
        }
    }
}

impl<D> Clone for TaskDefinition<D> {
    fn clone(&self) -> Self {
        match self {
            Self::Callable(callable) => Self::Callable(callable.clone()),
            Self::Capability(executable) => Self::Capability(Arc::clone(executable)),
            Self::Alias(body) => Self::Alias(body.clone()),
        }
    }
}

impl<D> fmt::Debug for TaskDefinition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(callable) => write!(f, "Callable({})", callable.convention()),
            Self::Capability(_) => write!(f, "Capability"),
            Self::Alias(body) => f.debug_tuple("Alias").field(body).finish(),
        }
    }
}

impl<D> From<Vec<TaskRef>> for TaskDefinition<D> {
    fn from(body: Vec<TaskRef>) -> Self {
        Self::Alias(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_alias_body() {
        let leaf: TaskDefinition<()> = TaskDefinition::from_fn(|_| Ok(Value::Null));
        assert_eq!(leaf.kind(), "callable");
        assert!(!leaf.is_alias());
        assert!(leaf.alias_body().is_none());

        let alias: TaskDefinition<()> = TaskDefinition::alias(["a", "b"]);
        assert_eq!(alias.kind(), "alias");
        assert_eq!(
            alias.alias_body(),
            Some(&[TaskRef::name("a"), TaskRef::name("b")][..])
        );
    }

    #[test]
    fn test_callable_conventions() {
        let sync: TaskDefinition<()> = TaskDefinition::from_fn(|_| Ok(Value::Null));
        let asynchronous: TaskDefinition<()> =
            TaskDefinition::from_async(|_| async { Ok(Value::Null) });
        let callback: TaskDefinition<()> =
            TaskDefinition::from_callback(|_, done| done.succeed(Value::Null));

        assert_eq!(format!("{:?}", sync), "Callable(sync)");
        assert_eq!(format!("{:?}", asynchronous), "Callable(async)");
        assert_eq!(format!("{:?}", callback), "Callable(callback)");
    }

    #[test]
    fn test_call_receiver_downcast() {
        #[derive(Debug, PartialEq)]
        struct Target {
            blah: &'static str,
        }

        let receiver: Receiver = Arc::new(Target { blah: "123" });
        let call = Call::new("test", Arc::new(()), Some(receiver));
        assert_eq!(call.name(), "test");
        assert_eq!(call.receiver::<Target>().map(|t| t.blah), Some("123"));
        assert!(call.receiver::<String>().is_none());

        let unbound = Call::new("test", Arc::new(()), None);
        assert!(unbound.receiver::<Target>().is_none());
    }

    #[test]
    fn test_call_shares_data() {
        let data = Arc::new(5_u32);
        let call = Call::new("n", Arc::clone(&data), None);
        assert_eq!(*call.data(), 5);
        assert!(Arc::ptr_eq(&call.shared_data(), &data));
    }
}
