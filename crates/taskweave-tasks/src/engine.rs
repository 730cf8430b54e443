//! Engine facade: owns the registry and runs task specifications

use std::any::Any;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use taskweave_core::TaskRef;

use crate::error::TaskError;
use crate::hooks::{FnHooks, HookDispatcher, TaskHooks};
use crate::invoker::Invoker;
use crate::registry::Registry;
use crate::resolver::{resolve, Plan};
use crate::scheduler::{RunReport, Scheduler};
use crate::task::{Receiver, TaskDefinition};

/// Options for constructing an [`Engine`]
pub struct EngineOptions<D> {
    callbacks: FnHooks<D>,
    hooks: Vec<Arc<dyn TaskHooks<D>>>,
    receiver: Option<Receiver>,
}

impl<D: 'static> EngineOptions<D> {
    /// Options with no hooks and no binding target
    pub fn new() -> Self {
        Self {
            callbacks: FnHooks::new(),
            hooks: Vec::new(),
            receiver: None,
        }
    }

    /// Called immediately before every leaf
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &D) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_start(f);
        self
    }

    /// Called immediately after every leaf, on success and on failure
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &D, Result<&Value, &TaskError>) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_finish(f);
        self
    }

    /// Receiver handed to plain callables; capability objects keep their own
    pub fn bind<T: Any + Send + Sync>(mut self, target: T) -> Self {
        self.receiver = Some(Arc::new(target));
        self
    }

    /// Like [`EngineOptions::bind`] for a target that is already shared
    pub fn bind_shared(mut self, target: Receiver) -> Self {
        self.receiver = Some(target);
        self
    }

    /// Add a hook set, notified after the `on_start`/`on_finish` callbacks
    pub fn with_hooks<H: TaskHooks<D> + 'static>(mut self, hooks: H) -> Self {
        self.hooks.push(Arc::new(hooks));
        self
    }

    /// Add an already shared hook set
    pub fn with_shared_hooks(mut self, hooks: Arc<dyn TaskHooks<D>>) -> Self {
        self.hooks.push(hooks);
        self
    }
}

impl<D: 'static> Default for EngineOptions<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// A task engine with its own registry.
///
/// Registration is copy-on-write: plans already produced by [`Engine::plan`]
/// keep the registry they were resolved against.
pub struct Engine<D = Value> {
    registry: Arc<Registry<D>>,
    scheduler: Scheduler<D>,
}

impl<D> Engine<D>
where
    D: Send + Sync + 'static,
{
    /// Engine with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Engine with the given hooks and binding target
    pub fn with_options(options: EngineOptions<D>) -> Self {
        let mut dispatcher = HookDispatcher::new();
        if !options.callbacks.is_empty() {
            dispatcher.register(options.callbacks);
        }
        for hooks in options.hooks {
            dispatcher.register_shared(hooks);
        }

        Self {
            registry: Arc::new(Registry::new()),
            scheduler: Scheduler::new(dispatcher, Invoker::new(options.receiver)),
        }
    }

    /// Store or overwrite a task definition
    pub fn register(&mut self, name: impl Into<String>, definition: TaskDefinition<D>) {
        Arc::make_mut(&mut self.registry).register(name, definition);
    }

    /// The current registry
    pub fn registry(&self) -> &Registry<D> {
        &self.registry
    }

    /// Resolve a specification without running it
    pub fn plan(&self, spec: impl Into<TaskRef>) -> Result<Plan<D>, TaskError> {
        resolve(&spec.into(), Arc::clone(&self.registry))
    }

    /// Resolve and run a specification with the given shared data
    pub async fn run(
        &self,
        spec: impl Into<TaskRef>,
        data: impl Into<Arc<D>>,
    ) -> Result<RunReport, TaskError> {
        let spec = spec.into();
        let data = data.into();
        info!(spec = %spec, "run requested");
        let plan = resolve(&spec, Arc::clone(&self.registry))?;
        self.scheduler.run(plan, data).await
    }

    /// Run a plan produced earlier by [`Engine::plan`]
    pub async fn run_plan(
        &self,
        plan: Plan<D>,
        data: impl Into<Arc<D>>,
    ) -> Result<RunReport, TaskError> {
        self.scheduler.run(plan, data.into()).await
    }
}

impl<D> Engine<D>
where
    D: Default + Send + Sync + 'static,
{
    /// Run with `D::default()` as the data.
    ///
    /// For JSON data that is `null`; use [`Engine::run_empty`] to start from `{}`.
    pub async fn run_default(&self, spec: impl Into<TaskRef>) -> Result<RunReport, TaskError> {
        self.run(spec, D::default()).await
    }
}

impl Engine<Value> {
    /// Run with an empty JSON object as the data
    pub async fn run_empty(&self, spec: impl Into<TaskRef>) -> Result<RunReport, TaskError> {
        self.run(spec, Value::Object(Map::new())).await
    }
}

impl<D> Default for Engine<D>
where
    D: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for Engine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tasks", &self.registry.names())
            .finish()
    }
}
