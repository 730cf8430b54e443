//! Lifecycle hooks around leaf execution

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::TaskError;

/// Events recorded by [`CollectingHooks`]
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A leaf is about to be invoked
    Started { task: String },
    /// A leaf returned a result
    Completed { task: String, result: Value },
    /// A leaf failed
    Failed { task: String, error: String },
}

impl TaskEvent {
    /// Name of the task the event is about
    pub fn task(&self) -> &str {
        match self {
            Self::Started { task } | Self::Completed { task, .. } | Self::Failed { task, .. } => {
                task
            }
        }
    }
}

/// Notifications fired around every leaf; never for groups or aliases.
///
/// `on_finish` fires on both outcomes, after the leaf's result is known.
pub trait TaskHooks<D>: Send + Sync {
    /// Fired immediately before a leaf is invoked
    fn on_start(&self, _task: &str, _data: &D) {}

    /// Fired immediately after a leaf's outcome is known
    fn on_finish(&self, _task: &str, _data: &D, _result: Result<&Value, &TaskError>) {}
}

/// Simple hooks that log to tracing
#[derive(Debug, Default)]
pub struct TracingHooks;

impl<D> TaskHooks<D> for TracingHooks {
    fn on_start(&self, task: &str, _data: &D) {
        tracing::info!("Starting {}", task);
    }

    fn on_finish(&self, task: &str, _data: &D, result: Result<&Value, &TaskError>) {
        match result {
            Ok(_) => tracing::info!("{} completed", task),
            Err(error) => tracing::error!("{} failed: {}", task, error),
        }
    }
}

/// Hooks that collect events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingHooks {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingHooks {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, event: TaskEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl<D> TaskHooks<D> for CollectingHooks {
    fn on_start(&self, task: &str, _data: &D) {
        self.push(TaskEvent::Started {
            task: task.to_string(),
        });
    }

    fn on_finish(&self, task: &str, _data: &D, result: Result<&Value, &TaskError>) {
        let event = match result {
            Ok(value) => TaskEvent::Completed {
                task: task.to_string(),
                result: value.clone(),
            },
            Err(error) => TaskEvent::Failed {
                task: task.to_string(),
                error: error.to_string(),
            },
        };
        self.push(event);
    }
}

type StartFn<D> = dyn Fn(&str, &D) + Send + Sync;
type FinishFn<D> = dyn Fn(&str, &D, Result<&Value, &TaskError>) + Send + Sync;

/// Closure-backed hooks; either side may be absent
pub struct FnHooks<D> {
    on_start: Option<Arc<StartFn<D>>>,
    on_finish: Option<Arc<FinishFn<D>>>,
}

impl<D> FnHooks<D> {
    /// Hooks that do nothing
    pub fn new() -> Self {
        Self {
            on_start: None,
            on_finish: None,
        }
    }

    /// Set the start callback
    pub fn with_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &D) + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(f));
        self
    }

    /// Set the finish callback
    pub fn with_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &D, Result<&Value, &TaskError>) + Send + Sync + 'static,
    {
        self.on_finish = Some(Arc::new(f));
        self
    }

    /// Whether neither callback is set
    pub fn is_empty(&self) -> bool {
        self.on_start.is_none() && self.on_finish.is_none()
    }
}

impl<D> Default for FnHooks<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> TaskHooks<D> for FnHooks<D> {
    fn on_start(&self, task: &str, data: &D) {
        if let Some(f) = &self.on_start {
            f(task, data);
        }
    }

    fn on_finish(&self, task: &str, data: &D, result: Result<&Value, &TaskError>) {
        if let Some(f) = &self.on_finish {
            f(task, data, result);
        }
    }
}

/// Broadcasts notifications to every registered hook set, in order
pub struct HookDispatcher<D> {
    hooks: Vec<Arc<dyn TaskHooks<D>>>,
}

impl<D> HookDispatcher<D> {
    /// Create a dispatcher with no hooks
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook set
    pub fn register<H: TaskHooks<D> + 'static>(&mut self, hooks: H) {
        self.hooks.push(Arc::new(hooks));
    }

    /// Add an already shared hook set
    pub fn register_shared(&mut self, hooks: Arc<dyn TaskHooks<D>>) {
        self.hooks.push(hooks);
    }

    /// All registered hook sets
    pub fn all(&self) -> &[Arc<dyn TaskHooks<D>>] {
        &self.hooks
    }

    /// Notify every hook set that a leaf is starting
    pub fn dispatch_start(&self, task: &str, data: &D) {
        for hooks in &self.hooks {
            hooks.on_start(task, data);
        }
    }

    /// Notify every hook set that a leaf finished
    pub fn dispatch_finish(&self, task: &str, data: &D, result: Result<&Value, &TaskError>) {
        for hooks in &self.hooks {
            hooks.on_finish(task, data, result);
        }
    }
}

impl<D> Default for HookDispatcher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for HookDispatcher<D> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_collecting_hooks() {
        let hooks = CollectingHooks::default();
        TaskHooks::<()>::on_start(&hooks, "build", &());
        TaskHooks::<()>::on_finish(&hooks, "build", &(), Ok(&Value::Bool(true)));

        let events = hooks.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            TaskEvent::Completed {
                task: "build".to_string(),
                result: Value::Bool(true),
            }
        );
    }

    #[test]
    fn test_collecting_hooks_records_failure() {
        let hooks = CollectingHooks::default();
        let error = TaskError::leaf("build", anyhow::anyhow!("exit 2"));
        TaskHooks::<()>::on_finish(&hooks, "build", &(), Err(&error));

        let events = hooks.events();
        assert_eq!(events[0].task(), "build");
        assert!(matches!(&events[0], TaskEvent::Failed { error, .. } if error.contains("exit 2")));
    }

    #[test]
    fn test_tracing_hooks() {
        let hooks = TracingHooks;

        // Just verify it doesn't panic
        TaskHooks::<()>::on_start(&hooks, "build", &());
        TaskHooks::<()>::on_finish(&hooks, "build", &(), Ok(&Value::Null));
    }

    #[test]
    fn test_fn_hooks() {
        let starts = Arc::new(AtomicUsize::new(0));
        let finishes = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&starts);
        let f = Arc::clone(&finishes);

        let hooks = FnHooks::<u32>::new()
            .with_start(move |name, data| {
                assert_eq!(name, "thing");
                assert_eq!(*data, 1);
                s.fetch_add(1, Ordering::SeqCst);
            })
            .with_finish(move |_, _, result| {
                assert_eq!(result.ok(), Some(&Value::from(2)));
                f.fetch_add(1, Ordering::SeqCst);
            });
        assert!(!hooks.is_empty());

        TaskHooks::on_start(&hooks, "thing", &1);
        TaskHooks::on_finish(&hooks, "thing", &1, Ok(&Value::from(2)));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = HookDispatcher::<()>::new();
        assert!(dispatcher.all().is_empty());
        dispatcher.dispatch_start("a", &());
    }

    #[test]
    fn test_dispatch_broadcasts_in_order() {
        let first = Arc::new(CollectingHooks::default());
        let second = Arc::new(CollectingHooks::default());
        let mut dispatcher = HookDispatcher::<()>::new();
        dispatcher.register_shared(first.clone());
        dispatcher.register_shared(second.clone());
        dispatcher.register(TracingHooks);
        assert_eq!(dispatcher.all().len(), 3);

        dispatcher.dispatch_start("lint", &());
        dispatcher.dispatch_finish("lint", &(), Ok(&Value::Null));

        assert_eq!(first.events().len(), 2);
        assert_eq!(second.events(), first.events());
    }
}
