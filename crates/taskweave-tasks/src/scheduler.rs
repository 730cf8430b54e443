//! Plan scheduler: series at the top level, fan-out/join below it

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use taskweave_core::TaskRef;

use crate::error::TaskError;
use crate::hooks::HookDispatcher;
use crate::invoker::{panic_message, Invoker};
use crate::registry::Registry;
use crate::resolver::Plan;
use crate::task::TaskDefinition;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Result of the last top-level step, when that step was a single leaf
    pub result: Option<Value>,
    /// Number of leaf invocations
    pub executed: usize,
    /// Wall-clock time of the whole run
    pub duration: Duration,
}

/// Everything a branch needs, shared by all branches of one run
struct RunContext<D> {
    data: Arc<D>,
    registry: Arc<Registry<D>>,
    hooks: HookDispatcher<D>,
    invoker: Invoker,
    executed: AtomicUsize,
}

/// Executes resolved plans
pub struct Scheduler<D> {
    hooks: HookDispatcher<D>,
    invoker: Invoker,
}

impl<D> Scheduler<D>
where
    D: Send + Sync + 'static,
{
    /// Create a new scheduler
    pub fn new(hooks: HookDispatcher<D>, invoker: Invoker) -> Self {
        Self { hooks, invoker }
    }

    /// Execute a plan against one shared data value.
    ///
    /// Each top-level step finishes (including all of its concurrent members)
    /// before the next starts. The first failure stops the sequence; within a
    /// concurrent group every launched member is still awaited and the first
    /// failure to complete is the one reported.
    pub async fn run(&self, plan: Plan<D>, data: Arc<D>) -> Result<RunReport, TaskError> {
        let start = Instant::now();
        let (steps, registry) = plan.into_parts();
        let ctx = Arc::new(RunContext {
            data,
            registry,
            hooks: self.hooks.clone(),
            invoker: self.invoker.clone(),
            executed: AtomicUsize::new(0),
        });

        info!(steps = steps.len(), "running plan");

        let mut last = None;
        for (index, step) in steps.into_iter().enumerate() {
            debug!(step = index + 1, reference = %step, "starting step");
            let outcome = match step {
                TaskRef::Name(name) => run_named(Arc::clone(&ctx), name).await,
                TaskRef::Group(members) => run_concurrent(Arc::clone(&ctx), members)
                    .await
                    .map(|()| None),
            };

            match outcome {
                Ok(result) => last = result,
                Err(error) => {
                    warn!(
                        step = index + 1,
                        executed = ctx.executed.load(Ordering::SeqCst),
                        error = %error,
                        "run failed, skipping remaining steps"
                    );
                    return Err(error);
                }
            }
        }

        let report = RunReport {
            result: last,
            executed: ctx.executed.load(Ordering::SeqCst),
            duration: start.elapsed(),
        };
        info!(
            executed = report.executed,
            duration_ms = report.duration.as_millis() as u64,
            "run complete"
        );
        Ok(report)
    }
}

/// A name at any level: a leaf runs directly, an alias fans out its body.
///
/// Yields the leaf's result; aliases yield nothing.
async fn run_named<D>(
    ctx: Arc<RunContext<D>>,
    name: String,
) -> Result<Option<Value>, TaskError>
where
    D: Send + Sync + 'static,
{
    match ctx.registry.lookup(&name) {
        Some(TaskDefinition::Alias(body)) => {
            debug!(alias = %name, members = body.len(), "expanding alias concurrently");
            run_concurrent(Arc::clone(&ctx), body.clone()).await?;
            Ok(None)
        }
        Some(definition) => run_leaf(&ctx, &name, definition).await.map(Some),
        None => Err(TaskError::UnknownTask(name)),
    }
}

async fn run_leaf<D>(
    ctx: &RunContext<D>,
    name: &str,
    definition: &TaskDefinition<D>,
) -> Result<Value, TaskError>
where
    D: Send + Sync + 'static,
{
    let start = Instant::now();
    guard_hook(name, || ctx.hooks.dispatch_start(name, &ctx.data))?;
    let outcome = ctx.invoker.invoke(name, definition, &ctx.data).await;
    ctx.executed.fetch_add(1, Ordering::SeqCst);
    guard_hook(name, || ctx.hooks.dispatch_finish(name, &ctx.data, outcome.as_ref()))?;

    match &outcome {
        Ok(_) => debug!(
            task = name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "leaf completed"
        ),
        Err(error) => debug!(task = name, error = %error, "leaf failed"),
    }
    outcome
}

/// A panicking hook fails the leaf it was reporting on, at any depth
fn guard_hook(name: &str, dispatch: impl FnOnce()) -> Result<(), TaskError> {
    catch_unwind(AssertUnwindSafe(dispatch)).map_err(|payload| {
        let message = panic_message(&*payload);
        debug!(task = name, message = %message, "hook panicked");
        TaskError::Panicked {
            task: name.to_string(),
            message,
        }
    })
}

/// Launch every member at once and wait for all of them
async fn run_concurrent<D>(
    ctx: Arc<RunContext<D>>,
    members: Vec<TaskRef>,
) -> Result<(), TaskError>
where
    D: Send + Sync + 'static,
{
    let mut set = JoinSet::new();
    for member in members {
        set.spawn(run_branch(Arc::clone(&ctx), member));
    }

    let mut first_error: Option<TaskError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = joined.unwrap_or_else(|e| {
            let message = if e.is_panic() {
                panic_message(&*e.into_panic())
            } else {
                e.to_string()
            };
            Err(TaskError::Panicked {
                task: "<group>".to_string(),
                message,
            })
        });

        if let Err(error) = outcome {
            if first_error.is_none() {
                first_error = Some(error);
            } else {
                debug!(error = %error, "suppressing later failure in group");
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// One member of a concurrent group; boxed because groups nest recursively
fn run_branch<D>(
    ctx: Arc<RunContext<D>>,
    reference: TaskRef,
) -> BoxFuture<'static, Result<(), TaskError>>
where
    D: Send + Sync + 'static,
{
    async move {
        match reference {
            TaskRef::Name(name) => run_named(ctx, name).await.map(|_| ()),
            TaskRef::Group(members) => run_concurrent(ctx, members).await,
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::CollectingHooks;
    use crate::resolver::resolve;
    use crate::task::Call;
    use std::sync::Mutex;

    fn scheduler(hooks: Arc<CollectingHooks>) -> Scheduler<Value> {
        let mut dispatcher = HookDispatcher::new();
        dispatcher.register_shared(hooks);
        Scheduler::new(dispatcher, Invoker::default())
    }

    #[tokio::test]
    async fn test_series_runs_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        for name in ["one", "two", "three"] {
            let order = Arc::clone(&order);
            registry.register(
                name,
                TaskDefinition::from_fn(move |call: Call<Value>| {
                    order.lock().unwrap().push(call.name().to_string());
                    Ok(Value::Null)
                }),
            );
        }

        let plan = resolve(&TaskRef::group(["one", "two", "three"]), Arc::new(registry)).unwrap();
        let hooks = Arc::new(CollectingHooks::default());
        let report = scheduler(hooks.clone())
            .run(plan, Arc::new(Value::Null))
            .await
            .unwrap();

        assert_eq!(report.executed, 3);
        assert_eq!(*order.lock().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(hooks.events().len(), 6);
    }

    #[tokio::test]
    async fn test_failure_stops_sequence() {
        let mut registry = Registry::new();
        registry.register("ok", TaskDefinition::from_fn(|_: Call<Value>| Ok(Value::Null)));
        registry.register(
            "bad",
            TaskDefinition::from_fn(|_: Call<Value>| Err(anyhow::anyhow!("broken"))),
        );
        registry.register(
            "never",
            TaskDefinition::from_fn(|_: Call<Value>| -> crate::task::LeafResult {
                panic!("must not run")
            }),
        );

        let plan = resolve(&TaskRef::group(["ok", "bad", "never"]), Arc::new(registry)).unwrap();
        let hooks = Arc::new(CollectingHooks::default());
        let err = scheduler(hooks.clone())
            .run(plan, Arc::new(Value::Null))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskError::LeafFailed { ref task, .. } if task == "bad"));
        assert!(hooks.events().iter().all(|e| e.task() != "never"));
    }

    #[tokio::test]
    async fn test_last_leaf_result_is_reported() {
        let mut registry = Registry::new();
        registry.register("first", TaskDefinition::from_fn(|_: Call<Value>| Ok(Value::from(1))));
        registry.register("second", TaskDefinition::from_fn(|_: Call<Value>| Ok(Value::from(2))));

        let plan = resolve(&TaskRef::group(["first", "second"]), Arc::new(registry)).unwrap();
        let report = scheduler(Arc::new(CollectingHooks::default()))
            .run(plan, Arc::new(Value::Null))
            .await
            .unwrap();
        assert_eq!(report.result, Some(Value::from(2)));
    }

    #[tokio::test]
    async fn test_trailing_group_reports_no_result() {
        let mut registry = Registry::new();
        registry.register("a", TaskDefinition::from_fn(|_: Call<Value>| Ok(Value::from(1))));

        let spec = TaskRef::group([TaskRef::name("a"), TaskRef::group(["a", "a"])]);
        let plan = resolve(&spec, Arc::new(registry)).unwrap();
        let report = scheduler(Arc::new(CollectingHooks::default()))
            .run(plan, Arc::new(Value::Null))
            .await
            .unwrap();
        assert_eq!(report.result, None);
        assert_eq!(report.executed, 3);
    }
}
