//! taskweave Tasks - Task orchestration engine
//!
//! Callers register named units of work and then run a task specification: a
//! single name, or a nested list of names. Top-level entries run in series,
//! nested lists fan out concurrently and are joined before the next step, and
//! one shared data value is threaded through every leaf.
//!
//! ```no_run
//! use serde_json::{json, Value};
//! use taskweave_tasks::{Engine, TaskDefinition, TaskRef};
//!
//! # async fn demo() -> Result<(), taskweave_tasks::TaskError> {
//! let mut engine: Engine<Value> = Engine::new();
//! engine.register("fetch", TaskDefinition::from_fn(|_call| Ok(json!("fetched"))));
//! engine.register("parse", TaskDefinition::from_fn(|_call| Ok(Value::Null)));
//! engine.register("index", TaskDefinition::from_fn(|_call| Ok(Value::Null)));
//! engine.register(
//!     "pipeline",
//!     TaskDefinition::alias([TaskRef::name("fetch"), TaskRef::group(["parse", "index"])]),
//! );
//!
//! let report = engine.run("pipeline", json!({ "url": "https://example.com" })).await?;
//! assert_eq!(report.executed, 3);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod hooks;
pub mod invoker;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod shell;
pub mod task;

pub use engine::{Engine, EngineOptions};
pub use error::TaskError;
pub use hooks::{CollectingHooks, FnHooks, HookDispatcher, TaskEvent, TaskHooks, TracingHooks};
pub use invoker::Invoker;
pub use registry::Registry;
pub use resolver::{resolve, Plan};
pub use scheduler::{RunReport, Scheduler};
pub use shell::ShellTask;
pub use task::{Call, Callable, Completion, Executable, LeafResult, Receiver, TaskDefinition};
pub use taskweave_core::TaskRef;
