//! Task specification resolution
//!
//! Turns a run request into a [`Plan`]: the ordered top-level steps plus a
//! snapshot of the registry they were resolved against.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use taskweave_core::TaskRef;

use crate::error::TaskError;
use crate::registry::Registry;
use crate::task::TaskDefinition;

/// A resolved run request.
///
/// Top-level steps run in series. Nested groups and aliases met below the top
/// level are expanded by the scheduler against the same registry snapshot, so
/// later registrations never change a plan that already exists.
pub struct Plan<D> {
    steps: Vec<TaskRef>,
    registry: Arc<Registry<D>>,
}

impl<D> Plan<D> {
    /// Top-level steps in execution order
    pub fn steps(&self) -> &[TaskRef] {
        &self.steps
    }

    /// Number of top-level steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The registry snapshot this plan was resolved against
    pub fn registry(&self) -> &Registry<D> {
        &self.registry
    }

    pub(crate) fn into_parts(self) -> (Vec<TaskRef>, Arc<Registry<D>>) {
        (self.steps, self.registry)
    }

    /// Get a human-readable summary of the plan
    pub fn outline(&self) -> String {
        let mut outline = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            let line = match step {
                TaskRef::Name(name) => match self.registry.lookup(name) {
                    Some(TaskDefinition::Alias(body)) => format!(
                        "{} = {} (parallel)",
                        name,
                        TaskRef::Group(body.clone())
                    ),
                    Some(definition) => format!("{} ({})", name, definition.kind()),
                    None => format!("{} (missing)", name),
                },
                TaskRef::Group(_) => format!("{} (parallel)", step),
            };
            outline.push_str(&format!("Step {}: {}\n", i + 1, line));
        }
        outline
    }
}

impl<D> std::fmt::Debug for Plan<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan").field("steps", &self.steps).finish()
    }
}

/// Resolve a task specification against a registry snapshot.
///
/// A single name that is an alias becomes the top level itself; a single leaf
/// name becomes a one-step plan. Alias names among the top-level entries are
/// spliced in place, one level deep. Every name reachable from the result is
/// then checked, so a plan that resolves will never meet an unknown name or
/// an alias cycle while running.
#[instrument(skip_all, fields(spec = %spec))]
pub fn resolve<D>(spec: &TaskRef, registry: Arc<Registry<D>>) -> Result<Plan<D>, TaskError> {
    if spec.is_empty() {
        return Err(TaskError::MissingSpecification);
    }

    let top_level: Vec<TaskRef> = match spec {
        TaskRef::Name(name) => match registry.lookup(name) {
            Some(TaskDefinition::Alias(body)) => body.clone(),
            Some(_) => vec![spec.clone()],
            None => return Err(TaskError::UnknownTask(name.clone())),
        },
        TaskRef::Group(items) => items.clone(),
    };

    let mut steps = Vec::with_capacity(top_level.len());
    for item in top_level {
        match &item {
            TaskRef::Name(name) => match registry.lookup(name) {
                Some(TaskDefinition::Alias(body)) => {
                    debug!(alias = %name, len = body.len(), "splicing alias into top level");
                    steps.extend(body.iter().cloned());
                }
                Some(_) => steps.push(item),
                None => return Err(TaskError::UnknownTask(name.clone())),
            },
            TaskRef::Group(_) => steps.push(item),
        }
    }

    let mut checker = Checker {
        registry: &registry,
        stack: Vec::new(),
        verified: HashSet::new(),
    };
    for step in &steps {
        checker.check(step)?;
    }

    debug!(steps = steps.len(), "specification resolved");
    Ok(Plan { steps, registry })
}

/// Depth-first walk over everything a plan can reach
struct Checker<'a, D> {
    registry: &'a Registry<D>,
    /// Aliases currently being expanded, outermost first
    stack: Vec<&'a str>,
    /// Aliases whose whole body is known to be sound
    verified: HashSet<&'a str>,
}

impl<'a, D> Checker<'a, D> {
    fn check(&mut self, reference: &'a TaskRef) -> Result<(), TaskError> {
        match reference {
            TaskRef::Name(name) => match self.registry.lookup(name) {
                None => Err(TaskError::UnknownTask(name.clone())),
                Some(TaskDefinition::Alias(body)) => {
                    if self.verified.contains(name.as_str()) {
                        return Ok(());
                    }
                    if let Some(pos) = self.stack.iter().position(|n| *n == name.as_str()) {
                        let mut chain: Vec<String> =
                            self.stack[pos..].iter().map(|n| n.to_string()).collect();
                        chain.push(name.clone());
                        return Err(TaskError::AliasCycle { chain });
                    }
                    self.stack.push(name);
                    for item in body {
                        self.check(item)?;
                    }
                    self.stack.pop();
                    self.verified.insert(name);
                    Ok(())
                }
                Some(_) => Ok(()),
            },
            TaskRef::Group(items) => {
                for item in items {
                    self.check(item)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn registry(aliases: &[(&str, TaskRef)], leaves: &[&str]) -> Arc<Registry<Value>> {
        let mut registry = Registry::new();
        for name in leaves {
            registry.register(*name, TaskDefinition::from_fn(|_| Ok(Value::Null)));
        }
        for (name, body) in aliases {
            let body = body.as_group().map(<[TaskRef]>::to_vec).unwrap_or_default();
            registry.register(*name, TaskDefinition::Alias(body));
        }
        Arc::new(registry)
    }

    #[test]
    fn test_single_leaf_becomes_one_step() {
        let reg = registry(&[], &["build"]);
        let plan = resolve(&TaskRef::name("build"), reg).unwrap();
        assert_eq!(plan.steps(), &[TaskRef::name("build")]);
    }

    #[test]
    fn test_single_alias_becomes_top_level() {
        let reg = registry(&[("ci", TaskRef::group(["lint", "test"]))], &["lint", "test"]);
        let plan = resolve(&TaskRef::name("ci"), reg).unwrap();
        assert_eq!(plan.steps(), &[TaskRef::name("lint"), TaskRef::name("test")]);
    }

    #[test]
    fn test_alias_in_group_is_spliced_one_level() {
        let reg = registry(
            &[
                ("group", TaskRef::group([TaskRef::name("a"), TaskRef::group(["b", "c"])])),
                ("outer", TaskRef::group(["group", "d"])),
            ],
            &["a", "b", "c", "d"],
        );
        let plan = resolve(&TaskRef::name("outer"), reg).unwrap();
        assert_eq!(
            plan.steps(),
            &[
                TaskRef::name("a"),
                TaskRef::group(["b", "c"]),
                TaskRef::name("d"),
            ]
        );
    }

    #[test]
    fn test_nested_groups_kept_unexpanded() {
        let reg = registry(&[("pair", TaskRef::group(["a", "b"]))], &["a", "b"]);
        let spec = TaskRef::group([TaskRef::group(["pair", "a"])]);
        let plan = resolve(&spec, reg).unwrap();
        assert_eq!(plan.steps(), &[TaskRef::group(["pair", "a"])]);
    }

    #[test]
    fn test_unknown_name_fails() {
        let reg = registry(&[], &["a"]);
        let err = resolve(&TaskRef::name("hi"), Arc::clone(&reg)).unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(ref n) if n == "hi"));

        let err = resolve(&TaskRef::group(["a", "missing"]), reg).unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(ref n) if n == "missing"));
    }

    #[test]
    fn test_unknown_name_deep_inside_alias_fails() {
        let reg = registry(
            &[("inner", TaskRef::group(["a", "ghost"]))],
            &["a"],
        );
        let spec = TaskRef::group([TaskRef::group(["a", "inner"])]);
        let err = resolve(&spec, reg).unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(ref n) if n == "ghost"));
    }

    #[test]
    fn test_empty_specification() {
        let reg = registry(&[], &["a"]);
        assert!(matches!(
            resolve(&TaskRef::name(""), Arc::clone(&reg)),
            Err(TaskError::MissingSpecification)
        ));
        assert!(matches!(
            resolve(&TaskRef::Group(Vec::new()), reg),
            Err(TaskError::MissingSpecification)
        ));
    }

    #[test]
    fn test_self_referencing_alias_is_cycle() {
        let reg = registry(&[("loop", TaskRef::group(["a", "loop"]))], &["a"]);
        let err = resolve(&TaskRef::name("loop"), reg).unwrap_err();
        match err {
            TaskError::AliasCycle { chain } => assert_eq!(chain, vec!["loop", "loop"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_mutual_alias_cycle() {
        let reg = registry(
            &[
                ("ping", TaskRef::group([TaskRef::group(["pong"])])),
                ("pong", TaskRef::group(["a", "ping"])),
            ],
            &["a"],
        );
        let err = resolve(&TaskRef::group([TaskRef::group(["ping"])]), reg).unwrap_err();
        match err {
            TaskError::AliasCycle { chain } => {
                assert_eq!(chain, vec!["ping", "pong", "ping"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_alias_is_not_a_cycle() {
        let reg = registry(
            &[
                ("common", TaskRef::group(["a"])),
                ("left", TaskRef::group(["common"])),
                ("right", TaskRef::group(["common"])),
            ],
            &["a"],
        );
        let spec = TaskRef::group([TaskRef::group(["left", "right", "common"])]);
        assert!(resolve(&spec, reg).is_ok());
    }

    #[test]
    fn test_empty_alias_resolves_to_empty_plan() {
        let reg = registry(&[("nothing", TaskRef::Group(Vec::new()))], &[]);
        let plan = resolve(&TaskRef::name("nothing"), reg).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_outline() {
        let reg = registry(
            &[("checks", TaskRef::group(["lint", "test"]))],
            &["lint", "test", "build"],
        );
        let spec = TaskRef::group([
            TaskRef::name("build"),
            TaskRef::group(["lint", "test"]),
        ]);
        let plan = resolve(&spec, reg).unwrap();
        let outline = plan.outline();
        assert!(outline.contains("Step 1: build (callable)"));
        assert!(outline.contains("Step 2: [lint, test] (parallel)"));
    }
}
