//! Parallel execution engine: fans a single `Operation` out over a set of
//! `Module`s, sequentially or concurrently, with fail-fast or
//! continue-on-error policy and per-module timing.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::discovery::Module;
use crate::error::{Error, Result};
use crate::extensions::{ExtensionRuntime, Manifest};
use crate::fs::Filesystem;

/// Borrowed view of the extension runtime and its resolved subscribers that
/// an operation needs to fire hook chains around its mutation.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub runtime: &'a ExtensionRuntime,
    pub extensions: &'a [(String, PathBuf, Manifest)],
    pub project_root: &'a Path,
}

/// Everything an `Operation::execute` call needs from its surroundings.
pub struct OperationContext<'a> {
    pub fs: &'a dyn Filesystem,
    pub cancel: &'a CancellationToken,
    pub hooks: Option<HookContext<'a>>,
}

/// Owns the extension runtime and its resolved subscriber list for one
/// `Executor` run. Kept separate from `Executor` so a caller without any
/// configured extensions pays nothing beyond an `Option` check per module.
pub struct ExecutorHooks {
    pub runtime: ExtensionRuntime,
    pub extensions: Vec<(String, PathBuf, Manifest)>,
    pub project_root: PathBuf,
}

impl ExecutorHooks {
    pub fn new(project_root: PathBuf, extensions: Vec<(String, PathBuf, Manifest)>) -> Self {
        ExecutorHooks { runtime: ExtensionRuntime::default(), extensions, project_root }
    }

    pub fn with_runtime(
        project_root: PathBuf,
        extensions: Vec<(String, PathBuf, Manifest)>,
        runtime: ExtensionRuntime,
    ) -> Self {
        ExecutorHooks { runtime, extensions, project_root }
    }
}

/// A capability applied to a module. Implementations are contracted to
/// update `module.current_version` on success -- the executor reads it
/// before and after to populate `old_version`/`new_version`.
pub trait Operation: Send + Sync {
    fn name(&self) -> &str;
    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub module: Module,
    pub success: bool,
    pub old_version: String,
    pub new_version: String,
    pub error: Option<Error>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub parallel: bool,
    pub fail_fast: bool,
    pub worker_cap: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig { parallel: false, fail_fast: false, worker_cap: None }
    }
}

/// What a run produced. A plain `Vec<ExecutionResult>` can't represent both
/// "already-completed results are preserved" and "the run returns an error"
/// at once, so `run` returns this instead of a `Result`.
pub enum ExecutorOutcome {
    Completed(Vec<ExecutionResult>),
    FailFast { results: Vec<ExecutionResult>, cause: Error },
}

impl ExecutorOutcome {
    pub fn results(&self) -> &[ExecutionResult] {
        match self {
            ExecutorOutcome::Completed(r) => r,
            ExecutorOutcome::FailFast { results, .. } => results,
        }
    }

    pub fn into_results(self) -> Vec<ExecutionResult> {
        match self {
            ExecutorOutcome::Completed(r) => r,
            ExecutorOutcome::FailFast { results, .. } => results,
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, ExecutorOutcome::FailFast { .. })
    }
}

pub struct Executor<'a> {
    fs: &'a dyn Filesystem,
    config: ExecutorConfig,
    hooks: Option<&'a ExecutorHooks>,
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn Filesystem, config: ExecutorConfig) -> Self {
        Executor { fs, config, hooks: None }
    }

    /// An executor whose operations can invoke extension hook chains around
    /// their mutation.
    pub fn with_hooks(fs: &'a dyn Filesystem, config: ExecutorConfig, hooks: &'a ExecutorHooks) -> Self {
        Executor { fs, config, hooks: Some(hooks) }
    }

    pub fn run(
        &self,
        modules: Vec<Module>,
        op: &dyn Operation,
        cancel: &CancellationToken,
    ) -> ExecutorOutcome {
        if self.config.parallel {
            self.run_parallel(modules, op, cancel)
        } else {
            self.run_sequential(modules, op, cancel)
        }
    }

    fn execute_one(&self, op: &dyn Operation, module: &mut Module, cancel: &CancellationToken) -> ExecutionResult {
        log::debug!("worker acquired {} for {}", module.name, op.name());
        let old_version = module.current_version.clone();
        let hooks = self.hooks.map(|h| HookContext {
            runtime: &h.runtime,
            extensions: &h.extensions,
            project_root: &h.project_root,
        });
        let ctx = OperationContext { fs: self.fs, cancel, hooks };
        let start = Instant::now();
        let outcome = op.execute(&ctx, module);
        let duration = start.elapsed();
        let new_version = module.current_version.clone();
        match outcome {
            Ok(()) => {
                log::info!("{}: {} -> {} via {}", module.name, old_version, new_version, op.name());
                log::debug!("worker completed {} in {:?}", module.name, duration);
                ExecutionResult {
                    module: module.clone(),
                    success: true,
                    old_version,
                    new_version,
                    error: None,
                    duration,
                }
            }
            Err(error) => {
                log::debug!("worker completed {} in {:?} with error: {}", module.name, duration, error);
                ExecutionResult {
                    module: module.clone(),
                    success: false,
                    old_version,
                    new_version,
                    error: Some(error),
                    duration,
                }
            }
        }
    }

    fn run_sequential(
        &self,
        modules: Vec<Module>,
        op: &dyn Operation,
        cancel: &CancellationToken,
    ) -> ExecutorOutcome {
        let mut results = Vec::with_capacity(modules.len());
        let mut fail_cause: Option<Error> = None;
        // Only a fail-fast error stops remaining modules from starting at
        // all; a cancelled context still emits one result per module.
        let mut stop = false;

        for mut module in modules {
            if stop {
                break;
            }
            if cancel.is_cancelled() {
                results.push(cancelled_result(module));
                fail_cause.get_or_insert(Error::Cancelled);
                continue;
            }
            let result = self.execute_one(op, &mut module, cancel);
            if let Some(err) = &result.error {
                if self.config.fail_fast {
                    fail_cause = Some(clone_shallow(err));
                    stop = true;
                }
            }
            results.push(result);
        }

        match fail_cause {
            Some(cause) => ExecutorOutcome::FailFast { results, cause },
            None => ExecutorOutcome::Completed(results),
        }
    }

    fn run_parallel(
        &self,
        modules: Vec<Module>,
        op: &dyn Operation,
        cancel: &CancellationToken,
    ) -> ExecutorOutcome {
        let total = modules.len();
        let worker_cap = self
            .config
            .worker_cap
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1)
            .min(total.max(1));

        let queue: Mutex<VecDeque<Module>> = Mutex::new(modules.into_iter().collect());
        let results: Mutex<Vec<ExecutionResult>> = Mutex::new(Vec::with_capacity(total));
        let fail_fast_triggered = AtomicBool::new(false);
        let fail_cause: Mutex<Option<Error>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..worker_cap {
                scope.spawn(|| loop {
                    if fail_fast_triggered.load(Ordering::SeqCst) {
                        break;
                    }
                    let mut module = {
                        let mut q = queue.lock().unwrap();
                        match q.pop_front() {
                            Some(m) => m,
                            None => break,
                        }
                    };

                    if cancel.is_cancelled() {
                        results.lock().unwrap().push(cancelled_result(module));
                        fail_cause.lock().unwrap().get_or_insert(Error::Cancelled);
                        continue;
                    }

                    let result = self.execute_one(op, &mut module, cancel);
                    let module_error = result.error.as_ref().map(clone_shallow);
                    results.lock().unwrap().push(result);

                    if let Some(err) = module_error {
                        if self.config.fail_fast {
                            log::debug!("fail-fast triggered by: {}", err);
                            fail_fast_triggered.store(true, Ordering::SeqCst);
                            cancel.cancel();
                            fail_cause.lock().unwrap().get_or_insert(err);
                        }
                    }
                });
            }
        });

        let results = results.into_inner().unwrap();
        match fail_cause.into_inner().unwrap() {
            Some(cause) => ExecutorOutcome::FailFast { results, cause },
            None => ExecutorOutcome::Completed(results),
        }
    }
}

fn cancelled_result(module: Module) -> ExecutionResult {
    let version = module.current_version.clone();
    ExecutionResult {
        module,
        success: false,
        old_version: version.clone(),
        new_version: version,
        error: Some(Error::Cancelled),
        duration: Duration::ZERO,
    }
}

/// `Error` is not `Clone` (it wraps `std::io::Error` / `Box<Error>`); the
/// fail-fast cause only needs to be inspectable, not bit-identical, so this
/// re-derives a value of the same discriminant rather than requiring `Clone`
/// on the whole taxonomy.
fn clone_shallow(e: &Error) -> Error {
    match e {
        Error::NotFound(s) => Error::NotFound(s.clone()),
        Error::InvalidInput(s) => Error::InvalidInput(s.clone()),
        Error::InvalidVersion { value, reason } => {
            Error::InvalidVersion { value: value.clone(), reason: reason.clone() }
        }
        Error::InvalidBumpType(s) => Error::InvalidBumpType(s.clone()),
        Error::PermissionDenied { op, path } => {
            Error::PermissionDenied { op: op.clone(), path: path.clone() }
        }
        Error::Timeout(d) => Error::Timeout(*d),
        Error::Cancelled => Error::Cancelled,
        Error::GitOperation(s) => Error::GitOperation(s.clone()),
        Error::Config(s) => Error::Config(s.clone()),
        Error::PathValidation { path, root } => {
            Error::PathValidation { path: path.clone(), root: root.clone() }
        }
        Error::FileOp { op, path, source } => Error::FileOp {
            op: op.clone(),
            path: path.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        Error::Extension { extension, operation, source } => Error::Extension {
            extension: extension.clone(),
            operation: operation.clone(),
            source: Box::new(clone_shallow(source)),
        },
    }
}
