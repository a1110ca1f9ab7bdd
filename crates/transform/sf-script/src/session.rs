//! Session - one interpreter bound to a compiled program.
//!
//! A session is never shared between threads while in use. It keeps its
//! own [`Scope`] (results of top-level statements), its own `this` object
//! (populated by `register`) and its own [`ScriptEvent`] handle.

use crate::builtin::register_builtin_functions;
use crate::chain::register_chain_api;
use crate::conversion::fields_to_dynamic;
use crate::event::{register_event_api, ScriptEvent};
use crate::program::CompiledProgram;
use crate::watchdog::{Interrupt, Watchdog};
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, FuncArgs, Map, Scope, AST};
use sf_error::ScriptError;
use sf_traits::ProcessorRegistry;
use sf_types::{Event, Fields};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Name of the per-event entry point.
pub const ENTRY_POINT: &str = "process";

/// Name of the optional initialization hook.
pub const REGISTER_HOOK: &str = "register";

/// Name of the optional self-test hook.
pub const TEST_HOOK: &str = "test";

/// Value thrown into the script when the watchdog fires.
const TIMEOUT_TOKEN: &str = "script processor execution timeout";

/// Creates a Rhai engine with nesting limits.
///
/// There is no operation limit; long-running scripts are stopped by the
/// watchdog instead. Value sizes are not limited either, since event data
/// handed to the script must always be readable.
pub(crate) fn create_engine() -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(64);

    engine
}

/// Everything needed to build a session.
#[derive(Debug)]
pub(crate) struct SessionFactory {
    pub program: Arc<CompiledProgram>,
    pub registry: Arc<ProcessorRegistry>,
    pub params: Option<Fields>,
    pub processor_id: String,
}

impl SessionFactory {
    /// Builds a session, running the self-test hook when `self_test` is set.
    pub fn create(&self, self_test: bool) -> Result<Session, ScriptError> {
        Session::new(self, self_test)
    }
}

/// Outcome of a single invocation.
#[derive(Debug)]
pub enum Invocation {
    /// `process` returned normally
    Completed(Event),

    /// The script cancelled the event
    Cancelled,

    /// The invocation failed; `event` is the event as the script left it
    Failed {
        event: Option<Event>,
        failure: Failure,
    },
}

/// Why an invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The script threw
    Exception(String),

    /// The watchdog interrupted the script
    Timeout,

    /// A host-side panic was caught
    Panic(String),
}

/// A script interpreter with its own state.
pub struct Session {
    engine: Engine,
    program: Arc<CompiledProgram>,
    scope: Scope<'static>,
    state: Dynamic,
    event: ScriptEvent,
    interrupt: Arc<Interrupt>,
    poisoned: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("sources", &self.program.source_names())
            .field("scope_len", &self.scope.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(factory: &SessionFactory, self_test: bool) -> Result<Self, ScriptError> {
        let interrupt = Arc::new(Interrupt::default());

        let mut engine = create_engine();
        register_builtin_functions(&mut engine, &factory.processor_id);
        register_event_api(&mut engine);
        register_chain_api(&mut engine, factory.registry.clone());

        let flag = interrupt.clone();
        engine.on_progress(move |_| {
            flag.is_triggered()
                .then(|| Dynamic::from(TIMEOUT_TOKEN.to_string()))
        });

        let program = factory.program.clone();
        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, program.ast())
            .map_err(|e| ScriptError::Session(error_message(&e)))?;

        if !program.has_function(ENTRY_POINT, 1) {
            return Err(if program.defines_function(ENTRY_POINT) {
                ScriptError::NotAFunction("process must take exactly one parameter".to_string())
            } else if scope.contains(ENTRY_POINT) {
                ScriptError::NotAFunction("process is a variable".to_string())
            } else {
                ScriptError::EntryPointNotFound
            });
        }

        let mut session = Self {
            engine,
            program,
            scope,
            state: Dynamic::from(Map::new()),
            event: ScriptEvent::new(),
            interrupt,
            poisoned: false,
        };

        if let Some(params) = &factory.params {
            if !session.program.has_function(REGISTER_HOOK, 1) {
                return Err(ScriptError::RegisterNotFound);
            }
            session
                .call(REGISTER_HOOK, (fields_to_dynamic(params),))
                .map_err(|e| ScriptError::Register(error_message(&e)))?;
        }

        if self_test && session.program.has_function(TEST_HOOK, 0) {
            session
                .call(TEST_HOOK, ())
                .map_err(|e| ScriptError::SelfTest(error_message(&e)))?;
        }

        trace!(processor = %factory.processor_id, self_test, "Created script session");
        Ok(session)
    }

    /// Runs `process` over `event`.
    ///
    /// When `timeout` is given, a timer is armed on the watchdog for the
    /// duration of the call and always disarmed before returning.
    pub fn invoke(&mut self, event: Event, timeout: Option<(&Watchdog, Duration)>) -> Invocation {
        self.event.reset(event);
        self.interrupt.clear();

        let handle = self.event.clone();
        let timer = timeout
            .and_then(|(watchdog, duration)| watchdog.arm(duration, self.interrupt.clone()));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.call(ENTRY_POINT, (handle,))));
        drop(timer);

        let (event, cancelled) = self.event.take();
        match outcome {
            Ok(Ok(_)) => match event {
                Some(event) if !cancelled => Invocation::Completed(event),
                _ => Invocation::Cancelled,
            },
            Ok(Err(err)) => {
                let failure = if is_timeout(&err) {
                    Failure::Timeout
                } else {
                    Failure::Exception(error_message(&err))
                };
                Invocation::Failed { event, failure }
            }
            Err(payload) => {
                self.poisoned = true;
                Invocation::Failed {
                    event: if cancelled { None } else { event },
                    failure: Failure::Panic(panic_message(payload.as_ref())),
                }
            }
        }
    }

    /// Drops any event still bound and clears the interrupt flag.
    pub fn reset(&mut self) {
        self.event.clear();
        self.interrupt.clear();
    }

    /// Returns true once a panic has unwound through this session.
    ///
    /// Poisoned sessions are not returned to the pool.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Returns the `this` object shared by `register` and `process`.
    pub fn state(&self) -> &Dynamic {
        &self.state
    }

    fn call(&mut self, name: &str, args: impl FuncArgs) -> Result<Dynamic, Box<EvalAltResult>> {
        call_with_this(
            &self.engine,
            &mut self.scope,
            self.program.ast(),
            &mut self.state,
            name,
            args,
        )
    }
}

fn call_with_this(
    engine: &Engine,
    scope: &mut Scope<'static>,
    ast: &AST,
    this: &mut Dynamic,
    name: &str,
    args: impl FuncArgs,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let options = CallFnOptions::new()
        .eval_ast(false)
        .rewind_scope(true)
        .bind_this_ptr(this);
    engine.call_fn_with_options(options, scope, ast, name, args)
}

/// Strips function-call wrappers down to the error that started it.
fn root_cause(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, ..) => root_cause(inner),
        EvalAltResult::ErrorInModule(_, inner, ..) => root_cause(inner),
        other => other,
    }
}

fn is_timeout(err: &EvalAltResult) -> bool {
    matches!(root_cause(err), EvalAltResult::ErrorTerminated(..))
}

/// Renders a script error the way operators want to read it.
///
/// Thrown values are shown as-is followed by their position.
pub(crate) fn error_message(err: &EvalAltResult) -> String {
    match root_cause(err) {
        EvalAltResult::ErrorRuntime(value, pos) if pos.is_none() => value.to_string(),
        EvalAltResult::ErrorRuntime(value, pos) => format!("{value} ({pos})"),
        EvalAltResult::ErrorTerminated(..) => TIMEOUT_TOKEN.to_string(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
