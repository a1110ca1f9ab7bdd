//! Chain composition and native processor access from scripts.
//!
//! ```text
//! fn register(params) {
//!     this.steps = chain()
//!         .Add("add_fields", #{ fields: #{ env: "prod" } })
//!         .Add(|evt| evt.Put("seen", true))
//!         .Build();
//! }
//!
//! fn process(evt) { this.steps.Run(evt); }
//! ```

use crate::conversion::dynamic_to_value;
use crate::event::ScriptEvent;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, NativeCallContext};
use serde_json::Value;
use sf_traits::{Processor, ProcessorRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// One step of a chain.
#[derive(Clone)]
pub enum ChainLink {
    /// A processor built from the registry
    Native(Arc<dyn Processor>),

    /// A script function called with the event handle
    Script(FnPtr),
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainLink::Native(p) => write!(f, "Native({})", p.name()),
            ChainLink::Script(fn_ptr) => write!(f, "Script({})", fn_ptr.fn_name()),
        }
    }
}

/// A native processor instance held by a script.
#[derive(Clone)]
pub struct NativeProcessor {
    processor: Arc<dyn Processor>,
}

impl NativeProcessor {
    /// Runs the processor over the event behind `evt`.
    pub fn run(&self, evt: &ScriptEvent) -> ScriptResult<()> {
        evt.run_native(self.processor.as_ref())
    }
}

/// Collects links before a chain is built.
#[derive(Clone)]
pub struct ChainBuilder {
    links: Vec<ChainLink>,
    registry: Arc<ProcessorRegistry>,
}

impl ChainBuilder {
    /// Creates an empty builder that resolves processor names in `registry`.
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            links: Vec::new(),
            registry,
        }
    }

    /// Appends a registry processor.
    pub fn add_named(&mut self, name: &str, config: &Value) -> ScriptResult<()> {
        let processor = build_native(&self.registry, name, config)?;
        self.links.push(ChainLink::Native(processor));
        Ok(())
    }

    /// Appends an already constructed processor.
    pub fn add_processor(&mut self, processor: Arc<dyn Processor>) {
        self.links.push(ChainLink::Native(processor));
    }

    /// Appends a script function.
    pub fn add_function(&mut self, function: FnPtr) {
        self.links.push(ChainLink::Script(function));
    }

    /// Finishes the chain.
    ///
    /// An empty chain is allowed but logged, since it does nothing.
    pub fn build(&self) -> ScriptChain {
        if self.links.is_empty() {
            warn!("chain built with no links");
        }
        ScriptChain {
            links: self.links.clone().into(),
        }
    }
}

/// An ordered list of native and script steps.
#[derive(Clone)]
pub struct ScriptChain {
    links: Arc<[ChainLink]>,
}

impl ScriptChain {
    /// Returns the number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Runs each link in order, stopping once the event is cancelled.
    pub fn run(&self, context: &NativeCallContext, evt: &ScriptEvent) -> ScriptResult<()> {
        for link in self.links.iter() {
            if evt.is_cancelled() {
                break;
            }

            match link {
                ChainLink::Native(processor) => evt.run_native(processor.as_ref())?,
                ChainLink::Script(function) => {
                    function.call_within_context::<Dynamic>(context, (evt.clone(),))?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ScriptChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.links.iter()).finish()
    }
}

fn build_native(
    registry: &ProcessorRegistry,
    name: &str,
    config: &Value,
) -> ScriptResult<Arc<dyn Processor>> {
    registry
        .build(name, config)
        .map_err(|e| format!("failed to create processor '{name}': {e}").into())
}

fn config_value(config: &Dynamic) -> ScriptResult<Value> {
    dynamic_to_value(config).map_err(|e| format!("invalid processor config: {e}").into())
}

/// Registers `new_processor`, `chain` and the types they return.
pub fn register_chain_api(engine: &mut Engine, registry: Arc<ProcessorRegistry>) {
    engine
        .register_type_with_name::<NativeProcessor>("Processor")
        .register_type_with_name::<ChainBuilder>("ChainBuilder")
        .register_type_with_name::<ScriptChain>("Chain");

    let reg = registry.clone();
    engine.register_fn(
        "new_processor",
        move |name: &str, config: Dynamic| -> ScriptResult<NativeProcessor> {
            let processor = build_native(&reg, name, &config_value(&config)?)?;
            Ok(NativeProcessor { processor })
        },
    );

    let reg = registry.clone();
    engine.register_fn(
        "new_processor",
        move |name: &str| -> ScriptResult<NativeProcessor> {
            let processor = build_native(&reg, name, &Value::Object(Default::default()))?;
            Ok(NativeProcessor { processor })
        },
    );

    engine.register_fn("Run", |p: &mut NativeProcessor, evt: ScriptEvent| p.run(&evt));

    engine.register_fn("chain", move || ChainBuilder::new(registry.clone()));

    engine
        .register_fn("Add", |b: &mut ChainBuilder, function: FnPtr| {
            b.add_function(function);
            b.clone()
        })
        .register_fn("Add", |b: &mut ChainBuilder, p: NativeProcessor| {
            b.add_processor(p.processor);
            b.clone()
        })
        .register_fn(
            "Add",
            |b: &mut ChainBuilder, name: &str, config: Dynamic| -> ScriptResult<ChainBuilder> {
                b.add_named(name, &config_value(&config)?)?;
                Ok(b.clone())
            },
        )
        .register_fn("Add", |b: &mut ChainBuilder, name: &str| -> ScriptResult<ChainBuilder> {
            b.add_named(name, &Value::Object(Default::default()))?;
            Ok(b.clone())
        })
        .register_fn("Build", |b: &mut ChainBuilder| b.build())
        .register_fn("len", |c: &mut ScriptChain| c.len() as i64)
        .register_fn(
            "Run",
            |context: NativeCallContext, c: &mut ScriptChain, evt: ScriptEvent| c.run(&context, &evt),
        );
}
