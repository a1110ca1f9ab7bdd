//! ScriptEvent - the event handle passed to script functions.
//!
//! A session owns one `ScriptEvent` for its whole life and rebinds it to
//! each incoming event. Scripts receive clones of the handle; all clones
//! share the same slot.

use crate::conversion::{dynamic_to_value, fields_to_dynamic, value_to_dynamic};
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult};
use sf_traits::{ProcessError, Processor};
use sf_types::Event;
use std::sync::Arc;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

#[derive(Debug, Default)]
struct Slot {
    event: Option<Event>,
    cancelled: bool,
}

/// Script-visible handle to the event being processed.
#[derive(Debug, Clone, Default)]
pub struct ScriptEvent {
    slot: Arc<Mutex<Slot>>,
}

impl ScriptEvent {
    /// Creates an unbound handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the handle to `event` and clears the cancellation flag.
    pub fn reset(&self, event: Event) {
        let mut slot = self.slot.lock();
        slot.event = Some(event);
        slot.cancelled = false;
    }

    /// Unbinds the handle.
    pub fn clear(&self) {
        *self.slot.lock() = Slot::default();
    }

    /// Unbinds the handle, returning the event and the cancellation flag.
    pub fn take(&self) -> (Option<Event>, bool) {
        let mut slot = self.slot.lock();
        let cancelled = std::mem::take(&mut slot.cancelled);
        (slot.event.take(), cancelled)
    }

    /// Marks the event to be dropped once the script returns.
    pub fn cancel(&self) {
        self.slot.lock().cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.lock().cancelled
    }

    /// Returns a copy of the value at `key`, or the whole field tree.
    ///
    /// Missing keys yield `()`.
    pub fn get(&self, key: Option<&str>) -> Dynamic {
        let slot = self.slot.lock();
        let Some(event) = slot.event.as_ref() else {
            return Dynamic::UNIT;
        };

        match key {
            None => fields_to_dynamic(&event.fields),
            Some(key) => event
                .get_value(key)
                .map(|value| value_to_dynamic(&value))
                .unwrap_or(Dynamic::UNIT),
        }
    }

    /// Stores `value` at `key` and returns the previous value or `()`.
    pub fn put(&self, key: &str, value: &Dynamic) -> ScriptResult<Dynamic> {
        let value = dynamic_to_value(value).map_err(|e| format!("Put({key}): {e}"))?;
        self.with_event(|event| {
            event
                .put_value(key, value)
                .map(|previous| previous.map(|v| value_to_dynamic(&v)).unwrap_or(Dynamic::UNIT))
                .map_err(|e| e.to_string().into())
        })
    }

    /// Moves the value at `from` to `to`. Never throws.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut slot = self.slot.lock();
        slot.event
            .as_mut()
            .map(|event| event.rename_value(from, to))
            .unwrap_or(false)
    }

    /// Removes the value at `key`.
    pub fn delete(&self, key: &str) -> bool {
        let mut slot = self.slot.lock();
        slot.event
            .as_mut()
            .map(|event| event.delete_value(key).is_ok())
            .unwrap_or(false)
    }

    /// Appends `tag` to the `tags` array.
    pub fn tag(&self, tag: &Dynamic) -> ScriptResult<()> {
        let tag = dynamic_to_value(tag).map_err(|e| format!("Tag: {e}"))?;
        self.with_event(|event| event.add_tag(tag).map_err(|e| e.to_string().into()))
    }

    /// Appends `value` to `key` with de-duplication.
    pub fn append_to(&self, key: &str, value: &Dynamic) -> ScriptResult<()> {
        let value = dynamic_to_value(value).map_err(|e| format!("AppendTo({key}): {e}"))?;
        self.with_event(|event| event.append_to(key, value).map_err(|e| e.to_string().into()))
    }

    /// Runs a native processor over the bound event.
    ///
    /// The processor works on a copy; the bound event is only replaced on
    /// success, so a panicking processor leaves the original in place. A
    /// dropped event cancels this handle. Cancellation does not stop the
    /// call; chains check it between links.
    pub fn run_native(&self, processor: &dyn Processor) -> ScriptResult<()> {
        let input = self.slot.lock().event.clone().ok_or_else(unbound)?;

        match processor.run(input) {
            Ok(Some(event)) => {
                self.slot.lock().event = Some(event);
                Ok(())
            }
            Ok(None) => {
                self.cancel();
                Ok(())
            }
            Err(ProcessError { event, error }) => {
                if let Some(event) = event {
                    self.slot.lock().event = Some(event);
                }
                Err(format!("{}: {error}", processor.name()).into())
            }
        }
    }

    fn with_event<R>(&self, f: impl FnOnce(&mut Event) -> ScriptResult<R>) -> ScriptResult<R> {
        let mut slot = self.slot.lock();
        let event = slot.event.as_mut().ok_or_else(unbound)?;
        f(event)
    }
}

fn unbound() -> Box<EvalAltResult> {
    "event is no longer available".into()
}

/// Registers the `Event` type and its methods.
pub fn register_event_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptEvent>("Event")
        .register_fn("Get", |evt: &mut ScriptEvent| evt.get(None))
        .register_fn("Get", |evt: &mut ScriptEvent, key: &str| evt.get(Some(key)))
        .register_fn("Put", |evt: &mut ScriptEvent, key: &str, value: Dynamic| {
            evt.put(key, &value)
        })
        .register_fn("Rename", |evt: &mut ScriptEvent, from: &str, to: &str| {
            evt.rename(from, to)
        })
        .register_fn("Delete", |evt: &mut ScriptEvent, key: &str| evt.delete(key))
        .register_fn("Cancel", |evt: &mut ScriptEvent| evt.cancel())
        .register_fn("IsCancelled", |evt: &mut ScriptEvent| evt.is_cancelled())
        .register_fn("Tag", |evt: &mut ScriptEvent, tag: Dynamic| evt.tag(&tag))
        .register_fn("AppendTo", |evt: &mut ScriptEvent, key: &str, value: Dynamic| {
            evt.append_to(key, &value)
        });
}
