use crate::playback::engine::PlaybackEngine;
use crate::utils::error::ApngResult;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique handle an engine registers with its clock under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        EngineId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for EngineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "engine#{}", self.0)
    }
}

/// The scheduler an engine subscribes to while it is playing with
/// `auto_update` enabled. The host owns the engines and is expected to call
/// `PlaybackEngine::update` for every connected id on each tick.
pub trait Clock {
    fn connect(&self, id: EngineId);
    fn disconnect(&self, id: EngineId);
}

/// A deterministic clock driven by explicit `advance` calls.
#[derive(Debug, Default)]
pub struct ManualClock {
    connected: RefCell<BTreeSet<EngineId>>,
    elapsed_ms: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self, id: EngineId) -> bool {
        self.connected.borrow().contains(&id)
    }

    pub fn connected_count(&self) -> usize {
        self.connected.borrow().len()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms.get()
    }

    /// Advances the clock and ticks every engine in `engines` that is
    /// currently connected. Returns how many engines were updated.
    pub fn advance<'a, I>(&self, delta_ms: f64, engines: I) -> ApngResult<usize>
    where
        I: IntoIterator<Item = &'a mut PlaybackEngine>,
    {
        self.elapsed_ms.set(self.elapsed_ms.get() + delta_ms);

        let mut ticked = 0;
        for engine in engines {
            if self.is_connected(engine.id()) {
                engine.update(delta_ms)?;
                ticked += 1;
            }
        }

        Ok(ticked)
    }
}

impl Clock for ManualClock {
    fn connect(&self, id: EngineId) {
        self.connected.borrow_mut().insert(id);
    }

    fn disconnect(&self, id: EngineId) {
        self.connected.borrow_mut().remove(&id);
    }
}
