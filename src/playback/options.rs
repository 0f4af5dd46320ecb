use crate::utils::error::{ApngError, ApngResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// Per-engine playback configuration. Fixed for the lifetime of an engine;
/// the runtime setters on `PlaybackEngine` only touch its playback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    pub auto_play: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub animation_speed: f64,
    pub auto_update: bool,
    /// Start auto-play with the stream's own play count when it is finite.
    pub use_stream_loop_count: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            auto_play: true,
            looping: true,
            animation_speed: 1.0,
            auto_update: true,
            use_stream_loop_count: false,
        }
    }
}

impl PlaybackOptions {
    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_animation_speed(mut self, speed: f64) -> Self {
        self.animation_speed = speed;
        self
    }

    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    pub fn with_stream_loop_count(mut self, enabled: bool) -> Self {
        self.use_stream_loop_count = enabled;
        self
    }

    pub fn validate(&self) -> ApngResult<()> {
        validate_speed(self.animation_speed)
    }
}

pub(crate) fn validate_speed(speed: f64) -> ApngResult<()> {
    if !speed.is_finite() || speed < 0.0 {
        return Err(ApngError::InvalidArgument(format!(
            "animation speed must be a non-negative number, got {}",
            speed
        )));
    }

    Ok(())
}

/// Optional observer slots. Cloning shares the handlers.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_complete: Option<Rc<dyn Fn()>>,
    pub on_loop: Option<Rc<dyn Fn()>>,
    pub on_frame_change: Option<Rc<dyn Fn(usize)>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_complete(mut self, handler: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Rc::new(handler));
        self
    }

    pub fn with_on_loop(mut self, handler: impl Fn() + 'static) -> Self {
        self.on_loop = Some(Rc::new(handler));
        self
    }

    pub fn with_on_frame_change(mut self, handler: impl Fn(usize) + 'static) -> Self {
        self.on_frame_change = Some(Rc::new(handler));
        self
    }

    pub(crate) fn complete(&self) {
        if let Some(handler) = &self.on_complete {
            handler();
        }
    }

    pub(crate) fn looped(&self) {
        if let Some(handler) = &self.on_loop {
            handler();
        }
    }

    pub(crate) fn frame_changed(&self, index: usize) {
        if let Some(handler) = &self.on_frame_change {
            handler(index);
        }
    }
}

impl Debug for Callbacks {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_loop", &self.on_loop.is_some())
            .field("on_frame_change", &self.on_frame_change.is_some())
            .finish()
    }
}
