use crate::log_debug;
use crate::playback::clock::{Clock, EngineId};
use crate::playback::options::{validate_speed, Callbacks, PlaybackOptions};
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::image::AnimationSequence;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;

/// Mutable playback state owned by a single engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_time_ms: f64,
    pub current_frame_index: usize,
    pub playing: bool,
    pub loops_remaining: Option<u32>,
    pub speed_multiplier: f64,
    pub auto_loop: bool,
    /// Set when the active frame changed and the host has not redrawn yet.
    pub dirty: bool,
}

impl PlaybackState {
    fn new(options: &PlaybackOptions) -> Self {
        Self {
            current_time_ms: 0.0,
            current_frame_index: 0,
            playing: false,
            loops_remaining: None,
            speed_multiplier: options.animation_speed,
            auto_loop: options.looping,
            dirty: true,
        }
    }
}

pub struct EngineBuilder {
    sequence: Arc<AnimationSequence>,
    options: PlaybackOptions,
    callbacks: Callbacks,
    clock: Option<Rc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> ApngResult<PlaybackEngine> {
        PlaybackEngine::create(self.sequence, self.options, self.callbacks, self.clock)
    }
}

/// Time-driven frame selection over a shared `AnimationSequence`.
///
/// The engine never schedules itself. While playing with `auto_update` it is
/// connected to its clock, and the host forwards ticks through `update`.
/// After `dispose` every operation fails with `UseAfterDispose`.
pub struct PlaybackEngine {
    id: EngineId,
    sequence: Option<Arc<AnimationSequence>>,
    options: PlaybackOptions,
    callbacks: Callbacks,
    clock: Option<Rc<dyn Clock>>,
    state: PlaybackState,
    connected: bool,
}

impl PlaybackEngine {
    pub fn new(sequence: Arc<AnimationSequence>, options: PlaybackOptions) -> ApngResult<Self> {
        Self::create(sequence, options, Callbacks::default(), None)
    }

    pub fn builder(sequence: Arc<AnimationSequence>) -> EngineBuilder {
        EngineBuilder {
            sequence,
            options: PlaybackOptions::default(),
            callbacks: Callbacks::default(),
            clock: None,
        }
    }

    fn create(
        sequence: Arc<AnimationSequence>,
        options: PlaybackOptions,
        callbacks: Callbacks,
        clock: Option<Rc<dyn Clock>>,
    ) -> ApngResult<Self> {
        options.validate()?;

        let state = PlaybackState::new(&options);
        let loop_count = sequence.loop_count();

        let mut engine = Self {
            id: EngineId::next(),
            sequence: Some(sequence),
            options,
            callbacks,
            clock,
            state,
            connected: false,
        };

        engine.apply_frame(0);

        if engine.options.auto_play {
            if engine.options.use_stream_loop_count && loop_count > 0 {
                engine.play(Some(loop_count))?;
            } else {
                engine.play(None)?;
            }
        }

        log_debug!("Created {} (auto_play: {})", engine.id, engine.options.auto_play);

        Ok(engine)
    }

    fn live(&self) -> ApngResult<&Arc<AnimationSequence>> {
        self.sequence.as_ref().ok_or(ApngError::UseAfterDispose)
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.sequence.is_none()
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn state(&self) -> ApngResult<&PlaybackState> {
        self.live()?;
        Ok(&self.state)
    }

    pub fn sequence(&self) -> ApngResult<&Arc<AnimationSequence>> {
        self.live()
    }

    pub fn current_frame(&self) -> ApngResult<usize> {
        self.live()?;
        Ok(self.state.current_frame_index)
    }

    pub fn current_time(&self) -> ApngResult<f64> {
        self.live()?;
        Ok(self.state.current_time_ms)
    }

    pub fn total_frames(&self) -> ApngResult<usize> {
        Ok(self.live()?.frame_count())
    }

    pub fn duration(&self) -> ApngResult<f64> {
        Ok(self.live()?.total_duration())
    }

    /// Fraction of the current lap that has elapsed. Stays below 1 while
    /// playing and reaches exactly 1 only once a non-looping run has completed.
    pub fn progress(&self) -> ApngResult<f64> {
        let duration = self.live()?.total_duration();
        Ok(self.state.current_time_ms / duration)
    }

    pub fn current_pixels(&self) -> ApngResult<&[u8]> {
        let sequence = self.live()?;
        sequence
            .frame(self.state.current_frame_index)
            .map(|frame| frame.pixels())
            .ok_or(ApngError::FrameIndexOutOfRange {
                index: self.state.current_frame_index,
                frame_count: sequence.frame_count(),
            })
    }

    pub fn mark_clean(&mut self) -> ApngResult<()> {
        self.live()?;
        self.state.dirty = false;
        Ok(())
    }

    pub fn set_animation_speed(&mut self, speed: f64) -> ApngResult<()> {
        self.live()?;
        validate_speed(speed)?;
        self.state.speed_multiplier = speed;
        Ok(())
    }

    pub fn set_loop(&mut self, looping: bool) -> ApngResult<()> {
        self.live()?;
        self.state.auto_loop = looping;
        Ok(())
    }

    pub fn set_callbacks(&mut self, callbacks: Callbacks) -> ApngResult<()> {
        self.live()?;
        self.callbacks = callbacks;
        Ok(())
    }

    /// Switches clock-driven updates on or off. A playing engine is
    /// connected or disconnected immediately.
    pub fn set_auto_update(&mut self, auto_update: bool) -> ApngResult<()> {
        self.live()?;

        if auto_update == self.options.auto_update {
            return Ok(());
        }

        self.options.auto_update = auto_update;

        if !auto_update && self.connected {
            self.disconnect();
        } else if auto_update && self.state.playing && !self.connected {
            self.connect();
        }

        Ok(())
    }

    /// Starts playback. `Some(n)` plays `n` laps and then completes,
    /// overriding the loop flag; `None` keeps the configured looping.
    pub fn play(&mut self, loops: Option<u32>) -> ApngResult<()> {
        let last_frame = self.live()?.frame_count() - 1;

        if self.state.playing {
            return Ok(());
        }

        self.state.playing = true;
        self.state.loops_remaining = loops;
        if loops.is_some() {
            self.state.auto_loop = false;
        }

        if self.options.auto_update {
            self.connect();
        }

        if !self.state.auto_loop && self.state.current_frame_index == last_frame {
            self.state.current_time_ms = 0.0;
        }

        Ok(())
    }

    pub fn stop(&mut self) -> ApngResult<()> {
        self.live()?;

        if !self.state.playing {
            return Ok(());
        }

        self.state.playing = false;
        self.disconnect();

        Ok(())
    }

    /// Advances playback by `delta_ms` of host time, scaled by the speed
    /// multiplier. A delta spanning several laps counts as one boundary.
    pub fn update(&mut self, delta_ms: f64) -> ApngResult<()> {
        let sequence = Arc::clone(self.live()?);

        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return Err(ApngError::InvalidArgument(format!(
                "tick delta must be a non-negative number, got {}",
                delta_ms
            )));
        }

        if !self.state.playing {
            return Ok(());
        }

        let duration = sequence.total_duration();
        let last_frame = sequence.frame_count() - 1;
        let candidate = self.state.current_time_ms + self.state.speed_multiplier * delta_ms;

        if candidate < duration {
            self.state.current_time_ms = candidate;
            self.apply_frame(sequence.frame_index_at(candidate).unwrap_or(last_frame));
            return Ok(());
        }

        let local_time = candidate % duration;

        if let Some(remaining) = self.state.loops_remaining {
            let remaining = remaining.saturating_sub(1);
            self.state.loops_remaining = if remaining == 0 { None } else { Some(remaining) };
        }

        if self.state.auto_loop || self.state.loops_remaining.is_some() {
            self.state.current_time_ms = local_time;
            self.apply_frame(sequence.frame_index_at(local_time).unwrap_or(0));
            self.callbacks.looped();
        } else {
            self.state.current_time_ms = duration;
            self.apply_frame(last_frame);
            self.callbacks.complete();
            self.stop()?;
        }

        Ok(())
    }

    /// Jumps to the start of `frame_index`. Out-of-range indices leave the
    /// state untouched.
    pub fn seek(&mut self, frame_index: usize) -> ApngResult<()> {
        let sequence = self.live()?;

        let start_ms = match sequence.frame(frame_index) {
            Some(frame) => frame.start_ms(),
            None => {
                return Err(ApngError::FrameIndexOutOfRange {
                    index: frame_index,
                    frame_count: sequence.frame_count(),
                })
            }
        };

        self.apply_frame(frame_index);
        self.state.current_time_ms = start_ms;

        Ok(())
    }

    /// A new engine over the same frames, with the same callbacks and clock
    /// and the current speed and loop settings, starting from frame 0.
    pub fn try_clone(&self) -> ApngResult<Self> {
        let sequence = Arc::clone(self.live()?);

        let options = PlaybackOptions {
            looping: self.state.auto_loop,
            animation_speed: self.state.speed_multiplier,
            ..self.options.clone()
        };

        Self::create(sequence, options, self.callbacks.clone(), self.clock.clone())
    }

    /// Stops playback and releases the frames and callbacks. The engine is
    /// unusable afterwards.
    pub fn dispose(&mut self) -> ApngResult<()> {
        self.stop()?;

        self.sequence = None;
        self.callbacks = Callbacks::default();
        self.clock = None;

        log_debug!("Disposed {}", self.id);

        Ok(())
    }

    fn apply_frame(&mut self, index: usize) {
        if index == self.state.current_frame_index {
            return;
        }

        self.state.current_frame_index = index;
        self.state.dirty = true;
        self.callbacks.frame_changed(index);
    }

    fn connect(&mut self) {
        if let Some(clock) = &self.clock {
            clock.connect(self.id);
            self.connected = true;
        }
    }

    fn disconnect(&mut self) {
        if let Some(clock) = &self.clock {
            clock.disconnect(self.id);
        }
        self.connected = false;
    }
}

impl Debug for PlaybackEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .field("options", &self.options)
            .field("callbacks", &self.callbacks)
            .field("has_clock", &self.clock.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if self.connected {
            self.disconnect();
        }
    }
}
