/// Sound controller: owns the audio engine, mute state, and maps game
/// events to cues.
///
/// The engine is opened lazily on the first user interaction (start or
/// mute toggle) and closed when the controller is dropped. If it cannot
/// be opened the failure is logged once and every cue becomes a no-op.
///
/// Compile without the "sound" feature to build a silent binary.

use std::time::Duration;

use log::{error, info};

use crate::error::GameError;
use super::synth::{Cue, Tone};

/// The capability the controller needs from an audio backend.
pub trait AudioEngine {
    /// Start `tone` after `offset`. Fire-and-forget.
    fn play_tone(&self, tone: &Tone, offset: Duration);
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}

pub type EngineFactory = Box<dyn FnMut() -> Result<Box<dyn AudioEngine>, GameError>>;

enum EngineSlot {
    Uninitialized,
    Ready(Box<dyn AudioEngine>),
    Unavailable,
}

pub struct SoundController {
    muted: bool,
    engine: EngineSlot,
    factory: EngineFactory,
}

impl SoundController {
    pub fn new(factory: EngineFactory, muted: bool) -> Self {
        SoundController { muted, engine: EngineSlot::Uninitialized, factory }
    }

    /// Controller backed by the default output device.
    pub fn with_default_output(muted: bool) -> Self {
        Self::new(Box::new(open_default_engine), muted)
    }

    /// Open the engine if it hasn't been opened yet.
    pub fn initialize_audio(&mut self) {
        if !matches!(self.engine, EngineSlot::Uninitialized) {
            return;
        }
        self.engine = match (self.factory)() {
            Ok(engine) => {
                info!("audio engine ready");
                EngineSlot::Ready(engine)
            }
            Err(e) => {
                error!("{e}; continuing without sound");
                EngineSlot::Unavailable
            }
        };
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.initialize_audio();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// False only once opening the engine has failed.
    pub fn is_available(&self) -> bool {
        !matches!(self.engine, EngineSlot::Unavailable)
    }

    pub fn play_correct_sound(&self) { self.play(Cue::Correct); }
    pub fn play_incorrect_sound(&self) { self.play(Cue::Incorrect); }
    pub fn play_game_over_sound(&self) { self.play(Cue::GameOver); }

    fn play(&self, cue: Cue) {
        if self.muted {
            return;
        }
        if let EngineSlot::Ready(engine) = &self.engine {
            for scheduled in cue.schedule() {
                engine.play_tone(&scheduled.tone, scheduled.offset);
            }
        }
    }
}

impl Drop for SoundController {
    fn drop(&mut self) {
        if let EngineSlot::Ready(engine) = &mut self.engine {
            if !engine.is_closed() {
                engine.close();
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  rodio backend
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
mod inner {
    use std::time::Duration;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::AudioEngine;
    use crate::error::GameError;
    use crate::ui::synth::{Tone, SAMPLE_RATE};

    pub struct RodioEngine {
        // Dropping the stream stops output; `None` means closed.
        stream: Option<OutputStream>,
        handle: OutputStreamHandle,
    }

    impl RodioEngine {
        pub fn open() -> Result<Self, GameError> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| GameError::AudioUnavailable(e.to_string()))?;
            Ok(RodioEngine { stream: Some(stream), handle })
        }
    }

    impl AudioEngine for RodioEngine {
        fn play_tone(&self, tone: &Tone, offset: Duration) {
            if self.stream.is_none() {
                return;
            }
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let src = SamplesBuffer::new(1, SAMPLE_RATE, tone.render(SAMPLE_RATE));
                sink.append(src.delay(offset));
                sink.detach(); // fire-and-forget
            }
        }

        fn close(&mut self) {
            self.stream = None;
        }

        fn is_closed(&self) -> bool {
            self.stream.is_none()
        }
    }
}

#[cfg(feature = "sound")]
fn open_default_engine() -> Result<Box<dyn AudioEngine>, GameError> {
    Ok(Box::new(inner::RodioEngine::open()?))
}

#[cfg(not(feature = "sound"))]
fn open_default_engine() -> Result<Box<dyn AudioEngine>, GameError> {
    Err(GameError::AudioUnavailable("built without the sound feature".into()))
}
