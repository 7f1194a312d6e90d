// Playback engine
// Owns the queue, the transport control and (optionally) the output device.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::audio::output::{AudioOutput, RenderCallback};
use crate::audio::player::{PlayOutcome, Player, PlayerState};
use crate::audio::queue::PlaybackQueue;
use crate::error::{DecodeError, EngineError};
use crate::metadata::{self, AudioProperties};
use crate::settings::EngineSettings;

/// One playback engine instance.
///
/// The queue lives here rather than in any global, so the control side and the
/// render callback only ever see it through this engine's handles.
pub struct Engine {
    settings: EngineSettings,
    queue: Arc<PlaybackQueue>,
    player: Player,
    render: RenderCallback,
    output: Option<AudioOutput>,
}

impl Engine {
    /// Build the engine and start streaming to the output device
    pub fn start(settings: EngineSettings) -> Result<Self, EngineError> {
        let mut engine = Self::headless(settings);
        let output = AudioOutput::open(engine.render.clone(), &engine.settings.output)?;
        engine.output = Some(output);
        Ok(engine)
    }

    /// Load `settings.json` from `dir` (defaults if absent) and start the engine
    pub fn start_from_dir(dir: &Path) -> Result<Self, EngineError> {
        let settings = EngineSettings::load(dir)?;
        Self::start(settings)
    }

    /// Build the engine without opening a device.
    ///
    /// The host drives [`render_callback`](Self::render_callback) itself.
    pub fn headless(settings: EngineSettings) -> Self {
        let queue = Arc::new(PlaybackQueue::new());
        let player = Player::new(Arc::clone(&queue), settings.decode.clone());
        let render = RenderCallback::new(Arc::clone(&queue));

        Self {
            settings,
            queue,
            player,
            render,
            output: None,
        }
    }

    /// Cancel the current sample and play `path`.
    ///
    /// With `decode.background` set, decoding continues on a worker thread and
    /// this returns `None`; otherwise it returns the finished session's outcome.
    pub fn play(&self, path: &Path) -> Option<PlayOutcome> {
        if !self.settings.decode.background {
            return Some(self.player.play(path));
        }

        match self.player.play_in_background(path.to_path_buf()) {
            Ok(_handle) => None,
            Err(e) => {
                error!("Failed to spawn decode worker, decoding inline: {}", e);
                Some(self.player.play(path))
            }
        }
    }

    /// Silence output
    pub fn stop(&self) {
        self.player.stop();
    }

    /// Probe a file for the catalog; independent of any playback session
    pub fn probe(&self, path: &Path) -> Result<AudioProperties, DecodeError> {
        metadata::probe(path)
    }

    pub fn state(&self) -> PlayerState {
        self.player.state()
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.player.current_file()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Handle for hosts that drive rendering themselves
    pub fn render_callback(&self) -> RenderCallback {
        self.render.clone()
    }

    /// Unread bytes still queued for output
    pub fn queued_bytes(&self) -> usize {
        self.queue.queued_bytes()
    }

    pub fn output(&self) -> Option<&AudioOutput> {
        self.output.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Stop the device and release all queued audio
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Stop the render thread, then release the queue and refuse pushes
        // from any decode worker still running
        self.output = None;
        self.queue.begin_session();
        info!("Playback engine shut down");
    }
}
