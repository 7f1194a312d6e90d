// Audio player implementation
// Transport control: every `play` cancels the previous session and streams the new file.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info, warn};

use super::decoder::AudioDecoder;
use super::queue::{PlaybackQueue, SessionId};
use crate::error::DecodeError;
use crate::settings::DecodeSettings;

/// Where the latest session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing queued
    Idle,
    /// The latest session is still decoding into the queue
    Decoding,
    /// Decoding is done and queued audio is draining
    Streaming,
}

/// How one `play` call ended. Never an error for the caller to propagate.
#[derive(Debug)]
pub enum PlayOutcome {
    /// Every decoded chunk was queued
    Played { chunks: usize, bytes: usize },
    /// A newer session took over the queue before decoding finished
    Cancelled { chunks: usize, bytes: usize },
    /// Decoding hit the configured timeout; what was queued still plays
    TimedOut { chunks: usize, bytes: usize },
    /// Nothing could be decoded; the queue stays silent
    Failed(DecodeError),
}

impl PlayOutcome {
    /// Bytes this session put on the queue
    pub fn bytes(&self) -> usize {
        match self {
            PlayOutcome::Played { bytes, .. }
            | PlayOutcome::Cancelled { bytes, .. }
            | PlayOutcome::TimedOut { bytes, .. } => *bytes,
            PlayOutcome::Failed(_) => 0,
        }
    }
}

/// Bookkeeping for the session that last claimed the queue
#[derive(Debug, Default)]
struct SessionInfo {
    id: SessionId,
    file: Option<PathBuf>,
    decoding: bool,
}

/// Control-side entry point for playback.
///
/// Cheap to clone; clones share the same queue and session bookkeeping.
#[derive(Clone)]
pub struct Player {
    queue: Arc<PlaybackQueue>,
    settings: DecodeSettings,
    /// Held across `begin_session` so the record always matches the queue's owner
    session: Arc<Mutex<SessionInfo>>,
}

impl Player {
    pub fn new(queue: Arc<PlaybackQueue>, settings: DecodeSettings) -> Self {
        Self {
            queue,
            settings,
            session: Arc::new(Mutex::new(SessionInfo::default())),
        }
    }

    /// Cancel whatever is playing and stream `path` into the queue.
    ///
    /// Decodes on the calling thread and returns once the file is fully
    /// queued, the session is cancelled, or decoding fails.
    pub fn play(&self, path: &Path) -> PlayOutcome {
        let session = self.start_session(path);
        self.run_session(session, path)
    }

    /// Like [`play`](Self::play) but decodes on a worker thread.
    ///
    /// The previous session is cancelled before this returns, so call order
    /// decides which file ends up audible.
    pub fn play_in_background(&self, path: PathBuf) -> std::io::Result<JoinHandle<PlayOutcome>> {
        let session = self.start_session(&path);
        let player = self.clone();

        thread::Builder::new()
            .name(format!("sfx-decode-{}", session))
            .spawn(move || player.run_session(session, &path))
    }

    /// Silence output by starting an empty session
    pub fn stop(&self) {
        let mut record = self.session.lock();
        let session = self.queue.begin_session();
        *record = SessionInfo {
            id: session,
            file: None,
            decoding: false,
        };
        drop(record);
        info!(session, "Playback stopped");
    }

    pub fn state(&self) -> PlayerState {
        let record = self.session.lock();
        // The engine may have claimed the queue directly on shutdown
        if record.decoding && record.id == self.queue.current_session() {
            PlayerState::Decoding
        } else if !self.queue.is_empty() {
            PlayerState::Streaming
        } else {
            PlayerState::Idle
        }
    }

    /// File of the latest session, if any
    pub fn current_file(&self) -> Option<PathBuf> {
        self.session.lock().file.clone()
    }

    pub fn queue(&self) -> &Arc<PlaybackQueue> {
        &self.queue
    }

    /// Clear the queue and claim it for a new session
    fn start_session(&self, path: &Path) -> SessionId {
        let mut record = self.session.lock();
        let session = self.queue.begin_session();
        *record = SessionInfo {
            id: session,
            file: Some(path.to_path_buf()),
            decoding: true,
        };
        drop(record);
        info!(session, "Playing {:?}", path);
        session
    }

    fn run_session(&self, session: SessionId, path: &Path) -> PlayOutcome {
        let outcome = self.decode_into_queue(session, path);

        // Only clear the marker if no newer session replaced it
        {
            let mut record = self.session.lock();
            if record.id == session {
                record.decoding = false;
            }
        }

        match &outcome {
            PlayOutcome::Played { chunks, bytes } => {
                info!(session, chunks, bytes, "Session fully queued")
            }
            PlayOutcome::Cancelled { chunks, bytes } => {
                info!(session, chunks, bytes, "Session cancelled by a newer one")
            }
            PlayOutcome::TimedOut { chunks, bytes } => {
                warn!(session, chunks, bytes, "Session decode timed out")
            }
            PlayOutcome::Failed(DecodeError::NoAudioStream) => {
                warn!(session, "Didn't find an audio stream in {:?}", path)
            }
            PlayOutcome::Failed(e) => error!(session, "Failed to play {:?}: {}", path, e),
        }

        outcome
    }

    fn decode_into_queue(&self, session: SessionId, path: &Path) -> PlayOutcome {
        let decoder = match AudioDecoder::open_with_chunk_frames(path, self.settings.max_chunk_frames) {
            Ok(decoder) => decoder,
            Err(e) => return PlayOutcome::Failed(e),
        };

        let deadline = self.settings.timeout().map(|t| Instant::now() + t);
        let mut chunks = 0;
        let mut bytes = 0;

        for chunk in decoder {
            let len = chunk.len();
            if !self.queue.push_for(session, chunk) {
                return PlayOutcome::Cancelled { chunks, bytes };
            }
            chunks += 1;
            bytes += len;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return PlayOutcome::TimedOut { chunks, bytes };
            }
        }

        PlayOutcome::Played { chunks, bytes }
    }
}
