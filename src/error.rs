// Error types for the playback engine
// None of these cross the `play` boundary as a failure; they are logged and reported.

use thiserror::Error;

/// Why a file could not be opened, probed or decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("failed to probe container: {0}")]
    Probe(String),

    #[error("no audio stream found")]
    NoAudioStream,

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("failed to initialise resampler: {0}")]
    Resampler(String),
}

/// Audio output device errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("no output device available")]
    NoDevice,

    #[error("output device does not support the required format: {0}")]
    UnsupportedConfig(String),

    #[error("failed to build output stream: {0}")]
    BuildStream(String),

    #[error("failed to start output stream: {0}")]
    Play(String),
}

/// Settings load/save errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Engine construction errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
