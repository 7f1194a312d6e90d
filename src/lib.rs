// sfxplay - streaming playback engine for auditioning sound-effect files
// Module declarations
pub mod audio;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod settings;

pub use audio::{PcmChunk, PlayOutcome, PlaybackQueue, PlayerState, RenderCallback};
pub use engine::Engine;
pub use error::{DecodeError, EngineError, OutputError, SettingsError};
pub use metadata::AudioProperties;
pub use settings::EngineSettings;
