// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod decoder;
pub mod format;
pub mod output;
pub mod player;
pub mod queue;
pub mod resampler;

pub use decoder::AudioDecoder;
pub use format::PcmChunk;
pub use output::{AudioOutput, ConvertingRender, RenderCallback};
pub use player::{PlayOutcome, Player, PlayerState};
pub use queue::PlaybackQueue;
