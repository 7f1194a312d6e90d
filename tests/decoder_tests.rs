// Decoder integration tests against generated WAV files
mod common;

use sfxplay::audio::format::BYTES_PER_FRAME;
use sfxplay::audio::AudioDecoder;
use sfxplay::DecodeError;

use common::{ramp_bytes, to_samples, write_ramp_wav, write_sine_wav};

#[test]
fn test_native_format_decodes_byte_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp_wav(&path, 44_100, 2, 10_000, 0);

    let decoder = AudioDecoder::open(&path).unwrap();
    assert_eq!(decoder.sample_rate(), Some(44_100));
    assert_eq!(decoder.channels(), Some(2));

    let bytes: Vec<u8> = decoder.flat_map(|c| c.as_bytes().to_vec()).collect();
    assert_eq!(bytes.len(), 10_000 * BYTES_PER_FRAME);
    assert_eq!(bytes, ramp_bytes(10_000, 0));
}

#[test]
fn test_chunks_respect_frame_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp_wav(&path, 44_100, 2, 5_000, 1);

    let decoder = AudioDecoder::open_with_chunk_frames(&path, 300).unwrap();
    let chunks: Vec<_> = decoder.collect();
    assert!(chunks.len() >= 5_000 / 300);
    assert!(chunks.iter().all(|c| c.frames() <= 300 && !c.is_empty()));
    assert!(chunks.iter().all(|c| c.len() % BYTES_PER_FRAME == 0));

    let total: usize = chunks.iter().map(|c| c.frames()).sum();
    assert_eq!(total, 5_000);
}

#[test]
fn test_mono_is_duplicated_to_stereo() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono.wav");
    write_ramp_wav(&path, 44_100, 1, 2_000, 3);

    let bytes: Vec<u8> = AudioDecoder::open(&path)
        .unwrap()
        .flat_map(|c| c.as_bytes().to_vec())
        .collect();
    let samples = to_samples(&bytes);
    assert_eq!(samples.len(), 2_000 * 2);
    for (frame, pair) in samples.chunks_exact(2).enumerate() {
        assert_eq!(pair[0], pair[1]);
        assert_eq!(pair[0], common::ramp_value(frame, 0, 3));
    }
}

#[test]
fn test_low_rate_is_resampled_to_output_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("low.wav");
    write_sine_wav(&path, 22_050, 1, 11_025);

    let decoder = AudioDecoder::open(&path).unwrap();
    assert_eq!(decoder.sample_rate(), Some(22_050));
    let frames: usize = decoder.map(|c| c.frames()).sum();

    // Half a second at 44.1kHz
    assert!(frames.abs_diff(22_050) <= 4, "got {} frames", frames);
}

#[test]
fn test_high_rate_is_resampled_to_output_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("high.wav");
    write_sine_wav(&path, 48_000, 2, 48_000);

    let frames: usize = AudioDecoder::open(&path).unwrap().map(|c| c.frames()).sum();
    assert!(frames.abs_diff(44_100) <= 4, "got {} frames", frames);
}

#[test]
fn test_files_shorter_than_one_packet_decode_byte_exact() {
    let dir = tempfile::tempdir().unwrap();

    for frames in [1, 100, 1_151] {
        let path = dir.path().join(format!("short-{}.wav", frames));
        write_ramp_wav(&path, 44_100, 2, frames, 11);

        let bytes: Vec<u8> = AudioDecoder::open(&path)
            .unwrap()
            .flat_map(|c| c.as_bytes().to_vec())
            .collect();
        assert_eq!(bytes, ramp_bytes(frames, 11), "{} frames", frames);
    }
}

#[test]
fn test_short_low_rate_file_is_resampled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short-low.wav");
    write_ramp_wav(&path, 22_050, 1, 100, 2);

    let frames: usize = AudioDecoder::open(&path).unwrap().map(|c| c.frames()).sum();
    assert_eq!(frames, 200);
}

#[test]
fn test_empty_wav_yields_no_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_ramp_wav(&path, 44_100, 2, 0, 0);

    match AudioDecoder::open(&path) {
        Ok(decoder) => assert_eq!(decoder.count(), 0),
        // Some containers refuse a data chunk of length zero outright
        Err(e) => assert!(matches!(e, DecodeError::Probe(_) | DecodeError::NoAudioStream)),
    }
}

#[test]
fn test_missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AudioDecoder::open(&dir.path().join("nope.wav"));
    assert!(matches!(result, Err(DecodeError::Open(_))));
}

#[test]
fn test_non_audio_file_is_probe_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence-format.txt");
    std::fs::write(&path, b"plain text, not a container").unwrap();

    let result = AudioDecoder::open(&path);
    assert!(matches!(result, Err(DecodeError::Probe(_))));
}

#[test]
fn test_truncated_file_plays_what_was_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.wav");
    write_ramp_wav(&path, 44_100, 2, 8_000, 9);

    // Chop the data chunk short while the header still declares 8000 frames
    let full = std::fs::read(&path).unwrap();
    let cut_len = full.len() - 4_000 * BYTES_PER_FRAME;
    std::fs::write(&path, &full[..cut_len]).unwrap();

    let bytes: Vec<u8> = AudioDecoder::open(&path)
        .unwrap()
        .flat_map(|c| c.as_bytes().to_vec())
        .collect();
    assert!(!bytes.is_empty());
    assert!(bytes.len() <= 4_000 * BYTES_PER_FRAME);
    let expected = ramp_bytes(8_000, 9);
    assert_eq!(&bytes[..], &expected[..bytes.len()]);
}
