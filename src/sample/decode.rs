//! Single-file MP3/WAV decode into resampled stereo float PCM.
//!
//! A trimmed-down version of the directory-scanning decoder this crate's
//! ambient sample-loading stack is built from: the engine only ever loads
//! one file (the secret-mode sample), so there is no index to scan and no
//! lazy head-preload, just decode-then-resample-once at load time.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded, resampled, stereo-duplicated PCM ready for playback at
/// `target_sr`. Interleaved `[L, R, L, R, ...]`.
pub struct DecodedSample {
    pub frames: Vec<f32>,
    pub channels: usize,
    pub frame_count: usize,
}

/// Decodes `path` to PCM, resamples to `target_sr` if needed, and expands
/// mono to stereo by duplication.
pub fn decode_and_resample(path: &Path, target_sr: f32) -> Result<DecodedSample, String> {
    let file = File::open(path).map_err(|e| format!("failed to open file: {e}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("failed to probe format: {e}"))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or("no audio track found")?;

    let codec_params = &track.codec_params;
    let source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let source_sr = codec_params.sample_rate.unwrap_or(44_100) as f32;

    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(|e| format!("failed to create decoder: {e}"))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(format!("failed to read packet: {e}")),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(format!("decode error: {e}")),
        };

        let spec = *decoded.spec();
        let duration = decoded.capacity() as u64;
        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::<f32>::new(duration, spec));
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() {
        return Err("no samples decoded".to_string());
    }

    let stereo = to_stereo(&samples, source_channels);
    let resampled = if (source_sr - target_sr).abs() > 1.0 {
        resample_linear(&stereo, 2, source_sr, target_sr)
    } else {
        stereo
    };

    let frame_count = resampled.len() / 2;
    Ok(DecodedSample {
        frames: resampled,
        channels: 2,
        frame_count,
    })
}

/// Expands mono to stereo by duplication; passes stereo through; downmixes
/// anything wider by averaging to mono then duplicating.
fn to_stereo(samples: &[f32], source_channels: usize) -> Vec<f32> {
    match source_channels {
        1 => {
            let mut out = Vec::with_capacity(samples.len() * 2);
            for &s in samples {
                out.push(s);
                out.push(s);
            }
            out
        }
        2 => samples.to_vec(),
        n if n > 2 => {
            let frames = samples.len() / n;
            let mut out = Vec::with_capacity(frames * 2);
            for f in 0..frames {
                let mono: f32 =
                    samples[f * n..f * n + n].iter().sum::<f32>() / n as f32;
                out.push(mono);
                out.push(mono);
            }
            out
        }
        _ => Vec::new(),
    }
}

fn resample_linear(samples: &[f32], channels: usize, from_sr: f32, to_sr: f32) -> Vec<f32> {
    let ratio = to_sr / from_sr;
    let in_frames = samples.len() / channels;
    let out_frames = ((in_frames as f32 * ratio) as usize).max(1);
    let mut output = vec![0.0; out_frames * channels];

    for out_frame in 0..out_frames {
        let in_pos = out_frame as f32 / ratio;
        let in_frame = (in_pos as usize).min(in_frames.saturating_sub(1));
        let next_frame = (in_frame + 1).min(in_frames.saturating_sub(1));
        let frac = in_pos - in_frame as f32;

        for ch in 0..channels {
            let s0 = samples[in_frame * channels + ch];
            let s1 = samples[next_frame * channels + ch];
            output[out_frame * channels + ch] = s0 + frac * (s1 - s0);
        }
    }

    output
}
