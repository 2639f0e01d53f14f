//! Sample playback for the secret-mode alternate audio path.
//!
//! Loaded once (off the audio thread, at startup or on an explicit reload),
//! then played back allocation-free: `process` only reads from the already
//! decoded buffer and advances an index.

use super::decode::decode_and_resample;
use std::path::Path;
use std::sync::Arc;

/// Immutable decoded sample data, stereo-interleaved at the engine's sample
/// rate. Cheap to share via `Arc` since it is written once and never
/// mutated after load.
pub struct SampleData {
    frames: Vec<f32>,
    frame_count: usize,
}

/// Plays back a single loaded sample on trigger; silent otherwise.
pub struct SamplePlayer {
    data: Option<Arc<SampleData>>,
    playhead: usize,
    playing: bool,
    gain: f32,
    loop_enabled: bool,
}

impl Default for SamplePlayer {
    fn default() -> Self {
        Self {
            data: None,
            playhead: 0,
            playing: false,
            gain: 1.0,
            loop_enabled: false,
        }
    }
}

impl SamplePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads, decodes, and resamples `path` to `target_sr`. Absence of the
    /// file is reported to the caller (who treats it as non-fatal: secret
    /// mode stays available but produces silence until a sample loads).
    pub fn load(&mut self, path: &Path, target_sr: f32) -> Result<(), String> {
        let decoded = decode_and_resample(path, target_sr)?;
        self.data = Some(Arc::new(SampleData {
            frames: decoded.frames,
            frame_count: decoded.frame_count,
        }));
        self.playhead = 0;
        self.playing = false;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn play(&mut self) {
        if self.data.is_some() {
            self.playhead = 0;
            self.playing = true;
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Fills `out` (stereo-interleaved, `2*n` floats) from the loaded
    /// sample, advancing the playhead. Silence if not playing or unloaded.
    pub fn process(&mut self, out: &mut [f32], n: usize) {
        let Some(data) = self.data.as_ref().filter(|_| self.playing) else {
            for slot in out.iter_mut().take(n * 2) {
                *slot = 0.0;
            }
            return;
        };

        for i in 0..n {
            if self.playhead >= data.frame_count {
                if self.loop_enabled {
                    self.playhead = 0;
                } else {
                    self.playing = false;
                    for slot in out[i * 2..n * 2].iter_mut() {
                        *slot = 0.0;
                    }
                    return;
                }
            }

            out[i * 2] = data.frames[self.playhead * 2] * self.gain;
            out[i * 2 + 1] = data.frames[self.playhead * 2 + 1] * self.gain;
            self.playhead += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_data(frame_count: usize) -> Arc<SampleData> {
        let mut frames = Vec::with_capacity(frame_count * 2);
        for i in 0..frame_count {
            frames.push(i as f32);
            frames.push(-(i as f32));
        }
        Arc::new(SampleData {
            frames,
            frame_count,
        })
    }

    #[test]
    fn unloaded_player_is_silent() {
        let mut p = SamplePlayer::new();
        p.play();
        let mut out = [1.0; 16];
        p.process(&mut out, 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stopped_player_is_silent_even_when_loaded() {
        let mut p = SamplePlayer::new();
        p.data = Some(fake_data(100));
        let mut out = [1.0; 16];
        p.process(&mut out, 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn play_advances_and_auto_stops_without_loop() {
        let mut p = SamplePlayer::new();
        p.data = Some(fake_data(4));
        p.play();
        let mut out = [0.0; 12];
        p.process(&mut out, 6);
        assert!(!p.is_playing());
        // First 4 frames are real data, remaining 2 are silence after stop.
        assert_eq!(out[0], 0.0);
        assert_eq!(out[6], 0.0);
        assert_eq!(out[7], 0.0);
    }

    #[test]
    fn loop_enabled_wraps_playhead() {
        let mut p = SamplePlayer::new();
        p.data = Some(fake_data(4));
        p.set_loop(true);
        p.play();
        let mut out = [0.0; 20];
        p.process(&mut out, 10);
        assert!(p.is_playing());
    }
}
