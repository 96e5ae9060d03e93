//! Canvas mixing: resampling, gain, fades, BGM looping and peak
//! normalization.

use super::error::AudioError;
use super::wav::{AudioClip, WavSpec};

/// Convert a dB value to a linear amplitude factor.
pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// A silent timeline that clips are mixed onto additively.
#[derive(Debug)]
pub struct Canvas {
    clip: AudioClip,
}

impl Canvas {
    /// Allocate a silent canvas of `duration_ms` at the given spec.
    pub fn new(spec: WavSpec, duration_ms: u64) -> Self {
        Self {
            clip: AudioClip::silence(spec, duration_ms),
        }
    }

    pub fn spec(&self) -> WavSpec {
        self.clip.spec
    }

    pub fn duration_ms(&self) -> u64 {
        self.clip.duration_ms()
    }

    /// Mix a clip onto the canvas at `start_ms`, adapting its sample rate
    /// and channel layout first. Samples beyond the canvas end are dropped.
    pub fn mix_at(&mut self, clip: &AudioClip, start_ms: u64) -> Result<(), AudioError> {
        let adapted = conform(clip, self.clip.spec)?;
        let channels = self.clip.spec.channels as usize;
        let start_frame = (self.clip.spec.sample_rate as u64 * start_ms / 1000) as usize;

        let canvas_frames = self.clip.frames();
        for frame in 0..adapted.frames() {
            let target = start_frame + frame;
            if target >= canvas_frames {
                break;
            }
            for ch in 0..channels {
                self.clip.samples[target * channels + ch] +=
                    adapted.samples[frame * channels + ch];
            }
        }
        Ok(())
    }

    /// Mix a background track across the whole canvas, looping it when it
    /// is shorter and truncating when longer, attenuated by `gain_db`.
    pub fn mix_background(&mut self, bgm: &AudioClip, gain_db: f32) -> Result<(), AudioError> {
        let adapted = conform(bgm, self.clip.spec)?;
        if adapted.frames() == 0 {
            return Ok(());
        }
        let gain = db_to_amplitude(gain_db);
        let channels = self.clip.spec.channels as usize;
        let source_frames = adapted.frames();

        for frame in 0..self.clip.frames() {
            let src = frame % source_frames;
            for ch in 0..channels {
                self.clip.samples[frame * channels + ch] +=
                    adapted.samples[src * channels + ch] * gain;
            }
        }
        Ok(())
    }

    /// Current absolute peak in dBFS. Returns negative infinity for silence.
    pub fn peak_dbfs(&self) -> f32 {
        let peak = self
            .clip
            .samples
            .iter()
            .fold(0f32, |acc, s| acc.max(s.abs()));
        if peak == 0.0 {
            f32::NEG_INFINITY
        } else {
            20.0 * peak.log10()
        }
    }

    /// Scale uniformly so the peak sits at `ceiling_dbfs`, but only when it
    /// currently exceeds the ceiling.
    pub fn normalize_peak(&mut self, ceiling_dbfs: f32) {
        let peak = self.peak_dbfs();
        if peak > ceiling_dbfs {
            let scale = db_to_amplitude(ceiling_dbfs - peak);
            for s in &mut self.clip.samples {
                *s *= scale;
            }
        }
    }

    /// Consume the canvas and return the mixed clip.
    pub fn into_clip(self) -> AudioClip {
        self.clip
    }
}

/// Apply a flat gain in dB.
pub fn apply_gain(clip: &mut AudioClip, gain_db: f32) {
    if gain_db == 0.0 {
        return;
    }
    let gain = db_to_amplitude(gain_db);
    for s in &mut clip.samples {
        *s *= gain;
    }
}

/// Apply linear fade-in and fade-out ramps.
pub fn apply_fades(clip: &mut AudioClip, fade_in_ms: u64, fade_out_ms: u64) {
    let channels = clip.spec.channels as usize;
    let frames = clip.frames();
    if frames == 0 || channels == 0 {
        return;
    }

    let fade_in = ((clip.spec.sample_rate as u64 * fade_in_ms / 1000) as usize).min(frames);
    for frame in 0..fade_in {
        let gain = frame as f32 / fade_in as f32;
        for ch in 0..channels {
            clip.samples[frame * channels + ch] *= gain;
        }
    }

    let fade_out = ((clip.spec.sample_rate as u64 * fade_out_ms / 1000) as usize).min(frames);
    for i in 0..fade_out {
        let frame = frames - 1 - i;
        let gain = i as f32 / fade_out as f32;
        for ch in 0..channels {
            clip.samples[frame * channels + ch] *= gain;
        }
    }
}

/// Cut `[start_ms, end_ms)` out of a clip, clamped to its length.
pub fn slice_ms(clip: &AudioClip, start_ms: u64, end_ms: u64) -> AudioClip {
    let channels = clip.spec.channels as usize;
    let frames = clip.frames();
    let to_frame = |ms: u64| ((clip.spec.sample_rate as u64 * ms / 1000) as usize).min(frames);

    let start = to_frame(start_ms);
    let end = to_frame(end_ms).max(start);
    AudioClip {
        samples: clip.samples[start * channels..end * channels].to_vec(),
        spec: clip.spec,
    }
}

/// Resample and channel-map a clip onto a target spec.
fn conform(clip: &AudioClip, target: WavSpec) -> Result<AudioClip, AudioError> {
    let remapped = map_channels(clip, target.channels)?;
    Ok(resample(&remapped, target.sample_rate))
}

fn map_channels(clip: &AudioClip, target: u16) -> Result<AudioClip, AudioError> {
    let from = clip.spec.channels;
    if from == target {
        return Ok(clip.clone());
    }

    let frames = clip.frames();
    let mut samples = Vec::with_capacity(frames * target as usize);
    match (from, target) {
        // Mono fan-out.
        (1, _) => {
            for frame in 0..frames {
                let v = clip.samples[frame];
                for _ in 0..target {
                    samples.push(v);
                }
            }
        }
        // Downmix to mono by averaging.
        (_, 1) => {
            let n = from as usize;
            for frame in 0..frames {
                let sum: f32 = clip.samples[frame * n..(frame + 1) * n].iter().sum();
                samples.push(sum / n as f32);
            }
        }
        _ => return Err(AudioError::ChannelMismatch { from, to: target }),
    }

    Ok(AudioClip {
        samples,
        spec: WavSpec {
            sample_rate: clip.spec.sample_rate,
            channels: target,
        },
    })
}

/// Linear-interpolation resampler.
fn resample(clip: &AudioClip, target_rate: u32) -> AudioClip {
    if clip.spec.sample_rate == target_rate {
        return clip.clone();
    }

    let channels = clip.spec.channels as usize;
    let frames = clip.frames();
    let ratio = target_rate as f64 / clip.spec.sample_rate as f64;
    let out_frames = (frames as f64 * ratio) as usize;
    let mut samples = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        for ch in 0..channels {
            let idx0 = src_idx * channels + ch;
            let idx1 = (src_idx + 1).min(frames.saturating_sub(1)) * channels + ch;
            let s0 = clip.samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = clip.samples.get(idx1).copied().unwrap_or(s0);
            samples.push(s0 + (s1 - s0) * frac);
        }
    }

    AudioClip {
        samples,
        spec: WavSpec {
            sample_rate: target_rate,
            channels: clip.spec.channels,
        },
    }
}
