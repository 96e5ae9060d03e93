//! Leading/trailing silence removal.

use super::wav::AudioClip;

/// Shortest clip the trimmer will produce; anything below this is left alone.
const MIN_CLIP_MS: u64 = 100;

/// Result of a trim pass over one clip.
#[derive(Debug)]
pub struct TrimOutcome {
    pub clip: AudioClip,
    /// Frames removed across both ends.
    pub removed_frames: usize,
    /// True when the clip was emitted unchanged.
    pub untouched: bool,
}

/// Remove leading and trailing silence from a clip.
///
/// A frame of `frame_ms` counts as silent when its RMS falls below
/// `threshold_dbfs`. A guard band of `guard_ms` is kept at each end. The
/// clip is returned unchanged when trimming would remove more than half of
/// its duration or shrink it below 100 ms.
pub fn trim_silence(
    clip: AudioClip,
    threshold_dbfs: f32,
    frame_ms: u64,
    guard_ms: u64,
) -> TrimOutcome {
    let channels = clip.spec.channels as usize;
    let frame_len = (clip.spec.sample_rate as u64 * frame_ms / 1000) as usize;
    let total_frames = clip.frames();

    if channels == 0 || frame_len == 0 || total_frames == 0 {
        return TrimOutcome {
            clip,
            removed_frames: 0,
            untouched: true,
        };
    }

    let threshold = db_to_rms(threshold_dbfs);
    let windows = total_frames / frame_len;

    let mut first_loud: Option<usize> = None;
    let mut last_loud: Option<usize> = None;
    for w in 0..windows {
        let start = w * frame_len * channels;
        let end = start + frame_len * channels;
        if rms(&clip.samples[start..end]) >= threshold {
            if first_loud.is_none() {
                first_loud = Some(w);
            }
            last_loud = Some(w);
        }
    }

    let (Some(first), Some(last)) = (first_loud, last_loud) else {
        // All silence; leave the clip for the caller to decide.
        return TrimOutcome {
            clip,
            removed_frames: 0,
            untouched: true,
        };
    };

    let guard_frames = (clip.spec.sample_rate as u64 * guard_ms / 1000) as usize;
    let start_frame = (first * frame_len).saturating_sub(guard_frames);
    let end_frame = ((last + 1) * frame_len + guard_frames).min(total_frames);

    let kept = end_frame - start_frame;
    let removed = total_frames - kept;

    let kept_ms = kept as u64 * 1000 / clip.spec.sample_rate as u64;
    if removed * 2 > total_frames || kept_ms < MIN_CLIP_MS {
        return TrimOutcome {
            clip,
            removed_frames: 0,
            untouched: true,
        };
    }

    let spec = clip.spec;
    let samples = clip.samples[start_frame * channels..end_frame * channels].to_vec();
    TrimOutcome {
        clip: AudioClip { samples, spec },
        removed_frames: removed,
        untouched: removed == 0,
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn db_to_rms(dbfs: f32) -> f32 {
    10f32.powf(dbfs / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::WavSpec;

    const SPEC: WavSpec = WavSpec {
        sample_rate: 16000,
        channels: 1,
    };

    fn clip_with_padding(lead_ms: u64, voice_ms: u64, tail_ms: u64) -> AudioClip {
        let frames = |ms: u64| (SPEC.sample_rate as u64 * ms / 1000) as usize;
        let mut samples = vec![0.0; frames(lead_ms)];
        for i in 0..frames(voice_ms) {
            let t = i as f32 / SPEC.sample_rate as f32;
            samples.push((t * 300.0 * 2.0 * std::f32::consts::PI).sin() * 0.6);
        }
        samples.extend(vec![0.0; frames(tail_ms)]);
        AudioClip { samples, spec: SPEC }
    }

    #[test]
    fn test_trims_leading_and_trailing_silence() {
        let clip = clip_with_padding(300, 1200, 300);
        let original_ms = clip.duration_ms();

        let outcome = trim_silence(clip, -40.0, 20, 50);
        assert!(!outcome.untouched);
        assert!(outcome.removed_frames > 0);

        let trimmed_ms = outcome.clip.duration_ms();
        assert!(trimmed_ms < original_ms);
        // Voice plus guard bands must survive.
        assert!(trimmed_ms >= 1200);
        assert!(trimmed_ms <= 1200 + 2 * 50 + 2 * 20);
    }

    #[test]
    fn test_never_trims_more_than_half() {
        // 200 ms of voice buried in 1.8 s of silence.
        let clip = clip_with_padding(900, 200, 900);
        let original_frames = clip.frames();

        let outcome = trim_silence(clip, -40.0, 20, 50);
        assert!(outcome.untouched);
        assert_eq!(outcome.clip.frames(), original_frames);
    }

    #[test]
    fn test_all_silence_left_untouched() {
        let clip = AudioClip::silence(SPEC, 500);
        let outcome = trim_silence(clip, -40.0, 20, 50);
        assert!(outcome.untouched);
        assert_eq!(outcome.removed_frames, 0);
    }

    #[test]
    fn test_already_tight_clip_unchanged() {
        let clip = clip_with_padding(0, 800, 0);
        let original_frames = clip.frames();
        let outcome = trim_silence(clip, -40.0, 20, 50);
        assert_eq!(outcome.clip.frames(), original_frames);
    }
}
