/// Tone synthesizer.
///
/// A tone is a single oscillator with its gain ramped exponentially from
/// 0.5 down to 0.001 over its duration, which keeps starts and stops free
/// of clicks. Cues are short lists of tones with start offsets.

use std::f32::consts::PI;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44_100;

const GAIN_START: f32 = 0.5;
const GAIN_END: f32 = 0.001;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_s: f32,
    pub waveform: Waveform,
}

impl Tone {
    pub const fn sine(frequency_hz: f32, duration_s: f32) -> Self {
        Tone { frequency_hz, duration_s, waveform: Waveform::Sine }
    }

    pub const fn square(frequency_hz: f32, duration_s: f32) -> Self {
        Tone { frequency_hz, duration_s, waveform: Waveform::Square }
    }

    /// Gain at `t` seconds into the tone.
    pub fn gain_at(&self, t: f32) -> f32 {
        if self.duration_s <= 0.0 {
            return GAIN_END;
        }
        let progress = (t / self.duration_s).clamp(0.0, 1.0);
        GAIN_START * (GAIN_END / GAIN_START).powf(progress)
    }

    /// Render mono f32 samples at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let n = (sample_rate as f32 * self.duration_s.max(0.0)) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let phase = (t * self.frequency_hz * 2.0 * PI).sin();
                let wave = match self.waveform {
                    Waveform::Sine => phase,
                    Waveform::Square => if phase >= 0.0 { 1.0 } else { -1.0 },
                };
                wave * self.gain_at(t)
            })
            .collect()
    }
}

/// A tone and when it starts relative to its cue.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ScheduledTone {
    pub tone: Tone,
    pub offset: Duration,
}

const fn at(offset_ms: u64, tone: Tone) -> ScheduledTone {
    ScheduledTone { tone, offset: Duration::from_millis(offset_ms) }
}

// Both chime tones start together.
const CORRECT: [ScheduledTone; 2] = [
    at(0, Tone::sine(600.0, 0.1)),
    at(0, Tone::sine(800.0, 0.1)),
];

const INCORRECT: [ScheduledTone; 1] = [
    at(0, Tone::square(200.0, 0.2)),
];

// C5, E5, G5
const GAME_OVER: [ScheduledTone; 3] = [
    at(0, Tone::sine(523.0, 0.15)),
    at(150, Tone::sine(659.0, 0.15)),
    at(300, Tone::sine(784.0, 0.2)),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Correct,
    Incorrect,
    GameOver,
}

impl Cue {
    pub fn schedule(self) -> &'static [ScheduledTone] {
        match self {
            Cue::Correct => &CORRECT,
            Cue::Incorrect => &INCORRECT,
            Cue::GameOver => &GAME_OVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_starts_at_half_and_decays_to_floor() {
        let tone = Tone::sine(440.0, 0.2);
        assert!((tone.gain_at(0.0) - 0.5).abs() < 1e-6);
        assert!((tone.gain_at(0.2) - 0.001).abs() < 1e-6);
        assert!(tone.gain_at(0.05) > tone.gain_at(0.1));
        // Exponential: halfway point is the geometric mean
        assert!((tone.gain_at(0.1) - (0.5f32 * 0.001).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn render_length_matches_duration() {
        let samples = Tone::sine(600.0, 0.1).render(SAMPLE_RATE);
        assert_eq!(samples.len(), 4410);
        assert!(samples.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn square_wave_is_two_level() {
        let tone = Tone::square(200.0, 0.2);
        for (i, s) in tone.render(SAMPLE_RATE).iter().enumerate() {
            let g = tone.gain_at(i as f32 / SAMPLE_RATE as f32);
            assert!((s.abs() - g).abs() < 1e-5);
        }
    }

    #[test]
    fn correct_cue_is_two_simultaneous_tones() {
        let s = Cue::Correct.schedule();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].tone.frequency_hz, 600.0);
        assert_eq!(s[1].tone.frequency_hz, 800.0);
        assert!(s.iter().all(|t| t.offset == Duration::ZERO && t.tone.duration_s == 0.1));
    }

    #[test]
    fn incorrect_cue_is_low_square() {
        assert_eq!(Cue::Incorrect.schedule(), &[at(0, Tone::square(200.0, 0.2))]);
    }

    #[test]
    fn game_over_cue_is_staggered_arpeggio() {
        let s = Cue::GameOver.schedule();
        let freqs: Vec<f32> = s.iter().map(|t| t.tone.frequency_hz).collect();
        let offsets: Vec<u128> = s.iter().map(|t| t.offset.as_millis()).collect();
        let durs: Vec<f32> = s.iter().map(|t| t.tone.duration_s).collect();
        assert_eq!(freqs, vec![523.0, 659.0, 784.0]);
        assert_eq!(offsets, vec![0, 150, 300]);
        assert_eq!(durs, vec![0.15, 0.15, 0.2]);
        assert!(s.iter().all(|t| t.tone.waveform == Waveform::Sine));
    }
}
