//! Audio-level sources.
//!
//! Capture and analysis happen outside this crate. The pipeline only needs
//! a non-blocking read of the latest level in `[0, 1]`; a time-domain
//! buffer can be turned into one with [`level_from_waveform`].

/// Length of the time-domain buffer a capture device hands over.
pub const WAVEFORM_LEN: usize = 128;

/// Gain applied to the RMS amplitude before clamping.
const LEVEL_GAIN: f32 = 5.0;

/// Outcome of asking the visitor for microphone access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Something that can report how loud the visitor currently is.
pub trait AudioSource {
    /// Latest level in `[0, 1]`. Never blocks.
    fn current_level(&self) -> f32;

    /// Latest time-domain buffer, unsigned 8-bit samples centered on 128.
    fn waveform(&self) -> &[u8];
}

/// Loudness of an unsigned 8-bit time-domain buffer.
///
/// Samples are centered on 128; the RMS of the normalized signal is
/// amplified and clamped to `[0, 1]`. An empty buffer is silent.
pub fn level_from_waveform(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&b| {
            let v = (f32::from(b) - 128.0) / 128.0;
            v * v
        })
        .sum();
    let rms = (sum / samples.len() as f32).sqrt();
    (rms * LEVEL_GAIN).min(1.0)
}

/// Source backed by the most recent buffer pushed by a capture device.
#[derive(Debug, Clone)]
pub struct WaveformSource {
    buffer: Vec<u8>,
}

impl Default for WaveformSource {
    fn default() -> Self {
        Self {
            buffer: vec![128; WAVEFORM_LEN],
        }
    }
}

impl WaveformSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer; only the latest one matters.
    pub fn push(&mut self, samples: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(samples);
    }

    /// Fill the buffer with a sine wave of the given peak amplitude
    /// (`0..=127`) and number of cycles.
    pub fn push_sine(&mut self, amplitude: u8, cycles: f32) {
        let amplitude = f32::from(amplitude.min(127));
        self.buffer.clear();
        self.buffer.extend((0..WAVEFORM_LEN).map(|i| {
            let phase = i as f32 / WAVEFORM_LEN as f32 * cycles * std::f32::consts::TAU;
            (128.0 + amplitude * phase.sin()).round().clamp(0.0, 255.0) as u8
        }));
    }
}

impl AudioSource for WaveformSource {
    fn current_level(&self) -> f32 {
        level_from_waveform(&self.buffer)
    }

    fn waveform(&self) -> &[u8] {
        &self.buffer
    }
}

/// Source that always reports the same level.
#[derive(Debug, Clone)]
pub struct FixedLevel {
    level: f32,
    silence: [u8; WAVEFORM_LEN],
}

impl FixedLevel {
    pub fn new(level: f32) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            silence: [128; WAVEFORM_LEN],
        }
    }
}

impl AudioSource for FixedLevel {
    fn current_level(&self) -> f32 {
        self.level
    }

    fn waveform(&self) -> &[u8] {
        &self.silence
    }
}
