//! Percussive envelope for click voices.

/// Linear attack, exponential decay, exponential release.
///
/// All time values are in seconds. `decay` and `release` are the times
/// taken to fall to roughly -40 dB.
#[derive(Debug, Clone, Copy)]
pub struct ClickEnvelope {
    pub attack: f64,
    pub decay: f64,
    pub release: f64,
}

/// ln(100): -40 dB.
const FALL: f64 = 4.605_170_185_988_091;

impl ClickEnvelope {
    /// Amplitude at time `t` for a note held for `note_duration`.
    pub fn amplitude(&self, t: f64, note_duration: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return t / self.attack;
        }

        let body = if self.decay <= 0.0 {
            0.0
        } else {
            (-(t - self.attack) * FALL / self.decay).exp()
        };

        if t < note_duration {
            body
        } else if t < note_duration + self.release {
            let released = (t - note_duration) * FALL / self.release;
            body * (-released).exp()
        } else {
            0.0
        }
    }

    /// Total sound duration including release tail.
    pub fn total_duration(&self, note_duration: f64) -> f64 {
        note_duration + self.release
    }
}
