//! Mass easings: eight curves of increasing "weight", 0 (linear) to 7 (circular).

use std::f64::consts::PI;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Linear,
    Sine,
    Power(i32),
    Expo,
    Circ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
    InOut,
}

/// An easing function over `[0, 1]`, with `apply(0) == 0` and `apply(1) == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Easing {
    curve: Curve,
    direction: Direction,
}

impl Easing {
    pub const LINEAR: Easing = Easing {
        curve: Curve::Linear,
        direction: Direction::In,
    };

    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self.direction {
            Direction::In => ease_in_curve(self.curve, t),
            Direction::Out => 1.0 - ease_in_curve(self.curve, 1.0 - t),
            Direction::InOut => {
                if t < 0.5 {
                    ease_in_curve(self.curve, 2.0 * t) / 2.0
                } else {
                    1.0 - ease_in_curve(self.curve, 2.0 - 2.0 * t) / 2.0
                }
            }
        }
    }
}

fn ease_in_curve(curve: Curve, t: f64) -> f64 {
    match curve {
        Curve::Linear => t,
        Curve::Sine => 1.0 - (t * PI / 2.0).cos(),
        Curve::Power(p) => t.powi(p),
        Curve::Expo => {
            if t <= 0.0 {
                0.0
            } else {
                2.0f64.powf(10.0 * t - 10.0)
            }
        }
        Curve::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
    }
}

/// How heavy the cursor feels, `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub struct EasingMass(u8);

impl EasingMass {
    pub const MAX: u8 = 7;

    pub fn new(mass: u8) -> Result<Self> {
        if mass <= Self::MAX {
            Ok(Self(mass))
        } else {
            Err(Error::InvalidEasingMass(mass))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn curve(self) -> Curve {
        match self.0 {
            0 => Curve::Linear,
            1 => Curve::Sine,
            2..=5 => Curve::Power(self.0 as i32),
            6 => Curve::Expo,
            _ => Curve::Circ,
        }
    }
}

impl Default for EasingMass {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for EasingMass {
    type Error = Error;

    fn try_from(mass: u8) -> Result<Self> {
        Self::new(mass)
    }
}

pub fn ease_in(mass: EasingMass) -> Easing {
    Easing {
        curve: mass.curve(),
        direction: Direction::In,
    }
}

pub fn ease_out(mass: EasingMass) -> Easing {
    Easing {
        curve: mass.curve(),
        direction: Direction::Out,
    }
}

pub fn ease_in_out(mass: EasingMass) -> Easing {
    Easing {
        curve: mass.curve(),
        direction: Direction::InOut,
    }
}
