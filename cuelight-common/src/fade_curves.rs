//! Easing curve implementations for lighting fades
//!
//! An easing curve maps linear fade progress in `[0, 1]` to shaped progress in
//! `[0, 1]`. Curves never change how long a fade takes, only how the value
//! moves between its start and end points.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

use crate::Error;

/// Easing curve types for channel fades
///
/// - Linear: Constant rate of change
/// - EaseIn: Cubic, slow start and fast finish
/// - EaseOut: Cubic, fast start and slow finish
/// - EaseInOut: Cubic, slow at both ends
/// - SCurve: Cosine, gentler than the cubic ease-in-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingCurve {
    /// v(t) = t
    #[default]
    Linear,

    /// v(t) = t³
    #[serde(alias = "easeIn", alias = "ease-in")]
    EaseIn,

    /// v(t) = 1 - (1 - t)³
    #[serde(alias = "easeOut", alias = "ease-out")]
    EaseOut,

    /// Cubic in for the first half, cubic out for the second
    #[serde(alias = "easeInOut", alias = "ease-in-out")]
    EaseInOut,

    /// v(t) = 0.5 × (1 - cos(π × t))
    #[serde(alias = "cosine", alias = "s-curve")]
    SCurve,
}

impl EasingCurve {
    /// Shape a linear progress value
    ///
    /// Input outside `[0, 1]` is clamped first, so the result is always in
    /// `[0, 1]` as well.
    pub fn apply(&self, progress: f64) -> f64 {
        let t = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };

        let shaped = match self {
            EasingCurve::Linear => t,
            EasingCurve::EaseIn => t * t * t,
            EasingCurve::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            EasingCurve::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - (u * u * u) / 2.0
                }
            }
            EasingCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
        };

        shaped.clamp(0.0, 1.0)
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            EasingCurve::Linear => "Linear",
            EasingCurve::EaseIn => "Ease In",
            EasingCurve::EaseOut => "Ease Out",
            EasingCurve::EaseInOut => "Ease In/Out",
            EasingCurve::SCurve => "S-Curve",
        }
    }

    /// All available curve variants
    pub fn all_variants() -> &'static [EasingCurve] {
        &[
            EasingCurve::Linear,
            EasingCurve::EaseIn,
            EasingCurve::EaseOut,
            EasingCurve::EaseInOut,
            EasingCurve::SCurve,
        ]
    }
}

impl FromStr for EasingCurve {
    type Err = Error;

    /// Parse a curve name as stored by show files and older consoles
    ///
    /// Case-insensitive; accepts snake_case, kebab-case and camelCase spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '/'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "linear" => Ok(EasingCurve::Linear),
            "easein" | "in" => Ok(EasingCurve::EaseIn),
            "easeout" | "out" => Ok(EasingCurve::EaseOut),
            "easeinout" | "inout" => Ok(EasingCurve::EaseInOut),
            "scurve" | "cosine" => Ok(EasingCurve::SCurve),
            _ => Err(Error::InvalidInput(format!("unknown easing curve '{}'", s))),
        }
    }
}

impl std::fmt::Display for EasingCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
