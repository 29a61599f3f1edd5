//! Keyframed animation tracks as authored.

use serde::{Deserialize, Serialize};

use crate::animation::tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
use crate::naming::argument_of;

/// Curve interpolation between two authored keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveInterpolation {
    Constant,
    #[default]
    Linear,
    /// Hermite segments built from the per-key slopes.
    Bezier,
}

impl From<CurveInterpolation> for InterpolationMode {
    fn from(value: CurveInterpolation) -> Self {
        match value {
            CurveInterpolation::Constant => InterpolationMode::Step,
            CurveInterpolation::Linear => InterpolationMode::Linear,
            CurveInterpolation::Bezier => InterpolationMode::CubicSpline,
        }
    }
}

/// One authored key, on the raw frame axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub frame: f32,
    pub value: f32,
    /// Incoming slope (value per frame), used by Bezier curves.
    #[serde(default)]
    pub in_slope: f32,
    /// Outgoing slope (value per frame), used by Bezier curves.
    #[serde(default)]
    pub out_slope: f32,
}

impl CurveKey {
    #[must_use]
    pub fn new(frame: f32, value: f32) -> Self {
        Self {
            frame,
            value,
            in_slope: 0.0,
            out_slope: 0.0,
        }
    }
}

/// One scalar component of an animated property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FCurve {
    /// Property path, optionally qualified: `location`,
    /// `pose.bones["Spine"].rotation_euler`, `EDMProps.ANIMATED_BRIGHTNESS`.
    pub data_path: String,
    /// Component index inside the property (x = 0, ...).
    #[serde(default)]
    pub array_index: usize,
    pub keyframes: Vec<CurveKey>,
    #[serde(default)]
    pub interpolation: CurveInterpolation,
}

impl FCurve {
    /// Linear curve through `(frame, value)` pairs.
    #[must_use]
    pub fn linear(data_path: impl Into<String>, array_index: usize, keys: &[(f32, f32)]) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            keyframes: keys.iter().map(|&(f, v)| CurveKey::new(f, v)).collect(),
            interpolation: CurveInterpolation::Linear,
        }
    }

    /// Raw frames of the authored keys.
    pub fn key_frames(&self) -> impl Iterator<Item = f32> + '_ {
        self.keyframes.iter().map(|k| k.frame)
    }

    /// Sampling track over the raw frame axis.
    #[must_use]
    pub fn track(&self) -> KeyframeTrack<f32> {
        let mode = InterpolationMode::from(self.interpolation);
        let times = self.keyframes.iter().map(|k| k.frame).collect();
        let values = match mode {
            InterpolationMode::CubicSpline => self
                .keyframes
                .iter()
                .flat_map(|k| [k.in_slope, k.value, k.out_slope])
                .collect(),
            _ => self.keyframes.iter().map(|k| k.value).collect(),
        };
        KeyframeTrack::new(times, values, mode)
    }

    /// Value at `frame`, clamped outside the keyed range. An empty curve reads 0.
    #[must_use]
    pub fn evaluate(&self, frame: f32) -> f32 {
        self.track().sample(frame).unwrap_or(0.0)
    }
}

/// Curve sampler reusing one track and cursor across monotonic frames.
pub(crate) struct CurveSampler {
    track: KeyframeTrack<f32>,
    cursor: KeyframeCursor,
}

impl CurveSampler {
    pub(crate) fn new(curve: &FCurve) -> Self {
        Self {
            track: curve.track(),
            cursor: KeyframeCursor::default(),
        }
    }

    pub(crate) fn sample(&mut self, frame: f32) -> f32 {
        self.track.sample_with_cursor(frame, &mut self.cursor).unwrap_or(0.0)
    }
}

/// Named set of curves. The leading digits of the name select the argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub curves: Vec<FCurve>,
}

impl Action {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_curve(mut self, curve: FCurve) -> Self {
        self.curves.push(curve);
        self
    }

    /// Argument parsed from the action name, `-1` when it has none.
    #[inline]
    #[must_use]
    pub fn argument(&self) -> i32 {
        argument_of(&self.name)
    }

    /// Whether any curve targets exactly `data_path`.
    #[must_use]
    pub fn has_path(&self, data_path: &str) -> bool {
        self.curves.iter().any(|c| c.data_path == data_path)
    }
}
