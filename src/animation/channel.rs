use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::animation::path::ChannelTarget;
use crate::source::action::{Action, CurveSampler, FCurve};

/// Frames per unit of normalized export time.
pub const FRAMES_PER_UNIT: f32 = 100.0;

/// Raw authoring frame to normalized export time: `[0, 200] -> [-1, 1]`.
#[inline]
#[must_use]
pub fn frame_to_time(frame: f32) -> f32 {
    frame / FRAMES_PER_UNIT - 1.0
}

/// One combined sample of an animated property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Normalized time in `[-1, 1]`.
    pub time: f32,
    pub value: T,
}

/// Ordered keyframes of one property, driven by one argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationChannel<T> {
    pub argument: i32,
    pub keys: Vec<Keyframe<T>>,
}

impl<T> AnimationChannel<T> {
    #[must_use]
    pub fn new(argument: i32, keys: Vec<Keyframe<T>>) -> Self {
        Self { argument, keys }
    }

    /// Applies `f` to every key value.
    #[must_use]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> AnimationChannel<U> {
        AnimationChannel {
            argument: self.argument,
            keys: self
                .keys
                .into_iter()
                .map(|k| Keyframe {
                    time: k.time,
                    value: f(k.value),
                })
                .collect(),
        }
    }
}

/// Exported property: a constant or an argument-driven channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property<T> {
    Constant(T),
    Animated(AnimationChannel<T>),
}

impl<T> Property<T> {
    #[inline]
    #[must_use]
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }
}

impl<T> From<T> for Property<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

/// Samples an `N`-component property of `action`.
///
/// Components without a curve are held at `defaults`. Samples are taken at
/// the union of all key frames of the real components, in ascending order.
/// `None` when no curve targets the property or no curve has keys.
#[must_use]
pub fn sample_components<const N: usize>(
    action: &Action,
    target: &ChannelTarget<'_>,
    defaults: [f32; N],
) -> Option<Vec<Keyframe<[f32; N]>>> {
    let mut curves: [Option<&FCurve>; N] = [None; N];
    for curve in &action.curves {
        if curve.array_index < N && target.matches(&curve.data_path) {
            curves[curve.array_index] = Some(curve);
        }
    }
    if curves.iter().all(Option::is_none) {
        return None;
    }

    let mut frames: Vec<f32> = curves.iter().flatten().flat_map(|c| c.key_frames()).collect();
    frames.sort_by(f32::total_cmp);
    frames.dedup();
    if frames.is_empty() {
        return None;
    }

    let mut samplers: [Option<CurveSampler>; N] = curves.map(|c| c.map(CurveSampler::new));
    let keys = frames
        .into_iter()
        .map(|frame| {
            let mut value = defaults;
            for (slot, sampler) in value.iter_mut().zip(samplers.iter_mut()) {
                if let Some(sampler) = sampler {
                    *slot = sampler.sample(frame);
                }
            }
            Keyframe {
                time: frame_to_time(frame),
                value,
            }
        })
        .collect();
    Some(keys)
}

/// Samples a scalar property into a channel driven by `argument`.
#[must_use]
pub fn sample_float(action: &Action, target: &ChannelTarget<'_>, argument: i32) -> Option<AnimationChannel<f32>> {
    let keys = sample_components(action, target, [0.0])?;
    Some(AnimationChannel::new(argument, keys).map(|[v]| v))
}

#[must_use]
pub fn sample_vec2(
    action: &Action,
    target: &ChannelTarget<'_>,
    argument: i32,
    defaults: Vec2,
) -> Option<AnimationChannel<Vec2>> {
    let keys = sample_components(action, target, defaults.to_array())?;
    Some(AnimationChannel::new(argument, keys).map(Vec2::from_array))
}

#[must_use]
pub fn sample_vec3(
    action: &Action,
    target: &ChannelTarget<'_>,
    argument: i32,
    defaults: Vec3,
) -> Option<AnimationChannel<Vec3>> {
    let keys = sample_components(action, target, defaults.to_array())?;
    Some(AnimationChannel::new(argument, keys).map(Vec3::from_array))
}

#[must_use]
pub fn sample_vec4(
    action: &Action,
    target: &ChannelTarget<'_>,
    argument: i32,
    defaults: Vec4,
) -> Option<AnimationChannel<Vec4>> {
    let keys = sample_components(action, target, defaults.to_array())?;
    Some(AnimationChannel::new(argument, keys).map(Vec4::from_array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::path::PropertyPath;

    #[test]
    fn union_of_component_frames() {
        let action = Action::new("1_move")
            .with_curve(FCurve::linear("location", 0, &[(0.0, 0.0), (200.0, 2.0)]))
            .with_curve(FCurve::linear("location", 2, &[(100.0, 5.0)]));
        let channel = sample_vec3(
            &action,
            &ChannelTarget::object(PropertyPath::Location),
            1,
            Vec3::new(0.0, 7.0, 0.0),
        )
        .unwrap();

        let times: Vec<f32> = channel.keys.iter().map(|k| k.time).collect();
        assert_eq!(times, [-1.0, 0.0, 1.0]);
        assert_eq!(channel.keys[1].value, Vec3::new(1.0, 7.0, 5.0));
    }

    #[test]
    fn missing_property_yields_none() {
        let action = Action::new("1_move").with_curve(FCurve::linear("scale", 0, &[(0.0, 1.0)]));
        assert!(sample_float(&action, &ChannelTarget::object(PropertyPath::Location), 1).is_none());
    }
}
