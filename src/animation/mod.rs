mod values;
pub mod channel;
pub mod path;
pub mod resolver;
pub mod tracks;

pub use channel::{AnimationChannel, Keyframe, Property, frame_to_time, sample_components};
pub use path::{ChannelScope, ChannelTarget, PropertyPath};
pub use resolver::{
    AllowedAnimations, TransformSource, extract_transform_animation, extract_transform_chain,
    extract_visibility_animation, has_bone_transform_anim, has_transform_anim, warn_unassigned_curves,
};
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::Interpolatable;
