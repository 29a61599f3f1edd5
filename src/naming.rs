//! Authoring Naming Contracts
//!
//! The authoring side encodes export metadata in names:
//!
//! | Pattern                          | Meaning                              |
//! |----------------------------------|--------------------------------------|
//! | `3_flap`                         | action driven by argument 3          |
//! | `Hull_LOD_1_50`                  | LOD level 1, switch distance 50      |
//! | `DMG_12`                         | vertex group tagging damage arg 12   |
//! | `pose.bones["Spine"].location`   | bone-qualified property path         |
//! | `Light_Dir`, `LD...`             | fake-light direction helper          |
//!
//! All parsers here are anchored at the start of the name and never allocate.

use serde::{Deserialize, Serialize};

/// Argument value meaning "no argument, always static".
pub const NO_ARGUMENT: i32 = -1;

/// Leading run of ASCII digits of `s`, with the rest of the string.
fn leading_digits(s: &str) -> (&str, &str) {
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Argument number encoded in an action or track name: its leading digit run,
/// or [`NO_ARGUMENT`].
///
/// ```
/// use scene_export::naming::argument_of;
/// assert_eq!(argument_of("3_flap"), 3);
/// assert_eq!(argument_of("flap"), -1);
/// ```
#[must_use]
pub fn argument_of(name: &str) -> i32 {
    let (digits, _) = leading_digits(name);
    if digits.is_empty() {
        return NO_ARGUMENT;
    }
    digits.parse().unwrap_or(NO_ARGUMENT)
}

/// LOD level descriptor parsed from a group name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodMarker {
    pub index: u32,
    pub distance: f32,
}

const LOD_TAG: &str = "LOD_";

#[inline]
fn is_lod_prefix_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Parses `[A-Za-z0-9_-]*LOD_<index>_<distance>` at the start of `name`.
///
/// The prefix is greedy, so when a name carries several markers the last
/// complete one wins. Text after the distance digits is ignored.
#[must_use]
pub fn parse_lod_marker(name: &str) -> Option<LodMarker> {
    let bytes = name.as_bytes();
    let prefix_end = bytes
        .iter()
        .position(|&b| !is_lod_prefix_byte(b))
        .unwrap_or(bytes.len());

    // Candidate tag positions must start inside (or right after) the prefix run.
    let mut candidates: Vec<usize> = name
        .match_indices(LOD_TAG)
        .map(|(i, _)| i)
        .filter(|&i| i <= prefix_end)
        .collect();
    candidates.reverse();

    candidates.into_iter().find_map(|start| {
        let rest = &name[start + LOD_TAG.len()..];
        let (index, rest) = leading_digits(rest);
        let rest = rest.strip_prefix('_')?;
        let (distance, _) = leading_digits(rest);
        if index.is_empty() || distance.is_empty() {
            return None;
        }
        Some(LodMarker {
            index: index.parse().ok()?,
            distance: distance.parse().ok()?,
        })
    })
}

/// Damage argument of a `DMG_<n>` vertex group, or [`NO_ARGUMENT`].
#[must_use]
pub fn damage_group_arg(group: &str) -> i32 {
    let Some(rest) = group.strip_prefix("DMG_") else {
        return NO_ARGUMENT;
    };
    let (digits, tail) = leading_digits(rest);
    if digits.is_empty() || !tail.is_empty() {
        return NO_ARGUMENT;
    }
    digits.parse().unwrap_or(NO_ARGUMENT)
}

/// Export id of a bone: `"<armature> : <bone>"`.
#[must_use]
pub fn bone_id(armature: &str, bone: &str) -> String {
    format!("{armature} : {bone}")
}

/// Splits `owner["Qualifier"].property` into `(Some("Qualifier"), "property")`.
/// Unqualified paths come back as `(None, path)`.
#[must_use]
pub fn split_data_path(path: &str) -> (Option<&str>, &str) {
    let Some(close) = path.rfind("\"].") else {
        return (None, path);
    };
    let Some(open) = path[..close].rfind("[\"") else {
        return (None, path);
    };
    (Some(&path[open + 2..close]), &path[close + 3..])
}

/// Name of an empty that sets the direction of a fake spot light:
/// `Light_Dir`, `light_direction`, `LD`, `ld_front`, ...
#[must_use]
pub fn is_light_direction_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let light = bytes.len() >= 9
        && bytes[0].eq_ignore_ascii_case(&b'l')
        && &bytes[1..6] == b"ight_"
        && bytes[6].eq_ignore_ascii_case(&b'd')
        && &bytes[7..9] == b"ir";
    let short = bytes.len() >= 2
        && bytes[0].eq_ignore_ascii_case(&b'l')
        && bytes[1].eq_ignore_ascii_case(&b'd');
    light || short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_is_leading_digit_run() {
        assert_eq!(argument_of("3_flap"), 3);
        assert_eq!(argument_of("120"), 120);
        assert_eq!(argument_of("flap"), NO_ARGUMENT);
        assert_eq!(argument_of("flap_3"), NO_ARGUMENT);
        assert_eq!(argument_of(""), NO_ARGUMENT);
    }

    #[test]
    fn lod_marker_variants() {
        assert_eq!(
            parse_lod_marker("Hull_LOD_1_50"),
            Some(LodMarker { index: 1, distance: 50.0 })
        );
        assert_eq!(
            parse_lod_marker("LOD_0_0"),
            Some(LodMarker { index: 0, distance: 0.0 })
        );
        assert_eq!(
            parse_lod_marker("a-LOD_1_10_LOD_2_200"),
            Some(LodMarker { index: 2, distance: 200.0 })
        );
        assert_eq!(
            parse_lod_marker("x_LOD_3_75 extra"),
            Some(LodMarker { index: 3, distance: 75.0 })
        );
        assert_eq!(parse_lod_marker("my LOD_1_5"), None);
        assert_eq!(parse_lod_marker("LOD_1"), None);
        assert_eq!(parse_lod_marker("Hull"), None);
    }

    #[test]
    fn damage_groups_are_exact() {
        assert_eq!(damage_group_arg("DMG_12"), 12);
        assert_eq!(damage_group_arg("DMG_12a"), NO_ARGUMENT);
        assert_eq!(damage_group_arg("DMG_"), NO_ARGUMENT);
        assert_eq!(damage_group_arg("Bone"), NO_ARGUMENT);
    }

    #[test]
    fn data_path_qualifier() {
        assert_eq!(
            split_data_path("pose.bones[\"Spine\"].location"),
            (Some("Spine"), "location")
        );
        assert_eq!(split_data_path("location"), (None, "location"));
    }

    #[test]
    fn light_direction_names() {
        assert!(is_light_direction_name("Light_Dir"));
        assert!(is_light_direction_name("light_direction.001"));
        assert!(is_light_direction_name("LD"));
        assert!(!is_light_direction_name("Lamp"));
    }
}
