//! Export Settings
//!
//! [`ExportSettings`] is the configuration of a single export run. It is a
//! plain serde-friendly value; callers usually build it in code or load it
//! from JSON with [`ExportSettings::from_json`].

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Format version handed to the model writer when none is configured.
pub const DEFAULT_FORMAT_VERSION: u32 = 10;

/// Configuration of one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Version tag forwarded to [`ModelWriter::serialize`](crate::export::ModelWriter::serialize).
    pub format_version: u32,

    /// Export only the animation bound to [`current_arg`](Self::current_arg).
    /// Every other argument is exported as static geometry.
    pub current_arg_only: bool,

    /// The argument kept by `current_arg_only`. Negative disables the filter.
    pub current_arg: i32,

    /// Insert the Z-up to Y-up root transform above the scene root.
    pub apply_root_transform: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format_version: DEFAULT_FORMAT_VERSION,
            current_arg_only: false,
            current_arg: -1,
            apply_root_transform: true,
        }
    }
}

impl ExportSettings {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the argument filter for this run, `None` when every argument is
    /// allowed.
    #[must_use]
    pub fn argument_filter(&self) -> Option<ArgumentFilter> {
        (self.current_arg_only && self.current_arg >= 0).then(|| ArgumentFilter::only(self.current_arg))
    }
}

/// Set of arguments whose animation is exported.
///
/// Anything outside the set is treated as unanimated for the current pass;
/// the authoring data itself is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentFilter {
    allowed: Vec<i32>,
}

impl ArgumentFilter {
    #[must_use]
    pub fn only(arg: i32) -> Self {
        Self { allowed: vec![arg] }
    }

    #[must_use]
    pub fn from_args(args: impl IntoIterator<Item = i32>) -> Self {
        let mut allowed: Vec<i32> = args.into_iter().collect();
        allowed.sort_unstable();
        allowed.dedup();
        Self { allowed }
    }

    #[inline]
    #[must_use]
    pub fn allows(&self, arg: i32) -> bool {
        self.allowed.binary_search(&arg).is_ok()
    }
}

/// Whether `arg` passes an optional filter. `None` allows everything.
#[inline]
#[must_use]
pub fn argument_allowed(filter: Option<&ArgumentFilter>, arg: i32) -> bool {
    filter.is_none_or(|f| f.allows(arg))
}
