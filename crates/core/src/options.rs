//! Per-parse configuration.

use serde::Deserialize;

/// Default limit on nested expression evaluations in one session. Holds
/// on a 2 MiB thread stack in unoptimised builds.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Options for one parse call. Deserializable so a host can keep them in
/// its own configuration file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Expression evaluations (rule calls, groups and operators) may nest
    /// this deep before the parse is aborted with
    /// `MatchError::DepthExceeded`.
    pub max_depth: usize,
    /// Start rule. `None` starts from the grammar's first rule.
    pub root: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            root: None,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
}
