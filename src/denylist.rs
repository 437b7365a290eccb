//!
//! src/denylist.rs  Oct 19th, 2026
//!
//! Plain substring filters for radio-show albums and extended mixes.
//!

use std::path::Path;

use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Denylist {
    enabled: bool,
    patterns: Vec<String>
}

impl Denylist {
    pub fn new(enabled: bool, patterns: Vec<String>) -> Self {
        let patterns = patterns.into_iter().filter(|p| !p.is_empty()).collect();
        Self { enabled, patterns }
    }

    /// One pattern per line. A missing file leaves the filter without
    /// patterns, which matches nothing.
    pub fn from_file(enabled: bool, path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::new(enabled, text.lines().map(str::to_string).collect()),
            Err(e) => {
                if enabled {
                    warn!(path = %path.display(), error = %e,
                        "denylist file missing, filtering will not work");
                }
                Self::new(enabled, Vec::new())
            }
        }
    }

    /// Case-sensitive substring test against every pattern
    pub fn matches(&self, name: &str) -> bool {
        self.enabled && self.patterns.iter().any(|p| name.contains(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
