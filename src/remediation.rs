use serde::{Deserialize, Serialize};

/// Upstream variants known to ship without a sprite, and the sibling
/// variant whose sprite stands in for theirs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRemediation {
    pub variant: String,
    pub borrow_image_from: String,
}

pub fn default_remediations() -> Vec<ImageRemediation> {
    vec![ImageRemediation {
        variant: "zygarde-10".to_string(),
        borrow_image_from: "zygarde-10-power-construct".to_string(),
    }]
}

#[derive(Debug, Clone)]
pub struct RemediationTable {
    entries: Vec<ImageRemediation>,
}

impl RemediationTable {
    pub fn new(entries: Vec<ImageRemediation>) -> Self {
        Self { entries }
    }

    /// Donor variant for `variant`, consulted only when its image is missing.
    pub fn image_donor(&self, variant: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.variant == variant)
            .map(|entry| entry.borrow_image_from.as_str())
    }
}

impl Default for RemediationTable {
    fn default() -> Self {
        Self::new(default_remediations())
    }
}
