//! Frame graph configuration.

/// Configuration for a [`FrameGraph`](super::FrameGraph).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Name used in log output.
    pub label: Option<String>,
    /// Panic when one task declares overlapping views of an image with
    /// different usages. Defaults to on in debug builds.
    pub validate_overlaps: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            label: None,
            validate_overlaps: cfg!(debug_assertions),
        }
    }
}

impl FrameGraphConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable overlap validation.
    pub fn with_overlap_validation(mut self, enabled: bool) -> Self {
        self.validate_overlaps = enabled;
        self
    }

    /// Label for log output.
    pub(crate) fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("frame graph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = FrameGraphConfig::new()
            .with_label("main")
            .with_overlap_validation(false);
        assert_eq!(config.display_label(), "main");
        assert!(!config.validate_overlaps);
        assert_eq!(FrameGraphConfig::default().display_label(), "frame graph");
    }
}
