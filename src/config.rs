//! Deployment-level configuration for the punch lifecycle. Loaded once by
//! the host and passed in by reference, the way the teacher crate's
//! `db::connection::establish_pool` takes its `PathBuf` from the caller
//! rather than discovering it itself.

use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Civil timezone used for all day-boundary and window computations.
    pub timezone: FixedOffset,
    /// Maximum length of punch `content`, in chars.
    pub max_content_length: usize,
    /// Maximum number of image references per punch.
    pub max_images: usize,
}

impl DeploymentConfig {
    pub fn reference_deployment() -> Self {
        Self {
            timezone: FixedOffset::east_opt(8 * 3600).expect("valid fixed offset"),
            max_content_length: 500,
            max_images: 9,
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::reference_deployment()
    }
}
