//! Registry load settings.

use idlcodec_core::DISCRIMINATOR_LEN;
use serde::{Deserialize, Serialize};

/// How discriminators are derived and located when an IDL does not state
/// them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Width of a derived discriminator, in bytes
    #[serde(default = "default_discriminator_len")]
    pub discriminator_len: usize,
    /// Where the discriminator sits inside account data
    #[serde(default)]
    pub account_discriminator_offset: usize,
}

fn default_discriminator_len() -> usize {
    DISCRIMINATOR_LEN
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            discriminator_len: default_discriminator_len(),
            account_discriminator_offset: 0,
        }
    }
}
