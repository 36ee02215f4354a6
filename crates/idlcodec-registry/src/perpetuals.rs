//! Jupiter Perpetuals program: addresses and a bundled IDL subset covering
//! the `Position`, `Custody` and `Pool` accounts and the position events.

use idlcodec_core::error::RegistryError;

use crate::config::RegistryConfig;
use crate::memory::MemoryRegistry;

pub const PROGRAM_ID: &str = "PERPHjGBqRHArX4DySjwM6UJHiR3sWAatqfdBS2qQJu";

/// Signer of the program's self-invoked event instructions.
pub const EVENT_AUTHORITY: &str = "37hJBDnntwqhGbK7L6M1bLyvccj4u55CCUiLPdYkiqBN";

/// The JLP pool account.
pub const JLP_POOL: &str = "5BUwFW4nRbftYTDMbgxykoFWqWHPzahFSNAaaaJtVKsq";

/// SOL custody account.
pub const SOL_CUSTODY: &str = "7xS2gz2bTp3fwCC7knJvUWTEU9Tycczu6VhJYKgi1wdz";

pub const IDL_JSON: &str = include_str!("../../../fixtures/idl/perpetuals.json");

/// Registry over the bundled IDL with Anchor defaults.
pub fn registry() -> Result<MemoryRegistry, RegistryError> {
    MemoryRegistry::from_idl_json(IDL_JSON, &RegistryConfig::default())
}
