//! Auto-naming for resources whose name is optional
//!
//! Precedence is strict:
//!
//! 1. A name supplied by the user wins, so renames can be requested.
//! 2. Otherwise the name already recorded in prior state is reused, so a
//!    no-change apply never triggers a replacement.
//! 3. Otherwise a new name `<prefix>-<6 hex chars>` is generated.

use crate::error::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random hex characters appended to a generated name
pub const RANDOM_SUFFIX_LEN: usize = 6;

/// Maximum length of a generated name
pub const MAX_GENERATED_LEN: usize = 28;

/// Decide the name for an auto-named field
///
/// # Parameters
///
/// - `explicit`: name from the current inputs (empty when unset)
/// - `prefix`: stable hint used for generated names, usually the logical resource name
/// - `previous`: name recorded in prior state, if any
pub fn autoname(explicit: &str, prefix: &str, previous: Option<&str>) -> Result<String> {
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }

    if let Some(previous) = previous.filter(|name| !name.is_empty()) {
        return Ok(previous.to_string());
    }

    unique_hex(prefix)
}

/// Generate `<prefix>-` followed by random lowercase hex
fn unique_hex(prefix: &str) -> Result<String> {
    if prefix.is_empty() {
        return Err(Error::generation("no name and no prefix to generate one from"));
    }

    let base = format!("{}-", prefix);
    if base.len() + RANDOM_SUFFIX_LEN > MAX_GENERATED_LEN {
        return Err(Error::generation(format!(
            "name '{}' plus {} random chars is longer than maximum length {}",
            base, RANDOM_SUFFIX_LEN, MAX_GENERATED_LEN
        )));
    }

    let mut bytes = [0u8; RANDOM_SUFFIX_LEN.div_ceil(2)];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::generation(format!("random source unavailable: {}", e)))?;

    let mut name = base;
    for byte in bytes {
        name.push_str(&format!("{:02x}", byte));
    }
    name.truncate(name.len() - (bytes.len() * 2 - RANDOM_SUFFIX_LEN));

    Ok(name)
}
