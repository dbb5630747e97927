use tracing::info;

use crate::error::{AppError, AppResult};
use crate::keys::StellarKeypair;

/// Attempts between progress reports
const PROGRESS_EVERY: u64 = 5_000;

/// Longest suffix that leaves the version character untouched
const MAX_SUFFIX_LEN: usize = 55;

#[derive(Debug)]
pub struct VanityMatch {
    /// Normalized suffix the address ends with
    pub suffix: String,
    pub keypair: StellarKeypair,
    pub tries: u64,
}

/// Upper-cases the suffix and checks it against the strkey base32 alphabet
pub fn normalize_suffix(suffix: &str) -> AppResult<String> {
    let suffix = suffix.trim().to_uppercase();

    if suffix.is_empty() {
        return Err(AppError::InvalidInput("suffix must not be empty".into()));
    }
    if suffix.len() > MAX_SUFFIX_LEN {
        return Err(AppError::InvalidInput(format!(
            "suffix longer than {} characters",
            MAX_SUFFIX_LEN
        )));
    }
    if let Some(c) = suffix
        .chars()
        .find(|c| !matches!(c, 'A'..='Z' | '2'..='7'))
    {
        return Err(AppError::InvalidInput(format!(
            "'{}' can never appear in a Stellar address (allowed: A-Z, 2-7)",
            c
        )));
    }

    Ok(suffix)
}

/// Generates random keypairs until the address ends with `suffix`
pub fn find_suffix(suffix: &str) -> AppResult<VanityMatch> {
    let suffix = normalize_suffix(suffix)?;
    info!("🔍 Searching for an address ending with '{}'", suffix);

    let mut tries: u64 = 0;
    loop {
        tries += 1;
        if tries % PROGRESS_EVERY == 0 {
            info!("{} tries", tries);
        }

        let keypair = StellarKeypair::random();
        if keypair.address.ends_with(&suffix) {
            info!("Found one ending with '{}' in {} tries", suffix, tries);
            return Ok(VanityMatch {
                suffix,
                keypair,
                tries,
            });
        }
    }
}
