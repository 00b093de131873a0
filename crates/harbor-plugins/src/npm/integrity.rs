//! Subresource Integrity (SRI) verification for downloaded tarballs.
//!
//! Accepts `sha512-<base64>` and `sha256-<base64>` tokens. `sha1-` tokens are
//! ignored, so an SRI string carrying only SHA-1 fails verification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{PluginError, PluginResult};

/// Supported algorithms, weakest first so `Ord` picks the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Verify `data` against an SRI string, using the strongest listed hash.
///
/// # Errors
///
/// Returns [`PluginError::IntegrityError`] on mismatch and
/// [`PluginError::RegistryError`] if the SRI string has no usable hash.
pub fn verify_sri(data: &[u8], sri: &str, package: &str) -> PluginResult<()> {
    let (algorithm, encoded) = strongest(sri)?;
    let expected = STANDARD
        .decode(encoded)
        .map_err(|e| PluginError::RegistryError {
            message: format!("invalid base64 in SRI hash: {e}"),
        })?;

    let actual = algorithm.digest(data);
    if bool::from(actual.ct_eq(&expected)) {
        Ok(())
    } else {
        Err(PluginError::IntegrityError {
            package: package.to_string(),
            expected: sri.to_string(),
        })
    }
}

fn strongest(sri: &str) -> PluginResult<(Algorithm, &str)> {
    let mut best: Option<(Algorithm, &str)> = None;
    for token in sri.split_whitespace() {
        // Drop `?options` per the SRI grammar.
        let token = token.split_once('?').map_or(token, |(t, _)| t);
        let candidate = if let Some(hash) = token.strip_prefix("sha512-") {
            (Algorithm::Sha512, hash)
        } else if let Some(hash) = token.strip_prefix("sha256-") {
            (Algorithm::Sha256, hash)
        } else if token.starts_with("sha1-") {
            continue;
        } else {
            return Err(PluginError::RegistryError {
                message: format!("unsupported SRI algorithm in: {token}"),
            });
        };
        if best.is_none_or(|(algo, _)| candidate.0 > algo) {
            best = Some(candidate);
        }
    }

    best.ok_or_else(|| PluginError::RegistryError {
        message: format!("no valid hash found in SRI string: {sri}"),
    })
}
