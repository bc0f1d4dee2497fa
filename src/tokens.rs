// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Opaque token generation.
//!
//! All tokens draw from the operating system CSPRNG via `ring` and map bytes
//! onto an alphabet with rejection sampling, so every symbol is equally
//! likely.

use crate::error::AppError;
use crate::models::LicenseTier;
use ring::rand::{SecureRandom, SystemRandom};

/// 62-symbol alphanumeric alphabet for session and magic-link tokens.
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// License key alphabet without look-alikes (0/O, 1/I/L).
pub const LICENSE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of magic-link and session tokens (~381 bits of entropy).
pub const TOKEN_LENGTH: usize = 64;

const DOCUMENT_ID_LENGTH: usize = 20;
const LICENSE_GROUPS: usize = 4;
const LICENSE_GROUP_LENGTH: usize = 4;

/// Generate `len` symbols uniformly from `alphabet`.
pub fn random_string(alphabet: &[u8], len: usize) -> Result<String, AppError> {
    debug_assert!(!alphabet.is_empty() && alphabet.len() <= 256);

    let rng = SystemRandom::new();
    // Largest multiple of the alphabet size that fits in a byte.
    let zone = 256 - (256 % alphabet.len());
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 64];

    while out.len() < len {
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System random source failed")))?;
        for &byte in buf.iter() {
            if (byte as usize) < zone {
                out.push(alphabet[byte as usize % alphabet.len()] as char);
                if out.len() == len {
                    break;
                }
            }
        }
    }

    Ok(out)
}

/// 64-char token for magic links and sessions.
pub fn secure_token() -> Result<String, AppError> {
    random_string(TOKEN_ALPHABET, TOKEN_LENGTH)
}

/// Store-assigned document id.
pub fn document_id() -> Result<String, AppError> {
    random_string(TOKEN_ALPHABET, DOCUMENT_ID_LENGTH)
}

/// License key: `PRO-XXXX-XXXX-XXXX-XXXX`.
pub fn license_key(tier: LicenseTier) -> Result<String, AppError> {
    let body = random_string(LICENSE_ALPHABET, LICENSE_GROUPS * LICENSE_GROUP_LENGTH)?;
    let groups: Vec<&str> = (0..LICENSE_GROUPS)
        .map(|i| &body[i * LICENSE_GROUP_LENGTH..(i + 1) * LICENSE_GROUP_LENGTH])
        .collect();
    Ok(format!("{}-{}", tier.key_prefix(), groups.join("-")))
}

/// Shortened form for logs.
pub fn redact(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    format!("{}…", visible)
}
