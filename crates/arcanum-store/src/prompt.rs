// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition via TTY prompt or `ARCANUM_STORE_KEY`.

use arcanum_core::ArcanumError;
use secrecy::SecretString;

/// The environment variable name for providing the store passphrase.
pub const STORE_KEY_ENV_VAR: &str = "ARCANUM_STORE_KEY";

/// Get the store passphrase from the environment or an interactive prompt.
///
/// Priority:
/// 1. `ARCANUM_STORE_KEY` environment variable (headless/systemd use)
/// 2. Interactive TTY prompt via `rpassword` (human operators)
///
/// Returns an error if neither source is available.
pub fn get_store_passphrase() -> Result<SecretString, ArcanumError> {
    if let Ok(key) = std::env::var(STORE_KEY_ENV_VAR)
        && !key.is_empty()
    {
        return Ok(SecretString::from(key));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Store passphrase: ");
        let passphrase = rpassword::read_password()
            .map_err(|e| ArcanumError::Crypto(format!("failed to read passphrase: {e}")))?;
        if passphrase.is_empty() {
            return Err(ArcanumError::Crypto(
                "empty passphrase not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(passphrase));
    }

    Err(ArcanumError::Crypto(
        "No passphrase provided. Set ARCANUM_STORE_KEY or run interactively.".to_string(),
    ))
}

/// Get the store passphrase with a confirmation prompt (store creation).
///
/// Prompts twice and verifies the passphrases match. The env var path does
/// not need confirmation.
pub fn get_store_passphrase_with_confirm() -> Result<SecretString, ArcanumError> {
    if let Ok(key) = std::env::var(STORE_KEY_ENV_VAR)
        && !key.is_empty()
    {
        return Ok(SecretString::from(key));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("New store passphrase: ");
        let pass1 = rpassword::read_password()
            .map_err(|e| ArcanumError::Crypto(format!("failed to read passphrase: {e}")))?;
        eprint!("Confirm store passphrase: ");
        let pass2 = rpassword::read_password()
            .map_err(|e| ArcanumError::Crypto(format!("failed to read passphrase: {e}")))?;

        if pass1 != pass2 {
            return Err(ArcanumError::Crypto("passphrases do not match".to_string()));
        }
        if pass1.is_empty() {
            return Err(ArcanumError::Crypto(
                "empty passphrase not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(pass1));
    }

    Err(ArcanumError::Crypto(
        "No passphrase provided. Set ARCANUM_STORE_KEY or run interactively.".to_string(),
    ))
}
