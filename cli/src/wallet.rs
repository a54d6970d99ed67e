//! Wallet session management.
//!
//! The wallet is whatever keypair the environment provides (the configured
//! path or `SOLANA_KEYPAIR`), detected at runtime the way a browser client
//! would probe an injected provider. A session lives for one invocation;
//! there is no explicit disconnect.

use std::sync::Arc;

use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::{read_keypair_file, Keypair};
use anchor_client::solana_sdk::signer::Signer;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::AmbigramConfig;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet keypair found at {0}")]
    ProviderMissing(String),
    #[error("wallet refused to provide a key: {0}")]
    Rejected(String),
}

pub struct WalletSession {
    pub address: Pubkey,
    signer: Arc<Keypair>,
}

impl WalletSession {
    pub fn signer(&self) -> Arc<Keypair> {
        self.signer.clone()
    }
}

pub struct ConnectOutcome {
    pub session: Option<WalletSession>,
    /// Whether a wallet keypair was found at all. Drives nothing but the
    /// help line in the disconnected view.
    pub provider_detected: bool,
}

/// Connect to the ambient wallet. With `silent` set (the page-load path) a
/// missing or unusable wallet is tolerated and logged at debug; an explicit
/// connect logs the failure at error. Either way the session stays unset on
/// failure and no error reaches the caller.
pub fn connect(cfg: &AmbigramConfig, silent: bool) -> ConnectOutcome {
    let provider_detected = cfg.keypair_path.exists();
    match try_connect(cfg) {
        Ok(session) => {
            info!(address = %session.address, "connected with wallet");
            ConnectOutcome { session: Some(session), provider_detected }
        }
        Err(err) => {
            if silent {
                debug!(%err, "silent wallet reconnect skipped");
            } else {
                error!(%err, "wallet connection failed");
            }
            ConnectOutcome { session: None, provider_detected }
        }
    }
}

fn try_connect(cfg: &AmbigramConfig) -> Result<WalletSession, WalletError> {
    let path = &cfg.keypair_path;
    if !path.exists() {
        return Err(WalletError::ProviderMissing(path.display().to_string()));
    }
    let keypair = read_keypair_file(path)
        .map_err(|e| WalletError::Rejected(format!("{}: {}", path.display(), e)))?;
    let address = keypair.pubkey();
    Ok(WalletSession { address, signer: Arc::new(keypair) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_client::solana_sdk::signature::write_keypair_file;

    fn config_with_keypair_path(path: std::path::PathBuf) -> AmbigramConfig {
        AmbigramConfig { keypair_path: path, ..AmbigramConfig::default() }
    }

    #[test]
    fn missing_provider_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_keypair_path(dir.path().join("absent.json"));
        let outcome = connect(&cfg, true);
        assert!(outcome.session.is_none());
        assert!(!outcome.provider_detected);
    }

    #[test]
    fn explicit_connect_failure_leaves_session_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not a keypair").unwrap();
        let cfg = config_with_keypair_path(path);
        let outcome = connect(&cfg, false);
        assert!(outcome.session.is_none());
        assert!(outcome.provider_detected);
    }

    #[test]
    fn connect_yields_the_keypair_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let keypair = Keypair::new();
        write_keypair_file(&keypair, &path).unwrap();
        let cfg = config_with_keypair_path(path);
        let outcome = connect(&cfg, true);
        let session = outcome.session.expect("session");
        assert_eq!(session.address, keypair.pubkey());
        assert!(outcome.provider_detected);
    }
}
