//! Client for the deployed gif-portal program.
//!
//! The interface is generated from the fixed schema at
//! `idls/gif_portal.json`; this module wires it to the connected wallet and
//! exposes the two writes and the one read the portal supports.

use std::str::FromStr;
use std::sync::Arc;

use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::{read_keypair_file, Keypair};
use anchor_client::solana_sdk::signer::Signer;
use anchor_client::solana_sdk::system_program;
use anchor_client::{Client, ClientError, Cluster, Program};
use anchor_lang::declare_program;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::wallet::WalletSession;
use crate::{AmbigramConfig, AmbigramError};

declare_program!(gif_portal);
use gif_portal::{accounts::BaseAccount, client::accounts, client::args};

/// One entry of the on-chain list, as the view consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifItem {
    pub link: String,
    pub submitted_by: Pubkey,
}

/// A failed fetch either means the base account was never created or that
/// the cluster could not be asked. The two are kept apart here even though
/// the rendered state treats both as "needs initialization".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("base account does not exist yet")]
    Missing,
    #[error("rpc failure: {0}")]
    Rpc(#[from] ClientError),
}

/// The portal's remote surface. `PortalClient` is the real thing; tests
/// drive the app layer through a recording stand-in.
#[async_trait]
pub trait PortalOps {
    /// One-time allocation of the on-chain list record.
    async fn initialize_account(&self) -> Result<()>;
    /// Append one request string to the list.
    async fn submit_request(&self, text: &str) -> Result<()>;
    /// Read the whole list back.
    async fn fetch_list(&self) -> Result<Vec<GifItem>, FetchError>;
}

pub struct PortalClient {
    cluster: Cluster,
    commitment: CommitmentConfig,
    program_id: Pubkey,
    wallet: Arc<Keypair>,
    base_account: Keypair,
}

impl PortalClient {
    pub fn new(cfg: &AmbigramConfig, session: &WalletSession) -> Result<Self> {
        let program_id = match cfg.program_id.as_deref() {
            Some(id) => Pubkey::from_str(id)
                .map_err(|_| anyhow!("invalid program_id in config: {id}"))?,
            None => gif_portal::ID,
        };
        let base_account = read_keypair_file(&cfg.base_account_path).map_err(|e| {
            anyhow!(
                "read base account keypair at {} (run `ambigram keygen` first): {}",
                cfg.base_account_path.display(),
                e
            )
        })?;
        Ok(Self {
            cluster: Cluster::Custom(cfg.rpc_url.clone(), ws_url(&cfg.rpc_url)),
            commitment: parse_commitment(&cfg.commitment)?,
            program_id,
            wallet: session.signer(),
            base_account,
        })
    }

    pub fn base_account_address(&self) -> Pubkey {
        self.base_account.pubkey()
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    // Rebuilt on every call; the client is a pure function of endpoint,
    // commitment, program id and the current wallet.
    fn program(&self) -> Result<Program<Arc<Keypair>>, ClientError> {
        Client::new_with_options(self.cluster.clone(), self.wallet.clone(), self.commitment)
            .program(self.program_id)
    }
}

#[async_trait]
impl PortalOps for PortalClient {
    async fn initialize_account(&self) -> Result<()> {
        let program = self.program().context("build program client")?;
        let signature = program
            .request()
            .accounts(accounts::StartStuffOff {
                base_account: self.base_account.pubkey(),
                user: program.payer(),
                system_program: system_program::ID,
            })
            .args(args::StartStuffOff {})
            .signer(self.base_account.insecure_clone())
            .send()
            .await
            .context("send start_stuff_off transaction")?;
        info!(%signature, base_account = %self.base_account.pubkey(), "created base account");
        Ok(())
    }

    async fn submit_request(&self, text: &str) -> Result<()> {
        let program = self.program().context("build program client")?;
        let signature = program
            .request()
            .accounts(accounts::AddGif {
                base_account: self.base_account.pubkey(),
                user: program.payer(),
            })
            .args(args::AddGif { gif_link: text.to_string() })
            .send()
            .await
            .context("send add_gif transaction")?;
        info!(%signature, "ambigram request sent to program");
        Ok(())
    }

    async fn fetch_list(&self) -> Result<Vec<GifItem>, FetchError> {
        let program = self.program()?;
        let account = program
            .account::<BaseAccount>(self.base_account.pubkey())
            .await
            .map_err(|err| match err {
                ClientError::AccountNotFound => FetchError::Missing,
                other => FetchError::Rpc(other),
            })?;
        debug!(total_gifs = account.total_gifs, "got the base account");
        Ok(account
            .gif_list
            .into_iter()
            .map(|item| GifItem { link: item.gif_link, submitted_by: item.user_address })
            .collect())
    }
}

pub fn parse_commitment(level: &str) -> Result<CommitmentConfig> {
    match level {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(AmbigramError::UnknownCommitment(other.to_string()).into()),
    }
}

fn ws_url(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        rpc_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_levels_parse() {
        assert!(parse_commitment("processed").is_ok());
        assert!(parse_commitment("confirmed").is_ok());
        assert!(parse_commitment("finalized").is_ok());
        assert!(parse_commitment("instant").is_err());
    }

    #[test]
    fn ws_url_follows_scheme() {
        assert_eq!(ws_url("https://api.devnet.solana.com"), "wss://api.devnet.solana.com");
        assert_eq!(ws_url("http://127.0.0.1:8899"), "ws://127.0.0.1:8899");
    }

    #[test]
    fn program_id_comes_from_the_idl() {
        assert_eq!(
            gif_portal::ID.to_string(),
            "2Ph9ShJ7wV3PwPdrFcFaJZm53t33CSBYkv3DEB56cdsq"
        );
    }
}
