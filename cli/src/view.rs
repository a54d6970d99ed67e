//! Text rendering of the three client states.

use std::fmt::Write as _;

use crate::portal::GifItem;

pub const WALLET_HELP_URL: &str = "https://docs.solanalabs.com/cli/wallets/file-system";

#[derive(Debug, PartialEq)]
pub enum View<'a> {
    Disconnected { provider_detected: bool },
    Uninitialized,
    Ready(&'a [GifItem]),
}

impl View<'_> {
    pub fn render(&self) -> String {
        match self {
            View::Disconnected { provider_detected } => {
                let mut out =
                    String::from("Wallet not connected. Run `ambigram connect` to get started.\n");
                if !provider_detected {
                    let _ = writeln!(
                        out,
                        "No wallet keypair found; create one and point `keypair_path` at it ({WALLET_HELP_URL})."
                    );
                }
                out
            }
            View::Uninitialized => {
                "Base account not initialized. Run `ambigram init` for the one-time setup.\n"
                    .to_string()
            }
            View::Ready(items) if items.is_empty() => {
                "No ambigram requests yet. Add one with `ambigram submit <text>`.\n".to_string()
            }
            View::Ready(items) => {
                let mut out = String::new();
                for (index, item) in items.iter().enumerate() {
                    let _ = writeln!(out, "{:>3}. {}  (from {})", index + 1, item.link, item.submitted_by);
                }
                out
            }
        }
    }
}
