//! # Flow Bind
//!
//! Self-signed attestations linking Flow accounts to Ethereum addresses.
//!
//! ## Main characteristics:
//!
//! **Self-signed** - the holder of an Ethereum key signs a message naming the
//! Flow account it belongs to, using the wallet personal-message convention.
//!
//! **Owner-bound** - an attestation only verifies while it is held by the
//! account its message names. Moving a registry to another account
//! invalidates every entry in it.
//!
//! **Public** - anyone can look attestations up and verify them through an
//! account's read-only registry capability; only the account itself can add
//! entries.
//!
//! ## Implementation
//!
//! Signatures are secp256k1 over the Keccak-256 personal-message digest, and
//! Ethereum addresses are the last 20 bytes of the Keccak-256 hash of the raw
//! public key, as done by Ethereum wallets.

// Rustc
#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
// Clippy
#![allow(clippy::tabs_in_doc_comments, clippy::new_without_default)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	clippy::clone_on_copy,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

pub mod attestation;
pub mod error;
pub mod eth;
pub mod ledger;
pub mod message;
pub mod network;
pub mod registry;
pub mod storage;

use error::FlowBindError;
use network::Network;
use serde::{Deserialize, Serialize};

/// Storage path of the attestation registry.
pub const DEFAULT_STORAGE_PATH: &str = "/storage/EthAttestationRegistry";
/// Public path of the read-only registry capability.
pub const DEFAULT_PUBLIC_PATH: &str = "/public/EthAttestationRegistry";

const STORAGE_DOMAIN: &str = "/storage/";
const PUBLIC_DOMAIN: &str = "/public/";

/// Protocol configuration settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
	/// Network accounts and messages belong to.
	pub network: Network,
	/// Where each account stores its registry.
	pub storage_path: String,
	/// Where each account links its public capability.
	pub public_path: String,
}

impl ProtocolConfig {
	/// Checks that both paths live in their expected domain and name
	/// something inside it.
	pub fn validate(&self) -> Result<(), FlowBindError> {
		check_path(&self.storage_path, STORAGE_DOMAIN)?;
		check_path(&self.public_path, PUBLIC_DOMAIN)
	}
}

impl Default for ProtocolConfig {
	fn default() -> Self {
		Self {
			network: Network::Emulator,
			storage_path: DEFAULT_STORAGE_PATH.to_string(),
			public_path: DEFAULT_PUBLIC_PATH.to_string(),
		}
	}
}

fn check_path(path: &str, domain: &str) -> Result<(), FlowBindError> {
	match path.strip_prefix(domain) {
		Some(name) if !name.is_empty() && !name.contains('/') => Ok(()),
		_ => Err(FlowBindError::ConfigurationError(format!(
			"'{}' is not a path of the form {}<name>",
			path, domain
		))),
	}
}
