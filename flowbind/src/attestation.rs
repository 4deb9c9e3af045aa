//! # Attestation Module.
//!
//! This module holds the attestation record binding one Ethereum address to
//! one Flow account, together with its three verification checks.

use crate::{
	eth::{derive_eth_address, verify_signature},
	message::AttestationMessage,
	network::FlowAddress,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Signed proof that the holder of `public_key` claims `message.flow_address`.
///
/// Immutable once built; a registry replaces an attestation by removing it
/// and creating a new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
	/// Hex-encoded raw secp256k1 public key (64 bytes).
	public_key: String,
	/// Hex-encoded signature over the canonical message.
	signature: String,
	/// The signed message.
	message: AttestationMessage,
}

impl Attestation {
	/// Constructs a new attestation.
	pub fn new(public_key: String, signature: String, message: AttestationMessage) -> Self {
		Self { public_key, signature, message }
	}

	/// Hex-encoded public key.
	pub fn public_key(&self) -> &str {
		&self.public_key
	}

	/// Hex-encoded signature.
	pub fn signature(&self) -> &str {
		&self.signature
	}

	/// The attestation message.
	pub fn message(&self) -> &AttestationMessage {
		&self.message
	}

	/// Ethereum address this attestation is keyed by.
	pub fn eth_address(&self) -> &str {
		self.message.eth_address()
	}

	/// Checks the signature over the canonical message.
	pub fn verify_signature(&self) -> bool {
		let canonical = self.message.canonicalize();
		verify_signature(&self.public_key, &self.signature, &canonical).unwrap_or_else(|e| {
			debug!("Signature check failed to decode: {}", e);
			false
		})
	}

	/// Checks that the message names the account holding this attestation.
	///
	/// An attestation without an owning account never passes.
	pub fn verify_flow_address_matches_owner(&self, owner: Option<&FlowAddress>) -> bool {
		match owner {
			Some(owner) => *owner == self.message.flow_address,
			None => false,
		}
	}

	/// Checks that the public key derives the Ethereum address in the message.
	pub fn verify_eth_address_matches_public_key(&self) -> bool {
		match derive_eth_address(&self.public_key) {
			Ok(derived) => derived == self.message.eth_address,
			Err(e) => {
				debug!("Address derivation failed to decode: {}", e);
				false
			},
		}
	}

	/// All three checks, for an attestation held by `owner`.
	pub fn verify(&self, owner: Option<&FlowAddress>) -> bool {
		self.verify_signature()
			&& self.verify_flow_address_matches_owner(owner)
			&& self.verify_eth_address_matches_public_key()
	}
}

/// An attestation borrowed from a registry, carrying the registry's owner.
#[derive(Clone, Copy, Debug)]
pub struct AttestationRef<'a> {
	attestation: &'a Attestation,
	owner: Option<&'a FlowAddress>,
}

impl<'a> AttestationRef<'a> {
	/// Pairs an attestation with the account currently holding it.
	pub fn new(attestation: &'a Attestation, owner: Option<&'a FlowAddress>) -> Self {
		Self { attestation, owner }
	}

	/// Account currently holding the attestation, if any.
	pub fn owner(&self) -> Option<&'a FlowAddress> {
		self.owner
	}

	/// The underlying attestation.
	pub fn attestation(&self) -> &'a Attestation {
		self.attestation
	}

	/// See [`Attestation::verify_flow_address_matches_owner`].
	pub fn verify_flow_address_matches_owner(&self) -> bool {
		self.attestation.verify_flow_address_matches_owner(self.owner)
	}

	/// See [`Attestation::verify`].
	pub fn verify(&self) -> bool {
		self.attestation.verify(self.owner)
	}
}

impl<'a> Deref for AttestationRef<'a> {
	type Target = Attestation;

	fn deref(&self) -> &Self::Target {
		self.attestation
	}
}
