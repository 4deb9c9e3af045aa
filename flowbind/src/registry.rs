//! # Registry Module.
//!
//! Per-account store of attestations keyed by Ethereum address. Creation is
//! all-or-nothing: every check runs before the map is touched.

use crate::{
	attestation::{Attestation, AttestationRef},
	error::FlowBindError,
	eth::{derive_eth_address, verify_signature},
	message::{split, AttestationMessage},
	network::{AddressValidation, FlowAddress},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of a registry, as exposed at an account's public path.
pub trait AttestationRegistryPublic {
	/// Looks up the attestation stored for `eth_address`.
	fn borrow_attestation(&self, eth_address: &str) -> Option<AttestationRef<'_>>;

	/// Verifies the attestation stored for `eth_address`. Absent entries
	/// verify as false.
	fn verify(&self, eth_address: &str) -> bool {
		self.borrow_attestation(eth_address).map(|att| att.verify()).unwrap_or(false)
	}
}

/// Registry of attestations held by one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRegistry {
	/// Account currently storing this registry.
	#[serde(skip)]
	owner: Option<FlowAddress>,
	/// Attestations keyed by the exact Ethereum address of their message.
	attestations: BTreeMap<String, Attestation>,
}

impl AttestationRegistry {
	/// Creates an empty registry that is not yet stored in any account.
	pub fn new() -> Self {
		Self { owner: None, attestations: BTreeMap::new() }
	}

	/// Account currently storing this registry.
	pub fn owner(&self) -> Option<&FlowAddress> {
		self.owner.as_ref()
	}

	pub(crate) fn bind_owner(&mut self, owner: FlowAddress) {
		self.owner = Some(owner);
	}

	pub(crate) fn release_owner(&mut self) {
		self.owner = None;
	}

	/// Number of stored attestations.
	pub fn len(&self) -> usize {
		self.attestations.len()
	}

	/// Returns true if no attestation is stored.
	pub fn is_empty(&self) -> bool {
		self.attestations.is_empty()
	}

	/// Stored Ethereum addresses, sorted.
	pub fn eth_addresses(&self) -> Vec<&str> {
		self.attestations.keys().map(String::as_str).collect()
	}

	/// Iterates over every stored attestation.
	pub fn iter(&self) -> impl Iterator<Item = AttestationRef<'_>> {
		let owner = self.owner.as_ref();
		self.attestations.values().map(move |att| AttestationRef::new(att, owner))
	}

	/// Keys whose attestation does not currently verify, or is stored under
	/// an Ethereum address other than the one its message names.
	pub fn failing(&self) -> Vec<&str> {
		self.attestations
			.iter()
			.filter(|(key, att)| {
				key.as_str() != att.eth_address() || !att.verify(self.owner.as_ref())
			})
			.map(|(key, _)| key.as_str())
			.collect()
	}

	/// Verifies and stores a new attestation.
	///
	/// The checks run in order: the public key must decode, the message must
	/// split, the public key must derive the claimed
	/// Ethereum address, no attestation may exist for it yet, the message must
	/// name a Flow address valid on the owner's network, and the finished
	/// attestation must verify against this registry's owner.
	pub fn create(
		&mut self, validator: &dyn AddressValidation, public_key: &str, signature: &str,
		message: &str,
	) -> Result<(), FlowBindError> {
		match self.validate(validator, public_key, signature, message) {
			Ok(attestation) => {
				let eth_address = attestation.eth_address().to_string();
				info!(
					"Attestation stored: {} -> {}",
					eth_address,
					attestation.message().flow_address()
				);
				self.attestations.insert(eth_address, attestation);
				Ok(())
			},
			Err(e) => {
				warn!("Attestation rejected: {}", e);
				Err(e)
			},
		}
	}

	fn validate(
		&self, validator: &dyn AddressValidation, public_key: &str, signature: &str,
		message: &str,
	) -> Result<Attestation, FlowBindError> {
		let derived_eth = derive_eth_address(public_key)?;
		let (_, claimed_eth) = split(message)?;
		if derived_eth != claimed_eth {
			return Err(FlowBindError::SignatureMismatchError(format!(
				"Public key derives {}, message claims {}",
				derived_eth, claimed_eth
			)));
		}
		debug!("Public key matches {}", claimed_eth);

		if self.attestations.contains_key(claimed_eth) {
			return Err(FlowBindError::DuplicateAttestationError(format!(
				"An attestation for {} already exists",
				claimed_eth
			)));
		}

		let current_network =
			self.owner.as_ref().and_then(|owner| validator.network_of(owner)).ok_or_else(|| {
				FlowBindError::InvalidAddressError(
					"Registry is not held by an account on a known network".to_string(),
				)
			})?;
		let message = AttestationMessage::parse(message, validator, current_network)?;
		debug!("Message names {} on {}", message.flow_address(), current_network);

		let attestation = Attestation::new(public_key.to_string(), signature.to_string(), message);

		if !attestation.verify_flow_address_matches_owner(self.owner.as_ref()) {
			return Err(FlowBindError::SignatureMismatchError(format!(
				"Message names {}, registry is held by another account",
				attestation.message().flow_address()
			)));
		}
		// Decode errors surface as such; a well-formed but wrong signature is a mismatch.
		let canonical = attestation.message().canonicalize();
		if !verify_signature(public_key, signature, &canonical)? {
			return Err(FlowBindError::SignatureMismatchError(format!(
				"Signature does not verify for {}",
				claimed_eth
			)));
		}
		if !attestation.verify(self.owner.as_ref()) {
			return Err(FlowBindError::SignatureMismatchError(format!(
				"Attestation for {} does not verify",
				claimed_eth
			)));
		}

		Ok(attestation)
	}

	/// Removes and returns the attestation for `eth_address`.
	pub fn remove(&mut self, eth_address: &str) -> Option<Attestation> {
		let removed = self.attestations.remove(eth_address);
		if removed.is_some() {
			info!("Attestation removed: {}", eth_address);
		}
		removed
	}
}

impl AttestationRegistryPublic for AttestationRegistry {
	fn borrow_attestation(&self, eth_address: &str) -> Option<AttestationRef<'_>> {
		self.attestations.get(eth_address).map(|att| AttestationRef::new(att, self.owner.as_ref()))
	}
}
