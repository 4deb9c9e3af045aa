//! # Message Module.
//!
//! Canonical encoding of the two-field attestation message
//! `flowAddress|ethAddress` and the bytes a wallet signs for it.

use crate::{
	error::FlowBindError,
	eth::personal_message_bytes,
	network::{AddressValidation, FlowAddress, Network},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the Flow and Ethereum address.
pub const MESSAGE_DELIMITER: &str = "|";

/// Splits `input` on `delimiter` into exactly `parts` pieces.
///
/// Fails with a `FormatError` when the delimiter occurs any other number of
/// times than `parts - 1`.
pub fn split_exact<'a>(
	input: &'a str, delimiter: &str, parts: usize,
) -> Result<Vec<&'a str>, FlowBindError> {
	if delimiter.is_empty() {
		return Err(FlowBindError::FormatError("Delimiter must not be empty".to_string()));
	}

	let pieces: Vec<&str> = input.split(delimiter).collect();
	if pieces.len() != parts {
		return Err(FlowBindError::FormatError(format!(
			"Expected {} '{}'-separated parts, found {}",
			parts,
			delimiter,
			pieces.len()
		)));
	}

	Ok(pieces)
}

/// Splits an attestation message into its Flow and Ethereum address parts.
pub fn split(message: &str) -> Result<(&str, &str), FlowBindError> {
	let parts = split_exact(message, MESSAGE_DELIMITER, 2)?;
	Ok((parts[0], parts[1]))
}

/// The payload an Ethereum key holder signs to claim a Flow account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationMessage {
	/// Flow account the Ethereum address is bound to.
	pub(crate) flow_address: FlowAddress,
	/// Ethereum address, kept exactly as it appeared in the message.
	pub(crate) eth_address: String,
}

impl AttestationMessage {
	/// Constructs a new message.
	pub fn new(flow_address: FlowAddress, eth_address: String) -> Self {
		Self { flow_address, eth_address }
	}

	/// Parses a raw message, checking the Flow address against
	/// `current_network` through `validator`.
	///
	/// The Ethereum part is taken verbatim: it is compared case-sensitively
	/// against derived addresses later on.
	pub fn parse(
		message: &str, validator: &dyn AddressValidation, current_network: Network,
	) -> Result<Self, FlowBindError> {
		let (flow_part, eth_part) = split(message)?;

		let flow_address: FlowAddress = flow_part.parse()?;
		if !validator.is_valid_address(flow_part, current_network) {
			return Err(FlowBindError::InvalidAddressError(format!(
				"{} is not a valid {} address",
				flow_part, current_network
			)));
		}

		Ok(Self { flow_address, eth_address: eth_part.to_string() })
	}

	/// Flow address.
	pub fn flow_address(&self) -> &FlowAddress {
		&self.flow_address
	}

	/// Ethereum address.
	pub fn eth_address(&self) -> &str {
		&self.eth_address
	}

	/// Canonical string form, the exact text that gets signed.
	pub fn canonicalize(&self) -> String {
		format!("{}{}{}", self.flow_address, MESSAGE_DELIMITER, self.eth_address)
	}

	/// Bytes hashed for signing under the personal-message convention.
	pub fn signed_bytes(&self) -> Vec<u8> {
		personal_message_bytes(self.canonicalize().as_bytes())
	}
}

impl fmt::Display for AttestationMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonicalize())
	}
}
