//! # Network Module.
//!
//! Flow account addresses, the networks they live on, and the
//! `AddressValidation` oracle the attestation protocol consults.

use crate::error::FlowBindError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of hex digits in a Flow address.
pub const FLOW_ADDRESS_HEX_LEN: usize = 16;

/// Flow network identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	/// Flow mainnet.
	Mainnet,
	/// Flow testnet.
	Testnet,
	/// Local emulator.
	Emulator,
}

impl Network {
	/// Lower-case network name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Mainnet => "mainnet",
			Network::Testnet => "testnet",
			Network::Emulator => "emulator",
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Network {
	type Err = FlowBindError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"mainnet" => Ok(Network::Mainnet),
			"testnet" => Ok(Network::Testnet),
			"emulator" => Ok(Network::Emulator),
			other => Err(FlowBindError::ParsingError(format!(
				"Unknown network '{}'",
				other
			))),
		}
	}
}

/// 8-byte Flow account address.
///
/// Displays as `0x` followed by 16 zero-padded lower-case hex digits, which is
/// the form embedded in attestation messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowAddress(u64);

impl FlowAddress {
	/// Wraps a raw address value.
	pub fn new(value: u64) -> Self {
		Self(value)
	}

	/// Raw address value.
	pub fn value(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for FlowAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{:016x}", self.0)
	}
}

impl FromStr for FlowAddress {
	type Err = FlowBindError;

	/// Accepts an optional `0x` prefix and 1 to 16 hex digits of either case.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = s.strip_prefix("0x").unwrap_or(s);

		if digits.is_empty() || digits.len() > FLOW_ADDRESS_HEX_LEN {
			return Err(FlowBindError::InvalidAddressError(format!(
				"'{}' must have between 1 and {} hex digits",
				s, FLOW_ADDRESS_HEX_LEN
			)));
		}

		// `from_str_radix` tolerates a leading sign, which no address carries.
		if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(FlowBindError::InvalidAddressError(format!(
				"'{}' contains non-hex characters",
				s
			)));
		}

		u64::from_str_radix(digits, 16)
			.map(FlowAddress)
			.map_err(|e| FlowBindError::InvalidAddressError(format!("'{}': {}", s, e)))
	}
}

impl TryFrom<String> for FlowAddress {
	type Error = FlowBindError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<FlowAddress> for String {
	fn from(address: FlowAddress) -> Self {
		address.to_string()
	}
}

/// Oracle deciding whether Flow addresses are well-formed members of a
/// network. The attestation protocol trusts its answers.
pub trait AddressValidation {
	/// Returns true if `address` is a syntactically valid address that belongs
	/// to `network`.
	fn is_valid_address(&self, address: &str, network: Network) -> bool;

	/// Network the given account address lives on, if known.
	fn network_of(&self, address: &FlowAddress) -> Option<Network>;
}


#[cfg(test)]
mod tests {
	use crate::network::*;

	#[test]
	fn test_flow_address_display_is_padded_lowercase() {
		let address = FlowAddress::new(0xF8D6E0586B0A20C7);
		assert_eq!(address.to_string(), "0xf8d6e0586b0a20c7");
		assert_eq!(FlowAddress::new(1).to_string(), "0x0000000000000001");
	}

	#[test]
	fn test_flow_address_parsing() {
		let expected = FlowAddress::new(0xf8d6e0586b0a20c7);
		assert_eq!("0xf8d6e0586b0a20c7".parse::<FlowAddress>().unwrap(), expected);
		assert_eq!("F8D6E0586B0A20C7".parse::<FlowAddress>().unwrap(), expected);
		assert_eq!("0x01".parse::<FlowAddress>().unwrap(), FlowAddress::new(1));
	}

	#[test]
	fn test_flow_address_rejects_malformed() {
		for input in ["", "0x", "0x1234567890abcdef0", "0xabcg", "+1", "0x-1", "0x 1"] {
			let res = input.parse::<FlowAddress>();
			assert!(
				matches!(res, Err(FlowBindError::InvalidAddressError(_))),
				"'{}' should be rejected",
				input
			);
		}
	}

	#[test]
	fn test_flow_address_serde_uses_canonical_string() {
		let address = FlowAddress::new(0x1cb159857af02018);
		let json = serde_json::to_string(&address).unwrap();
		assert_eq!(json, "\"0x1cb159857af02018\"");

		let parsed: FlowAddress = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, address);

		let bad: Result<FlowAddress, _> = serde_json::from_str("\"0xnothex\"");
		assert!(bad.is_err());
	}

	#[test]
	fn test_network_parsing() {
		assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
		assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
		assert_eq!("EMULATOR".parse::<Network>().unwrap(), Network::Emulator);
		assert!("previewnet".parse::<Network>().is_err());
		assert_eq!(Network::Testnet.to_string(), "testnet");
	}
}
