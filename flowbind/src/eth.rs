//! # Ethereum Module.
//!
//! This module provides the Ethereum-side cryptography: personal-message
//! digests, secp256k1 signature verification and address derivation.

use crate::error::FlowBindError;
use ethers::{
	prelude::k256::ecdsa::{
		signature::hazmat::PrehashVerifier, Signature, SigningKey, VerifyingKey,
	},
	utils::{hex, keccak256},
};
use log::debug;

/// Prefix of the Ethereum personal-message convention.
pub const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";
/// Length of a raw (non-prefixed) uncompressed secp256k1 public key.
pub const PUBLIC_KEY_LEN: usize = 64;
/// Length of a compact `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;
/// SEC1 tag of an uncompressed point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Decodes a hex string, accepting either case and an optional `0x` prefix.
pub fn decode_hex(input: &str, what: &str) -> Result<Vec<u8>, FlowBindError> {
	let digits = input.strip_prefix("0x").unwrap_or(input);
	hex::decode(digits)
		.map_err(|e| FlowBindError::DecodeError(format!("Malformed {} hex: {}", what, e)))
}

/// Builds the byte sequence hashed under the personal-message convention:
/// prefix, decimal byte length of `message`, then `message` itself.
pub fn personal_message_bytes(message: &[u8]) -> Vec<u8> {
	let length = message.len().to_string();
	let mut bytes = Vec::with_capacity(ETH_MESSAGE_PREFIX.len() + length.len() + message.len());

	bytes.extend_from_slice(ETH_MESSAGE_PREFIX.as_bytes());
	bytes.extend_from_slice(length.as_bytes());
	bytes.extend_from_slice(message);

	bytes
}

/// Keccak-256 digest of the personal-message encoding of `message`.
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
	keccak256(personal_message_bytes(message))
}

/// Verifies a hex-encoded secp256k1 signature of `message` under the
/// personal-message convention.
///
/// Malformed hex is a `DecodeError`. Anything that decodes but is not a
/// valid key, a valid signature, or a matching signature yields `Ok(false)`.
pub fn verify_signature(
	public_key: &str, signature: &str, message: &str,
) -> Result<bool, FlowBindError> {
	let public_key = decode_hex(public_key, "public key")?;
	let signature = decode_hex(signature, "signature")?;
	let digest = personal_message_digest(message.as_bytes());

	Ok(verify_prehash(&public_key, &signature, &digest))
}

/// Verifies a signature over an already computed 32-byte digest.
///
/// Accepts `r || s` or `r || s || v`; the recovery byte is ignored since the
/// public key is given.
pub fn verify_prehash(public_key: &[u8], signature: &[u8], digest: &[u8; 32]) -> bool {
	if public_key.len() != PUBLIC_KEY_LEN {
		debug!("Rejecting public key of {} bytes", public_key.len());
		return false;
	}

	let compact = match signature.len() {
		SIGNATURE_LEN => signature,
		len if len == SIGNATURE_LEN + 1 => &signature[..SIGNATURE_LEN],
		len => {
			debug!("Rejecting signature of {} bytes", len);
			return false;
		},
	};

	let mut sec1 = Vec::with_capacity(PUBLIC_KEY_LEN + 1);
	sec1.push(SEC1_UNCOMPRESSED_TAG);
	sec1.extend_from_slice(public_key);

	let verifying_key = match VerifyingKey::from_sec1_bytes(&sec1) {
		Ok(key) => key,
		Err(_) => {
			debug!("Public key is not a point on secp256k1");
			return false;
		},
	};

	let signature = match Signature::from_slice(compact) {
		Ok(sig) => sig,
		Err(_) => {
			debug!("Signature scalars are out of range");
			return false;
		},
	};

	// High-s signatures are accepted in their low-s form.
	let signature = signature.normalize_s().unwrap_or(signature);

	verifying_key.verify_prehash(digest, &signature).is_ok()
}

/// Derives the lower-case, `0x`-prefixed Ethereum address of a hex-encoded
/// raw public key.
pub fn derive_eth_address(public_key: &str) -> Result<String, FlowBindError> {
	let public_key = decode_hex(public_key, "public key")?;
	Ok(eth_address_from_public_key(&public_key))
}

/// Last 20 bytes of the Keccak-256 hash of the raw public key bytes.
pub fn eth_address_from_public_key(public_key: &[u8]) -> String {
	let hash = keccak256(public_key);
	format!("0x{}", hex::encode(&hash[12..]))
}

/// Returns true if `address` is `0x` followed by 40 lower-case hex digits.
pub fn is_canonical_eth_address(address: &str) -> bool {
	match address.strip_prefix("0x") {
		Some(digits) => {
			digits.len() == 40
				&& digits.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
		},
		None => false,
	}
}

/// Wallet-side signer producing attestation inputs from a secp256k1 key.
pub struct EthSigner {
	key: SigningKey,
}

impl EthSigner {
	/// Builds a signer from a hex-encoded 32-byte private key.
	pub fn from_private_key(private_key: &str) -> Result<Self, FlowBindError> {
		let bytes = decode_hex(private_key, "private key")?;
		let key = SigningKey::from_slice(&bytes)
			.map_err(|_| FlowBindError::DecodeError("Invalid secp256k1 private key".to_string()))?;
		Ok(Self { key })
	}

	/// Hex-encoded raw public key, without the SEC1 tag.
	pub fn public_key(&self) -> String {
		let point = self.key.verifying_key().to_encoded_point(false);
		hex::encode(&point.as_bytes()[1..])
	}

	/// Ethereum address of the key.
	pub fn eth_address(&self) -> String {
		let point = self.key.verifying_key().to_encoded_point(false);
		eth_address_from_public_key(&point.as_bytes()[1..])
	}

	/// Signs `message` under the personal-message convention, returning the
	/// hex-encoded `r || s || v` signature wallets emit.
	pub fn sign_personal(&self, message: &str) -> Result<String, FlowBindError> {
		let digest = personal_message_digest(message.as_bytes());
		let (signature, recovery_id) = self
			.key
			.sign_prehash_recoverable(&digest)
			.map_err(|e| FlowBindError::SignatureMismatchError(e.to_string()))?;

		let mut bytes = signature.to_bytes().to_vec();
		bytes.push(recovery_id.to_byte() + 27);
		Ok(hex::encode(bytes))
	}
}


#[cfg(test)]
mod tests {
	use crate::eth::{test_helpers::*, *};
	use ethers::{prelude::k256::ecdsa::SigningKey, utils::hash_message};

	#[test]
	fn test_personal_message_bytes_layout() {
		let bytes = personal_message_bytes("hello".as_bytes());
		assert_eq!(bytes, b"\x19Ethereum Signed Message:\n5hello".to_vec());

		// Length counts UTF-8 bytes, not characters.
		let bytes = personal_message_bytes("é".as_bytes());
		assert_eq!(bytes, b"\x19Ethereum Signed Message:\n2\xc3\xa9".to_vec());
	}

	#[test]
	fn test_personal_message_digest_matches_ethers() {
		let message = "0x0000000000000001|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
		let expected = hash_message(message);
		assert_eq!(personal_message_digest(message.as_bytes()), expected.to_fixed_bytes());
	}

	#[test]
	fn test_derive_eth_address_known_vector() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let address = derive_eth_address(&public_key_hex(&key)).unwrap();
		assert_eq!(address, TEST_ETH_ADDRESS);
	}

	#[test]
	fn test_derive_eth_address_is_deterministic_and_canonical() {
		let public_key = public_key_hex(&signing_key(OTHER_PRIVATE_KEY));

		let first = derive_eth_address(&public_key).unwrap();
		let second = derive_eth_address(&public_key.to_uppercase()).unwrap();
		let prefixed = derive_eth_address(&format!("0x{}", public_key)).unwrap();

		assert_eq!(first, second);
		assert_eq!(first, prefixed);
		assert!(is_canonical_eth_address(&first));
		assert_eq!(first, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
	}

	#[test]
	fn test_derive_eth_address_malformed_hex() {
		let odd = derive_eth_address("abc");
		assert!(matches!(odd, Err(FlowBindError::DecodeError(_))));

		let non_hex = derive_eth_address("zz".repeat(64).as_str());
		assert!(matches!(non_hex, Err(FlowBindError::DecodeError(_))));
	}

	#[test]
	fn test_verify_signature_valid() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let public_key = public_key_hex(&key);
		let message = "0x0000000000000001|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

		let signature = sign_personal(&key, message);
		assert!(verify_signature(&public_key, &signature, message).unwrap());

		// Wallet output with a trailing recovery byte and mixed-case hex.
		let signature = sign_personal_with_v(&key, message);
		assert!(verify_signature(&public_key.to_uppercase(), &signature, message).unwrap());
	}

	#[test]
	fn test_verify_signature_random_keys() {
		let mut rng = rand::thread_rng();
		for i in 1..=8u64 {
			let key = SigningKey::random(&mut rng);
			let eth_address = derive_eth_address(&public_key_hex(&key)).unwrap();
			let message = format!("0x{:016x}|{}", i, eth_address);
			let signature = sign_personal(&key, &message);
			assert!(verify_signature(&public_key_hex(&key), &signature, &message).unwrap());
		}
	}

	#[test]
	fn test_verify_signature_flipped_bytes() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let public_key = public_key_hex(&key);
		let message = "0x0000000000000001|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
		let signature = hex::decode(sign_personal(&key, message)).unwrap();

		for i in 0..signature.len() {
			let mut tampered = signature.clone();
			tampered[i] ^= 0x01;
			let valid = verify_signature(&public_key, &hex::encode(&tampered), message).unwrap();
			assert!(!valid, "flipped byte {} still verifies", i);
		}
	}

	#[test]
	fn test_verify_signature_wrong_message_or_key() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let other = signing_key(OTHER_PRIVATE_KEY);
		let message = "0x0000000000000001|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
		let signature = sign_personal(&key, message);

		let altered = "0x0000000000000002|0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
		assert!(!verify_signature(&public_key_hex(&key), &signature, altered).unwrap());
		assert!(!verify_signature(&public_key_hex(&other), &signature, message).unwrap());
	}

	#[test]
	fn test_verify_signature_structurally_invalid_inputs() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let public_key = public_key_hex(&key);
		let signature = sign_personal(&key, "msg");

		// Wrong lengths decode fine but never verify.
		assert!(!verify_signature(&public_key[..126], &signature, "msg").unwrap());
		assert!(!verify_signature(&public_key, &signature[..126], "msg").unwrap());
		// Not a curve point.
		assert!(!verify_signature(&"00".repeat(64), &signature, "msg").unwrap());
		// Zero scalars.
		assert!(!verify_signature(&public_key, &"00".repeat(64), "msg").unwrap());
	}

	#[test]
	fn test_verify_signature_malformed_hex() {
		let key = signing_key(TEST_PRIVATE_KEY);
		let public_key = public_key_hex(&key);
		let signature = sign_personal(&key, "msg");

		let bad_key = verify_signature("0x123", &signature, "msg");
		assert!(matches!(bad_key, Err(FlowBindError::DecodeError(_))));

		let bad_sig = verify_signature(&public_key, "not hex", "msg");
		assert!(matches!(bad_sig, Err(FlowBindError::DecodeError(_))));
	}

	#[test]
	fn test_is_canonical_eth_address() {
		assert!(is_canonical_eth_address(TEST_ETH_ADDRESS));
		assert!(!is_canonical_eth_address("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
		assert!(!is_canonical_eth_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
		assert!(!is_canonical_eth_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb9226"));
	}

	#[test]
	fn test_eth_signer() {
		let signer = EthSigner::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
		assert_eq!(signer.eth_address(), TEST_ETH_ADDRESS);
		assert_eq!(derive_eth_address(&signer.public_key()).unwrap(), TEST_ETH_ADDRESS);

		let signature = signer.sign_personal("0x0000000000000001|msg").unwrap();
		assert_eq!(signature.len(), 130);
		assert!(verify_signature(&signer.public_key(), &signature, "0x0000000000000001|msg")
			.unwrap());

		let res = EthSigner::from_private_key(&"00".repeat(32));
		assert!(matches!(res, Err(FlowBindError::DecodeError(_))));
		assert!(EthSigner::from_private_key("zz").is_err());
	}
}
