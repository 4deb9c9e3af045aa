//! # Error Module.
//!
//! This module features the `FlowBindError` enum for error handling throughout the project.

use thiserror::Error;

/// The crate-wide error variants.
#[derive(Debug, Error)]
pub enum FlowBindError {
	/// Account error
	#[error("AccountError: {0}")]
	AccountError(String),

	/// Configuration error
	#[error("ConfigurationError: {0}")]
	ConfigurationError(String),

	/// Malformed hex input
	#[error("DecodeError: {0}")]
	DecodeError(String),

	/// An attestation already exists for the Ethereum address
	#[error("DuplicateAttestationError: {0}")]
	DuplicateAttestationError(String),

	/// File read/write error
	#[error("FileIOError: {0}")]
	FileIOError(String),

	/// Attestation message is not two delimiter-separated parts
	#[error("FormatError: {0}")]
	FormatError(String),

	/// Flow address is malformed or belongs to another network
	#[error("InvalidAddressError: {0}")]
	InvalidAddressError(String),

	/// Input/output error
	#[error("IOError: {0}")]
	IOError(std::io::Error),

	/// Parsing error
	#[error("ParsingError: {0}")]
	ParsingError(String),

	/// Public key, Ethereum address and signature do not line up
	#[error("SignatureMismatchError: {0}")]
	SignatureMismatchError(String),

	/// Validation error
	#[error("ValidationError: {0}")]
	ValidationError(String),
}
