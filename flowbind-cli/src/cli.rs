//! # CLI Module.
//!
//! This module contains all CLI related data handling and conversions.

use crate::fs::{
	get_file_path, load_ledger, load_private_key, save_config, save_ledger, FileType,
	ATTESTATIONS_FILENAME,
};
use clap::{Args, Parser, Subcommand};
use flowbind::{
	error::FlowBindError,
	eth::{derive_eth_address, is_canonical_eth_address, EthSigner},
	ledger::Ledger,
	message::AttestationMessage,
	network::{FlowAddress, Network},
	storage::{AttestationRecord, CSVFileStorage, Storage},
	ProtocolConfig,
};
use log::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Mode {
	/// Create a new account and print its address.
	Account,
	/// Create an attestation. Requires 'AttestData'.
	Attest(AttestData),
	/// Print the Ethereum address of a public key.
	Derive(DeriveData),
	/// Save an account's attestations as CSV.
	Export(AccountData),
	/// Opt an account in by creating its registry.
	Setup(AccountData),
	/// Display the current configuration.
	Show,
	/// Print a stored attestation.
	ShowAttestation(LookupData),
	/// Sign an attestation message with the configured key.
	Sign(AccountData),
	/// Update the configuration. Requires 'UpdateData'.
	Update(UpdateData),
	/// Verify an attestation and print the outcome.
	Verify(LookupData),
}

/// Account subcommand input.
#[derive(Args, Debug)]
pub struct AccountData {
	/// Flow account address.
	#[clap(long = "account")]
	account: Option<String>,
}

/// Attestation subcommand input.
#[derive(Args, Debug)]
pub struct AttestData {
	/// Flow account holding the registry.
	#[clap(long = "account")]
	account: Option<String>,
	/// Raw secp256k1 public key (64-byte hex string).
	#[clap(long = "public-key")]
	public_key: Option<String>,
	/// Signature over the message (64 or 65-byte hex string).
	#[clap(long = "signature")]
	signature: Option<String>,
	/// Signed message, 'flowAddress|ethAddress'.
	#[clap(long = "message")]
	message: Option<String>,
}

/// Derive subcommand input.
#[derive(Args, Debug)]
pub struct DeriveData {
	/// Raw secp256k1 public key (64-byte hex string).
	#[clap(long = "public-key")]
	public_key: Option<String>,
}

/// Attestation lookup input.
#[derive(Args, Debug)]
pub struct LookupData {
	/// Flow account holding the registry.
	#[clap(long = "account")]
	account: Option<String>,
	/// Ethereum address the attestation is keyed by.
	#[clap(long = "eth")]
	eth_address: Option<String>,
}

/// Configuration update subcommand input.
#[derive(Args, Debug)]
pub struct UpdateData {
	/// Flow network (mainnet, testnet, emulator).
	#[clap(long = "network")]
	network: Option<String>,
	/// Registry storage path.
	#[clap(long = "storage-path")]
	storage_path: Option<String>,
	/// Registry public path.
	#[clap(long = "public-path")]
	public_path: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, FlowBindError> {
	value.as_deref().ok_or_else(|| FlowBindError::ValidationError(format!("Missing {}", name)))
}

fn parse_account(account: &Option<String>) -> Result<FlowAddress, FlowBindError> {
	required(account, "account")?.parse()
}

impl AccountData {
	/// Opts the account in.
	pub fn setup(&self, ledger: &mut Ledger) -> Result<(), FlowBindError> {
		ledger.setup_registry(&parse_account(&self.account)?)
	}

	/// Collects export records for every attestation the account holds.
	pub fn records(&self, ledger: &Ledger) -> Result<Vec<AttestationRecord>, FlowBindError> {
		let address = parse_account(&self.account)?;
		let registry = ledger
			.account(&address)
			.and_then(|account| account.registry(&ledger.config().storage_path))
			.ok_or_else(|| {
				FlowBindError::AccountError(format!("Account {} has no registry", address))
			})?;

		Ok(registry.iter().map(AttestationRecord::from).collect())
	}

	/// Builds the message binding the signer's Ethereum address to the account
	/// and signs it. Returns the public key, signature and message.
	pub fn sign(&self, signer: &EthSigner) -> Result<(String, String, String), FlowBindError> {
		let message = AttestationMessage::new(parse_account(&self.account)?, signer.eth_address());
		let canonical = message.canonicalize();
		let signature = signer.sign_personal(&canonical)?;

		Ok((signer.public_key(), signature, canonical))
	}
}

impl AttestData {
	/// Submits the attestation to the account's registry.
	pub fn submit(&self, ledger: &mut Ledger) -> Result<(), FlowBindError> {
		let address = parse_account(&self.account)?;
		let public_key = required(&self.public_key, "public key")?;
		let signature = required(&self.signature, "signature")?;
		let message = required(&self.message, "message")?;

		ledger.create_attestation(&address, public_key, signature, message)
	}
}

impl LookupData {
	fn eth_address(&self) -> Result<&str, FlowBindError> {
		let eth_address = required(&self.eth_address, "eth address")?;
		if !is_canonical_eth_address(eth_address) {
			warn!("{} is not a lower-case 0x address; lookups are case-sensitive.", eth_address);
		}
		Ok(eth_address)
	}

	/// Verifies the attestation through the account's public capability.
	pub fn verify(&self, ledger: &Ledger) -> Result<bool, FlowBindError> {
		let address = parse_account(&self.account)?;
		let eth_address = self.eth_address()?;

		Ok(ledger.verify(&address, eth_address))
	}

	/// Looks the attestation up through the account's public capability.
	pub fn record(&self, ledger: &Ledger) -> Result<Option<AttestationRecord>, FlowBindError> {
		let address = parse_account(&self.account)?;
		let eth_address = self.eth_address()?;

		let registry = ledger.public_registry(&address).ok_or_else(|| {
			FlowBindError::AccountError(format!("Account {} exposes no registry", address))
		})?;

		Ok(registry.borrow_attestation(eth_address).map(AttestationRecord::from))
	}
}

impl UpdateData {
	/// Applies the requested changes to `config` and validates the result.
	pub fn apply(self, config: ProtocolConfig) -> Result<ProtocolConfig, FlowBindError> {
		let mut config = config;

		if let Some(network) = self.network {
			config.network = network.parse::<Network>()?;
		}

		if let Some(storage_path) = self.storage_path {
			config.storage_path = storage_path;
		}

		if let Some(public_path) = self.public_path {
			config.public_path = public_path;
		}

		config.validate()?;
		Ok(config)
	}
}

/// Handles the `account` command.
pub fn handle_account(config: ProtocolConfig) -> Result<(), FlowBindError> {
	let mut ledger = load_ledger(config)?;
	let address = ledger.create_account()?;
	save_ledger(&ledger)?;

	println!("{}", address);
	Ok(())
}

/// Handles the `setup` command.
pub fn handle_setup(config: ProtocolConfig, data: AccountData) -> Result<(), FlowBindError> {
	let mut ledger = load_ledger(config)?;
	data.setup(&mut ledger)?;
	save_ledger(&ledger)
}

/// Handles the `attest` command.
pub fn handle_attest(config: ProtocolConfig, data: AttestData) -> Result<(), FlowBindError> {
	let mut ledger = load_ledger(config)?;
	data.submit(&mut ledger)?;
	save_ledger(&ledger)
}

/// Handles the `verify` command.
pub fn handle_verify(config: ProtocolConfig, data: LookupData) -> Result<(), FlowBindError> {
	let ledger = load_ledger(config)?;
	println!("{}", data.verify(&ledger)?);
	Ok(())
}

/// Handles the `show-attestation` command.
pub fn handle_show_attestation(
	config: ProtocolConfig, data: LookupData,
) -> Result<(), FlowBindError> {
	let ledger = load_ledger(config)?;

	match data.record(&ledger)? {
		Some(record) => {
			let json = serde_json::to_string_pretty(&record)
				.map_err(|e| FlowBindError::ParsingError(e.to_string()))?;
			println!("{}", json);
			if !record.valid() {
				info!("Attestation is stored but does not verify.");
			}
		},
		None => info!("No attestation stored for that Ethereum address."),
	}

	Ok(())
}

/// Handles the `derive` command.
pub fn handle_derive(data: DeriveData) -> Result<(), FlowBindError> {
	let public_key = required(&data.public_key, "public key")?;
	println!("{}", derive_eth_address(public_key)?);
	Ok(())
}

/// Handles the `export` command.
pub fn handle_export(config: ProtocolConfig, data: AccountData) -> Result<(), FlowBindError> {
	let ledger = load_ledger(config)?;
	let records = data.records(&ledger)?;

	let filepath = get_file_path(ATTESTATIONS_FILENAME, FileType::Csv)?;
	let mut storage = CSVFileStorage::<AttestationRecord>::new(filepath);
	storage.save(records)?;

	info!(
		"Attestations saved at \"{}\".",
		storage.filepath().display()
	);

	Ok(())
}

/// Handles the `sign` command.
pub fn handle_sign(data: AccountData) -> Result<(), FlowBindError> {
	let signer = EthSigner::from_private_key(&load_private_key())?;
	let (public_key, signature, message) = data.sign(&signer)?;

	println!("--public-key {} --signature {} --message '{}'", public_key, signature, message);
	Ok(())
}

/// Handles the CLI project configuration update.
pub fn handle_update(config: ProtocolConfig, data: UpdateData) -> Result<(), FlowBindError> {
	let config = data.apply(config)?;
	save_config(&config)?;

	info!("Protocol config updated:\n{:#?}", config);
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::cli::*;
	use clap::CommandFactory;

	/// Anvil development account #0.
	const PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ETH_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

	fn account_data(address: &FlowAddress) -> AccountData {
		AccountData { account: Some(address.to_string()) }
	}

	fn lookup_data(address: &FlowAddress) -> LookupData {
		LookupData { account: Some(address.to_string()), eth_address: Some(ETH_ADDRESS.to_string()) }
	}

	#[test]
	fn test_cli() {
		Cli::command().debug_assert()
	}

	#[test]
	fn test_sign_setup_attest_verify() {
		let mut ledger = Ledger::new(ProtocolConfig::default()).unwrap();
		let alice = ledger.create_account().unwrap();
		account_data(&alice).setup(&mut ledger).unwrap();

		let signer = EthSigner::from_private_key(PRIVATE_KEY).unwrap();
		let (public_key, signature, message) = account_data(&alice).sign(&signer).unwrap();
		assert_eq!(message, format!("{}|{}", alice, ETH_ADDRESS));

		let attest = AttestData {
			account: Some(alice.to_string()),
			public_key: Some(public_key),
			signature: Some(signature),
			message: Some(message),
		};
		attest.submit(&mut ledger).unwrap();

		assert!(lookup_data(&alice).verify(&ledger).unwrap());

		let record = lookup_data(&alice).record(&ledger).unwrap().unwrap();
		assert_eq!(record.eth_address(), ETH_ADDRESS);
		assert!(record.valid());

		let records = account_data(&alice).records(&ledger).unwrap();
		assert_eq!(records, vec![record]);

		let mixed_case = LookupData {
			account: Some(alice.to_string()),
			eth_address: Some("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string()),
		};
		assert!(!mixed_case.verify(&ledger).unwrap());
		assert!(mixed_case.record(&ledger).unwrap().is_none());
	}

	#[test]
	fn test_lookup_absent_attestation() {
		let mut ledger = Ledger::new(ProtocolConfig::default()).unwrap();
		let alice = ledger.create_account().unwrap();

		// Not opted in yet.
		assert!(!lookup_data(&alice).verify(&ledger).unwrap());
		assert!(matches!(
			lookup_data(&alice).record(&ledger),
			Err(FlowBindError::AccountError(_))
		));

		account_data(&alice).setup(&mut ledger).unwrap();
		assert!(lookup_data(&alice).record(&ledger).unwrap().is_none());
	}

	#[test]
	fn test_missing_arguments() {
		let mut ledger = Ledger::new(ProtocolConfig::default()).unwrap();
		let alice = ledger.create_account().unwrap();

		let attest = AttestData {
			account: Some(alice.to_string()),
			public_key: None,
			signature: None,
			message: None,
		};
		assert!(matches!(attest.submit(&mut ledger), Err(FlowBindError::ValidationError(_))));

		let data = AccountData { account: None };
		assert!(matches!(data.setup(&mut ledger), Err(FlowBindError::ValidationError(_))));

		let data = AccountData { account: Some("0xnope".to_string()) };
		assert!(matches!(data.setup(&mut ledger), Err(FlowBindError::InvalidAddressError(_))));
	}

	#[test]
	fn test_update_data_apply() {
		let data = UpdateData {
			network: Some("Testnet".to_string()),
			storage_path: Some("/storage/Bindings".to_string()),
			public_path: None,
		};
		let config = data.apply(ProtocolConfig::default()).unwrap();

		assert_eq!(config.network, Network::Testnet);
		assert_eq!(config.storage_path, "/storage/Bindings");
		assert_eq!(config.public_path, ProtocolConfig::default().public_path);

		let bad_network = UpdateData {
			network: Some("devnet".to_string()),
			storage_path: None,
			public_path: None,
		};
		assert!(matches!(
			bad_network.apply(ProtocolConfig::default()),
			Err(FlowBindError::ParsingError(_))
		));

		let bad_path = UpdateData {
			network: None,
			storage_path: None,
			public_path: Some("/storage/Oops".to_string()),
		};
		assert!(matches!(
			bad_path.apply(ProtocolConfig::default()),
			Err(FlowBindError::ConfigurationError(_))
		));
	}
}
