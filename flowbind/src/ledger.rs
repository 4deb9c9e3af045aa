//! # Ledger Module.
//!
//! In-process account environment. Each account may store one attestation
//! registry at the configured storage path and expose it read-only at the
//! configured public path; only the account itself can create attestations.

use crate::{
	attestation::{Attestation, AttestationRef},
	error::FlowBindError,
	network::{AddressValidation, FlowAddress, Network},
	registry::{AttestationRegistry, AttestationRegistryPublic},
	ProtocolConfig,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

/// The set of accounts that exist on one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountDirectory {
	network: Network,
	addresses: BTreeSet<FlowAddress>,
}

impl AccountDirectory {
	/// Creates an empty directory for `network`.
	pub fn new(network: Network) -> Self {
		Self { network, addresses: BTreeSet::new() }
	}

	/// Network of every account in the directory.
	pub fn network(&self) -> Network {
		self.network
	}

	/// Returns true if an account exists at `address`.
	pub fn contains(&self, address: &FlowAddress) -> bool {
		self.addresses.contains(address)
	}

	fn insert(&mut self, address: FlowAddress) -> bool {
		self.addresses.insert(address)
	}
}

impl AddressValidation for AccountDirectory {
	fn is_valid_address(&self, address: &str, network: Network) -> bool {
		match address.parse::<FlowAddress>() {
			Ok(address) => network == self.network && self.contains(&address),
			Err(_) => false,
		}
	}

	fn network_of(&self, address: &FlowAddress) -> Option<Network> {
		self.contains(address).then_some(self.network)
	}
}

/// A ledger account and its storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Account address.
	address: FlowAddress,
	/// Registries stored in the account, by storage path.
	storage: BTreeMap<String, AttestationRegistry>,
	/// Public links, from public path to storage path.
	links: BTreeMap<String, String>,
}

impl Account {
	fn new(address: FlowAddress) -> Self {
		Self { address, storage: BTreeMap::new(), links: BTreeMap::new() }
	}

	/// Account address.
	pub fn address(&self) -> &FlowAddress {
		&self.address
	}

	/// Registry stored at `storage_path`.
	pub fn registry(&self, storage_path: &str) -> Option<&AttestationRegistry> {
		self.storage.get(storage_path)
	}

	/// Read-only registry capability linked at `public_path`.
	pub fn public_registry(&self, public_path: &str) -> Option<&dyn AttestationRegistryPublic> {
		self.links
			.get(public_path)
			.and_then(|target| self.storage.get(target))
			.map(|registry| registry as &dyn AttestationRegistryPublic)
	}
}

/// Serializable form of a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
	/// Network the ledger belongs to.
	pub network: Network,
	/// Index of the most recently allocated account.
	pub last_index: u64,
	/// Every account, in address order.
	pub accounts: Vec<Account>,
}

/// Accounts of one network together with their attestation registries.
#[derive(Debug)]
pub struct Ledger {
	config: Arc<ProtocolConfig>,
	directory: AccountDirectory,
	accounts: BTreeMap<FlowAddress, Account>,
	last_index: u64,
}

impl Ledger {
	/// Creates an empty ledger.
	pub fn new(config: ProtocolConfig) -> Result<Self, FlowBindError> {
		config.validate()?;
		let directory = AccountDirectory::new(config.network);

		Ok(Self { config: Arc::new(config), directory, accounts: BTreeMap::new(), last_index: 0 })
	}

	/// Rebuilds a ledger from a snapshot.
	///
	/// Every stored attestation must still verify against the account that
	/// holds it and be filed under the Ethereum address its message names; a
	/// snapshot containing one that is not is rejected.
	pub fn restore(config: ProtocolConfig, snapshot: LedgerSnapshot) -> Result<Self, FlowBindError> {
		let mut ledger = Self::new(config)?;

		if snapshot.network != ledger.config.network {
			return Err(FlowBindError::ConfigurationError(format!(
				"Snapshot belongs to {}, configured network is {}",
				snapshot.network, ledger.config.network
			)));
		}

		for mut account in snapshot.accounts {
			let address = account.address;
			if !ledger.directory.insert(address) {
				return Err(FlowBindError::ValidationError(format!(
					"Duplicate account {} in snapshot",
					address
				)));
			}

			for (path, registry) in account.storage.iter_mut() {
				registry.bind_owner(address);

				let failing = registry.failing();
				if !failing.is_empty() {
					return Err(FlowBindError::ValidationError(format!(
						"Account {} holds attestations at {} that do not verify or are misfiled: {}",
						address,
						path,
						failing.join(", ")
					)));
				}
			}

			ledger.last_index = ledger.last_index.max(address.value());
			ledger.accounts.insert(address, account);
		}
		ledger.last_index = ledger.last_index.max(snapshot.last_index);

		info!("Restored {} accounts on {}", ledger.accounts.len(), ledger.config.network);

		Ok(ledger)
	}

	/// Serializable copy of the ledger.
	pub fn snapshot(&self) -> LedgerSnapshot {
		LedgerSnapshot {
			network: self.config.network,
			last_index: self.last_index,
			accounts: self.accounts.values().cloned().collect(),
		}
	}

	/// Shared protocol configuration.
	pub fn config(&self) -> Arc<ProtocolConfig> {
		self.config.clone()
	}

	/// Address oracle backed by this ledger's accounts.
	pub fn directory(&self) -> &AccountDirectory {
		&self.directory
	}

	/// Allocates a new account. Addresses are handed out sequentially.
	pub fn create_account(&mut self) -> Result<FlowAddress, FlowBindError> {
		let index = self.last_index.checked_add(1).ok_or_else(|| {
			FlowBindError::AccountError("Account address space exhausted".to_string())
		})?;
		let address = FlowAddress::new(index);

		self.last_index = index;
		self.directory.insert(address);
		self.accounts.insert(address, Account::new(address));
		info!("Account created: {}", address);

		Ok(address)
	}

	/// Looks up an account.
	pub fn account(&self, address: &FlowAddress) -> Option<&Account> {
		self.accounts.get(address)
	}

	/// Iterates over all accounts in address order.
	pub fn accounts(&self) -> impl Iterator<Item = &Account> {
		self.accounts.values()
	}

	fn account_mut(&mut self, address: &FlowAddress) -> Result<&mut Account, FlowBindError> {
		self.accounts
			.get_mut(address)
			.ok_or_else(|| FlowBindError::AccountError(format!("No account at {}", address)))
	}

	/// Stores `registry` in the account and links its public capability.
	pub fn save_registry(
		&mut self, address: &FlowAddress, mut registry: AttestationRegistry,
	) -> Result<(), FlowBindError> {
		let config = self.config.clone();
		let account = self.account_mut(address)?;

		if account.storage.contains_key(&config.storage_path) {
			return Err(FlowBindError::AccountError(format!(
				"Account {} already stores a registry at {}",
				address, config.storage_path
			)));
		}

		registry.bind_owner(*address);
		account.storage.insert(config.storage_path.clone(), registry);
		account.links.insert(config.public_path.clone(), config.storage_path.clone());
		info!("Registry saved in {} at {}", address, config.storage_path);

		Ok(())
	}

	/// Opts an account in by storing an empty registry.
	pub fn setup_registry(&mut self, address: &FlowAddress) -> Result<(), FlowBindError> {
		self.save_registry(address, AttestationRegistry::new())
	}

	/// Unlinks and removes the account's registry.
	///
	/// The returned registry has no owner, so none of its attestations verify
	/// until it is saved back into the same account.
	pub fn remove_registry(
		&mut self, address: &FlowAddress,
	) -> Result<AttestationRegistry, FlowBindError> {
		let config = self.config.clone();
		let account = self.account_mut(address)?;

		let mut registry = account.storage.remove(&config.storage_path).ok_or_else(|| {
			FlowBindError::AccountError(format!("Account {} has no registry", address))
		})?;
		account.links.remove(&config.public_path);
		registry.release_owner();
		info!("Registry removed from {}", address);

		Ok(registry)
	}

	/// Creates an attestation in the account's own registry.
	pub fn create_attestation(
		&mut self, address: &FlowAddress, public_key: &str, signature: &str, message: &str,
	) -> Result<(), FlowBindError> {
		let Self { config, directory, accounts, .. } = self;

		let account = accounts
			.get_mut(address)
			.ok_or_else(|| FlowBindError::AccountError(format!("No account at {}", address)))?;
		let registry = account.storage.get_mut(&config.storage_path).ok_or_else(|| {
			FlowBindError::AccountError(format!("Account {} has no registry", address))
		})?;

		debug!("Creating attestation in {}", address);
		registry.create(&*directory, public_key, signature, message)
	}

	/// Removes an attestation from the account's own registry.
	pub fn remove_attestation(
		&mut self, address: &FlowAddress, eth_address: &str,
	) -> Result<Option<Attestation>, FlowBindError> {
		let config = self.config.clone();
		let account = self.account_mut(address)?;
		let registry = account.storage.get_mut(&config.storage_path).ok_or_else(|| {
			FlowBindError::AccountError(format!("Account {} has no registry", address))
		})?;

		Ok(registry.remove(eth_address))
	}

	/// Public registry capability of an account, if it opted in.
	pub fn public_registry(&self, address: &FlowAddress) -> Option<&dyn AttestationRegistryPublic> {
		self.accounts.get(address)?.public_registry(&self.config.public_path)
	}

	/// Looks up an attestation through the account's public capability.
	pub fn borrow_attestation(
		&self, address: &FlowAddress, eth_address: &str,
	) -> Option<AttestationRef<'_>> {
		self.public_registry(address)?.borrow_attestation(eth_address)
	}

	/// Verifies an attestation through the account's public capability.
	pub fn verify(&self, address: &FlowAddress, eth_address: &str) -> bool {
		self.public_registry(address).map(|registry| registry.verify(eth_address)).unwrap_or(false)
	}
}

impl AddressValidation for Ledger {
	fn is_valid_address(&self, address: &str, network: Network) -> bool {
		self.directory.is_valid_address(address, network)
	}

	fn network_of(&self, address: &FlowAddress) -> Option<Network> {
		self.directory.network_of(address)
	}
}
