//! # Filesystem Actions Module.
//!
//! This module provides functionalities for filesystem actions.

use dotenv::{dotenv, var};
use flowbind::{
	error::FlowBindError,
	ledger::{Ledger, LedgerSnapshot},
	storage::{JSONFileStorage, Storage},
	ProtocolConfig,
};
use log::{debug, warn};
use std::{env::current_dir, path::PathBuf};

/// Anvil development key #0, used when no key is configured.
const DEFAULT_PRIVATE_KEY: &str =
	"ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Protocol configuration file name.
pub const CONFIG_FILENAME: &str = "config";
/// Ledger state file name.
pub const LEDGER_FILENAME: &str = "ledger";
/// Attestation export file name.
pub const ATTESTATIONS_FILENAME: &str = "attestations";

/// Enum representing the possible file extensions.
pub enum FileType {
	/// CSV file.
	Csv,
	/// JSON file.
	Json,
}

impl FileType {
	/// Converts the enum variant into its corresponding file extension.
	fn as_str(&self) -> &'static str {
		match self {
			FileType::Csv => "csv",
			FileType::Json => "json",
		}
	}
}

/// Loads the signing key from the environment file.
pub fn load_private_key() -> String {
	dotenv().ok();
	var("PRIVATE_KEY").unwrap_or_else(|_| {
		warn!("PRIVATE_KEY environment variable is not set. Using default.");
		DEFAULT_PRIVATE_KEY.to_string()
	})
}

/// Retrieves the path to the `assets` directory.
pub fn get_assets_path() -> Result<PathBuf, FlowBindError> {
	current_dir().map_err(FlowBindError::IOError).map(|current_dir| {
		// Tests run from the crate directory.
		#[cfg(test)]
		{
			current_dir.join("assets")
		}

		#[cfg(not(test))]
		{
			current_dir.join("flowbind-cli/assets")
		}
	})
}

/// Helper function to get the path of a file in the `assets` directory.
pub fn get_file_path(file_name: &str, file_type: FileType) -> Result<PathBuf, FlowBindError> {
	let assets_path = get_assets_path()?;
	Ok(assets_path.join(format!("{}.{}", file_name, file_type.as_str())))
}

/// Loads and validates the configuration file, falling back to defaults if
/// there is none.
pub fn load_config() -> Result<ProtocolConfig, FlowBindError> {
	let storage = JSONFileStorage::<ProtocolConfig>::new(get_file_path(
		CONFIG_FILENAME,
		FileType::Json,
	)?);

	let config = if storage.exists() {
		storage.load()?
	} else {
		warn!("No config at \"{}\". Using defaults.", storage.filepath().display());
		ProtocolConfig::default()
	};
	config.validate()?;

	Ok(config)
}

/// Saves the configuration file.
pub fn save_config(config: &ProtocolConfig) -> Result<(), FlowBindError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<ProtocolConfig>::new(filepath).save(config.clone())
}

/// Path of the ledger state, overridable through `LEDGER_PATH`.
pub fn get_ledger_path() -> Result<PathBuf, FlowBindError> {
	dotenv().ok();
	match var("LEDGER_PATH") {
		Ok(path) => Ok(PathBuf::from(path)),
		Err(_) => get_file_path(LEDGER_FILENAME, FileType::Json),
	}
}

/// Loads the ledger, or starts an empty one if none was saved yet.
pub fn load_ledger(config: ProtocolConfig) -> Result<Ledger, FlowBindError> {
	let storage = JSONFileStorage::<LedgerSnapshot>::new(get_ledger_path()?);

	if storage.exists() {
		debug!("Loading ledger from \"{}\"", storage.filepath().display());
		Ledger::restore(config, storage.load()?)
	} else {
		debug!("No ledger at \"{}\". Starting empty.", storage.filepath().display());
		Ledger::new(config)
	}
}

/// Saves the ledger state.
pub fn save_ledger(ledger: &Ledger) -> Result<(), FlowBindError> {
	let mut storage = JSONFileStorage::<LedgerSnapshot>::new(get_ledger_path()?);
	storage.save(ledger.snapshot())?;
	debug!("Ledger saved at \"{}\"", storage.filepath().display());

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::fs::*;

	#[test]
	fn test_file_paths() {
		let path = get_file_path(ATTESTATIONS_FILENAME, FileType::Csv).unwrap();
		assert!(path.ends_with("assets/attestations.csv"));

		let path = get_file_path(CONFIG_FILENAME, FileType::Json).unwrap();
		assert!(path.ends_with("assets/config.json"));
	}

	#[test]
	fn test_bundled_config_is_valid() {
		let config = load_config().unwrap();
		assert_eq!(config, ProtocolConfig::default());
	}
}
