//! # Storage Module.
//!
//! File-backed persistence for ledger snapshots and attestation exports.

use crate::{attestation::AttestationRef, error::FlowBindError};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{from_reader, to_string};
use std::{
	fs::File,
	io::{BufReader, Write},
	marker::PhantomData,
	path::PathBuf,
};

/// Something that can load and save a `T`.
pub trait Storage<T> {
	/// The error type.
	type Err;

	/// Loads data from storage.
	fn load(&self) -> Result<T, Self::Err>;
	/// Saves data to storage.
	fn save(&mut self, data: T) -> Result<(), Self::Err>;
}

/// Stores a list of records as CSV, one row per record.
///
/// # Examples
///
/// ```no_run
/// use flowbind::storage::{CSVFileStorage, Storage};
/// use serde::{Deserialize, Serialize};
/// use std::path::PathBuf;
///
/// #[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
/// struct Row {
///    flow_address: String,
///    count: u64,
/// }
///
/// let mut storage = CSVFileStorage::<Row>::new(PathBuf::from("/tmp/rows.csv"));
/// let rows = vec![Row { flow_address: "0x0000000000000001".into(), count: 2 }];
///
/// storage.save(rows.clone()).unwrap();
/// assert_eq!(storage.load().unwrap(), rows);
/// ```
pub struct CSVFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> CSVFileStorage<T> {
	/// Creates a new CSVFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned> Storage<Vec<T>> for CSVFileStorage<T> {
	type Err = FlowBindError;

	fn load(&self) -> Result<Vec<T>, FlowBindError> {
		let file = File::open(&self.filepath).map_err(FlowBindError::IOError)?;
		let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));

		reader
			.deserialize()
			.map(|result| result.map_err(|e| FlowBindError::FileIOError(e.to_string())))
			.collect()
	}

	fn save(&mut self, data: Vec<T>) -> Result<(), FlowBindError> {
		let mut writer = WriterBuilder::new()
			.from_path(&self.filepath)
			.map_err(|e| FlowBindError::FileIOError(e.to_string()))?;

		for record in &data {
			writer.serialize(record).map_err(|e| FlowBindError::FileIOError(e.to_string()))?;
		}
		writer.flush().map_err(FlowBindError::IOError)
	}
}

/// Stores a single value as JSON.
pub struct JSONFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> JSONFileStorage<T> {
	/// Creates a new JSONFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}

	/// Returns true if the backing file exists.
	pub fn exists(&self) -> bool {
		self.filepath.is_file()
	}
}

impl<T: Serialize + DeserializeOwned> Storage<T> for JSONFileStorage<T> {
	type Err = FlowBindError;

	fn load(&self) -> Result<T, Self::Err> {
		let file = File::open(&self.filepath).map_err(FlowBindError::IOError)?;
		from_reader(BufReader::new(file)).map_err(|e| FlowBindError::ParsingError(e.to_string()))
	}

	fn save(&mut self, data: T) -> Result<(), Self::Err> {
		let json_str = to_string(&data).map_err(|e| FlowBindError::ParsingError(e.to_string()))?;

		let mut file = File::create(&self.filepath).map_err(FlowBindError::IOError)?;
		file.write_all(json_str.as_bytes()).map_err(FlowBindError::IOError)
	}
}

/// Flat, exportable view of one stored attestation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
	/// Ethereum address the attestation is keyed by.
	eth_address: String,
	/// Flow account named in the message.
	flow_address: String,
	/// Hex-encoded public key.
	public_key: String,
	/// Hex-encoded signature.
	signature: String,
	/// Whether the attestation verified against its holder when exported.
	valid: bool,
}

impl AttestationRecord {
	/// Ethereum address.
	pub fn eth_address(&self) -> &str {
		&self.eth_address
	}

	/// Flow address.
	pub fn flow_address(&self) -> &str {
		&self.flow_address
	}

	/// Hex-encoded public key.
	pub fn public_key(&self) -> &str {
		&self.public_key
	}

	/// Hex-encoded signature.
	pub fn signature(&self) -> &str {
		&self.signature
	}

	/// Verification outcome at export time.
	pub fn valid(&self) -> bool {
		self.valid
	}
}

impl<'a> From<AttestationRef<'a>> for AttestationRecord {
	fn from(attestation: AttestationRef<'a>) -> Self {
		Self {
			eth_address: attestation.eth_address().to_string(),
			flow_address: attestation.message().flow_address().to_string(),
			public_key: attestation.public_key().to_string(),
			signature: attestation.signature().to_string(),
			valid: attestation.verify(),
		}
	}
}
