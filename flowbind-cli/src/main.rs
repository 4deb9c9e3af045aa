//! # Flow Bind CLI
//!
//! This crate provides a CLI interface to use the `flowbind` library.

#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

mod cli;
mod fs;

use clap::Parser;
use cli::*;
use dotenv::dotenv;
use env_logger::{init_from_env, Env};
use flowbind::{error::FlowBindError, ProtocolConfig};
use fs::load_config;
use log::info;

fn main() -> Result<(), FlowBindError> {
	dotenv().ok();
	init_from_env(Env::default().filter_or("LOG_LEVEL", "info"));
	let config: ProtocolConfig = load_config()?;

	match Cli::parse().mode {
		Mode::Account => handle_account(config)?,
		Mode::Attest(attest_data) => handle_attest(config, attest_data)?,
		Mode::Derive(derive_data) => handle_derive(derive_data)?,
		Mode::Export(account_data) => handle_export(config, account_data)?,
		Mode::Setup(account_data) => handle_setup(config, account_data)?,
		Mode::Show => info!("Protocol config:\n{:#?}", config),
		Mode::ShowAttestation(lookup_data) => handle_show_attestation(config, lookup_data)?,
		Mode::Sign(account_data) => handle_sign(account_data)?,
		Mode::Update(update_data) => handle_update(config, update_data)?,
		Mode::Verify(lookup_data) => handle_verify(config, lookup_data)?,
	};

	Ok(())
}
