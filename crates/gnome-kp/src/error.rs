// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crypto layer error types.

use thiserror::Error;

pub type KpResult<T> = Result<T, KpError>;

/// Errors that can occur in the KeePass-compatible crypto layer.
#[derive(Error, Debug)]
pub enum KpError {
	/// Cipher or transform construction failed (bad key/IV length,
	/// unsupported parameters) or a decryption did not verify. A cipher
	/// never partially initializes.
	#[error("cryptographic setup failed: {0}")]
	CryptoSetup(String),

	#[error("no stream-cipher engine registered for id {0}")]
	UnknownRngId(u32),

	#[error("unknown key derivation function: {0}")]
	UnknownKdf(String),

	#[error("key derivation parameter missing or invalid: {0}")]
	InvalidKdfParams(String),

	#[error("malformed {what}: {detail}")]
	Parse { what: &'static str, detail: String },

	#[error("IO error: {0}")]
	Io(String),
}

impl From<std::io::Error> for KpError {
	fn from(err: std::io::Error) -> Self {
		KpError::Io(err.to_string())
	}
}
