// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vault error types.

use gnome_kp::KpError;
use gnome_os_store::OsStoreError;

/// Errors that can occur during vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serde(#[from] serde_json::Error),

	#[error("crypto error: {0}")]
	Crypto(#[from] KpError),

	#[error("OS secret store error: {0}")]
	Store(#[from] OsStoreError),

	/// The vault lock-file was held by another writer for the whole retry
	/// window.
	#[error("vault file locked by a concurrent writer: {0}")]
	LockContention(String),

	#[error("invalid vault document: {0}")]
	InvalidDocument(String),

	/// The operation is not available on this vault backend.
	#[error("operation not supported by this vault: {0}")]
	NotSupported(&'static str),

	#[error("background task failed: {0}")]
	Task(String),
}

/// Convenience alias for vault results.
pub type VaultResult<T> = Result<T, VaultError>;
