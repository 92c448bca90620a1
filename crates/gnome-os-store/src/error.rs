// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OS credential store error types.
//!
//! "Absent" is not an error: reads return `Ok(None)` and deletes `Ok(false)`
//! for missing entries, so callers can distinguish not-found from failure
//! cheaply. Everything the native layer reports is translated into this
//! closed taxonomy at the adapter boundary — raw platform errors never
//! escape uninterpreted.

use thiserror::Error;

pub type OsStoreResult<T> = Result<T, OsStoreError>;

/// Errors surfaced by OS credential store adapters.
#[derive(Error, Debug)]
pub enum OsStoreError {
	/// The operation requires an OS capability this platform (or OS version)
	/// does not provide. Raised before any native call is attempted.
	#[error("{op} is not supported on this platform")]
	NotSupported { op: &'static str },

	#[error("credential store authorization failed")]
	AuthFailed,

	#[error("an item with this (service, account) already exists")]
	DuplicateItem,

	#[error("the keychain is invalid or unavailable")]
	InvalidKeychain,

	#[error("keychain interaction is not allowed in this context")]
	InteractionNotAllowed,

	#[error("the user canceled the credential prompt")]
	UserCanceled,

	/// An otherwise-unclassified native failure; the platform error code is
	/// preserved for diagnostics.
	#[error("native {op} call failed with code {code}")]
	Native { op: &'static str, code: i32 },

	#[error("stored secret is not valid UTF-8")]
	NotUtf8,
}
