// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fail-fast store for platforms without an OS credential facility.

use crate::error::{OsStoreError, OsStoreResult};
use crate::OsSecretStore;

/// Every operation fails with [`OsStoreError::NotSupported`] before any
/// native call is attempted. Callers that need durable secrets on these
/// platforms use the encrypted JSON vault in `gnome-vault` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedStore;

impl OsSecretStore for UnsupportedStore {
	fn get_secret_bytes(&self, _service: &str, _account: &str) -> OsStoreResult<Option<Vec<u8>>> {
		Err(OsStoreError::NotSupported { op: "get_secret" })
	}

	fn set_secret(&self, _service: &str, _account: &str, _value: &[u8]) -> OsStoreResult<()> {
		Err(OsStoreError::NotSupported { op: "set_secret" })
	}

	fn delete_secret(&self, _service: &str, _account: &str) -> OsStoreResult<bool> {
		Err(OsStoreError::NotSupported { op: "delete_secret" })
	}
}
