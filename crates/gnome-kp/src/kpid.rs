// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! 16-byte algorithm/object identifiers.
//!
//! KeePass-family formats tag every cipher and KDF with a 16-byte UUID; a
//! persisted blob records which algorithm produced it by carrying the id
//! alongside. [`Kpid`] is that identifier: immutable, compared by byte
//! sequence.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{KpError, KpResult};

/// A 16-byte algorithm/object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kpid([u8; 16]);

/// The AES-256-CBC cipher id (`31C1F2E6-BF71-4350-BE58-05216AFC5AFF`),
/// fixed by the KeePass 2.x format.
pub const AES256_CBC_ID: Kpid = Kpid([
	0x31, 0xC1, 0xF2, 0xE6, 0xBF, 0x71, 0x43, 0x50, 0xBE, 0x58, 0x05, 0x21, 0x6A, 0xFC, 0x5A, 0xFF,
]);

/// The PBKDF2-HMAC-SHA256 KDF id used by the vault layer.
pub const KDF_PBKDF2_ID: Kpid = Kpid([
	0x7C, 0x02, 0xBB, 0x82, 0x79, 0xA7, 0x4A, 0xC0, 0x92, 0x7D, 0x11, 0x4A, 0x00, 0x64, 0x8D, 0x2E,
]);

impl Kpid {
	/// The all-zero identifier, representing "no algorithm configured".
	pub const EMPTY: Kpid = Kpid([0u8; 16]);

	pub const fn new(bytes: [u8; 16]) -> Self {
		Self(bytes)
	}

	/// Parse from a slice; anything other than exactly 16 bytes is an error.
	pub fn from_slice(bytes: &[u8]) -> KpResult<Self> {
		let bytes: [u8; 16] = bytes.try_into().map_err(|_| KpError::Parse {
			what: "kpid",
			detail: format!("expected 16 bytes, got {}", bytes.len()),
		})?;
		Ok(Self(bytes))
	}

	/// Generate a fresh random identifier.
	///
	/// Practically never produces [`Kpid::EMPTY`] (probability 2^-128).
	pub fn generate() -> Self {
		let mut bytes = [0u8; 16];
		OsRng.fill_bytes(&mut bytes);
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		*self == Self::EMPTY
	}
}

impl fmt::Display for Kpid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// UUID-style grouping: 8-4-4-4-12.
		let h = hex::encode(self.0);
		write!(
			f,
			"{}-{}-{}-{}-{}",
			&h[0..8],
			&h[8..12],
			&h[12..16],
			&h[16..20],
			&h[20..32]
		)
	}
}

impl fmt::Debug for Kpid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Kpid({self})")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies equality by byte sequence.
	#[test]
	fn equality_is_by_bytes() {
		let bytes = [7u8; 16];
		assert_eq!(Kpid::new(bytes), Kpid::new(bytes));
		assert_ne!(Kpid::new(bytes), Kpid::new([8u8; 16]));
	}

	/// Verifies that generated ids are not the empty sentinel and differ
	/// between calls.
	#[test]
	fn generate_is_nonzero_and_unique() {
		let a = Kpid::generate();
		let b = Kpid::generate();

		assert!(!a.is_empty());
		assert!(!b.is_empty());
		assert_ne!(a, b);
	}

	/// Verifies slice parsing rejects wrong lengths.
	#[test]
	fn from_slice_validates_length() {
		assert!(Kpid::from_slice(&[0u8; 16]).is_ok());
		assert!(Kpid::from_slice(&[0u8; 15]).is_err());
		assert!(Kpid::from_slice(&[0u8; 17]).is_err());
	}

	/// Verifies the Display format matches the canonical UUID grouping.
	#[test]
	fn display_is_uuid_formatted() {
		assert_eq!(
			AES256_CBC_ID.to_string(),
			"31c1f2e6-bf71-4350-be58-05216afc5aff"
		);
	}
}
