// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shrouded byte buffers.
//!
//! A [`ShroudedBytes`] owns a copy of sensitive data that is kept encrypted
//! with a process-local ChaCha20 key for as long as it is resident in memory.
//! The plaintext only exists for the duration of a [`read`] call; callers get
//! a [`Zeroizing`] buffer and must not retain it past first use.
//!
//! The shroud key is generated once per process and never persisted, so a
//! shrouded value is meaningless outside the process that created it. This is
//! an obfuscation layer against accidental exposure (core dumps, swapped
//! pages), not durable encryption — durable protection goes through the
//! derived-key cipher path in `gnome-kp`.
//!
//! [`read`]: ShroudedBytes::read

use std::fmt;
use std::sync::OnceLock;

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

const NONCE_LEN: usize = 12;

static SHROUD_KEY: OnceLock<[u8; 32]> = OnceLock::new();

/// The process-local shroud key, generated lazily on first use.
fn shroud_key() -> &'static [u8; 32] {
	SHROUD_KEY.get_or_init(|| {
		let mut key = [0u8; 32];
		OsRng.fill_bytes(&mut key);
		key
	})
}

/// A secret byte buffer that stays encrypted while resident in memory.
///
/// Construction takes a mutable slice so the caller's copy can be zeroed
/// immediately after the shrouded copy is made. The internal representation
/// never equals the plaintext for non-empty input.
///
/// # Example
///
/// ```
/// use gnome_secret::ShroudedBytes;
///
/// let mut password = *b"hunter2";
/// let shrouded = ShroudedBytes::new(&mut password);
///
/// // The caller's buffer has been wiped.
/// assert_eq!(password, [0u8; 7]);
///
/// // Plaintext is re-derived on every read.
/// assert_eq!(shrouded.read().as_slice(), b"hunter2");
/// ```
pub struct ShroudedBytes {
	nonce: [u8; NONCE_LEN],
	protected: Vec<u8>,
}

impl ShroudedBytes {
	/// Shroud a copy of `data` and zero the caller's buffer.
	///
	/// Empty input yields the same value as [`ShroudedBytes::empty`], not an
	/// error.
	pub fn new(data: &mut [u8]) -> Self {
		if data.is_empty() {
			return Self::empty();
		}

		let mut nonce = [0u8; NONCE_LEN];
		OsRng.fill_bytes(&mut nonce);

		let mut protected = data.to_vec();
		let mut cipher = ChaCha20::new(shroud_key().into(), (&nonce).into());
		cipher.apply_keystream(&mut protected);

		data.zeroize();

		Self { nonce, protected }
	}

	/// Shroud an owned buffer, zeroing it in place.
	pub fn from_vec(mut data: Vec<u8>) -> Self {
		let shrouded = Self::new(&mut data);
		data.zeroize();
		shrouded
	}

	/// The distinguished zero-length shrouded value.
	pub fn empty() -> Self {
		Self {
			nonce: [0u8; NONCE_LEN],
			protected: Vec::new(),
		}
	}

	/// Decrypt and return the plaintext.
	///
	/// Each call re-derives the plaintext from the protected form; nothing is
	/// cached. The returned buffer is zeroized when dropped — treat it as
	/// transient and do not retain it.
	pub fn read(&self) -> Zeroizing<Vec<u8>> {
		let mut plaintext = Zeroizing::new(self.protected.clone());
		if !plaintext.is_empty() {
			let mut cipher = ChaCha20::new(shroud_key().into(), (&self.nonce).into());
			cipher.apply_keystream(&mut plaintext);
		}
		plaintext
	}

	/// Length of the shrouded data in bytes.
	pub fn len(&self) -> usize {
		self.protected.len()
	}

	/// Whether this is the empty value.
	pub fn is_empty(&self) -> bool {
		self.protected.is_empty()
	}

	/// The protected (encrypted) form, for tests and diagnostics.
	///
	/// Never equals the plaintext for non-empty input.
	pub fn protected_bytes(&self) -> &[u8] {
		&self.protected
	}
}

impl Clone for ShroudedBytes {
	fn clone(&self) -> Self {
		Self {
			nonce: self.nonce,
			protected: self.protected.clone(),
		}
	}
}

impl Default for ShroudedBytes {
	fn default() -> Self {
		Self::empty()
	}
}

impl Drop for ShroudedBytes {
	fn drop(&mut self) {
		self.protected.zeroize();
	}
}

impl fmt::Debug for ShroudedBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ShroudedBytes")
			.field("len", &self.protected.len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	/// Verifies that the protected form never equals the plaintext.
	/// This is the core confidentiality property of the shroud.
	#[test]
	fn protected_form_differs_from_plaintext() {
		let mut data = *b"a moderately long secret value";
		let original = data.to_vec();
		let shrouded = ShroudedBytes::new(&mut data);

		assert_ne!(shrouded.protected_bytes(), original.as_slice());
	}

	/// Verifies that read() reproduces the original bytes exactly.
	#[test]
	fn read_roundtrips() {
		let mut data = *b"s3cr3t";
		let shrouded = ShroudedBytes::new(&mut data);

		assert_eq!(shrouded.read().as_slice(), b"s3cr3t");
		// A second read must yield the same plaintext (no state consumed).
		assert_eq!(shrouded.read().as_slice(), b"s3cr3t");
	}

	/// Verifies that the caller's input buffer is wiped by construction.
	#[test]
	fn input_buffer_is_zeroed() {
		let mut data = *b"wipe me";
		let _shrouded = ShroudedBytes::new(&mut data);

		assert_eq!(data, [0u8; 7]);
	}

	/// Verifies that empty input degrades to the empty value, not an error.
	#[test]
	fn empty_input_yields_empty_value() {
		let mut data: [u8; 0] = [];
		let shrouded = ShroudedBytes::new(&mut data);

		assert!(shrouded.is_empty());
		assert_eq!(shrouded.len(), 0);
		assert!(shrouded.read().is_empty());
	}

	/// Verifies that two shrouds of the same plaintext use distinct nonces,
	/// so identical secrets do not produce identical protected forms.
	#[test]
	fn identical_plaintexts_shroud_differently() {
		let mut a = *b"same secret";
		let mut b = *b"same secret";
		let sa = ShroudedBytes::new(&mut a);
		let sb = ShroudedBytes::new(&mut b);

		assert_ne!(sa.protected_bytes(), sb.protected_bytes());
		assert_eq!(sa.read().as_slice(), sb.read().as_slice());
	}

	/// Verifies that clones read back the same plaintext.
	#[test]
	fn clone_preserves_plaintext() {
		let mut data = *b"cloneable";
		let shrouded = ShroudedBytes::new(&mut data);
		let cloned = shrouded.clone();

		assert_eq!(shrouded.read().as_slice(), cloned.read().as_slice());
	}

	/// Verifies that Debug output never contains the plaintext.
	#[test]
	fn debug_is_redacted() {
		let mut data = *b"top-secret-debug";
		let shrouded = ShroudedBytes::new(&mut data);
		let debug = format!("{shrouded:?}");

		assert!(!debug.contains("top-secret-debug"));
	}

	proptest! {
		/// Roundtrip for arbitrary non-empty input.
		#[test]
		fn shroud_roundtrips(data in proptest::collection::vec(any::<u8>(), 1..512)) {
			let mut buf = data.clone();
			let shrouded = ShroudedBytes::new(&mut buf);

			let read = shrouded.read();
			prop_assert_eq!(read.as_slice(), data.as_slice());
		}

		/// Confidentiality for inputs long enough that a keystream collision
		/// is cryptographically impossible (short inputs could collide with
		/// small probability on individual bytes).
		#[test]
		fn shroud_hides_plaintext(data in proptest::collection::vec(any::<u8>(), 16..512)) {
			let mut buf = data.clone();
			let shrouded = ShroudedBytes::new(&mut buf);

			prop_assert_ne!(shrouded.protected_bytes(), data.as_slice());
		}

		/// from_vec behaves like new() for arbitrary input.
		#[test]
		fn from_vec_matches_new(data in proptest::collection::vec(any::<u8>(), 0..256)) {
			let shrouded = ShroudedBytes::from_vec(data.clone());

			let read = shrouded.read();
			prop_assert_eq!(read.as_slice(), data.as_slice());
		}
	}
}
