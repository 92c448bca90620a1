// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key fragments and composite keys.
//!
//! A fragment yields 32 bytes of raw key material via [`read`]; a composite
//! key digests its fragments into the master secret handed to the KDF.
//! Fragments are constructed once from an external source (password, key
//! file, raw bytes) and are read-only afterward; the material is held in a
//! [`ShroudedBytes`] so it stays encrypted while resident in memory.
//!
//! Per KeePass composite-key rules, a password or raw-byte source
//! contributes the SHA-256 of its content, not the content itself.
//!
//! [`read`]: KeyFragment::read

use std::path::Path;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use gnome_secret::ShroudedBytes;

use crate::error::KpResult;
use crate::keyfile;

/// Yields raw key material.
pub trait KeyFragment: Send + Sync {
	/// The fragment's 32 bytes of key material. Transient; do not retain.
	fn read(&self) -> Zeroizing<Vec<u8>>;
}

/// A fragment sourced from a password or raw secret bytes.
pub struct SecretFragment {
	shrouded: ShroudedBytes,
}

impl SecretFragment {
	/// Capture a password. The stored material is SHA-256 of the UTF-8 bytes.
	pub fn from_password(password: &str) -> Self {
		let mut digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
		Self {
			shrouded: ShroudedBytes::new(&mut digest),
		}
	}

	/// Capture raw secret bytes, zeroing the caller's buffer.
	pub fn from_bytes(data: &mut [u8]) -> Self {
		let mut digest: [u8; 32] = Sha256::digest(&*data).into();
		data.zeroize();
		Self {
			shrouded: ShroudedBytes::new(&mut digest),
		}
	}
}

impl KeyFragment for SecretFragment {
	fn read(&self) -> Zeroizing<Vec<u8>> {
		self.shrouded.read()
	}
}

/// A fragment sourced from a key file.
pub struct KeyFileFragment {
	shrouded: ShroudedBytes,
}

impl KeyFileFragment {
	pub fn load(path: impl AsRef<Path>) -> KpResult<Self> {
		let key = keyfile::load_key_file(path)?;
		Ok(Self::from_material(key))
	}

	pub fn from_key_file_bytes(data: &[u8]) -> KpResult<Self> {
		let key = keyfile::parse_key_file(data)?;
		Ok(Self::from_material(key))
	}

	fn from_material(key: Zeroizing<[u8; 32]>) -> Self {
		let mut material = *key;
		Self {
			shrouded: ShroudedBytes::new(&mut material),
		}
	}
}

impl KeyFragment for KeyFileFragment {
	fn read(&self) -> Zeroizing<Vec<u8>> {
		self.shrouded.read()
	}
}

/// An ordered set of fragments digested into one master secret.
#[derive(Default)]
pub struct CompositeKey {
	fragments: Vec<Box<dyn KeyFragment>>,
}

impl CompositeKey {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, fragment: Box<dyn KeyFragment>) {
		self.fragments.push(fragment);
	}

	pub fn is_empty(&self) -> bool {
		self.fragments.is_empty()
	}

	/// SHA-256 over the concatenated fragment material, in push order.
	pub fn master_secret(&self) -> Zeroizing<[u8; 32]> {
		let mut hasher = Sha256::new();
		for fragment in &self.fragments {
			hasher.update(fragment.read().as_slice());
		}
		Zeroizing::new(hasher.finalize().into())
	}
}
