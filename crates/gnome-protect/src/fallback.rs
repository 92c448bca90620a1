// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Non-Windows protection fallback.
//!
//! Envelope layout: `nonce(12) || ciphertext || hmac-sha256(32)`, keyed by a
//! 32-byte key generated once per process. The tag covers nonce and
//! ciphertext so bit flips and truncation are detected before decryption.
//!
//! The process key is never persisted: blobs from this module do not survive
//! a process restart. Persistent protection must use the derived-key cipher
//! path instead.

use std::sync::OnceLock;

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{ProtectError, ProtectResult};
use crate::ProtectionScope;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 32;

static PROCESS_KEY: OnceLock<[u8; 32]> = OnceLock::new();

fn process_key() -> &'static [u8; 32] {
	PROCESS_KEY.get_or_init(|| {
		let mut key = [0u8; 32];
		OsRng.fill_bytes(&mut key);
		key
	})
}

/// Mix optional caller entropy into the process key.
fn working_key(entropy: Option<&[u8]>) -> Zeroizing<[u8; 32]> {
	let mut hasher = Sha256::new();
	hasher.update(process_key());
	if let Some(entropy) = entropy {
		hasher.update(entropy);
	}
	Zeroizing::new(hasher.finalize().into())
}

pub fn protect(
	data: &[u8],
	entropy: Option<&[u8]>,
	_scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	let key = working_key(entropy);

	let mut nonce = [0u8; NONCE_LEN];
	OsRng.fill_bytes(&mut nonce);

	let mut blob = Vec::with_capacity(NONCE_LEN + data.len() + TAG_LEN);
	blob.extend_from_slice(&nonce);
	blob.extend_from_slice(data);

	let mut cipher = ChaCha20::new(key.as_ref().into(), (&nonce).into());
	cipher.apply_keystream(&mut blob[NONCE_LEN..]);

	// Mac construction from a fixed-length key cannot fail.
	let mut mac = HmacSha256::new_from_slice(key.as_ref())
		.map_err(|_| ProtectError::InvalidEnvelope)?;
	mac.update(&blob);
	blob.extend_from_slice(&mac.finalize().into_bytes());

	Ok(blob)
}

pub fn unprotect(
	protected: &[u8],
	entropy: Option<&[u8]>,
	_scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	if protected.len() < NONCE_LEN + TAG_LEN {
		return Err(ProtectError::InvalidEnvelope);
	}

	let key = working_key(entropy);
	let (body, tag) = protected.split_at(protected.len() - TAG_LEN);

	let mut mac = HmacSha256::new_from_slice(key.as_ref())
		.map_err(|_| ProtectError::InvalidEnvelope)?;
	mac.update(body);
	mac.verify_slice(tag).map_err(|_| ProtectError::Tampered)?;

	let (nonce, ciphertext) = body.split_at(NONCE_LEN);
	let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| ProtectError::InvalidEnvelope)?;

	let mut plaintext = ciphertext.to_vec();
	let mut cipher = ChaCha20::new(key.as_ref().into(), (&nonce).into());
	cipher.apply_keystream(&mut plaintext);

	Ok(plaintext)
}
