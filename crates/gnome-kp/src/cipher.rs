// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload ciphers.
//!
//! A [`KpCipher`] pairs a fixed 16-byte algorithm id with encrypt/decrypt
//! over a derived key and IV. The AES-256-CBC implementation uses CBC mode
//! with PKCS7 padding because the reference vault format mandates it; this is
//! a compatibility constraint for round-tripping existing encrypted vaults,
//! not a security recommendation (see DESIGN.md for the AEAD discussion).

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use crate::error::{KpError, KpResult};
use crate::kpid::{Kpid, AES256_CBC_ID};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// A payload cipher identified by a fixed algorithm id.
///
/// Key and IV buffers passed in are copied into local zeroizing storage; the
/// caller's originals remain the caller's responsibility.
pub trait KpCipher: Send + Sync {
	/// The algorithm id recorded alongside encrypted payloads.
	fn id(&self) -> Kpid;

	/// Encrypt `plaintext` with a 256-bit key and 128-bit IV.
	fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> KpResult<Vec<u8>>;

	/// Decrypt `ciphertext` with the same key and IV used to encrypt.
	///
	/// Failures (wrong key, tampered data, bad padding) always surface as an
	/// error; corrupted plaintext is never returned silently.
	fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> KpResult<Vec<u8>>;
}

/// AES-256 in CBC mode with PKCS7 padding (KeePass cipher
/// `31C1F2E6-BF71-4350-BE58-05216AFC5AFF`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256CbcCipher;

fn check_lengths(key: &[u8], iv: &[u8]) -> KpResult<(Zeroizing<[u8; KEY_LEN]>, [u8; IV_LEN])> {
	let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
		KpError::CryptoSetup(format!("AES-256 requires a {KEY_LEN}-byte key, got {}", key.len()))
	})?;
	let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
		KpError::CryptoSetup(format!("CBC requires a {IV_LEN}-byte IV, got {}", iv.len()))
	})?;
	Ok((Zeroizing::new(key), iv))
}

impl KpCipher for Aes256CbcCipher {
	fn id(&self) -> Kpid {
		AES256_CBC_ID
	}

	fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> KpResult<Vec<u8>> {
		let (key, iv) = check_lengths(key, iv)?;
		let cipher = Aes256CbcEnc::new(key.as_ref().into(), (&iv).into());
		Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
	}

	fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> KpResult<Vec<u8>> {
		let (key, iv) = check_lengths(key, iv)?;
		let cipher = Aes256CbcDec::new(key.as_ref().into(), (&iv).into());
		cipher
			.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
			.map_err(|_| KpError::CryptoSetup("decryption failed: invalid padding".to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const KEY: [u8; 32] = [0x11; 32];
	const IV: [u8; 16] = [0x22; 16];

	/// Verifies the encrypt/decrypt round-trip.
	#[test]
	fn roundtrip() {
		let cipher = Aes256CbcCipher;
		let ct = cipher.encrypt(&KEY, &IV, b"payload").unwrap();

		assert_ne!(ct.as_slice(), b"payload".as_slice());
		assert_eq!(cipher.decrypt(&KEY, &IV, &ct).unwrap(), b"payload");
	}

	/// Verifies the cipher reports the KeePass AES id.
	#[test]
	fn id_is_the_keepass_aes_uuid() {
		assert_eq!(Aes256CbcCipher.id(), AES256_CBC_ID);
	}

	/// Verifies that bad key/IV lengths fail at setup, before any transform.
	#[test]
	fn wrong_lengths_fail_setup() {
		let cipher = Aes256CbcCipher;

		assert!(cipher.encrypt(&[0u8; 16], &IV, b"x").is_err());
		assert!(cipher.encrypt(&KEY, &[0u8; 12], b"x").is_err());
		assert!(cipher.decrypt(&[0u8; 31], &IV, &[0u8; 16]).is_err());
	}

	/// Verifies that decrypting with the wrong key never silently returns
	/// the original plaintext.
	#[test]
	fn wrong_key_never_yields_plaintext() {
		let cipher = Aes256CbcCipher;
		let ct = cipher.encrypt(&KEY, &IV, b"the original payload").unwrap();

		match cipher.decrypt(&[0x99; 32], &IV, &ct) {
			Ok(garbage) => assert_ne!(garbage.as_slice(), b"the original payload".as_slice()),
			Err(_) => {}
		}
	}

	/// Verifies PKCS7 block expansion: ciphertext is always a multiple of 16
	/// and strictly longer than the plaintext.
	#[test]
	fn pkcs7_pads_to_block_size() {
		let cipher = Aes256CbcCipher;

		for len in [0usize, 1, 15, 16, 17, 31, 32] {
			let ct = cipher.encrypt(&KEY, &IV, &vec![0xAB; len]).unwrap();
			assert_eq!(ct.len() % 16, 0);
			assert!(ct.len() > len);
		}
	}

	proptest! {
		/// Round-trip for arbitrary payloads, keys and IVs.
		#[test]
		fn roundtrip_arbitrary(
			key in proptest::collection::vec(any::<u8>(), 32),
			iv in proptest::collection::vec(any::<u8>(), 16),
			payload in proptest::collection::vec(any::<u8>(), 0..4096),
		) {
			let cipher = Aes256CbcCipher;
			let ct = cipher.encrypt(&key, &iv, &payload).unwrap();
			prop_assert_eq!(cipher.decrypt(&key, &iv, &ct).unwrap(), payload);
		}
	}
}
