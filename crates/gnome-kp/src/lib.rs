// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! KeePass-compatible cryptographic primitives.
//!
//! The building blocks the secret vaults are made of:
//!
//! - [`Kpid`]: 16-byte algorithm/object identifiers.
//! - [`KpMap`] / [`DerivedKeyParams`]: typed parameter maps in the
//!   VariantDictionary wire format, carrying the KDF identity and its
//!   parameters; [`derive_key`] turns a user secret into a 256-bit working
//!   key.
//! - [`KpRng`] engines ([`Salsa20Rng`], [`ChaCha20Rng`]): deterministic
//!   stream-cipher byte generators behind a fixed id registry
//!   ([`create_rng`]).
//! - [`KpCipher`] / [`Aes256CbcCipher`]: payload encryption, CBC+PKCS7 for
//!   compatibility with the reference vault format.
//! - Key files ([`load_key_file`]) and key fragments ([`KeyFragment`],
//!   [`CompositeKey`]) that turn external secrets into master-key material.

pub mod cipher;
pub mod error;
pub mod fragment;
pub mod keyfile;
pub mod kpid;
pub mod map;
pub mod rng;

pub use cipher::{Aes256CbcCipher, KpCipher};
pub use error::{KpError, KpResult};
pub use fragment::{CompositeKey, KeyFileFragment, KeyFragment, SecretFragment};
pub use keyfile::{load_key_file, parse_key_file};
pub use kpid::{Kpid, AES256_CBC_ID, KDF_PBKDF2_ID};
pub use map::{derive_key, DerivedKeyParams, KpMap, KpValue, DEFAULT_PBKDF2_ROUNDS};
pub use rng::{create_rng, ChaCha20Rng, KpRng, KpRngId, Salsa20Rng};
