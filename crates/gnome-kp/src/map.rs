// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed parameter maps and KDF parameter sets.
//!
//! [`KpMap`] is the string-keyed typed map the KeePass 2.x format calls a
//! VariantDictionary; its binary layout (version `0x0100`) must round-trip
//! byte-compatibly so existing vault headers keep working:
//!
//! ```text
//! u16 LE version
//! repeated: type u8 | name-len u32 LE | name utf8 | value-len u32 LE | value
//! 0x00 terminator
//! ```
//!
//! [`DerivedKeyParams`] is a `KpMap` carrying the mandatory `$UUID` entry that
//! identifies the KDF algorithm, plus that algorithm's parameters.

use std::collections::BTreeMap;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{KpError, KpResult};
use crate::kpid::{Kpid, KDF_PBKDF2_ID};

const VD_VERSION: u16 = 0x0100;
const VD_VERSION_MASK: u16 = 0xFF00;

const TYPE_END: u8 = 0x00;
const TYPE_U32: u8 = 0x04;
const TYPE_U64: u8 = 0x05;
const TYPE_BOOL: u8 = 0x08;
const TYPE_I32: u8 = 0x0C;
const TYPE_I64: u8 = 0x0D;
const TYPE_STR: u8 = 0x18;
const TYPE_BYTES: u8 = 0x42;

/// A typed value in a [`KpMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KpValue {
	Bool(bool),
	U32(u32),
	U64(u64),
	I32(i32),
	I64(i64),
	Str(String),
	Bytes(Vec<u8>),
}

impl KpValue {
	fn type_tag(&self) -> u8 {
		match self {
			KpValue::Bool(_) => TYPE_BOOL,
			KpValue::U32(_) => TYPE_U32,
			KpValue::U64(_) => TYPE_U64,
			KpValue::I32(_) => TYPE_I32,
			KpValue::I64(_) => TYPE_I64,
			KpValue::Str(_) => TYPE_STR,
			KpValue::Bytes(_) => TYPE_BYTES,
		}
	}

	fn encode(&self) -> Vec<u8> {
		match self {
			KpValue::Bool(v) => vec![u8::from(*v)],
			KpValue::U32(v) => v.to_le_bytes().to_vec(),
			KpValue::U64(v) => v.to_le_bytes().to_vec(),
			KpValue::I32(v) => v.to_le_bytes().to_vec(),
			KpValue::I64(v) => v.to_le_bytes().to_vec(),
			KpValue::Str(v) => v.as_bytes().to_vec(),
			KpValue::Bytes(v) => v.clone(),
		}
	}

	fn decode(tag: u8, raw: &[u8]) -> KpResult<Self> {
		let fixed = |expected: usize| {
			if raw.len() == expected {
				Ok(())
			} else {
				Err(KpError::Parse {
					what: "variant dictionary",
					detail: format!(
						"value of type {tag:#04x} has length {}, expected {expected}",
						raw.len()
					),
				})
			}
		};

		match tag {
			TYPE_BOOL => {
				fixed(1)?;
				Ok(KpValue::Bool(raw[0] != 0))
			}
			TYPE_U32 => {
				fixed(4)?;
				Ok(KpValue::U32(u32::from_le_bytes(raw.try_into().unwrap())))
			}
			TYPE_U64 => {
				fixed(8)?;
				Ok(KpValue::U64(u64::from_le_bytes(raw.try_into().unwrap())))
			}
			TYPE_I32 => {
				fixed(4)?;
				Ok(KpValue::I32(i32::from_le_bytes(raw.try_into().unwrap())))
			}
			TYPE_I64 => {
				fixed(8)?;
				Ok(KpValue::I64(i64::from_le_bytes(raw.try_into().unwrap())))
			}
			TYPE_STR => {
				let s = String::from_utf8(raw.to_vec()).map_err(|e| KpError::Parse {
					what: "variant dictionary",
					detail: format!("string value is not UTF-8: {e}"),
				})?;
				Ok(KpValue::Str(s))
			}
			TYPE_BYTES => Ok(KpValue::Bytes(raw.to_vec())),
			other => Err(KpError::Parse {
				what: "variant dictionary",
				detail: format!("unknown value type {other:#04x}"),
			}),
		}
	}
}

/// An ordered, string-keyed map of typed values with a byte-compatible
/// binary serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KpMap {
	entries: BTreeMap<String, KpValue>,
}

impl KpMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, name: impl Into<String>, value: KpValue) {
		self.entries.insert(name.into(), value);
	}

	pub fn get(&self, name: &str) -> Option<&KpValue> {
		self.entries.get(name)
	}

	pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
		match self.entries.get(name) {
			Some(KpValue::Bytes(b)) => Some(b),
			_ => None,
		}
	}

	pub fn get_u64(&self, name: &str) -> Option<u64> {
		match self.entries.get(name) {
			Some(KpValue::U64(v)) => Some(*v),
			_ => None,
		}
	}

	pub fn remove(&mut self, name: &str) -> Option<KpValue> {
		self.entries.remove(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &KpValue)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Serialize to the VariantDictionary wire format.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.extend_from_slice(&VD_VERSION.to_le_bytes());

		for (name, value) in &self.entries {
			let encoded = value.encode();
			out.push(value.type_tag());
			out.extend_from_slice(&(name.len() as u32).to_le_bytes());
			out.extend_from_slice(name.as_bytes());
			out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
			out.extend_from_slice(&encoded);
		}

		out.push(TYPE_END);
		out
	}

	/// Parse the VariantDictionary wire format.
	pub fn from_bytes(data: &[u8]) -> KpResult<Self> {
		let mut cursor = Cursor::new(data);

		let version = u16::from_le_bytes(cursor.take_array::<2>()?);
		if version & VD_VERSION_MASK != VD_VERSION & VD_VERSION_MASK {
			return Err(KpError::Parse {
				what: "variant dictionary",
				detail: format!("unsupported version {version:#06x}"),
			});
		}

		let mut map = Self::new();
		loop {
			let tag = cursor.take_array::<1>()?[0];
			if tag == TYPE_END {
				break;
			}

			let name_len = u32::from_le_bytes(cursor.take_array::<4>()?) as usize;
			let name = String::from_utf8(cursor.take(name_len)?.to_vec()).map_err(|e| {
				KpError::Parse {
					what: "variant dictionary",
					detail: format!("entry name is not UTF-8: {e}"),
				}
			})?;

			let value_len = u32::from_le_bytes(cursor.take_array::<4>()?) as usize;
			let value = KpValue::decode(tag, cursor.take(value_len)?)?;

			map.set(name, value);
		}

		Ok(map)
	}
}

struct Cursor<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	fn take(&mut self, len: usize) -> KpResult<&'a [u8]> {
		let end = self.pos.checked_add(len).filter(|&e| e <= self.data.len());
		match end {
			Some(end) => {
				let slice = &self.data[self.pos..end];
				self.pos = end;
				Ok(slice)
			}
			None => Err(KpError::Parse {
				what: "variant dictionary",
				detail: "truncated input".to_string(),
			}),
		}
	}

	fn take_array<const N: usize>(&mut self) -> KpResult<[u8; N]> {
		Ok(self.take(N)?.try_into().expect("length checked"))
	}
}

/// Name of the mandatory KDF-identity entry.
pub const UUID_PARAM: &str = "$UUID";
/// Salt parameter for the PBKDF2 KDF.
pub const SALT_PARAM: &str = "S";
/// Round-count parameter for the PBKDF2 KDF.
pub const ROUNDS_PARAM: &str = "R";

/// Default PBKDF2 round count for newly created vaults.
pub const DEFAULT_PBKDF2_ROUNDS: u64 = 600_000;

/// KDF identity plus parameters, persisted alongside an encrypted store.
///
/// Invariant: `uuid()` is non-empty unless the instance represents "no KDF
/// configured" (a default-constructed value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedKeyParams {
	map: KpMap,
}

impl DerivedKeyParams {
	/// Parameters for a given KDF algorithm, with no algorithm parameters set.
	pub fn new(kdf: Kpid) -> Self {
		let mut map = KpMap::new();
		map.set(UUID_PARAM, KpValue::Bytes(kdf.as_bytes().to_vec()));
		Self { map }
	}

	/// PBKDF2-HMAC-SHA256 parameters with the given salt and round count.
	pub fn pbkdf2(salt: &[u8], rounds: u64) -> Self {
		let mut params = Self::new(KDF_PBKDF2_ID);
		params.map.set(SALT_PARAM, KpValue::Bytes(salt.to_vec()));
		params.map.set(ROUNDS_PARAM, KpValue::U64(rounds));
		params
	}

	/// The KDF algorithm id, or [`Kpid::EMPTY`] when none is configured.
	pub fn uuid(&self) -> Kpid {
		self.map
			.get_bytes(UUID_PARAM)
			.and_then(|b| Kpid::from_slice(b).ok())
			.unwrap_or(Kpid::EMPTY)
	}

	pub fn map(&self) -> &KpMap {
		&self.map
	}

	pub fn map_mut(&mut self) -> &mut KpMap {
		&mut self.map
	}

	/// Serialize the whole structure, `$UUID` included.
	pub fn to_bytes(&self) -> Vec<u8> {
		self.map.to_bytes()
	}

	/// Round-trip counterpart of [`to_bytes`](Self::to_bytes).
	pub fn from_bytes(data: &[u8]) -> KpResult<Self> {
		Ok(Self {
			map: KpMap::from_bytes(data)?,
		})
	}
}

/// Derive a 256-bit working key from a user secret and KDF parameters.
///
/// Dispatches on the params' `$UUID`; an unknown algorithm is a typed error.
pub fn derive_key(secret: &[u8], params: &DerivedKeyParams) -> KpResult<Zeroizing<[u8; 32]>> {
	let uuid = params.uuid();
	if uuid != KDF_PBKDF2_ID {
		return Err(KpError::UnknownKdf(uuid.to_string()));
	}

	let salt = params
		.map()
		.get_bytes(SALT_PARAM)
		.ok_or_else(|| KpError::InvalidKdfParams("missing salt (S)".to_string()))?;
	let rounds = params
		.map()
		.get_u64(ROUNDS_PARAM)
		.ok_or_else(|| KpError::InvalidKdfParams("missing round count (R)".to_string()))?;
	let rounds = u32::try_from(rounds)
		.map_err(|_| KpError::InvalidKdfParams(format!("round count {rounds} out of range")))?;
	if rounds == 0 {
		return Err(KpError::InvalidKdfParams("round count must be positive".to_string()));
	}

	tracing::debug!(rounds, "deriving working key");
	let mut key = Zeroizing::new([0u8; 32]);
	pbkdf2_hmac::<Sha256>(secret, salt, rounds, key.as_mut());
	Ok(key)
}
