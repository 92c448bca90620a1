// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! KeePass-compatible key files.
//!
//! A key file contributes 32 bytes of key material to a composite key. The
//! accepted shapes, in probe order:
//!
//! 1. exactly 32 bytes: used as-is;
//! 2. exactly 64 ASCII hex characters: decoded;
//! 3. an XML document with root `KeyFile`, `Meta/Version` and `Key/Data`:
//!    version 2.x data is hex, otherwise base64;
//! 4. anything else: SHA-256 of the whole file.
//!
//! Decoded XML values that are not 32 bytes are SHA-256-reduced to 32.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{KpError, KpResult};

/// Load and parse a key file from disk.
pub fn load_key_file(path: impl AsRef<Path>) -> KpResult<Zeroizing<[u8; 32]>> {
	let path = path.as_ref();
	let data = Zeroizing::new(std::fs::read(path)?);
	tracing::debug!(path = %path.display(), bytes = data.len(), "key file read");
	parse_key_file(&data)
}

/// Reduce key-file contents to 32 bytes of key material.
pub fn parse_key_file(data: &[u8]) -> KpResult<Zeroizing<[u8; 32]>> {
	if data.len() == 32 {
		let mut key = Zeroizing::new([0u8; 32]);
		key.copy_from_slice(data);
		return Ok(key);
	}

	if data.len() == 64 && data.iter().all(u8::is_ascii_hexdigit) {
		let decoded = hex::decode(data).map_err(|e| KpError::Parse {
			what: "key file",
			detail: format!("hex key data did not decode: {e}"),
		})?;
		let decoded = Zeroizing::new(decoded);
		let mut key = Zeroizing::new([0u8; 32]);
		key.copy_from_slice(&decoded);
		return Ok(key);
	}

	if looks_like_xml(data) {
		if let Some(key) = parse_xml_key_file(data)? {
			return Ok(key);
		}
	}

	Ok(sha256_reduce(data))
}

fn sha256_reduce(data: &[u8]) -> Zeroizing<[u8; 32]> {
	let mut hasher = Sha256::new();
	hasher.update(data);
	Zeroizing::new(hasher.finalize().into())
}

fn looks_like_xml(data: &[u8]) -> bool {
	data.iter()
		.find(|b| !b.is_ascii_whitespace())
		.is_some_and(|&b| b == b'<')
}

/// Parse the XML key-file shape.
///
/// Returns `Ok(None)` when the document is well-formed XML but not a
/// `KeyFile` (the caller falls back to hashing); malformed XML inside a
/// `KeyFile` root is a parse error.
fn parse_xml_key_file(data: &[u8]) -> KpResult<Option<Zeroizing<[u8; 32]>>> {
	let mut reader = Reader::from_reader(data);
	reader.config_mut().trim_text(true);

	let mut buf = Vec::new();
	let mut path: Vec<String> = Vec::new();
	let mut saw_keyfile_root = false;
	let mut version: Option<String> = None;
	let mut key_data: Option<Zeroizing<String>> = None;

	loop {
		let event = match reader.read_event_into(&mut buf) {
			Ok(event) => event,
			Err(e) if saw_keyfile_root => {
				return Err(KpError::Parse {
					what: "key file",
					detail: format!("invalid XML: {e}"),
				})
			}
			// Not a KeyFile document at all; let the caller hash the bytes.
			Err(_) => return Ok(None),
		};

		match event {
			Event::Start(e) => {
				let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
				if path.is_empty() {
					if name != "KeyFile" {
						return Ok(None);
					}
					saw_keyfile_root = true;
				}
				path.push(name);
			}
			Event::End(_) => {
				path.pop();
			}
			Event::Text(t) => {
				let text = t.unescape().map_err(|e| KpError::Parse {
					what: "key file",
					detail: format!("invalid XML text: {e}"),
				})?;
				match path.iter().map(String::as_str).collect::<Vec<_>>()[..] {
					["KeyFile", "Meta", "Version"] => version = Some(text.into_owned()),
					["KeyFile", "Key", "Data"] => {
						key_data = Some(Zeroizing::new(text.into_owned()))
					}
					_ => {}
				}
			}
			Event::Eof => break,
			_ => {}
		}
		buf.clear();
	}

	if !saw_keyfile_root {
		return Ok(None);
	}

	let data_text = key_data.ok_or(KpError::Parse {
		what: "key file",
		detail: "missing Key/Data element".to_string(),
	})?;

	let is_v2 = version.as_deref().is_some_and(|v| v.starts_with('2'));
	let compact: Zeroizing<String> =
		Zeroizing::new(data_text.split_whitespace().collect::<String>());

	let decoded = if is_v2 {
		Zeroizing::new(hex::decode(compact.as_bytes()).map_err(|e| KpError::Parse {
			what: "key file",
			detail: format!("version 2.0 key data is not hex: {e}"),
		})?)
	} else {
		Zeroizing::new(BASE64.decode(compact.as_bytes()).map_err(|e| {
			KpError::Parse {
				what: "key file",
				detail: format!("key data is not base64: {e}"),
			}
		})?)
	};

	if decoded.len() == 32 {
		let mut key = Zeroizing::new([0u8; 32]);
		key.copy_from_slice(&decoded);
		Ok(Some(key))
	} else {
		Ok(Some(sha256_reduce(&decoded)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies that a raw 32-byte file is used as-is.
	#[test]
	fn raw_32_bytes_used_directly() {
		let data = [0x5Au8; 32];
		assert_eq!(parse_key_file(&data).unwrap().as_ref(), &data);
	}

	/// Verifies that 64 hex characters decode to the key.
	#[test]
	fn hex_64_chars_decoded() {
		let key = [0xC3u8; 32];
		let hex_file = hex::encode(key);

		assert_eq!(parse_key_file(hex_file.as_bytes()).unwrap().as_ref(), &key);
	}

	/// Verifies the XML v1 shape: base64 key data.
	#[test]
	fn xml_v1_base64() {
		let key = [0x42u8; 32];
		let xml = format!(
			"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
			 <KeyFile>\n\
			 \t<Meta><Version>1.00</Version></Meta>\n\
			 \t<Key><Data>{}</Data></Key>\n\
			 </KeyFile>",
			BASE64.encode(key)
		);

		assert_eq!(parse_key_file(xml.as_bytes()).unwrap().as_ref(), &key);
	}

	/// Verifies the XML v2 shape: hex key data, whitespace tolerated.
	#[test]
	fn xml_v2_hex() {
		let key = [0x77u8; 32];
		let hex = hex::encode_upper(key);
		let (head, tail) = hex.split_at(32);
		let xml = format!(
			"<KeyFile><Meta><Version>2.0</Version></Meta>\
			 <Key><Data>{head} {tail}</Data></Key></KeyFile>"
		);

		assert_eq!(parse_key_file(xml.as_bytes()).unwrap().as_ref(), &key);
	}

	/// Verifies that a KeyFile without Key/Data is a parse error.
	#[test]
	fn xml_missing_data_is_error() {
		let xml = "<KeyFile><Meta><Version>1.00</Version></Meta></KeyFile>";
		assert!(parse_key_file(xml.as_bytes()).is_err());
	}

	/// Verifies that non-32-byte XML key data is SHA-256-reduced.
	#[test]
	fn xml_odd_length_data_is_reduced() {
		let material = b"short";
		let xml = format!(
			"<KeyFile><Meta><Version>1.00</Version></Meta>\
			 <Key><Data>{}</Data></Key></KeyFile>",
			BASE64.encode(material)
		);

		let expected: [u8; 32] = Sha256::digest(material).into();
		assert_eq!(parse_key_file(xml.as_bytes()).unwrap().as_ref(), &expected);
	}

	/// Verifies that arbitrary file contents are SHA-256-reduced.
	#[test]
	fn arbitrary_contents_are_hashed() {
		let data = b"not a key file at all, just some text";
		let expected: [u8; 32] = Sha256::digest(data).into();

		assert_eq!(parse_key_file(data).unwrap().as_ref(), &expected);
	}

	/// Verifies that XML that is not a KeyFile falls back to hashing.
	#[test]
	fn foreign_xml_is_hashed() {
		let data = b"<html><body>hi</body></html>";
		let expected: [u8; 32] = Sha256::digest(data.as_slice()).into();

		assert_eq!(parse_key_file(data).unwrap().as_ref(), &expected);
	}

	/// Verifies load_key_file reads from disk.
	#[test]
	fn load_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("key.keyx");
		let key = [0x0Fu8; 32];
		std::fs::write(&path, key).unwrap();

		assert_eq!(load_key_file(&path).unwrap().as_ref(), &key);
	}
}
