// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting secret wrappers.
//!
//! Where [`ShroudedBytes`](crate::ShroudedBytes) protects a secret's bytes at
//! rest in memory, [`Secret<T>`] protects a secret from leaving the process
//! by accident: it formats and serializes as [`REDACTED`], and the only way
//! at the value is the deliberately named [`expose`](Secret::expose).
//!
//! There is no deserialization and no mutable access: a secret enters the
//! wrapper through [`Secret::new`] at the place it was produced or decrypted,
//! and the wrapper is replaced wholesale when the value changes.

use std::fmt;

use zeroize::Zeroize;

/// Placeholder emitted wherever a secret would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value that redacts itself in Debug, Display, and Serialize.
///
/// The inner value is zeroized when the wrapper is dropped.
///
/// # Example
///
/// ```
/// use gnome_secret::Secret;
///
/// let password = Secret::new("p@ss".to_string());
///
/// assert_eq!(format!("{password}"), "[REDACTED]");
/// assert_eq!(password.expose(), "p@ss");
/// ```
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	value: T,
}

/// The common case: a secret UTF-8 string.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	/// Wrap a sensitive value at the point it was produced or decrypted.
	pub fn new(value: T) -> Self {
		Self { value }
	}

	/// Deliberate access to the wrapped value.
	///
	/// Named so that every sensitive read is visible in the code; do not pass
	/// the reference onward to logging or serialization.
	pub fn expose(&self) -> &T {
		&self.value
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.value.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Secret({REDACTED})")
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

// Serialization is deliberately lossy: a secret that rides along in a config
// dump or API response comes out as the redaction marker, never the value.
// There is intentionally no Deserialize; secrets re-enter through Secret::new
// wherever they are decrypted or read from their authoritative source.
#[cfg(feature = "serde")]
impl<T> serde::Serialize for Secret<T>
where
	T: Zeroize,
{
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}
