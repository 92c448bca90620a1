// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Platform data protection.
//!
//! [`protect`] and [`unprotect`] wrap the operating system's per-user /
//! per-machine data-protection facility where one exists:
//!
//! - **Windows**: DPAPI (`CryptProtectData` / `CryptUnprotectData`). Protected
//!   blobs survive process restarts and are scoped to the current user or the
//!   local machine.
//! - **Everywhere else**: no OS equivalent exists, so protection falls back to
//!   a symmetric stream-cipher key generated once per process and never
//!   persisted. Protected data is only recoverable within the same process
//!   lifetime. This is a deliberate, documented limitation — data that must
//!   survive a restart on non-Windows platforms goes through the derived-key
//!   cipher vault path in `gnome-kp` instead.
//!
//! [`is_supported`] probes the platform capability once by round-tripping a
//! test buffer and caches the result; probe failures degrade to `false`.

pub mod error;

#[cfg(windows)]
mod dpapi;
#[cfg(not(windows))]
mod fallback;

use std::sync::OnceLock;

pub use error::{ProtectError, ProtectResult};

/// Visibility scope for protected data.
///
/// On Windows this selects between per-user and per-machine DPAPI keys. The
/// non-Windows fallback has a single process-lifetime key and the scope is
/// recorded but has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionScope {
	CurrentUser,
	LocalMachine,
}

/// Protect `data`, returning an opaque blob only recoverable via
/// [`unprotect`] with the same entropy and scope.
pub fn protect(
	data: &[u8],
	entropy: Option<&[u8]>,
	scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	#[cfg(windows)]
	{
		dpapi::protect(data, entropy, scope)
	}
	#[cfg(not(windows))]
	{
		fallback::protect(data, entropy, scope)
	}
}

/// Reverse [`protect`], recovering the original bytes.
///
/// The same optional entropy and scope used to protect must be supplied.
/// Tampered or malformed blobs fail with a typed error; corrupted plaintext
/// is never returned silently.
pub fn unprotect(
	protected: &[u8],
	entropy: Option<&[u8]>,
	scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	#[cfg(windows)]
	{
		dpapi::unprotect(protected, entropy, scope)
	}
	#[cfg(not(windows))]
	{
		fallback::unprotect(protected, entropy, scope)
	}
}

static SUPPORTED: OnceLock<bool> = OnceLock::new();

/// Whether data protection works on this platform.
///
/// Probed once by round-tripping a small buffer; the result is cached for the
/// life of the process. A probe failure means "unsupported", never a panic.
pub fn is_supported() -> bool {
	*SUPPORTED.get_or_init(|| {
		let probe = b"gnome-protect probe";
		match protect(probe, None, ProtectionScope::CurrentUser)
			.and_then(|blob| unprotect(&blob, None, ProtectionScope::CurrentUser))
		{
			Ok(recovered) => recovered == probe,
			Err(err) => {
				tracing::debug!(error = %err, "data protection probe failed");
				false
			}
		}
	})
}
