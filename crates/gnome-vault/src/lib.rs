// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generic secret vault.
//!
//! [`SecretVault`] is the application-facing shape over secret storage:
//! named [`SecretRecord`]s with timestamps, optional expiry, and free-form
//! tags. Three backends ship here:
//!
//! - [`MemorySecretVault`] — process-local map, for tests and ephemeral use.
//! - [`JsonSecretVault`] — an encrypted JSON file; values are AES-256-CBC
//!   under a PBKDF2-derived key, writes are atomic and serialized through an
//!   advisory lock-file.
//! - [`OsStoreVault`] — adapts any `gnome-os-store` backend (Keychain,
//!   Credential Manager) to the vault trait.

pub mod error;
pub mod json;
pub mod memory;
pub mod os;
pub mod record;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use json::JsonSecretVault;
pub use memory::MemorySecretVault;
pub use os::OsStoreVault;
pub use record::SecretRecord;
pub use vault::SecretVault;
