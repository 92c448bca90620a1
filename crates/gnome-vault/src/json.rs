// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encrypted JSON file vault.
//!
//! Records live in a single JSON document on disk. Secret values are
//! encrypted with AES-256-CBC under a key derived from the vault's master
//! secret via PBKDF2; everything else (names, timestamps, tags) is plaintext
//! JSON. The KDF parameters travel with the document, so reopening the vault
//! needs only the path and the master secret.
//!
//! Writes are atomic (temp file + `sync_all` + rename, 0600 on Unix) and
//! serialized through an advisory `<path>.lock` file with create-new
//! semantics. Lock acquisition retries a bounded number of times with a fixed
//! delay and then fails with [`VaultError::LockContention`]; this is
//! best-effort serialization against cooperating writers, not mandatory
//! locking.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use gnome_kp::{derive_key, Aes256CbcCipher, DerivedKeyParams, KpCipher, DEFAULT_PBKDF2_ROUNDS};
use gnome_secret::{SecretString, ShroudedBytes};

use crate::error::{VaultError, VaultResult};
use crate::record::SecretRecord;
use crate::vault::SecretVault;

const LOCK_RETRIES: u32 = 10;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);
const IV_LEN: usize = 16;

/// On-disk vault document.
#[derive(Debug, Serialize, Deserialize)]
struct VaultDocument {
	/// base64 of the serialized KDF parameter dictionary.
	kdf: String,
	/// base64 of the KDF salt (also present inside `kdf`).
	salt: String,
	secrets: Vec<PersistedRecord>,
}

/// On-disk record format. `value` is base64 of `iv || ciphertext`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRecord {
	name: String,
	value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_at: Option<DateTime<Utc>>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	tags: HashMap<String, String>,
}

/// Decrypted working state, memoized after the first load.
struct VaultState {
	params: DerivedKeyParams,
	salt: Vec<u8>,
	key: Zeroizing<[u8; 32]>,
	records: HashMap<String, SecretRecord>,
}

/// A [`SecretVault`] stored as an encrypted JSON file.
pub struct JsonSecretVault {
	path: PathBuf,
	master: ShroudedBytes,
	cipher: Aes256CbcCipher,
	state: tokio::sync::Mutex<Option<VaultState>>,
}

impl std::fmt::Debug for JsonSecretVault {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JsonSecretVault")
			.field("path", &self.path)
			.finish_non_exhaustive()
	}
}

impl JsonSecretVault {
	/// Open (or prepare to create) a vault at the given path.
	///
	/// The file is not touched until the first read or write.
	pub fn new(path: impl Into<PathBuf>, master: ShroudedBytes) -> Self {
		Self {
			path: path.into(),
			master,
			cipher: Aes256CbcCipher,
			state: tokio::sync::Mutex::new(None),
		}
	}

	/// Path to the vault document.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Discard the memoized state and re-read the document from disk.
	pub async fn reload(&self) -> VaultResult<()> {
		let mut guard = self.state.lock().await;
		*guard = Some(self.load_state().await?);
		Ok(())
	}

	async fn state(&self) -> VaultResult<tokio::sync::MutexGuard<'_, Option<VaultState>>> {
		let mut guard = self.state.lock().await;
		if guard.is_none() {
			*guard = Some(self.load_state().await?);
		}
		Ok(guard)
	}

	/// Read and decrypt the document, or initialize fresh state when the
	/// file does not exist yet.
	async fn load_state(&self) -> VaultResult<VaultState> {
		if !self.path.exists() {
			let mut salt = [0u8; 32];
			OsRng.fill_bytes(&mut salt);
			let params = DerivedKeyParams::pbkdf2(&salt, DEFAULT_PBKDF2_ROUNDS);
			let key = derive_key(&self.master.read(), &params)?;
			return Ok(VaultState {
				params,
				salt: salt.to_vec(),
				key,
				records: HashMap::new(),
			});
		}

		let contents = fs::read_to_string(&self.path).await?;
		let document: VaultDocument = serde_json::from_str(&contents)?;

		let kdf_bytes = BASE64
			.decode(&document.kdf)
			.map_err(|e| VaultError::InvalidDocument(format!("kdf is not base64: {e}")))?;
		let params = DerivedKeyParams::from_bytes(&kdf_bytes)?;
		let salt = BASE64
			.decode(&document.salt)
			.map_err(|e| VaultError::InvalidDocument(format!("salt is not base64: {e}")))?;
		let key = derive_key(&self.master.read(), &params)?;

		let mut records = HashMap::with_capacity(document.secrets.len());
		for persisted in document.secrets {
			let value = self.decrypt_value(key.as_ref(), &persisted.value)?;
			records.insert(
				persisted.name.clone(),
				SecretRecord::from_parts(
					persisted.name,
					value,
					persisted.expires_at,
					persisted.created_at,
					persisted.updated_at,
					persisted.tags,
				),
			);
		}

		debug!(path = ?self.path, records = records.len(), "vault loaded");
		Ok(VaultState {
			params,
			salt,
			key,
			records,
		})
	}

	/// Encrypt and persist `records` atomically under the lock-file.
	///
	/// The memoized cache is not touched here; callers commit `records` into
	/// the cache only after this returns Ok, so a failed write never leaves
	/// the cache ahead of the file.
	async fn write_records(
		&self,
		state: &VaultState,
		records: &HashMap<String, SecretRecord>,
	) -> VaultResult<()> {
		let mut secrets: Vec<PersistedRecord> = Vec::with_capacity(records.len());
		for record in records.values() {
			secrets.push(PersistedRecord {
				name: record.name().to_string(),
				value: self.encrypt_value(state.key.as_ref(), record.value().expose())?,
				expires_at: record.expires_at(),
				created_at: record.created_at(),
				updated_at: record.updated_at(),
				tags: record.tags().clone(),
			});
		}
		secrets.sort_by(|a, b| a.name.cmp(&b.name));

		let document = VaultDocument {
			kdf: BASE64.encode(state.params.to_bytes()),
			salt: BASE64.encode(&state.salt),
			secrets,
		};
		let contents = serde_json::to_string_pretty(&document)?;

		let _lock = self.acquire_lock().await?;

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).await?;
		}

		let temp_path = self.sibling_path(".tmp");
		let mut file = fs::File::create(&temp_path).await?;
		file.write_all(contents.as_bytes()).await?;
		file.sync_all().await?;
		drop(file);

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let perms = std::fs::Permissions::from_mode(0o600);
			if let Err(e) = std::fs::set_permissions(&temp_path, perms) {
				warn!(path = ?temp_path, error = %e, "Failed to set file permissions to 0600");
			}
		}

		fs::rename(&temp_path, &self.path).await?;

		debug!(path = ?self.path, "vault written");
		Ok(())
	}

	/// A sibling of the vault file with `suffix` appended to the full file
	/// name, so `vault.json` pairs with `vault.json.lock` and never collides
	/// with an unrelated `vault.lock`.
	fn sibling_path(&self, suffix: &str) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|n| n.to_os_string())
			.unwrap_or_default();
		name.push(suffix);
		self.path.with_file_name(name)
	}

	async fn acquire_lock(&self) -> VaultResult<LockFile> {
		let lock_path = self.sibling_path(".lock");
		for _ in 0..LOCK_RETRIES {
			match fs::OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(&lock_path)
				.await
			{
				Ok(_) => {
					return Ok(LockFile {
						path: lock_path,
					})
				}
				Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
					tokio::time::sleep(LOCK_RETRY_DELAY).await;
				}
				Err(e) => return Err(e.into()),
			}
		}
		Err(VaultError::LockContention(lock_path.display().to_string()))
	}

	fn encrypt_value(&self, key: &[u8], plaintext: &str) -> VaultResult<String> {
		let mut iv = [0u8; IV_LEN];
		OsRng.fill_bytes(&mut iv);

		let ciphertext = self.cipher.encrypt(key, &iv, plaintext.as_bytes())?;
		let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
		blob.extend_from_slice(&iv);
		blob.extend_from_slice(&ciphertext);
		Ok(BASE64.encode(blob))
	}

	fn decrypt_value(&self, key: &[u8], value: &str) -> VaultResult<SecretString> {
		let blob = BASE64
			.decode(value)
			.map_err(|e| VaultError::InvalidDocument(format!("secret value is not base64: {e}")))?;
		if blob.len() < IV_LEN {
			return Err(VaultError::InvalidDocument(
				"secret value shorter than its IV".to_string(),
			));
		}

		let plaintext = self.cipher.decrypt(key, &blob[..IV_LEN], &blob[IV_LEN..])?;
		let text = String::from_utf8(plaintext)
			.map_err(|_| VaultError::InvalidDocument("secret value is not UTF-8".to_string()))?;
		Ok(SecretString::new(text))
	}
}

#[async_trait]
impl SecretVault for JsonSecretVault {
	async fn get_secret(&self, name: &str) -> VaultResult<Option<SecretRecord>> {
		let guard = self.state().await?;
		let state = guard.as_ref().expect("state memoized above");
		Ok(state.records.get(name).cloned())
	}

	async fn set_secret(&self, record: &SecretRecord) -> VaultResult<()> {
		let mut guard = self.state().await?;
		let state = guard.as_mut().expect("state memoized above");

		// Stage the change and commit it to the cache only once the write
		// succeeded, so the cache never runs ahead of the file.
		let mut staged = state.records.clone();
		match staged.get_mut(record.name()) {
			Some(existing) => existing.merge_from(record),
			None => {
				let mut fresh = record.clone();
				fresh.touch();
				staged.insert(record.name().to_string(), fresh);
			}
		}

		self.write_records(state, &staged).await?;
		state.records = staged;
		Ok(())
	}

	async fn set_secret_value(&self, name: &str, value: SecretString) -> VaultResult<()> {
		let mut guard = self.state().await?;
		let state = guard.as_mut().expect("state memoized above");

		let mut staged = state.records.clone();
		match staged.get_mut(name) {
			Some(existing) => existing.set_value(value),
			None => {
				let mut fresh = SecretRecord::new(name);
				fresh.set_value(value);
				staged.insert(name.to_string(), fresh);
			}
		}

		self.write_records(state, &staged).await?;
		state.records = staged;
		Ok(())
	}

	async fn delete_secret(&self, name: &str) -> VaultResult<bool> {
		let mut guard = self.state().await?;
		let state = guard.as_mut().expect("state memoized above");

		let mut staged = state.records.clone();
		if staged.remove(name).is_none() {
			return Ok(false);
		}

		self.write_records(state, &staged).await?;
		state.records = staged;
		Ok(true)
	}

	async fn list_names(&self) -> VaultResult<Vec<String>> {
		let guard = self.state().await?;
		let state = guard.as_ref().expect("state memoized above");
		let mut names: Vec<String> = state.records.keys().cloned().collect();
		names.sort();
		Ok(names)
	}
}

/// Removes the advisory lock-file when dropped.
struct LockFile {
	path: PathBuf,
}

impl Drop for LockFile {
	fn drop(&mut self) {
		if let Err(e) = std::fs::remove_file(&self.path) {
			warn!(path = ?self.path, error = %e, "Failed to remove vault lock file");
		}
	}
}
