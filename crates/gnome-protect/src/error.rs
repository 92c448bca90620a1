// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Data protection error types.

use thiserror::Error;

pub type ProtectResult<T> = Result<T, ProtectError>;

/// Errors that can occur while protecting or unprotecting data.
///
/// Raw platform failures never escape uninterpreted; every native error path
/// is mapped into this closed taxonomy at the boundary.
#[derive(Error, Debug)]
pub enum ProtectError {
	#[error("data protection is not supported on this platform")]
	NotSupported,

	#[error("native data protection call failed with code {code}")]
	Native { code: u32 },

	#[error("protected envelope is malformed or truncated")]
	InvalidEnvelope,

	#[error("protected envelope failed integrity verification")]
	Tampered,
}
