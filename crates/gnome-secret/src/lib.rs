// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory secret guards.
//!
//! Two layers of protection for secrets resident in process memory:
//!
//! - [`ShroudedBytes`]: keeps a secret's bytes encrypted with a process-local
//!   key while at rest in memory, decrypting only transiently on [`read`].
//! - [`Secret<T>`]: a wrapper that prevents accidental logging of sensitive
//!   values (redacted Debug/Display/Serialize, zeroized on drop, explicit
//!   `.expose()` access).
//!
//! [`read`]: ShroudedBytes::read

pub mod secret;
pub mod shrouded;

pub use secret::{Secret, SecretString, REDACTED};
pub use shrouded::ShroudedBytes;
