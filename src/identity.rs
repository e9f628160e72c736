//! Doctor identity normalization.
//!
//! Every doctor-partitioned path keys on a [`DoctorKey`], produced by
//! [`normalize`] and nowhere else. Two call sites normalizing the same
//! logical identity differently would silently split a doctor's data
//! across two partitions, so the mapping lives here and the rest of the
//! crate only accepts the typed key.
//!
//! The mapping: lower-case the local part, strip the known `.com` suffix
//! from the domain (store keys cannot contain `.`). Stripping iterates to
//! a fixpoint and local-lowering is stable, so `normalize(normalize(x)) ==
//! normalize(x)` for every accepted input.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// The TLD suffix registration identities carry.
const STRIPPED_SUFFIX: &str = ".com";

/// A normalized doctor partition key, e.g. `dra@x` for `DrA@x.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorKey(String);

impl DoctorKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DoctorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalizes a raw email-shaped identity into a partition key.
///
/// Pure, deterministic and idempotent. Fails `InvalidIdentity` when the
/// input has no `@` separator or an empty side around it.
pub fn normalize(raw: &str) -> Result<DoctorKey, LedgerError> {
    let raw = raw.trim();
    let (local, domain) = raw
        .split_once('@')
        .ok_or_else(|| LedgerError::InvalidIdentity(format!("'{raw}' is not email-shaped")))?;
    if local.is_empty() || domain.is_empty() {
        return Err(LedgerError::InvalidIdentity(format!(
            "'{raw}' is missing a local or domain part"
        )));
    }

    let mut domain = domain;
    loop {
        let len = domain.len();
        if len > STRIPPED_SUFFIX.len()
            && domain[len - STRIPPED_SUFFIX.len()..].eq_ignore_ascii_case(STRIPPED_SUFFIX)
        {
            domain = &domain[..len - STRIPPED_SUFFIX.len()];
        } else {
            break;
        }
    }

    Ok(DoctorKey(format!("{}@{}", local.to_lowercase(), domain)))
}
