use datsmith_core::{HashKind, Record};

use crate::error::CatalogError;

/// The identity scheme a catalog is currently bucketed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketScheme {
    /// Group by owning machine (the parse-time default)
    Machine,
    /// Group by content digest of the named algorithm
    Crc32,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    /// Resolve at use time to the strongest hash every content-bearing
    /// record carries (see `Statistics::strongest_uniform_hash`)
    Default,
}

impl BucketScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Crc32 => "crc32",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Default => "default",
        }
    }

    /// The hash algorithm this scheme keys on, if it is a hash scheme.
    pub fn hash_kind(&self) -> Option<HashKind> {
        match self {
            Self::Machine | Self::Default => None,
            Self::Crc32 => Some(HashKind::Crc32),
            Self::Md5 => Some(HashKind::Md5),
            Self::Sha1 => Some(HashKind::Sha1),
            Self::Sha256 => Some(HashKind::Sha256),
            Self::Sha384 => Some(HashKind::Sha384),
            Self::Sha512 => Some(HashKind::Sha512),
        }
    }

    pub fn for_hash(kind: HashKind) -> Self {
        match kind {
            HashKind::Crc32 => Self::Crc32,
            HashKind::Md5 => Self::Md5,
            HashKind::Sha1 => Self::Sha1,
            HashKind::Sha256 => Self::Sha256,
            HashKind::Sha384 => Self::Sha384,
            HashKind::Sha512 => Self::Sha512,
        }
    }
}

/// Whether the originating source file participates in machine identity.
///
/// `NameOnly` is the "norename" mode: records from different source files
/// with the same machine and item name share identity. `MachineAndSource`
/// keeps per-file identity by prefixing the zero-padded source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScope {
    MachineAndSource,
    NameOnly,
}

/// Derive a record's bucket key under `scheme`.
///
/// Hash schemes fall back to CRC-32, then to the decimal size, then to the
/// machine-derived key, so partially-hashed records still bucket
/// deterministically. `Default` is resolved by the catalog before keying;
/// called directly it derives like `Crc32` (the uniform-hash floor).
///
/// Errors are the malformed-input boundary of the engine: a machine-keyed
/// record with no machine name, or a record with no identity material at
/// all, cannot be assigned a key and is never silently bucketed under "".
pub fn derive_key(
    record: &Record,
    scheme: BucketScheme,
    lowercase: bool,
    scope: IdentityScope,
) -> Result<String, CatalogError> {
    let key = match scheme.hash_kind() {
        Some(kind) => hash_key(record, kind, scope)?,
        None => match scheme {
            BucketScheme::Machine => machine_key(record, scope)?,
            _ => hash_key(record, HashKind::Crc32, scope)?,
        },
    };

    Ok(if lowercase { key.to_lowercase() } else { key })
}

fn machine_key(record: &Record, scope: IdentityScope) -> Result<String, CatalogError> {
    let machine = record.machine.name.as_str();
    if machine.is_empty() {
        return Err(CatalogError::missing_machine(&record.name));
    }
    Ok(match scope {
        IdentityScope::NameOnly => machine.to_string(),
        IdentityScope::MachineAndSource => {
            format!("{:010}-{}", record.source.index, machine)
        }
    })
}

fn hash_key(
    record: &Record,
    kind: HashKind,
    scope: IdentityScope,
) -> Result<String, CatalogError> {
    if let Some(digest) = record.hashes.get(kind) {
        return Ok(digest.to_string());
    }
    if let Some(crc) = record.hashes.get(HashKind::Crc32) {
        return Ok(crc.to_string());
    }
    if let Some(size) = record.size {
        return Ok(size.to_string());
    }
    // Hashless, sizeless records (samples, releases, blanks) key by their
    // machine so they stay grouped with their owners.
    if !record.machine.name.is_empty() {
        return machine_key(record, scope);
    }
    Err(CatalogError::unkeyable(
        &record.name,
        BucketScheme::for_hash(kind).name(),
    ))
}
