use serde::{Deserialize, Serialize};

/// Hash algorithms a catalog entry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashKind {
    /// CRC-32 (the baseline algorithm every DAT dialect carries)
    Crc32,
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashKind {
    /// All kinds, weakest first.
    pub const ALL: [HashKind; 6] = [
        HashKind::Crc32,
        HashKind::Md5,
        HashKind::Sha1,
        HashKind::Sha256,
        HashKind::Sha384,
        HashKind::Sha512,
    ];

    /// All kinds ordered strongest to weakest (SHA-512 down to CRC-32).
    pub fn strongest_first() -> impl Iterator<Item = HashKind> {
        Self::ALL.into_iter().rev()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "CRC-32",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest of zero bytes of input (lowercase hex).
    ///
    /// DATs use these as placeholder values for empty-dump markers, so a
    /// record whose digests all equal them describes a zero-byte entry
    /// rather than real content.
    pub fn empty_digest(&self) -> &'static str {
        match self {
            Self::Crc32 => "00000000",
            Self::Md5 => "d41d8cd98f00b204e9800998ecf8427e",
            Self::Sha1 => "da39a3ee5e6b4b0d3255bfef95601890afd80709",
            Self::Sha256 => "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            Self::Sha384 => {
                "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b"
            }
            Self::Sha512 => {
                "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
            }
        }
    }
}

/// The digest set carried by one record.
///
/// Each field is either absent or a lowercase hex digest. DAT dialects vary
/// wildly in coverage — a record may carry any subset of these, and the
/// duplicate rule in [`Record`](crate::Record) is written around that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashes {
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha384: Option<String>,
    pub sha512: Option<String>,
}

impl Hashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: HashKind) -> Option<&str> {
        match kind {
            HashKind::Crc32 => self.crc32.as_deref(),
            HashKind::Md5 => self.md5.as_deref(),
            HashKind::Sha1 => self.sha1.as_deref(),
            HashKind::Sha256 => self.sha256.as_deref(),
            HashKind::Sha384 => self.sha384.as_deref(),
            HashKind::Sha512 => self.sha512.as_deref(),
        }
    }

    /// Set one digest, folding to lowercase hex.
    pub fn set(&mut self, kind: HashKind, digest: impl Into<String>) {
        let digest = digest.into().to_lowercase();
        let slot = match kind {
            HashKind::Crc32 => &mut self.crc32,
            HashKind::Md5 => &mut self.md5,
            HashKind::Sha1 => &mut self.sha1,
            HashKind::Sha256 => &mut self.sha256,
            HashKind::Sha384 => &mut self.sha384,
            HashKind::Sha512 => &mut self.sha512,
        };
        *slot = Some(digest);
    }

    pub fn has(&self, kind: HashKind) -> bool {
        self.get(kind).is_some()
    }

    /// True if no digest of any kind is present.
    pub fn is_empty(&self) -> bool {
        HashKind::ALL.iter().all(|&k| !self.has(k))
    }

    /// Kinds present on both sides.
    pub fn shared_kinds<'a>(&'a self, other: &'a Hashes) -> impl Iterator<Item = HashKind> + 'a {
        HashKind::ALL
            .into_iter()
            .filter(move |&k| self.has(k) && other.has(k))
    }

    /// Fold `other`'s digests into `self`; a digest present on `other`
    /// replaces whatever was here (later value wins per field).
    pub fn absorb(&mut self, other: &Hashes) {
        for kind in HashKind::ALL {
            if let Some(digest) = other.get(kind) {
                self.set(kind, digest);
            }
        }
    }

    /// True if every present digest equals its algorithm's empty-input
    /// digest — the placeholder convention for zero-byte entries.
    pub fn is_placeholder(&self) -> bool {
        !self.is_empty()
            && HashKind::ALL
                .iter()
                .all(|&k| self.get(k).is_none_or(|d| d == k.empty_digest()))
    }
}
