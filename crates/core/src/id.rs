// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types.
//!
//! Two id families live in this workspace. Generated ids — attachments
//! (`att-…`) and activity-journal entries (`ent-…`) — are minted in large
//! numbers and stored inline in frontmatter lists and JSONL records, so
//! they use a fixed-size copyable buffer ([`IdBuf`] via [`define_id!`]).
//! Human-assigned ids — tasks like `PIFA-123`, workspace ids — arrive from
//! outside with no length bound and stay heap-backed string newtypes
//! ([`define_string_id!`]).

/// Byte length of every generated id: a 4-char kind prefix plus a 19-char
/// nanoid. `from_string` tolerates shorter input but debug-asserts the cap.
pub const ID_MAX_LEN: usize = 23;

/// Truncate a string slice to at most `n` bytes (for compact log fields).
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Inline buffer for a generated id. `Copy`, at most [`ID_MAX_LEN`] ASCII
/// bytes, so attachment and entry ids move around without allocating.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdBuf {
    bytes: [u8; ID_MAX_LEN],
    len: u8,
}

impl IdBuf {
    pub fn new(s: &str) -> Self {
        debug_assert!(
            s.len() <= ID_MAX_LEN,
            "id longer than {ID_MAX_LEN} bytes ({} bytes): {s:?}",
            s.len(),
        );
        let len = s.len().min(ID_MAX_LEN);
        let mut bytes = [0u8; ID_MAX_LEN];
        bytes[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { bytes, len: len as u8 }
    }

    pub fn as_str(&self) -> &str {
        // Only ever constructed from &str, so the active bytes are valid
        // UTF-8.
        match std::str::from_utf8(&self.bytes[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf holds non-UTF-8 bytes"),
        }
    }
}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Must hash like the equivalent &str so Borrow<str>-keyed map
        // lookups find generated ids by plain string.
        self.as_str().hash(state);
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.len() > ID_MAX_LEN {
            return Err(serde::de::Error::custom(format!(
                "id longer than {ID_MAX_LEN} bytes: {s:?}"
            )));
        }
        Ok(IdBuf::new(s))
    }
}

/// Define a generated-id newtype over [`IdBuf`].
///
/// `new()` mints `{prefix}{19-char nanoid}` — exactly [`ID_MAX_LEN`] bytes;
/// `from_string()` re-wraps an id read back from frontmatter or the
/// journal. `suffix()` drops the kind prefix and `short(n)` truncates the
/// suffix for log fields. String comparisons and `Borrow<str>` map lookups
/// work against the full prefixed form.
///
/// ```ignore
/// crate::define_id! {
///     /// Generated identifier for a stored attachment.
///     pub struct AttachmentId("att-");
/// }
///
/// let id = AttachmentId::new();            // "att-V1StGXR8_Z5jdHi6B-m"
/// let stored = format!("{id}.png");        // on-disk attachment name
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$doc:meta])*
        pub struct $id:ident($prefix:literal);
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $id(pub $crate::id::IdBuf);

        impl $id {
            pub const PREFIX: &'static str = $prefix;

            /// Mint a fresh random id with the kind prefix.
            pub fn new() -> Self {
                Self($crate::id::IdBuf::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(19)
                )))
            }

            /// Wrap an id read back from storage.
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::IdBuf::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// The id without its kind prefix.
            pub fn suffix(&self) -> &str {
                self.as_str().strip_prefix(Self::PREFIX).unwrap_or_else(|| self.as_str())
            }

            /// At most `n` bytes of the suffix, for compact log fields.
            pub fn short(&self, n: usize) -> &str {
                $crate::id::short(self.suffix(), n)
            }
        }

        impl Default for $id {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $id {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $id {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $id {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $id {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $id {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $id {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }
    };
}

/// Define a transparent string newtype for a human-assigned identifier.
///
/// Unlike [`define_id!`] there is no prefix or generation — these ids come
/// from the outside (e.g. `PIFA-123`) and have no length bound.
#[macro_export]
macro_rules! define_string_id {
    (
        $(#[$doc:meta])*
        pub struct $id:ident;
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $id(pub String);

        impl $id {
            /// Create a new id from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the string value of this id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $id {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $id {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $id {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $id {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $id {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
