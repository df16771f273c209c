//! Key encoding for the in-memory store.
//!
//! Keys are `kind \0 namespace \0 name`, so all objects of one kind share a
//! prefix and sort by namespace then name.

const SEPARATOR: u8 = 0;

/// Encode the key of one object.
#[must_use]
pub fn object_key(kind: &str, namespace: &str, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(kind.len() + namespace.len() + name.len() + 2);
    key.extend_from_slice(kind.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(namespace.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Encode a kind prefix for scanning all objects of one kind.
#[must_use]
pub fn kind_prefix(kind: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(kind.len() + 1);
    key.extend_from_slice(kind.as_bytes());
    key.push(SEPARATOR);
    key
}
