//! Cache key sanitising.
//!
//! Keys follow memcached rules: printable ASCII without spaces plus high
//! bytes. Anything else (spaces, control characters, empty keys) is replaced
//! by the hex MD5 digest of the key.

/// Whether `key` can be used verbatim.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| (0x21..=0x7e).contains(&b) || b >= 0x80)
}

/// Build the storage key for `key` under `prefix`.
pub fn cache_key(prefix: &str, key: &str) -> String {
    if is_valid_key(key) {
        format!("{}{}", prefix, key)
    } else {
        format!("{}{:x}", prefix, md5::compute(key.as_bytes()))
    }
}
