use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = party_common::id::prefixed_ulid("pty");
/// assert!(id.starts_with("pty_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const PARTY: &str = "pty";
    pub const USER: &str = "usr";
    pub const MESSAGE: &str = "msg";
    pub const REQUEST: &str = "req";
}
