//! Derives thumbnail keys from source keys.

/// Maps source keys to destination keys by replacing a leading
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapper {
    pub source_prefix: String,
    pub target_prefix: String,
}

impl Default for KeyMapper {
    fn default() -> Self {
        KeyMapper::new("original/", "thumb/")
    }
}

impl KeyMapper {
    pub fn new(source_prefix: &str, target_prefix: &str) -> Self {
        KeyMapper {
            source_prefix: String::from(source_prefix),
            target_prefix: String::from(target_prefix),
        }
    }

    /// Replace the source prefix with the target prefix. Keys that
    /// don't start with the source prefix are returned unchanged, so
    /// the destination equals the source for them.
    pub fn map(&self, key: &str) -> String {
        match key.strip_prefix(&self.source_prefix) {
            Some(rest) => format!("{}{}", self.target_prefix, rest),
            None => String::from(key),
        }
    }
}
