use crate::error::StorageError;
use std::path::{Path, PathBuf};

pub(crate) const MAX_KEY_LEN: usize = 128;

/// A key that is safe to use as a single file name under the storage root.
///
/// Only `[A-Za-z0-9._-]` is accepted and the first character may not be `.`,
/// so a key can never name a parent directory, a hidden file, or a temp file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Key<'a>(&'a str);

impl<'a> Key<'a> {
    pub(crate) fn parse(raw: &'a str) -> Result<Self, StorageError> {
        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey {
                message: raw.to_owned().into(),
                context: Some(format!("Key length must be 1..={MAX_KEY_LEN}").into()),
            });
        }

        if raw.starts_with('.') {
            return Err(StorageError::InvalidKey {
                message: raw.to_owned().into(),
                context: Some("Key must not start with '.'".into()),
            });
        }

        if let Some(bad) = raw.chars().find(|c| !is_key_char(*c)) {
            return Err(StorageError::InvalidKey {
                message: raw.to_owned().into(),
                context: Some(format!("Illegal character {bad:?}").into()),
            });
        }

        Ok(Self(raw))
    }

    pub(crate) const fn as_str(self) -> &'a str {
        self.0
    }

    pub(crate) fn resolve(self, root: &Path) -> PathBuf {
        root.join(self.0)
    }
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Returns true for directory entries that can be reported as keys.
pub(crate) fn is_key_name(name: &str) -> bool {
    Key::parse(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        for key in ["token", "user.profile", "draft_42", "a-b", "x"] {
            assert!(Key::parse(key).is_ok(), "{key} should be accepted");
        }
        assert!(Key::parse(&"k".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn rejects_traversal_and_hidden_names() {
        for key in ["", "..", ".", ".hidden", "../etc/passwd", "a/b", "a\\b", "tok en", "ключ"] {
            let err = Key::parse(key).expect_err(key);
            assert!(matches!(err, StorageError::InvalidKey { .. }), "{key}: {err}");
        }
        assert!(Key::parse(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn resolves_to_direct_child_of_root() {
        let root = Path::new("/srv/bazaar");
        let path = Key::parse("token").map(|k| k.resolve(root)).unwrap();
        assert_eq!(path.parent(), Some(root));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("token"));
    }
}
