//! Change records.

use storesync_value::{Path, Value};

/// One unit of structural difference between two values.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    /// A value changed in place.
    Edited {
        /// Location of the change.
        path: Path,
        /// Value before the change.
        previous: Value,
        /// Value after the change.
        next: Value,
    },
    /// A key present only in the next value.
    Created {
        /// Location of the new key.
        path: Path,
        /// The new value.
        next: Value,
    },
    /// A key present only in the previous value.
    Deleted {
        /// Location of the removed key.
        path: Path,
        /// The removed value.
        previous: Value,
    },
    /// A positional change inside an array.
    ArrayItem {
        /// Location of the array.
        path: Path,
        /// Index of the affected element.
        index: usize,
        /// What happened at `index`.
        item: ItemChange,
    },
}

/// The change carried by a [`ChangeRecord::ArrayItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    /// An element appended at the index.
    Created {
        /// The new element.
        next: Value,
    },
    /// The element at the index was removed.
    Deleted {
        /// The removed element.
        previous: Value,
    },
    /// The element at the index was replaced.
    Edited {
        /// Element before the change.
        previous: Value,
        /// Element after the change.
        next: Value,
    },
}

impl ItemChange {
    /// Returns the single-letter kind code.
    pub fn kind_code(&self) -> &'static str {
        match self {
            ItemChange::Created { .. } => "N",
            ItemChange::Deleted { .. } => "D",
            ItemChange::Edited { .. } => "E",
        }
    }
}

impl ChangeRecord {
    /// Returns the path the record addresses.
    ///
    /// For array items this is the path of the array itself.
    pub fn path(&self) -> &Path {
        match self {
            ChangeRecord::Edited { path, .. }
            | ChangeRecord::Created { path, .. }
            | ChangeRecord::Deleted { path, .. }
            | ChangeRecord::ArrayItem { path, .. } => path,
        }
    }

    /// Returns the single-letter kind code (`E`, `N`, `D`, or `A`).
    pub fn kind_code(&self) -> &'static str {
        match self {
            ChangeRecord::Edited { .. } => "E",
            ChangeRecord::Created { .. } => "N",
            ChangeRecord::Deleted { .. } => "D",
            ChangeRecord::ArrayItem { .. } => "A",
        }
    }

    /// Returns the top-level section this record touches, if any.
    pub fn section(&self) -> Option<&str> {
        self.path().segments().first().and_then(|s| s.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes() {
        let path = Path::root().key("a");
        assert_eq!(
            ChangeRecord::Edited {
                path: path.clone(),
                previous: Value::from(1),
                next: Value::from(2)
            }
            .kind_code(),
            "E"
        );
        assert_eq!(
            ChangeRecord::Created {
                path: path.clone(),
                next: Value::from(1)
            }
            .kind_code(),
            "N"
        );
        assert_eq!(
            ChangeRecord::ArrayItem {
                path,
                index: 0,
                item: ItemChange::Deleted {
                    previous: Value::from(1)
                }
            }
            .kind_code(),
            "A"
        );
    }

    #[test]
    fn section_is_first_key() {
        let record = ChangeRecord::Deleted {
            path: Path::root().key("ui").key("modal"),
            previous: Value::Null,
        };
        assert_eq!(record.section(), Some("ui"));

        let root = ChangeRecord::Created {
            path: Path::root(),
            next: Value::Null,
        };
        assert_eq!(root.section(), None);
    }
}
