//! Error kinds and the rules deciding commit versus rollback.
//!
//! Every error that can escape a unit of work reports an [`ErrorKind`].
//! Kinds form a tree through their parent links; a kind *is a* another
//! kind when it is that kind or one of its descendants. Kinds are compared
//! by address, so declare them as `static` items:
//!
//! ```ignore
//! static IO: ErrorKind = ErrorKind::child("io", &kinds::ANY);
//! static FILE_NOT_FOUND: ErrorKind = ErrorKind::child("file_not_found", &IO);
//! ```

use std::fmt;
use std::ptr;

use crate::storage::StorageError;
use crate::transaction::error::TransactionError;

/// A node in the error kind tree.
pub struct ErrorKind {
    name: &'static str,
    parent: Option<&'static ErrorKind>,
}

impl ErrorKind {
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    pub const fn child(name: &'static str, parent: &'static ErrorKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ErrorKind> {
        self.parent
    }

    /// Check if this kind is `other` or descends from it.
    pub fn is_a(&self, other: &ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if ptr::eq(kind, other) {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ErrorKind {}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorKind({})", self.name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Built-in kinds.
pub mod kinds {
    use super::ErrorKind;

    /// Root of every kind.
    pub static ANY: ErrorKind = ErrorKind::root("any");

    /// Errors raised by the orchestration layer itself.
    pub static TRANSACTION: ErrorKind = ErrorKind::child("transaction", &ANY);

    /// Errors raised by the database client.
    pub static STORAGE: ErrorKind = ErrorKind::child("storage", &ANY);
}

/// Errors that can be matched against rollback and ignore rules.
pub trait Classify {
    fn kind(&self) -> &'static ErrorKind;
}

impl Classify for TransactionError {
    fn kind(&self) -> &'static ErrorKind {
        match self {
            TransactionError::Storage(_) => &kinds::STORAGE,
            _ => &kinds::TRANSACTION,
        }
    }
}

impl Classify for StorageError {
    fn kind(&self) -> &'static ErrorKind {
        &kinds::STORAGE
    }
}

/// One entry of a rollback or ignore list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRule {
    pub kind: &'static ErrorKind,
    /// Also match descendants of `kind`.
    pub subkinds: bool,
}

impl MatchRule {
    /// Match `kind` and everything below it.
    pub fn kind(kind: &'static ErrorKind) -> Self {
        Self {
            kind,
            subkinds: true,
        }
    }

    /// Match `kind` only.
    pub fn exact(kind: &'static ErrorKind) -> Self {
        Self {
            kind,
            subkinds: false,
        }
    }

    pub fn matches(&self, kind: &ErrorKind) -> bool {
        if self.subkinds {
            kind.is_a(self.kind)
        } else {
            ptr::eq(kind, self.kind)
        }
    }
}

impl From<&'static ErrorKind> for MatchRule {
    fn from(kind: &'static ErrorKind) -> Self {
        MatchRule::kind(kind)
    }
}

/// What to do with the touched pools when a unit of work ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Commit,
    Rollback,
}

/// Decide how a unit of work failing with `kind` finishes.
///
/// An ignore match always commits, even when a more specific rollback
/// rule also matches. An empty rollback list rolls back on anything.
pub fn decide(rollback_on: &[MatchRule], ignore: &[MatchRule], kind: &ErrorKind) -> Outcome {
    if ignore.iter().any(|rule| rule.matches(kind)) {
        return Outcome::Commit;
    }
    if rollback_on.is_empty() || rollback_on.iter().any(|rule| rule.matches(kind)) {
        return Outcome::Rollback;
    }
    Outcome::Commit
}

/// Kinds addressable by name, used when reading configuration.
#[derive(Debug, Clone)]
pub struct KindTable {
    kinds: Vec<&'static ErrorKind>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            kinds: vec![&kinds::ANY, &kinds::TRANSACTION, &kinds::STORAGE],
        }
    }
}

impl KindTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an application kind. A later kind with the same name shadows earlier ones.
    pub fn with(mut self, kind: &'static ErrorKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&'static ErrorKind> {
        self.kinds.iter().rev().find(|kind| kind.name == name).copied()
    }
}
