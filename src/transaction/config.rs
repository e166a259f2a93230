//! Transaction configuration.
//!
//! A [`TxConfig`] fixes the transaction type of a unit of work and the
//! error kinds that roll it back or are recovered from.

use crate::storage::TxType;
use crate::transaction::rules::{decide, ErrorKind, MatchRule, Outcome};

/// Per-unit transaction settings.
///
/// The default is an optimistic transaction with empty lists, meaning any
/// error rolls the unit back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxConfig {
    tx_type: TxType,
    rollback_on: Vec<MatchRule>,
    ignore: Vec<MatchRule>,
}

impl TxConfig {
    pub fn new(tx_type: TxType) -> Self {
        Self {
            tx_type,
            ..Default::default()
        }
    }

    /// Roll back only on errors matching `rule` (and any other rollback rule).
    pub fn rollback_on(mut self, rule: impl Into<MatchRule>) -> Self {
        self.rollback_on.push(rule.into());
        self
    }

    /// Commit and still report errors matching `rule`.
    pub fn ignore(mut self, rule: impl Into<MatchRule>) -> Self {
        self.ignore.push(rule.into());
        self
    }

    pub fn with_tx_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    pub fn rollback_rules(&self) -> &[MatchRule] {
        &self.rollback_on
    }

    pub fn ignore_rules(&self) -> &[MatchRule] {
        &self.ignore
    }

    /// Decide how a unit failing with `kind` finishes under this config.
    pub fn outcome_for(&self, kind: &ErrorKind) -> Outcome {
        decide(&self.rollback_on, &self.ignore, kind)
    }
}
