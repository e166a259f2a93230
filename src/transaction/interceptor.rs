//! Declarative transactions for service calls.
//!
//! A [`Transactional`] value describes how a call wants its unit of work
//! configured. Fields left unset fall back to the manager's default config.

use crate::storage::TxType;
use crate::transaction::config::TxConfig;
use crate::transaction::error::TransactionError;
use crate::transaction::manager::TransactionManager;
use crate::transaction::rules::{Classify, MatchRule};
use crate::transaction::template::TxTemplate;

/// Transaction settings attached to a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transactional {
    tx_type: Option<TxType>,
    rollback_on: Vec<MatchRule>,
    ignore: Vec<MatchRule>,
}

impl Transactional {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    pub fn rollback_on(mut self, rule: impl Into<MatchRule>) -> Self {
        self.rollback_on.push(rule.into());
        self
    }

    pub fn ignore(mut self, rule: impl Into<MatchRule>) -> Self {
        self.ignore.push(rule.into());
        self
    }

    /// Config for the call, taking unset fields from `defaults`.
    pub fn resolve(&self, defaults: &TxConfig) -> TxConfig {
        let rollback_on = if self.rollback_on.is_empty() {
            defaults.rollback_rules()
        } else {
            &self.rollback_on
        };
        let ignore = if self.ignore.is_empty() {
            defaults.ignore_rules()
        } else {
            &self.ignore
        };

        let config = TxConfig::new(self.tx_type.unwrap_or(defaults.tx_type()));
        let config = rollback_on
            .iter()
            .fold(config, |config, rule| config.rollback_on(*rule));
        ignore.iter().fold(config, |config, rule| config.ignore(*rule))
    }
}

/// Wraps calls in a unit of work configured by a [`Transactional`].
#[derive(Debug, Clone)]
pub struct TransactionInterceptor {
    template: TxTemplate,
}

impl TransactionInterceptor {
    pub fn new(manager: TransactionManager) -> Self {
        Self {
            template: TxTemplate::new(manager),
        }
    }

    pub fn invoke<T, E, F>(&self, annotation: &Transactional, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Classify + From<TransactionError>,
    {
        let config = annotation.resolve(self.template.manager().default_config());
        self.template.run_with(config, call)
    }
}
