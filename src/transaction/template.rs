//! Transaction templates: run a closure as one unit of work.

use tracing::error;

use crate::pool::{ConnectionSource, Provider};
use crate::transaction::config::TxConfig;
use crate::transaction::error::TransactionError;
use crate::transaction::manager::TransactionManager;
use crate::transaction::rules::Classify;

/// Runs closures inside a unit of work.
///
/// A closure returning `Ok` commits every touched pool. A closure returning
/// `Err` is classified against the unit's [`TxConfig`]: ignored kinds
/// commit, everything else configured for rollback rolls back. Either way
/// the closure's own error reaches the caller unchanged, unless committing
/// failed, in which case the commit failure is returned instead.
///
/// When the thread already has a unit of work the closure simply runs
/// inside it and the outer caller decides how the unit ends.
#[derive(Debug, Clone)]
pub struct TxTemplate {
    manager: TransactionManager,
}

impl TxTemplate {
    pub fn new(manager: TransactionManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Run `body` with the manager's default config.
    pub fn run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Classify + From<TransactionError>,
    {
        self.run_with(self.manager.default_config().clone(), body)
    }

    /// Run `body` with the given config.
    pub fn run_with<T, E, F>(&self, config: TxConfig, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Classify + From<TransactionError>,
    {
        if !self.manager.begin_with(config) {
            return body();
        }

        let guard = UnitGuard {
            manager: &self.manager,
            armed: true,
        };
        let result = body();
        guard.disarm();

        match result {
            Ok(value) => {
                self.manager.end()?;
                Ok(value)
            }
            Err(err) => {
                self.manager.end_with_error(err.kind())?;
                Err(err)
            }
        }
    }
}

/// Rolls the unit back if the body unwinds.
struct UnitGuard<'a> {
    manager: &'a TransactionManager,
    armed: bool,
}

impl UnitGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UnitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.manager.rollback() {
                error!(error = %e, "rollback after panic failed");
            }
        }
    }
}

/// A template bound to one pool: the closure receives that pool's connection.
///
/// The pool joins the unit of work before the closure runs.
pub struct SpecificTxTemplate<P> {
    template: TxTemplate,
    provider: Provider<P>,
}

impl<P: ConnectionSource> SpecificTxTemplate<P> {
    pub fn new(provider: Provider<P>) -> Self {
        Self {
            template: TxTemplate::new(provider.manager().clone()),
            provider,
        }
    }

    pub fn run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(P::Connection) -> Result<T, E>,
        E: Classify + From<TransactionError>,
    {
        self.run_with(self.template.manager().default_config().clone(), body)
    }

    pub fn run_with<T, E, F>(&self, config: TxConfig, body: F) -> Result<T, E>
    where
        F: FnOnce(P::Connection) -> Result<T, E>,
        E: Classify + From<TransactionError>,
    {
        self.template.run_with(config, || {
            let connection = self.provider.get()?;
            body(connection)
        })
    }
}
