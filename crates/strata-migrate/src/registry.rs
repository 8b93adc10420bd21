//! Migration registry
//!
//! Provides [`MigrationRegistry`] for running migrations strictly in
//! ascending version order.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{MigrationError, PartialMigration};
use crate::migration::Migration;

/// Result of a migration chain that reached its target
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    /// Upgraded tree
    pub data: Value,
    /// Version the chain started from
    pub from: u32,
    /// Version of `data`
    pub reached: u32,
}

impl Migrated {
    /// Check if any step ran
    #[inline]
    #[must_use]
    pub fn changed_version(&self) -> bool {
        self.reached != self.from
    }
}

/// Ordered registry of migrations keyed by the version they upgrade from
///
/// The current schema version is one past the highest registered step, so
/// adding a migration is the only way to bump it.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, Box<dyn Migration>>,
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field(
                "steps",
                &self
                    .steps
                    .iter()
                    .map(|(v, m)| (*v, m.description()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MigrationRegistry {
    /// Create empty registry (current version 0)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }

    /// Register a step upgrading `from` to `from + 1`
    ///
    /// # Errors
    /// Returns [`MigrationError::Duplicate`] if `from` already has a step
    pub fn register<M>(&mut self, from: u32, migration: M) -> Result<(), MigrationError>
    where
        M: Migration + 'static,
    {
        if self.steps.contains_key(&from) {
            return Err(MigrationError::Duplicate(from));
        }
        self.steps.insert(from, Box::new(migration));
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    ///
    /// # Errors
    /// Returns [`MigrationError::Duplicate`] if `from` already has a step
    pub fn with<M>(mut self, from: u32, migration: M) -> Result<Self, MigrationError>
    where
        M: Migration + 'static,
    {
        self.register(from, migration)?;
        Ok(self)
    }

    /// Current schema version
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> u32 {
        self.steps.keys().next_back().map_or(0, |v| v + 1)
    }

    /// Number of registered steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Description of the step registered from `version`
    #[must_use]
    pub fn describe(&self, version: u32) -> Option<&str> {
        self.steps.get(&version).map(|m| m.description())
    }

    /// Check that every version from 0 to current - 1 has a step
    ///
    /// # Errors
    /// Returns [`MigrationError::Gap`] naming the first missing version
    pub fn validate(&self) -> Result<(), MigrationError> {
        match (0..self.current_version()).find(|v| !self.steps.contains_key(v)) {
            Some(missing) => Err(MigrationError::Gap(missing)),
            None => Ok(()),
        }
    }

    /// Upgrade `data` from version `from` to the current version
    ///
    /// Steps run strictly in ascending order, each receiving the previous
    /// step's output. A tree from a newer schema (`from >= current`) passes
    /// through untouched.
    ///
    /// # Errors
    /// Returns [`PartialMigration`] if a step fails or is missing. It carries
    /// the output of the last successful step, never the original tree
    /// unless no step ran.
    pub fn run(&self, data: Value, from: u32) -> Result<Migrated, PartialMigration> {
        let target = self.current_version();

        if from >= target {
            if from > target {
                tracing::debug!(
                    "stored schema v{} is newer than v{}, passing through",
                    from,
                    target
                );
            }
            return Ok(Migrated {
                data,
                from,
                reached: from,
            });
        }

        let mut current = data;
        for version in from..target {
            let Some(step) = self.steps.get(&version) else {
                tracing::warn!("no migration registered from v{}, stopping", version);
                return Err(PartialMigration {
                    data: current,
                    from,
                    reached: version,
                    target,
                    error: MigrationError::Gap(version),
                });
            };

            match step.apply(&current, version) {
                Ok(next) => {
                    tracing::debug!(
                        "applied migration v{} -> v{}: {}",
                        version,
                        version + 1,
                        step.description()
                    );
                    current = next;
                }
                Err(error) => {
                    tracing::warn!(
                        "migration v{} -> v{} ({}) failed: {}",
                        version,
                        version + 1,
                        step.description(),
                        error
                    );
                    return Err(PartialMigration {
                        data: current,
                        from,
                        reached: version,
                        target,
                        error,
                    });
                }
            }
        }

        tracing::info!("migrated data tree from v{} to v{}", from, target);
        Ok(Migrated {
            data: current,
            from,
            reached: target,
        })
    }
}
