//! Persistence controller
//!
//! Orchestrates the load pipeline:
//! 1. Read the raw envelope from the store
//! 2. Decode it (corrupt text becomes the empty tree)
//! 3. Migrate to the current schema (a failing step truncates the chain)
//! 4. Merge against the baseline
//! 5. Expose the result as the [`LiveState`]
//!
//! and its inverse on save. No stage of either pipeline interrupts the
//! caller: every failure is logged and degrades to the best state available
//! in memory.

use serde_json::Value;
use strata_merge::{MergeEngine, PolicyTable};
use strata_migrate::MigrationRegistry;
use strata_store::{empty_tree, EnvelopeCodec, EnvelopeFormat, KeyValueStore};

use crate::baseline::Baseline;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::fingerprint::Fingerprint;
use crate::live::{ControllerPhase, LiveState, LoadReport, RefreshOutcome, SaveStatus};

/// Sole writer of the live state and the stored envelope
#[derive(Debug)]
pub struct PersistenceController<S> {
    /// Backing store
    store: S,
    /// Compiled-in defaults
    baseline: Baseline,
    /// Field policies
    engine: MergeEngine,
    /// Schema upgrades
    migrations: MigrationRegistry,
    /// Envelope encoding
    codec: EnvelopeCodec,
    /// Configuration
    config: ControllerConfig,
    /// Current snapshot
    state: LiveState,
    /// Lifecycle phase
    phase: ControllerPhase,
    /// Outcome of the last load
    last_load: Option<LoadReport>,
}

/// Intermediate result of the read side of the pipeline
struct Reconciled {
    state: LiveState,
    report: LoadReport,
    needs_write_back: bool,
}

impl<S: KeyValueStore> PersistenceController<S> {
    /// Create controller without loading
    ///
    /// Checks the schema up front: every declared policy must fit its
    /// baseline value and the migration chain must have no gaps.
    ///
    /// # Errors
    /// Returns error if the configuration, the policy declarations or the
    /// migration registry are invalid
    pub fn new(
        store: S,
        baseline: Baseline,
        policies: PolicyTable,
        migrations: MigrationRegistry,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        policies.validate_against(baseline.tree())?;
        migrations.validate()?;

        tracing::debug!(
            "controller for key {} (schema v{}, {} declared fields)",
            config.storage_key,
            migrations.current_version(),
            policies.len()
        );

        Ok(Self {
            store,
            baseline,
            engine: MergeEngine::new(policies),
            migrations,
            codec: EnvelopeCodec::new().pretty(config.pretty),
            config,
            state: LiveState::empty(),
            phase: ControllerPhase::Uninitialized,
            last_load: None,
        })
    }

    /// Create controller and load the live state
    ///
    /// # Errors
    /// Returns error under the same conditions as [`new`](Self::new)
    pub fn open(
        store: S,
        baseline: Baseline,
        policies: PolicyTable,
        migrations: MigrationRegistry,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        let mut controller = Self::new(store, baseline, policies, migrations, config)?;
        controller.load();
        Ok(controller)
    }

    /// Current live state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &LiveState {
        &self.state
    }

    /// Lifecycle phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// Outcome of the most recent load or refresh
    #[inline]
    #[must_use]
    pub fn last_load(&self) -> Option<&LoadReport> {
        self.last_load.as_ref()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Baseline data set
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Declared field policies
    #[inline]
    #[must_use]
    pub fn policies(&self) -> &PolicyTable {
        self.engine.table()
    }

    /// Schema version the registry upgrades to
    #[inline]
    #[must_use]
    pub fn target_version(&self) -> u32 {
        self.migrations.current_version()
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the live state from the store
    ///
    /// Never fails: on the first load an unreadable store or corrupt
    /// envelope yields the first-run state, a failing migration yields the
    /// partially migrated tree at the version actually reached. Once a state
    /// is live, an unreadable or corrupt store leaves it in place.
    pub fn load(&mut self) -> &LiveState {
        let Reconciled {
            state,
            mut report,
            needs_write_back,
        } = self.read_and_reconcile();

        if self.phase != ControllerPhase::Uninitialized && (report.read_failed || report.decode_failed) {
            tracing::warn!(
                "store for {} unusable, keeping current state at v{}",
                self.config.storage_key,
                self.state.version()
            );
            report.version = self.state.version();
            report.kept_previous = true;
            self.last_load = Some(report);
            return &self.state;
        }

        if report.is_degraded() {
            tracing::warn!(
                "loaded {} at v{} with degradation (format {}, stored v{})",
                self.config.storage_key,
                report.version,
                report.format,
                report.stored_version
            );
        } else {
            tracing::info!(
                "loaded {} at v{} (format {})",
                self.config.storage_key,
                report.version,
                report.format
            );
        }

        self.state = state;
        self.last_load = Some(report);
        self.phase = ControllerPhase::Loaded;

        if self.config.save_on_load && needs_write_back {
            let status = self.persist();
            if status.is_saved() {
                tracing::debug!("wrote reconciled state back to {}", self.config.storage_key);
            }
        }

        &self.state
    }

    /// Re-run the load pipeline against whatever the store now holds
    ///
    /// A store that cannot be read or decoded keeps the current live state
    /// and phase; the outcome then reports no change.
    pub fn refresh(&mut self) -> RefreshOutcome {
        let previous = self.state.fingerprint();
        self.load();
        let current = self.state.fingerprint();
        let changed = previous != current;

        if changed {
            tracing::info!("refresh picked up changes ({} -> {})", previous.short(), current.short());
        } else {
            tracing::debug!("refresh found no changes");
        }

        RefreshOutcome {
            changed,
            previous,
            current,
        }
    }

    /// Apply a mutation producing the next full tree, then save
    pub fn mutate<F>(&mut self, f: F) -> SaveStatus
    where
        F: FnOnce(&Value) -> Value,
    {
        self.ensure_loaded();
        let next = f(self.state.data());
        self.replace(next)
    }

    /// Replace the whole tree, then save
    pub fn replace(&mut self, tree: Value) -> SaveStatus {
        self.ensure_loaded();
        self.state = LiveState::new(tree, self.state.version());
        self.phase = ControllerPhase::Mutated;
        self.save()
    }

    /// Persist the live state at its version
    ///
    /// Failures leave the in-memory state authoritative and are returned
    /// as [`SaveStatus::Failed`].
    pub fn save(&mut self) -> SaveStatus {
        let status = self.persist();
        if status.is_saved() {
            self.phase = ControllerPhase::Saved;
        }
        status
    }

    /// Restore defaults: the baseline reconciled with an empty tree at the
    /// current schema version replaces the stored envelope wholesale
    pub fn reset(&mut self) -> SaveStatus {
        let version = self.migrations.current_version();
        let data = self.merge_or_keep(empty_tree());
        tracing::info!("resetting {} to defaults at v{}", self.config.storage_key, version);

        self.state = LiveState::new(data, version);
        self.phase = ControllerPhase::Mutated;
        self.save()
    }

    /// Encode the live state as backup text (always indented)
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn export_backup(&self) -> Result<String, ControllerError> {
        let text = self
            .codec
            .pretty(true)
            .encode(self.state.data(), self.state.version())?;
        Ok(text)
    }

    /// Restore from backup text, then save
    ///
    /// The backup goes through the same migrate and merge stages as a
    /// stored envelope. Unlike [`load`](Self::load), unreadable input is
    /// rejected and the live state is left untouched.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidBackup`] if the text cannot be
    /// decoded, or [`ControllerError::BackupShape`] if its data tree is not
    /// an object
    pub fn import_backup(&mut self, raw: &str) -> Result<SaveStatus, ControllerError> {
        let decoded = self.codec.decode(Some(raw)).map_err(ControllerError::InvalidBackup)?;
        if !decoded.data.is_object() {
            return Err(ControllerError::BackupShape(strata_merge::value_kind(&decoded.data)));
        }

        tracing::info!(
            "importing backup (format {}, v{})",
            decoded.format,
            decoded.version
        );

        let (state, _) = self.reconcile(decoded.data, decoded.version);
        self.state = state;
        self.phase = ControllerPhase::Mutated;
        Ok(self.save())
    }

    fn ensure_loaded(&mut self) {
        if self.phase == ControllerPhase::Uninitialized {
            self.load();
        }
    }

    fn read_and_reconcile(&self) -> Reconciled {
        let key = &self.config.storage_key;

        let (raw, read_failed) = match self.store.get(key) {
            Ok(raw) => (raw, false),
            Err(e) => {
                tracing::warn!("could not read {}: {}", key, e);
                (None, true)
            }
        };

        let (decoded, decode_error) = self.codec.decode_or_empty(raw.as_deref());
        let decode_failed = decode_error.is_some();

        let format = decoded.format;
        let stored_version = decoded.version;
        let stored_fingerprint = Fingerprint::of(&decoded.data);

        let (state, migration_stopped) = self.reconcile(decoded.data, decoded.version);

        let needs_write_back = !read_failed
            && (format != EnvelopeFormat::Current
                || state.version() != stored_version
                || state.fingerprint() != stored_fingerprint);

        Reconciled {
            report: LoadReport {
                format,
                stored_version,
                version: state.version(),
                target_version: self.migrations.current_version(),
                read_failed,
                decode_failed,
                migration_stopped,
                kept_previous: false,
            },
            state,
            needs_write_back,
        }
    }

    /// Migrate then merge; returns the state and whether migration stopped
    fn reconcile(&self, data: Value, version: u32) -> (LiveState, bool) {
        let (migrated, reached, stopped) = match self.migrations.run(data, version) {
            Ok(migrated) => (migrated.data, migrated.reached, false),
            Err(partial) => {
                tracing::warn!("continuing with partially migrated data: {}", partial);
                let (data, reached) = partial.into_parts();
                (data, reached, true)
            }
        };

        (LiveState::new(self.merge_or_keep(migrated), reached), stopped)
    }

    fn merge_or_keep(&self, user: Value) -> Value {
        match self.engine.merge(&user, self.baseline.tree()) {
            Ok(merged) => merged,
            Err(e) => {
                tracing::error!("merge failed, keeping unreconciled data: {}", e);
                user
            }
        }
    }

    fn persist(&self) -> SaveStatus {
        let key = &self.config.storage_key;

        let text = match self.codec.encode(self.state.data(), self.state.version()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("could not encode live state, keeping it in memory: {}", e);
                return SaveStatus::Failed(e.into());
            }
        };

        match self.store.set(key, &text) {
            Ok(()) => {
                tracing::debug!("saved {} at v{} ({} bytes)", key, self.state.version(), text.len());
                SaveStatus::Saved { bytes: text.len() }
            }
            Err(e) => {
                tracing::warn!("save to {} failed, keeping in-memory state: {}", key, e);
                SaveStatus::Failed(e.into())
            }
        }
    }
}
