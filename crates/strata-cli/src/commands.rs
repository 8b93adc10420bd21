//! Subcommand bodies
//!
//! Each command takes the opened controller and an output sink so the
//! binary and the tests share one code path.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use strata_core::{PersistenceController, SaveStatus};
use strata_store::KeyValueStore;

/// Print the live tree, or one field of it
///
/// `field` is either a top-level field name or a JSON pointer.
///
/// # Errors
/// Returns error if the field is absent or output fails
pub fn show<S: KeyValueStore>(
    controller: &PersistenceController<S>,
    field: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let state = controller.state();
    let value = match field {
        None => state.data(),
        Some(pointer) if pointer.starts_with('/') => state
            .pointer(pointer)
            .ok_or_else(|| anyhow!("nothing at {pointer}"))?,
        Some(name) => state.get(name).ok_or_else(|| anyhow!("no field named {name:?}"))?,
    };
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Re-read the store and report whether the live tree changed
///
/// # Errors
/// Returns error if output fails
pub fn refresh<S: KeyValueStore>(
    controller: &mut PersistenceController<S>,
    out: &mut dyn Write,
) -> Result<()> {
    let outcome = controller.refresh();
    if outcome.changed {
        writeln!(
            out,
            "changed {} -> {}",
            outcome.previous.short(),
            outcome.current.short()
        )?;
    } else {
        writeln!(out, "unchanged {}", outcome.current.short())?;
    }
    Ok(())
}

/// Set the value at `pointer` to `raw` (JSON text) and persist
///
/// # Errors
/// Returns error if `raw` is not JSON, the pointer does not resolve to a
/// writable slot, or the save fails
pub fn set<S: KeyValueStore>(
    controller: &mut PersistenceController<S>,
    pointer: &str,
    raw: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("value {raw:?} is not JSON"))?;

    let mut next = controller.state().data().clone();
    set_pointer(&mut next, pointer, value)?;

    finish(controller.replace(next))?;
    writeln!(out, "set {pointer}")?;
    Ok(())
}

/// Replace the live tree with the baseline and persist
///
/// # Errors
/// Returns error if the save fails
pub fn reset<S: KeyValueStore>(
    controller: &mut PersistenceController<S>,
    out: &mut dyn Write,
) -> Result<()> {
    finish(controller.reset())?;
    writeln!(out, "reset to baseline at v{}", controller.state().version())?;
    Ok(())
}

/// Write a backup to `path`, or to `out` when no path is given
///
/// # Errors
/// Returns error if encoding or writing fails
pub fn export<S: KeyValueStore>(
    controller: &PersistenceController<S>,
    path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let text = controller.export_backup()?;
    match path {
        Some(path) => {
            std::fs::write(path, text.as_bytes())
                .with_context(|| format!("writing backup to {}", path.display()))?;
            writeln!(out, "exported {} bytes to {}", text.len(), path.display())?;
        }
        None => writeln!(out, "{text}")?,
    }
    Ok(())
}

/// Restore a backup file (any envelope format) and persist it
///
/// # Errors
/// Returns error if the file cannot be read, is not a backup, or the save
/// fails
pub fn import<S: KeyValueStore>(
    controller: &mut PersistenceController<S>,
    path: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading backup {}", path.display()))?;
    finish(controller.import_backup(&raw)?)?;
    writeln!(
        out,
        "imported {} at v{}",
        path.display(),
        controller.state().version()
    )?;
    Ok(())
}

/// Print controller, load and policy status
///
/// # Errors
/// Returns error if output fails
pub fn status<S: KeyValueStore>(
    controller: &PersistenceController<S>,
    location: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let state = controller.state();
    writeln!(out, "store:    {location}")?;
    writeln!(out, "key:      {}", controller.config().storage_key)?;
    writeln!(out, "phase:    {}", controller.phase())?;
    writeln!(out, "version:  {} (target {})", state.version(), controller.target_version())?;
    writeln!(out, "content:  {}", state.fingerprint().short())?;
    writeln!(out, "baseline: {}", controller.baseline().fingerprint().short())?;

    if let Some(report) = controller.last_load() {
        writeln!(out, "loaded:   {} envelope, stored v{}", report.format, report.stored_version)?;
        if report.read_failed {
            writeln!(out, "warning:  store could not be read, running on baseline")?;
        }
        if report.decode_failed {
            writeln!(out, "warning:  stored text was corrupt and has been replaced")?;
        }
        if report.kept_previous {
            writeln!(out, "warning:  last reload failed, showing the previous state")?;
        }
        if report.migration_stopped {
            writeln!(out, "warning:  migration stopped at v{}", report.version)?;
        }
    }

    writeln!(out, "policies:")?;
    for (field, policy) in controller.policies().iter() {
        writeln!(out, "  {field:<12} {}", policy.name())?;
    }
    Ok(())
}

fn finish(status: SaveStatus) -> Result<()> {
    match status {
        SaveStatus::Saved { .. } => Ok(()),
        SaveStatus::Failed(err) => Err(anyhow::Error::new(err).context("change applied but not saved")),
    }
}

/// Write `value` at a JSON pointer, creating the final object key or
/// appending to an array with `-`
fn set_pointer(tree: &mut Value, pointer: &str, value: Value) -> Result<()> {
    let Some(path) = pointer.strip_prefix('/') else {
        bail!("pointer {pointer:?} must start with '/'");
    };
    let mut tokens: Vec<String> = path
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();
    let Some(last) = tokens.pop() else {
        bail!("empty pointer");
    };

    let mut slot = tree;
    for token in &tokens {
        slot = match slot {
            Value::Object(fields) => fields.get_mut(token.as_str()),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| anyhow!("nothing at {token:?} in {pointer}"))?;
    }

    match slot {
        Value::Object(fields) => {
            fields.insert(last, value);
        }
        Value::Array(items) if last == "-" => items.push(value),
        Value::Array(items) => {
            let index: usize = last
                .parse()
                .with_context(|| format!("{last:?} is not an array index"))?;
            let item = items
                .get_mut(index)
                .ok_or_else(|| anyhow!("index {index} out of bounds in {pointer}"))?;
            *item = value;
        }
        other => bail!("cannot set {last:?} inside a non-container ({other})"),
    }
    Ok(())
}
