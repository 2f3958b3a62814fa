//! Schema reconciliation: which columns must be created before an importer can stream.

use std::collections::BTreeSet;

use crate::error::{ImportError, ImportResult};
use crate::types::ColumnSpec;

/// Return one creation request per requested column whose name is not in `existing_keys`,
/// in request order.
///
/// Existing columns are not inspected here; see [`check_compatible`] for the strict variant.
/// Applying the result and planning again yields nothing.
pub fn plan(existing_keys: &BTreeSet<String>, requested: &[ColumnSpec]) -> Vec<ColumnSpec> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut out = Vec::new();
    for spec in requested {
        if !existing_keys.contains(&spec.name) && seen.insert(spec.name.as_str()) {
            out.push(spec.clone());
        }
    }
    out
}

/// Fail with [`ImportError::SchemaConflict`] if a pre-existing column disagrees with the
/// requested spec of the same name.
pub fn check_compatible(existing: &ColumnSpec, requested: &ColumnSpec) -> ImportResult<()> {
    let conflict = |message: String| ImportError::SchemaConflict {
        column: requested.name.clone(),
        message,
    };

    if existing.dtype != requested.dtype {
        return Err(conflict(format!(
            "store has dtype {}, importer declares {}",
            existing.dtype, requested.dtype
        )));
    }
    if existing.variable_shape != requested.variable_shape {
        return Err(conflict(format!(
            "store variable_shape={}, importer declares {}",
            existing.variable_shape, requested.variable_shape
        )));
    }
    // A variable-shape column accepts anything that fits its declared bound.
    let shape_ok = if existing.variable_shape {
        existing.shape.dims().len() == requested.shape.dims().len()
    } else {
        existing.shape == requested.shape
    };
    if !shape_ok {
        return Err(conflict(format!(
            "store has shape {}, importer declares {}",
            existing.shape, requested.shape
        )));
    }
    Ok(())
}
