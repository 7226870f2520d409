use tracing::trace;

use super::ops::MutationOp;
use crate::clock::check_explicit_timestamp;
use crate::error::{GraphError, Result};
use crate::events::GraphEvent;
use crate::model::{
    ElementKind, ExtendedDataCell, ExtendedDataRowId, HistoricalPropertyValue, Metadata,
    PropertyKey,
};
use crate::security::{Authorizations, Visibility};
use crate::storage::{ElementRecord, StoredProperty};

/// Inputs shared by every op of one commit.
pub(crate) struct ApplyContext<'a> {
    pub(crate) auths: &'a Authorizations,
    pub(crate) strict_write_visibility: bool,
    /// Commit timestamp used by every op without an explicit one.
    pub(crate) now: i64,
}

impl ApplyContext<'_> {
    pub(crate) fn ensure_writable(&self, visibility: &Visibility) -> Result<()> {
        if self.strict_write_visibility && !visibility.evaluate(self.auths) {
            return Err(GraphError::Security(format!(
                "authorizations {} cannot read visibility '{}'",
                self.auths, visibility
            )));
        }
        Ok(())
    }
}

/// Extended-data change staged by a mutation, applied after the record commits.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ExtendedChange {
    Write {
        row: ExtendedDataRowId,
        cell: ExtendedDataCell,
    },
    DeleteCell {
        row: ExtendedDataRowId,
        column: String,
        key: String,
        visibility: Visibility,
    },
    DeleteRow(ExtendedDataRowId),
}

/// Result of applying a mutation to a detached record copy.
pub(crate) struct Applied {
    pub(crate) record: ElementRecord,
    pub(crate) events: Vec<GraphEvent>,
    pub(crate) extended: Vec<ExtendedChange>,
    pub(crate) property_writes: usize,
    /// Largest explicit timestamp seen, if any.
    pub(crate) max_explicit_timestamp: Option<i64>,
}

/// Applies `ops` in order to `record`.
///
/// Pure with respect to the graph: on error the record copy is dropped and
/// nothing has been published.
pub(crate) fn apply(mut record: ElementRecord, ops: &[MutationOp], ctx: &ApplyContext<'_>) -> Result<Applied> {
    let mut events = Vec::new();
    let mut extended = Vec::new();
    let mut property_writes = 0;
    let mut max_explicit_timestamp: Option<i64> = None;
    let mut observe = |ts: Option<i64>| {
        if let Some(ts) = ts {
            max_explicit_timestamp = Some(max_explicit_timestamp.map_or(ts, |m| m.max(ts)));
        }
    };

    for op in ops {
        match op {
            MutationOp::WriteProperty {
                key,
                name,
                value,
                visibility,
                metadata,
                timestamp,
                replace_metadata,
            } => {
                if value.is_null() {
                    return Err(GraphError::NullPropertyValue { name: name.clone() });
                }
                ctx.ensure_writable(visibility)?;
                if let Some(metadata) = metadata {
                    metadata.validate(name)?;
                    for v in metadata.visibilities() {
                        ctx.ensure_writable(v)?;
                    }
                }
                check_explicit_timestamp(*timestamp)?;
                observe(*timestamp);
                let ts = timestamp.unwrap_or(ctx.now);
                let property_key = PropertyKey::new(key.clone(), name.clone(), visibility.clone());
                let existing = record.properties.get(&property_key);
                let metadata = match (metadata, replace_metadata) {
                    (Some(m), _) => m.clone(),
                    (None, true) => Metadata::new(),
                    (None, false) => existing.map(|p| p.metadata.clone()).unwrap_or_default(),
                };
                let newer = existing.map_or(true, |p| ts >= p.timestamp);
                record.history.push(HistoricalPropertyValue {
                    key: key.clone(),
                    name: name.clone(),
                    visibility: visibility.clone(),
                    value: Some(value.clone()),
                    metadata: metadata.clone(),
                    timestamp: ts,
                    is_deleted: false,
                });
                if newer {
                    record.properties.insert(
                        property_key.clone(),
                        StoredProperty {
                            key: property_key.clone(),
                            value: value.clone(),
                            metadata,
                            timestamp: ts,
                        },
                    );
                    events.push(GraphEvent::AddProperty {
                        element: record.id.clone(),
                        property: property_key,
                        value: value.clone(),
                    });
                } else {
                    trace!(property = %property_key, timestamp = ts, "mutation.write.history_only");
                }
                property_writes += 1;
            }
            MutationOp::DeleteProperty {
                key,
                name,
                visibility,
                soft,
            } => {
                let targets = readable_keys(&record, ctx.auths, |k| {
                    &k.key == key
                        && &k.name == name
                        && visibility.as_ref().map_or(true, |v| &k.visibility == v)
                });
                for target in targets {
                    delete_property(&mut record, &target, *soft, ctx.now, &mut events);
                }
            }
            MutationOp::DeleteProperties { name, soft } => {
                let targets = readable_keys(&record, ctx.auths, |k| &k.name == name);
                for target in targets {
                    delete_property(&mut record, &target, *soft, ctx.now, &mut events);
                }
            }
            MutationOp::SetPropertyHidden {
                key,
                name,
                property_visibility,
                visibility,
                hidden,
            } => {
                let property_key =
                    PropertyKey::new(key.clone(), name.clone(), property_visibility.clone());
                if !record.properties.contains_key(&property_key)
                    || !property_visibility.evaluate(ctx.auths)
                {
                    trace!(property = %property_key, "mutation.hide.no_property");
                    continue;
                }
                if record
                    .property_hidden_log_mut(&property_key)
                    .set(visibility, *hidden, ctx.now)
                {
                    events.push(hidden_event(&record, Some(property_key), visibility, *hidden));
                }
            }
            MutationOp::AlterPropertyVisibility {
                key,
                name,
                old_visibility,
                new_visibility,
            } => {
                ctx.ensure_writable(new_visibility)?;
                let Some(old_key) = readable_keys(&record, ctx.auths, |k| {
                    &k.key == key
                        && &k.name == name
                        && old_visibility.as_ref().map_or(true, |v| &k.visibility == v)
                })
                .into_iter()
                .next() else {
                    trace!(key = %key, name = %name, "mutation.alter_visibility.no_property");
                    continue;
                };
                if &old_key.visibility == new_visibility {
                    continue;
                }
                let Some(prev) = record.properties.remove(&old_key) else {
                    continue;
                };
                let new_key = PropertyKey::new(key.clone(), name.clone(), new_visibility.clone());
                if let Some(displaced) = record.properties.remove(&new_key) {
                    record.history.push(HistoricalPropertyValue {
                        key: key.clone(),
                        name: name.clone(),
                        visibility: new_visibility.clone(),
                        value: None,
                        metadata: displaced.metadata,
                        timestamp: ctx.now,
                        is_deleted: true,
                    });
                    record.property_hidden.remove(&new_key);
                    events.push(GraphEvent::DeleteProperty {
                        element: record.id.clone(),
                        property: new_key.clone(),
                        soft: false,
                    });
                }
                record.history.push(HistoricalPropertyValue {
                    key: key.clone(),
                    name: name.clone(),
                    visibility: old_key.visibility.clone(),
                    value: None,
                    metadata: prev.metadata.clone(),
                    timestamp: ctx.now,
                    is_deleted: true,
                });
                record.history.push(HistoricalPropertyValue {
                    key: key.clone(),
                    name: name.clone(),
                    visibility: new_visibility.clone(),
                    value: Some(prev.value.clone()),
                    metadata: prev.metadata.clone(),
                    timestamp: ctx.now,
                    is_deleted: false,
                });
                record.properties.insert(
                    new_key.clone(),
                    StoredProperty {
                        key: new_key.clone(),
                        value: prev.value.clone(),
                        metadata: prev.metadata,
                        timestamp: ctx.now,
                    },
                );
                events.push(GraphEvent::DeleteProperty {
                    element: record.id.clone(),
                    property: old_key,
                    soft: false,
                });
                events.push(GraphEvent::AddProperty {
                    element: record.id.clone(),
                    property: new_key,
                    value: prev.value,
                });
            }
            MutationOp::SetPropertyMetadata {
                key,
                name,
                property_visibility,
                metadata_key,
                value,
                metadata_visibility,
            } => {
                if value.is_null() {
                    return Err(GraphError::InvalidArgument(format!(
                        "metadata '{metadata_key}' on property '{name}' cannot have a null value"
                    )));
                }
                ctx.ensure_writable(metadata_visibility)?;
                let property_key =
                    PropertyKey::new(key.clone(), name.clone(), property_visibility.clone());
                match record.properties.get_mut(&property_key) {
                    Some(property) if property_visibility.evaluate(ctx.auths) => {
                        property
                            .metadata
                            .add(metadata_key.clone(), value.clone(), metadata_visibility.clone());
                    }
                    _ => trace!(property = %property_key, "mutation.metadata.no_property"),
                }
            }
            MutationOp::AlterElementVisibility(visibility) => {
                ctx.ensure_writable(visibility)?;
                if &record.visibility != visibility {
                    let type_name = record.type_name.clone();
                    record.push_version(visibility.clone(), type_name, false, ctx.now);
                }
            }
            MutationOp::SetElementHidden { visibility, hidden } => {
                if record.hidden.set(visibility, *hidden, ctx.now) {
                    events.push(hidden_event(&record, None, visibility, *hidden));
                }
            }
            MutationOp::AlterTypeName(type_name) => {
                if record.kind() == ElementKind::Edge && type_name.is_empty() {
                    return Err(GraphError::InvalidArgument(format!(
                        "edge '{}' requires a label",
                        record.id.id
                    )));
                }
                if &record.type_name != type_name {
                    let visibility = record.visibility.clone();
                    record.push_version(visibility, type_name.clone(), false, ctx.now);
                }
            }
            MutationOp::AddExtendedData {
                table,
                row,
                column,
                key,
                value,
                visibility,
                timestamp,
            } => {
                let row_id = extended_row_id(&record, table, row)?;
                if column.is_empty() {
                    return Err(GraphError::InvalidArgument(format!(
                        "extended data row '{row_id}' requires a column name"
                    )));
                }
                if value.is_null() {
                    return Err(GraphError::NullPropertyValue {
                        name: column.clone(),
                    });
                }
                ctx.ensure_writable(visibility)?;
                check_explicit_timestamp(*timestamp)?;
                observe(*timestamp);
                extended.push(ExtendedChange::Write {
                    row: row_id,
                    cell: ExtendedDataCell {
                        name: column.clone(),
                        key: key.clone(),
                        value: value.clone(),
                        visibility: visibility.clone(),
                        timestamp: timestamp.unwrap_or(ctx.now),
                    },
                });
            }
            MutationOp::DeleteExtendedData {
                table,
                row,
                column,
                key,
                visibility,
            } => {
                let row_id = extended_row_id(&record, table, row)?;
                extended.push(ExtendedChange::DeleteCell {
                    row: row_id,
                    column: column.clone(),
                    key: key.clone(),
                    visibility: visibility.clone(),
                });
            }
            MutationOp::DeleteExtendedDataRow { table, row } => {
                extended.push(ExtendedChange::DeleteRow(extended_row_id(&record, table, row)?));
            }
        }
    }

    Ok(Applied {
        record,
        events,
        extended,
        property_writes,
        max_explicit_timestamp,
    })
}

/// Live property identities matching `keep` whose visibility `auths` satisfies.
fn readable_keys(
    record: &ElementRecord,
    auths: &Authorizations,
    keep: impl Fn(&PropertyKey) -> bool,
) -> Vec<PropertyKey> {
    record
        .properties
        .keys()
        .filter(|k| keep(k) && k.visibility.evaluate(auths))
        .cloned()
        .collect()
}

/// Removes a live property and appends its delete marker.
pub(crate) fn delete_property(
    record: &mut ElementRecord,
    key: &PropertyKey,
    soft: bool,
    now: i64,
    events: &mut Vec<GraphEvent>,
) {
    let Some(prev) = record.properties.remove(key) else {
        return;
    };
    record.history.push(HistoricalPropertyValue {
        key: key.key.clone(),
        name: key.name.clone(),
        visibility: key.visibility.clone(),
        value: None,
        metadata: prev.metadata,
        timestamp: now.max(prev.timestamp),
        is_deleted: true,
    });
    if !soft {
        record.property_hidden.remove(key);
    }
    events.push(GraphEvent::DeleteProperty {
        element: record.id.clone(),
        property: key.clone(),
        soft,
    });
}

fn hidden_event(
    record: &ElementRecord,
    property: Option<PropertyKey>,
    visibility: &Visibility,
    hidden: bool,
) -> GraphEvent {
    let element = record.id.clone();
    let visibility = visibility.clone();
    if hidden {
        GraphEvent::MarkHidden {
            element,
            property,
            visibility,
        }
    } else {
        GraphEvent::MarkVisible {
            element,
            property,
            visibility,
        }
    }
}

fn extended_row_id(record: &ElementRecord, table: &str, row: &str) -> Result<ExtendedDataRowId> {
    if table.is_empty() || row.is_empty() {
        return Err(GraphError::InvalidArgument(format!(
            "extended data on {} requires a table name and row id",
            record.id
        )));
    }
    Ok(ExtendedDataRowId::new(
        record.id.kind,
        record.id.id.clone(),
        table,
        row,
    ))
}
