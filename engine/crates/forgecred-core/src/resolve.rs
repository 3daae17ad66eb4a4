//! Form schema resolution - raw caller input plus schema defaults into an `InputSet`

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldSpec};
use crate::inputs::{InputSet, RawInputs};
use crate::value::Value;
use std::collections::HashMap;
use tracing::trace;

/// Resolve raw caller input against a field list.
///
/// Plain fields take the raw value, else their default, else the kind's empty
/// value. Dependent fields take the raw value when the caller supplied one,
/// otherwise `when_true`/`when_false` according to the controlling field's
/// resolved value. Note fields are dropped and unknown raw keys pass through.
pub fn resolve(fields: &[FieldSpec], raw: &RawInputs) -> Result<InputSet> {
    let by_name: HashMap<&str, &FieldSpec> =
        fields.iter().map(|f| (f.name.as_str(), f)).collect();
    let mut inputs = InputSet::new();

    for field in fields {
        if field.kind == FieldKind::Note || field.dependency.is_some() {
            continue;
        }
        let value = match supplied(raw, &field.name) {
            Some(value) => coerce(field, value.clone())?,
            None => default_for(field),
        };
        put(&mut inputs, field, value);
    }

    // Controlling fields never have dependencies, so they are all resolved by now.
    for field in fields {
        let Some(dep) = &field.dependency else {
            continue;
        };
        let source = by_name.get(dep.field.as_str()).ok_or_else(|| {
            Error::field(
                &field.name,
                format!("depends on unknown field '{}'", dep.field),
            )
        })?;
        if source.dependency.is_some() || source.kind == FieldKind::Note {
            return Err(Error::field(
                &field.name,
                format!("controlling field '{}' cannot drive a default", dep.field),
            ));
        }

        let value = match supplied(raw, &field.name) {
            Some(value) => coerce(field, value.clone())?,
            None => {
                let controlling = inputs
                    .get(&dep.field)
                    .and_then(Value::to_flag)
                    .unwrap_or(false);
                trace!(
                    field = %field.name,
                    controller = %dep.field,
                    controlling,
                    "resolved dependent default"
                );
                if controlling {
                    dep.when_true.clone()
                } else {
                    dep.when_false.clone()
                }
            }
        };
        put(&mut inputs, field, value);
    }

    for (name, value) in raw {
        if !by_name.contains_key(name.as_str()) {
            inputs.insert(name.clone(), value.clone());
        }
    }

    Ok(inputs)
}

fn supplied<'a>(raw: &'a RawInputs, name: &str) -> Option<&'a Value> {
    raw.get(name).filter(|v| !v.is_null())
}

fn default_for(field: &FieldSpec) -> Value {
    if let Some(default) = &field.default {
        return default.clone();
    }
    match field.kind {
        FieldKind::Select => field
            .options
            .first()
            .map(|o| Value::text(o.as_str()))
            .unwrap_or_else(|| field.kind.empty_value()),
        kind => kind.empty_value(),
    }
}

fn coerce(field: &FieldSpec, value: Value) -> Result<Value> {
    if field.kind != FieldKind::Bool {
        return Ok(value);
    }
    value.to_flag().map(Value::Bool).ok_or_else(|| {
        Error::field(
            &field.name,
            format!("expected a boolean, got '{}'", value),
        )
    })
}

fn put(inputs: &mut InputSet, field: &FieldSpec, value: Value) {
    if field.is_secret() {
        inputs.insert_secret(field.name.clone(), value);
    } else {
        inputs.insert(field.name.clone(), value);
    }
}
