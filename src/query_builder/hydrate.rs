use crate::traits::RelationKind;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Remove the `alias.`-prefixed columns from `fields`, returning them unprefixed.
fn take_prefixed(fields: &mut Map<String, Value>, alias: &str) -> Map<String, Value> {
    let prefix = format!("{alias}.");
    let keys: Vec<String> = fields
        .keys()
        .filter(|key| key.starts_with(&prefix))
        .cloned()
        .collect();
    keys.into_iter()
        .filter_map(|key| {
            let value = fields.shift_remove(&key)?;
            Some((key[prefix.len()..].to_string(), value))
        })
        .collect()
}

/// Fold flat joined rows into one object per root row.
///
/// Rows are grouped by `primary_key`, keeping first-seen order. A joined object whose
/// columns are all null (no match on the left join) is dropped.
pub(crate) fn hydrate(
    rows: Vec<Value>,
    relations: &[(String, RelationKind)],
    primary_key: &str,
) -> Vec<Value> {
    if relations.is_empty() {
        return rows;
    }

    let mut records: Vec<Map<String, Value>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Value::Object(mut fields) = row else {
            continue;
        };
        let related: Vec<Map<String, Value>> = relations
            .iter()
            .map(|(alias, _)| take_prefixed(&mut fields, alias))
            .collect();

        let key = fields
            .get(primary_key)
            .filter(|value| !value.is_null())
            .map(Value::to_string);
        let position = match key.as_ref().and_then(|key| positions.get(key)) {
            Some(&position) => position,
            None => {
                for (alias, kind) in relations {
                    let empty = match kind {
                        RelationKind::Many => Value::Array(Vec::new()),
                        RelationKind::One => Value::Null,
                    };
                    fields.insert(alias.clone(), empty);
                }
                records.push(fields);
                let position = records.len() - 1;
                if let Some(key) = key {
                    positions.insert(key, position);
                }
                position
            }
        };

        let record = &mut records[position];
        for ((alias, kind), object) in relations.iter().zip(related) {
            if object.values().all(Value::is_null) {
                continue;
            }
            let object = Value::Object(object);
            match kind {
                RelationKind::Many => {
                    if let Some(Value::Array(items)) = record.get_mut(alias)
                        && !items.contains(&object)
                    {
                        items.push(object);
                    }
                }
                RelationKind::One => {
                    record.insert(alias.clone(), object);
                }
            }
        }
    }

    records.into_iter().map(Value::Object).collect()
}
