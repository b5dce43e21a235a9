//! Bracket-notation query-string decoding.
//!
//! ```text
//! age[$gt]=18&$sort[name]=1&$or[0][name]=a&$or[1][name]=b
//!   => {"age": {"$gt": "18"}, "$sort": {"name": "1"}, "$or": [{"name": "a"}, {"name": "b"}]}
//! ```
//!
//! Values are never typed here; they stay strings and the filter converters parse
//! what they need.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Bracket segments honoured per key; the remainder becomes one literal segment.
const MAX_DEPTH: usize = 5;
/// Highest bracket index that still builds an array; larger ones are object keys.
const ARRAY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
enum Node {
    Scalar(Value),
    /// Possibly sparse; compacted in index order on output.
    List(BTreeMap<usize, Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    fn text(value: String) -> Self {
        Self::Scalar(Value::String(value))
    }

    fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    fn into_value(self) -> Value {
        match self {
            Self::Scalar(value) => value,
            Self::List(items) => Value::Array(items.into_values().map(Self::into_value).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, node)| (key, node.into_value()))
                    .collect(),
            ),
        }
    }
}

fn push(items: &mut BTreeMap<usize, Node>, node: Node) {
    let next = items.keys().next_back().map_or(0, |last| last + 1);
    items.insert(next, node);
}

fn list_entries(items: BTreeMap<usize, Node>) -> Vec<(String, Node)> {
    items
        .into_iter()
        .map(|(index, node)| (index.to_string(), node))
        .collect()
}

fn merge_entries(mut target: Vec<(String, Node)>, source: Vec<(String, Node)>) -> Node {
    for (key, node) in source {
        match target.iter().position(|(existing, _)| *existing == key) {
            Some(position) => {
                let (_, existing) = target.remove(position);
                target.insert(position, (key, merge(existing, node)));
            }
            None => target.push((key, node)),
        }
    }
    Node::Map(target)
}

/// Deep merge used when several keys address the same path.
fn merge(target: Node, source: Node) -> Node {
    match (target, source) {
        (Node::List(mut items), Node::Scalar(value)) => {
            push(&mut items, Node::Scalar(value));
            Node::List(items)
        }
        (Node::Map(mut entries), Node::Scalar(value)) => {
            // A bare value merged into an object becomes a flag key
            let key = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if !entries.iter().any(|(existing, _)| *existing == key) {
                entries.push((key, Node::Scalar(Value::Bool(true))));
            }
            Node::Map(entries)
        }
        (Node::Scalar(first), Node::Scalar(second)) => Node::List(BTreeMap::from([
            (0, Node::Scalar(first)),
            (1, Node::Scalar(second)),
        ])),
        (Node::Scalar(first), Node::List(items)) => {
            let mut merged = BTreeMap::from([(0, Node::Scalar(first))]);
            merged.extend(items.into_iter().map(|(index, node)| (index + 1, node)));
            Node::List(merged)
        }
        (Node::Scalar(first), map @ Node::Map(_)) => {
            Node::List(BTreeMap::from([(0, Node::Scalar(first)), (1, map)]))
        }
        (Node::List(mut target), Node::List(source)) => {
            for (index, node) in source {
                match target.remove(&index) {
                    Some(existing) if existing.is_container() && node.is_container() => {
                        target.insert(index, merge(existing, node));
                    }
                    Some(existing) => {
                        target.insert(index, existing);
                        push(&mut target, node);
                    }
                    None => {
                        target.insert(index, node);
                    }
                }
            }
            Node::List(target)
        }
        (Node::List(target), Node::Map(source)) => merge_entries(list_entries(target), source),
        (Node::Map(target), Node::List(source)) => merge_entries(target, list_entries(source)),
        (Node::Map(target), Node::Map(source)) => merge_entries(target, source),
    }
}

/// Next `[...]` group (no nested brackets) at or after `from`, as a byte range.
fn next_group(key: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = key.as_bytes();
    let mut start = from;
    while start < bytes.len() {
        let open = start + key[start..].find('[')?;
        let close = key[open + 1..]
            .find(['[', ']'])
            .map(|offset| open + 1 + offset);
        match close {
            Some(close) if bytes[close] == b']' => return Some((open, close + 1)),
            Some(close) => start = close,
            None => return None,
        }
    }
    None
}

/// `a[b][c]` => `["a", "[b]", "[c]"]`.
fn split_key(key: &str) -> Vec<String> {
    let first = next_group(key, 0);
    let parent = first.map_or(key, |(start, _)| &key[..start]);

    let mut segments = Vec::new();
    if !parent.is_empty() {
        segments.push(parent.to_string());
    }

    let mut cursor = 0;
    let mut depth = 0;
    while let Some((start, end)) = next_group(key, cursor) {
        if depth == MAX_DEPTH {
            segments.push(format!("[{}]", &key[start..]));
            break;
        }
        segments.push(key[start..end].to_string());
        cursor = end;
        depth += 1;
    }
    segments
}

fn strip_brackets(segment: &str) -> &str {
    segment
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(segment)
}

fn array_index(segment: &str) -> Option<usize> {
    let inner = strip_brackets(segment);
    if inner == segment {
        return None;
    }
    let index: usize = inner.parse().ok()?;
    (index.to_string() == inner && index <= ARRAY_LIMIT).then_some(index)
}

/// Wrap `leaf` in the containers the key segments describe, innermost first.
fn nest(segments: &[String], leaf: Node) -> Node {
    segments.iter().rev().fold(leaf, |node, segment| {
        if segment == "[]" {
            match node {
                list @ Node::List(_) => list,
                other => Node::List(BTreeMap::from([(0, other)])),
            }
        } else if let Some(index) = array_index(segment) {
            Node::List(BTreeMap::from([(index, node)]))
        } else {
            Node::Map(vec![(strip_brackets(segment).to_string(), node)])
        }
    })
}

/// Decode an `application/x-www-form-urlencoded` query string into the nested
/// query object. A leading `?` is ignored.
#[must_use]
pub fn parse_query_string(input: &str) -> Map<String, Value> {
    let input = input.strip_prefix('?').unwrap_or(input);

    // Repeated raw keys collect their values first
    let mut raw: Vec<(String, Vec<String>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        match positions.get(key.as_ref()) {
            Some(&position) => raw[position].1.push(value.into_owned()),
            None => {
                positions.insert(key.to_string(), raw.len());
                raw.push((key.into_owned(), vec![value.into_owned()]));
            }
        }
    }

    let mut result = Node::Map(Vec::new());
    for (key, mut values) in raw {
        let leaf = if values.len() == 1 {
            Node::text(values.remove(0))
        } else {
            Node::List(values.into_iter().map(Node::text).enumerate().collect())
        };
        let segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        result = merge(result, nest(&segments, leaf));
    }

    match result.into_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
