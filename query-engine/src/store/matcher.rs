//! Evaluation of MongoDB-style filters, projections and sorts over JSON
//! documents.
//!
//! Supported filter operators: `$eq $ne $gt $gte $lt $lte $in $nin $exists
//! $regex/$options $size $all $elemMatch $not` on fields and `$and $or $nor`
//! at the top level. Paths are dotted (`address.city`, `scores.0`) and
//! descend into arrays of sub-documents. Values are compared with MongoDB's
//! cross-type ordering; `{"$oid": ..}` and `{"$date": ..}` are treated as
//! ObjectIds and dates.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use regex::RegexBuilder;
use serde_json::{Map, Value};

use crate::descriptor::{Document, SortDirection, SortSpec};
use crate::error::StoreError;

static NULL: Value = Value::Null;

/// Whether `doc` satisfies `filter`.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => clauses(key, cond)?
                .iter()
                .try_fold(true, |acc, c| Ok::<_, StoreError>(acc && matches(doc, c)?))?,
            "$or" => clauses(key, cond)?
                .iter()
                .try_fold(false, |acc, c| Ok::<_, StoreError>(acc || matches(doc, c)?))?,
            "$nor" => !clauses(key, cond)?
                .iter()
                .try_fold(false, |acc, c| Ok::<_, StoreError>(acc || matches(doc, c)?))?,
            op if op.starts_with('$') => {
                return Err(StoreError::Unsupported(format!("top-level operator {op}")));
            }
            path => {
                let found = lookup(doc, path);
                match operator_map(cond) {
                    Some(ops) => eval_ops(&found, ops)?,
                    None => eq_any(&found, cond),
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, cond: &'a Value) -> Result<Vec<&'a Document>, StoreError> {
    let items = cond
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| StoreError::InvalidQuery(format!("{op} expects a non-empty array")))?;
    items
        .iter()
        .map(|c| {
            c.as_object()
                .ok_or_else(|| StoreError::InvalidQuery(format!("{op} entries must be objects")))
        })
        .collect()
}

/// `Some` when `cond` is a non-empty object whose keys are all operators.
fn operator_map(cond: &Value) -> Option<&Map<String, Value>> {
    cond.as_object()
        .filter(|m| !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
}

/* --------------------------- Path lookup --------------------------- */

/// All values reachable through a dotted path.
fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = segments.split_first()
        && let Some(v) = doc.get(*head)
    {
        descend(v, rest, &mut out);
    }
    out
}

fn descend<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = path.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(*head) {
                descend(v, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(v) = items.get(idx) {
                    descend(v, rest, out);
                }
            } else {
                for item in items.iter().filter(|i| i.is_object()) {
                    descend(item, path, out);
                }
            }
        }
        _ => {}
    }
}

/* ----------------------------- Operators ----------------------------- */

fn eval_ops(found: &[&Value], ops: &Map<String, Value>) -> Result<bool, StoreError> {
    // Missing fields compare like null.
    let null_only = [&NULL];
    let cands: &[&Value] = if found.is_empty() { &null_only } else { found };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => eq_any(found, arg),
            "$ne" => !eq_any(found, arg),
            "$gt" => cmp_any(cands, arg, |o| o == Ordering::Greater),
            "$gte" => cmp_any(cands, arg, |o| o != Ordering::Less),
            "$lt" => cmp_any(cands, arg, |o| o == Ordering::Less),
            "$lte" => cmp_any(cands, arg, |o| o != Ordering::Greater),
            "$in" => array_arg(op, arg)?.iter().any(|v| eq_any(found, v)),
            "$nin" => !array_arg(op, arg)?.iter().any(|v| eq_any(found, v)),
            "$exists" => truthy(arg) == !found.is_empty(),
            "$regex" => regex_any(found, arg, ops.get("$options"))?,
            "$options" if ops.contains_key("$regex") => true,
            "$size" => {
                let n = size_arg(arg)
                    .ok_or_else(|| StoreError::InvalidQuery("$size expects a number".into()))?;
                found
                    .iter()
                    .any(|v| v.as_array().is_some_and(|a| a.len() as u64 == n))
            }
            "$all" => {
                let wanted = array_arg(op, arg)?;
                !wanted.is_empty()
                    && found.iter().any(|v| wanted.iter().all(|w| eq_value(v, w)))
            }
            "$elemMatch" => elem_match(found, arg)?,
            "$not" => {
                let inner = operator_map(arg).ok_or_else(|| {
                    StoreError::InvalidQuery("$not expects an operator object".into())
                })?;
                !eval_ops(found, inner)?
            }
            other => return Err(StoreError::Unsupported(format!("operator {other}"))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn array_arg<'a>(op: &str, arg: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    arg.as_array()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{op} expects an array")))
}

/// Implicit equality: the value itself or, for arrays, any element.
fn eq_any(found: &[&Value], target: &Value) -> bool {
    if found.is_empty() {
        return target.is_null();
    }
    found.iter().any(|v| eq_value(v, target))
}

fn eq_value(v: &Value, target: &Value) -> bool {
    if compare_values(v, target) == Ordering::Equal {
        return true;
    }
    match v {
        Value::Array(items) => items
            .iter()
            .any(|i| compare_values(i, target) == Ordering::Equal),
        _ => false,
    }
}

/// Range comparison; only values of the same type bracket are compared.
fn cmp_any(cands: &[&Value], target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let test = |v: &Value| type_rank(v) == type_rank(target) && accept(compare_values(v, target));
    cands.iter().copied().any(|v| {
        test(v)
            || match v {
                Value::Array(items) => items.iter().any(&test),
                _ => false,
            }
    })
}

fn regex_any(found: &[&Value], pattern: &Value, options: Option<&Value>) -> Result<bool, StoreError> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| StoreError::InvalidQuery("$regex expects a string".into()))?;
    let flags = options.and_then(Value::as_str).unwrap_or("");

    let re = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| StoreError::InvalidQuery(format!("$regex: {e}")))?;

    let test = |v: &Value| v.as_str().is_some_and(|s| re.is_match(s));
    Ok(found.iter().copied().any(|v| {
        test(v)
            || match v {
                Value::Array(items) => items.iter().any(&test),
                _ => false,
            }
    }))
}

fn elem_match(found: &[&Value], arg: &Value) -> Result<bool, StoreError> {
    let cond = arg
        .as_object()
        .ok_or_else(|| StoreError::InvalidQuery("$elemMatch expects an object".into()))?;
    let ops = operator_map(arg);

    for v in found {
        let Value::Array(items) = v else { continue };
        for item in items {
            let hit = match (ops, item) {
                (Some(ops), _) => eval_ops(&[item], ops)?,
                (None, Value::Object(sub)) => matches(sub, cond)?,
                (None, _) => false,
            };
            if hit {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        _ => true,
    }
}

/* ----------------------------- Ordering ----------------------------- */

/// MongoDB type bracket: null < numbers < strings < objects < arrays
/// < ObjectId < booleans < dates.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(m) if is_wrapper(m, "$oid") => 7,
        Value::Object(m) if is_wrapper(m, "$date") => 9,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
        Value::Bool(_) => 8,
    }
}

fn is_wrapper(m: &Map<String, Value>, key: &str) -> bool {
    m.len() == 1 && m.contains_key(key)
}

/// Total order over JSON values following MongoDB's comparison rules.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(p, q)| compare_values(p, q))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

/// Sorts in place; ties keep their original relative order.
///
/// Array fields sort by their smallest element ascending and their largest
/// element descending. Missing fields sort like null.
pub fn sort_documents(docs: &mut [Document], spec: &SortSpec) {
    if spec.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        spec.keys()
            .iter()
            .map(|(field, dir)| {
                let ka = sort_key(a, field, *dir);
                let kb = sort_key(b, field, *dir);
                let o = compare_values(ka, kb);
                match dir {
                    SortDirection::Ascending => o,
                    SortDirection::Descending => o.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_key<'a>(doc: &'a Document, field: &str, dir: SortDirection) -> &'a Value {
    let mut keys: Vec<&Value> = Vec::new();
    for v in lookup(doc, field) {
        match v {
            Value::Array(items) => keys.extend(items.iter()),
            other => keys.push(other),
        }
    }
    let pick = match dir {
        SortDirection::Ascending => keys.into_iter().min_by(|a, b| compare_values(a, b)),
        SortDirection::Descending => keys.into_iter().max_by(|a, b| compare_values(a, b)),
    };
    pick.unwrap_or(&NULL)
}

/* ---------------------------- Projection ---------------------------- */

#[derive(Debug)]
enum Node {
    Leaf,
    Branch(BTreeMap<String, Node>),
}

fn insert_path(tree: &mut BTreeMap<String, Node>, path: &str) {
    let mut cur = tree;
    let mut segments = path.split('.').peekable();
    while let Some(seg) = segments.next() {
        if segments.peek().is_none() {
            cur.insert(seg.to_string(), Node::Leaf);
            return;
        }
        cur = match cur
            .entry(seg.to_string())
            .or_insert_with(|| Node::Branch(BTreeMap::new()))
        {
            Node::Branch(children) => children,
            // parent path already covers it
            Node::Leaf => return,
        };
    }
}

/// Applies a projection (`1`/`0`/`true`/`false` per path, `$slice` on arrays).
///
/// `_id` is kept unless explicitly excluded. Mixing inclusion and exclusion
/// of other fields is rejected.
pub fn project(doc: &Document, projection: &Document) -> Result<Document, StoreError> {
    let mut include = BTreeMap::new();
    let mut exclude = BTreeMap::new();
    let mut slices: Vec<(&str, &Value)> = Vec::new();
    let mut keep_id = true;
    let mut id_included = false;

    for (path, spec) in projection {
        match spec {
            Value::Object(m) if m.len() == 1 && m.contains_key("$slice") => {
                slices.push((path.as_str(), &m["$slice"]));
            }
            Value::Bool(_) | Value::Number(_) => {
                let on = truthy(spec);
                if path == "_id" {
                    keep_id = on;
                    id_included = on;
                } else if on {
                    insert_path(&mut include, path);
                } else {
                    insert_path(&mut exclude, path);
                }
            }
            other => {
                return Err(StoreError::Unsupported(format!(
                    "projection for '{path}': {other}"
                )));
            }
        }
    }

    if !include.is_empty() && !exclude.is_empty() {
        return Err(StoreError::InvalidQuery(
            "cannot mix inclusion and exclusion in a projection".into(),
        ));
    }

    // `{_id: 1}` alone is still an inclusion projection.
    let inclusion = !include.is_empty() || (id_included && exclude.is_empty());
    let mut out = if !inclusion {
        let mut out = doc.clone();
        apply_exclude(&mut out, &exclude);
        out
    } else {
        for (path, _) in &slices {
            insert_path(&mut include, path);
        }
        let mut out = Document::new();
        for (k, v) in doc {
            if k == "_id" {
                out.insert(k.clone(), v.clone());
            } else if let Some(node) = include.get(k)
                && let Some(v) = apply_include(v, node)
            {
                out.insert(k.clone(), v);
            }
        }
        out
    };

    if !keep_id {
        out.remove("_id");
    }
    for (path, arg) in slices {
        apply_slice(&mut out, path, arg)?;
    }
    Ok(out)
}

fn apply_include(value: &Value, node: &Node) -> Option<Value> {
    let Node::Branch(children) = node else {
        return Some(value.clone());
    };
    match value {
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| {
                    children
                        .get(k)
                        .and_then(|n| apply_include(v, n))
                        .map(|v| (k.clone(), v))
                })
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter(|i| i.is_object())
                .filter_map(|i| apply_include(i, node))
                .collect(),
        )),
        _ => None,
    }
}

fn apply_exclude(map: &mut Document, tree: &BTreeMap<String, Node>) {
    for (k, node) in tree {
        match node {
            Node::Leaf => {
                map.remove(k);
            }
            Node::Branch(children) => match map.get_mut(k) {
                Some(Value::Object(sub)) => apply_exclude(sub, children),
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Object(sub) = item {
                            apply_exclude(sub, children);
                        }
                    }
                }
                _ => {}
            },
        }
    }
}

fn apply_slice(doc: &mut Document, path: &str, arg: &Value) -> Result<(), StoreError> {
    let bounds = slice_bounds(arg)?;
    let segments: Vec<&str> = path.split('.').collect();
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };
    if let Some(value) = doc.get_mut(*first) {
        slice_at(value, rest, bounds);
    }
    Ok(())
}

/// Walks `segments` below `value`, through arrays of sub-documents, and
/// slices the array found at the end.
fn slice_at(value: &mut Value, segments: &[&str], bounds: (i64, Option<i64>)) {
    match (segments.split_first(), value) {
        (None, Value::Array(items)) => {
            let (start, end) = slice_range(items.len(), bounds);
            *items = items[start..end].to_vec();
        }
        (Some((seg, rest)), Value::Object(map)) => {
            if let Some(child) = map.get_mut(*seg) {
                slice_at(child, rest, bounds);
            }
        }
        (Some(_), Value::Array(items)) => {
            for item in items.iter_mut().filter(|i| i.is_object()) {
                slice_at(item, segments, bounds);
            }
        }
        _ => {}
    }
}

/// Clamped `start..end` indices for `(skip, take)` over `len` items.
fn slice_range(len: usize, (skip, take): (i64, Option<i64>)) -> (usize, usize) {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let start = if skip < 0 {
        len.saturating_add(skip).max(0)
    } else {
        skip.min(len)
    };
    let end = match take {
        Some(n) => start.saturating_add(n).min(len),
        None => len,
    };
    // both bounds lie in 0..=len
    (start as usize, end.max(start) as usize)
}

/// `$size` argument: a non-negative integer, possibly written as a double.
fn size_arg(arg: &Value) -> Option<u64> {
    if let Some(n) = arg.as_u64() {
        return Some(n);
    }
    let f = arg.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// `n` → first n, `-n` → last n, `[skip, n]` → n elements after skip.
/// Returns `(start offset, optional count)`; a negative start counts from the end.
fn slice_bounds(arg: &Value) -> Result<(i64, Option<i64>), StoreError> {
    let bad = || StoreError::InvalidQuery(format!("$slice expects n or [skip, n], got {arg}"));
    match arg {
        Value::Number(n) => {
            let n = n.as_i64().ok_or_else(bad)?;
            Ok(if n >= 0 { (0, Some(n)) } else { (n, None) })
        }
        Value::Array(pair) => match pair.as_slice() {
            [skip, n] => {
                let skip = skip.as_i64().ok_or_else(bad)?;
                let n = n.as_i64().filter(|n| *n > 0).ok_or_else(bad)?;
                Ok((skip, Some(n)))
            }
            _ => Err(bad()),
        },
        _ => Err(bad()),
    }
}
