use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

use compact_str::CompactString;
use serde_json::Value as JsonValue;

use super::{Marker, PageSource};
use crate::collection::data_get;
use crate::error::Result;

type MapFn<'a> = Rc<dyn Fn(JsonValue) -> JsonValue + 'a>;
type FilterFn<'a> = Rc<dyn Fn(&JsonValue) -> bool + 'a>;

/// A deferred transformation, applied as items are pulled.
#[derive(Clone)]
enum Op<'a> {
    Map(MapFn<'a>),
    Filter(FilterFn<'a>),
    Take(usize),
    Skip(usize),
    Pluck(CompactString),
}

impl fmt::Debug for Op<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Map(_) => f.write_str("Map"),
            Op::Filter(_) => f.write_str("Filter"),
            Op::Take(n) => write!(f, "Take({n})"),
            Op::Skip(n) => write!(f, "Skip({n})"),
            Op::Pluck(path) => write!(f, "Pluck({path})"),
        }
    }
}

/// A pull-based sequence over a paged source.
///
/// Transformations queue up and run only while items are pulled; `take`
/// stops page fetches as soon as it is satisfied. Every call to
/// [`iter`](Self::iter) re-opens the source from the start.
///
/// ```ignore
/// let names = db.table("customers")?
///     .lazy(100)?
///     .filter(|c| c["active"] == 1)
///     .pluck("name")
///     .take(10)
///     .all()?;
/// ```
#[derive(Clone)]
pub struct LazySequence<'a> {
    source: Rc<dyn PageSource + 'a>,
    size: u64,
    ops: Vec<Op<'a>>,
}

impl fmt::Debug for LazySequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySequence")
            .field("size", &self.size)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl<'a> LazySequence<'a> {
    /// A sequence pulling pages of `size` rows from `source`.
    pub fn new(source: impl PageSource + 'a, size: u64) -> Self {
        LazySequence {
            source: Rc::new(source),
            size: size.max(1),
            ops: Vec::new(),
        }
    }

    fn op(mut self, op: Op<'a>) -> Self {
        self.ops.push(op);
        self
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(JsonValue) -> JsonValue + 'a,
    {
        self.op(Op::Map(Rc::new(f)))
    }

    pub fn filter<F>(self, f: F) -> Self
    where
        F: Fn(&JsonValue) -> bool + 'a,
    {
        self.op(Op::Filter(Rc::new(f)))
    }

    /// Stops after `n` items have passed this point.
    pub fn take(self, n: usize) -> Self {
        self.op(Op::Take(n))
    }

    /// Drops the first `n` items reaching this point.
    pub fn skip(self, n: usize) -> Self {
        self.op(Op::Skip(n))
    }

    /// Replaces each item with the value at a dotted `path`, or null.
    pub fn pluck(self, path: &str) -> Self {
        self.op(Op::Pluck(path.into()))
    }

    /// A fresh pass over the source.
    pub fn iter(&self) -> LazyIter<'a> {
        LazyIter {
            source: Rc::clone(&self.source),
            size: self.size,
            ops: self.ops.clone(),
            counters: vec![0; self.ops.len()],
            next: Some(Marker::Start),
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    pub fn all(&self) -> Result<Vec<JsonValue>> {
        self.iter().collect()
    }

    pub fn first(&self) -> Result<Option<JsonValue>> {
        self.iter().next().transpose()
    }

    /// Calls `f` for every item until it breaks.
    pub fn each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(JsonValue) -> ControlFlow<()>,
    {
        for item in self.iter() {
            if f(item?).is_break() {
                break;
            }
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Joins items (or the value at `path` of each item) with `glue`.
    /// Strings are joined unquoted, nulls as empty strings.
    pub fn implode(&self, glue: &str, path: Option<&str>) -> Result<String> {
        let mut out = String::new();
        for (i, item) in self.iter().enumerate() {
            let item = item?;
            let value = match path {
                Some(path) => data_get(&item, path).cloned().unwrap_or(JsonValue::Null),
                None => item,
            };
            if i > 0 {
                out.push_str(glue);
            }
            match value {
                JsonValue::String(s) => out.push_str(&s),
                JsonValue::Null => {}
                other => out.push_str(&other.to_string()),
            }
        }
        Ok(out)
    }
}

impl<'a> IntoIterator for &LazySequence<'a> {
    type Item = Result<JsonValue>;
    type IntoIter = LazyIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`LazySequence`].
pub struct LazyIter<'a> {
    source: Rc<dyn PageSource + 'a>,
    size: u64,
    ops: Vec<Op<'a>>,
    counters: Vec<usize>,
    next: Option<Marker>,
    buffer: VecDeque<JsonValue>,
    failed: bool,
}

impl fmt::Debug for LazyIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyIter")
            .field("ops", &self.ops)
            .field("next", &self.next)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl LazyIter<'_> {
    /// Re-opens the source at position zero.
    pub fn rewind(&mut self) {
        self.next = Some(Marker::Start);
        self.buffer.clear();
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.failed = false;
    }

    fn saturated(&self) -> bool {
        self.ops
            .iter()
            .zip(&self.counters)
            .any(|(op, count)| matches!(op, Op::Take(n) if count >= n))
    }

    fn pull(&mut self) -> Option<Result<JsonValue>> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(item));
        }
        let marker = self.next.take()?;
        let page = match self.source.fetch(self.size, &marker) {
            Ok(page) => page,
            Err(error) => return Some(Err(error)),
        };
        if page.is_empty() {
            return None;
        }
        self.next = self.source.advance(&marker, &page, self.size);
        self.buffer.extend(page.into_iter().map(JsonValue::Object));
        self.buffer.pop_front().map(Ok)
    }

    /// Runs `item` through the queued ops; `None` when an op drops it.
    fn apply(&mut self, mut item: JsonValue) -> Option<JsonValue> {
        for (op, count) in self.ops.iter().zip(self.counters.iter_mut()) {
            match op {
                Op::Map(f) => item = f(item),
                Op::Filter(f) => {
                    if !f(&item) {
                        return None;
                    }
                }
                Op::Take(n) => {
                    if *count >= *n {
                        return None;
                    }
                    *count += 1;
                }
                Op::Skip(n) => {
                    if *count < *n {
                        *count += 1;
                        return None;
                    }
                }
                Op::Pluck(path) => {
                    item = data_get(&item, path).cloned().unwrap_or(JsonValue::Null);
                }
            }
        }
        Some(item)
    }
}

impl Iterator for LazyIter<'_> {
    type Item = Result<JsonValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while !self.saturated() {
            match self.pull()? {
                Ok(item) => {
                    if let Some(item) = self.apply(item) {
                        return Some(Ok(item));
                    }
                }
                Err(error) => {
                    self.failed = true;
                    return Some(Err(error));
                }
            }
        }
        None
    }
}
