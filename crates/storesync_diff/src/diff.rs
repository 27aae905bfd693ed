//! Cycle-safe structural diff.
//!
//! The walk compares two values depth-first and emits [`ChangeRecord`]s in a
//! deterministic order:
//!
//! - object keys of the previous value in enumeration order, then keys that
//!   only exist in the next value, in their enumeration order
//! - array indices present on both sides in ascending order, then trailing
//!   removals from the highest index down, then trailing additions in
//!   ascending order
//!
//! Trailing removals run highest-first so that replaying the records as an
//! ordered fold never addresses an index that an earlier removal shifted.

use crate::record::{ChangeRecord, ItemChange};
use storesync_value::{Array, Object, Path, PathSegment, Value};
use tracing::trace;

/// Computes the change records that turn `previous` into `next`.
///
/// Returns an empty vector when the values are equal.
pub fn diff(previous: &Value, next: &Value) -> Vec<ChangeRecord> {
    Differ::new().diff(previous, next)
}

/// What a [`Prefilter`] wants done with one key.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefilterDecision {
    /// Compare the key normally.
    Compare,
    /// Do not descend into the key at all.
    Skip,
    /// Compare these replacement values instead of the originals.
    ///
    /// The first value stands in for the previous side, the second for the
    /// next side. A side that does not own the key stays absent.
    Normalize(Value, Value),
}

/// Hook consulted before every keyed comparison.
pub trait Prefilter: Send + Sync {
    /// Decides how to compare `key` under `path`.
    ///
    /// `previous` and `next` are `None` when the corresponding container
    /// does not own the key.
    fn inspect(
        &self,
        path: &Path,
        key: &PathSegment,
        previous: Option<&Value>,
        next: Option<&Value>,
    ) -> PrefilterDecision;
}

impl<F> Prefilter for F
where
    F: Fn(&Path, &PathSegment, Option<&Value>, Option<&Value>) -> PrefilterDecision + Send + Sync,
{
    fn inspect(
        &self,
        path: &Path,
        key: &PathSegment,
        previous: Option<&Value>,
        next: Option<&Value>,
    ) -> PrefilterDecision {
        self(path, key, previous, next)
    }
}

/// A configurable differ.
///
/// ```
/// use storesync_diff::{Differ, PrefilterDecision};
/// use storesync_value::{Path, PathSegment, Value};
///
/// let differ = Differ::new().with_prefilter(
///     |_: &Path, key: &PathSegment, _: Option<&Value>, _: Option<&Value>| {
///         if key.as_key() == Some("updatedAt") {
///             PrefilterDecision::Skip
///         } else {
///             PrefilterDecision::Compare
///         }
///     },
/// );
///
/// let a = Value::object([("title", Value::from("a")), ("updatedAt", Value::from(1))]);
/// let b = Value::object([("title", Value::from("a")), ("updatedAt", Value::from(2))]);
/// assert!(differ.diff(&a, &b).is_empty());
/// ```
#[derive(Default)]
pub struct Differ {
    prefilter: Option<Box<dyn Prefilter>>,
}

impl Differ {
    /// Creates a differ without a prefilter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a prefilter.
    #[must_use]
    pub fn with_prefilter(mut self, prefilter: impl Prefilter + 'static) -> Self {
        self.prefilter = Some(Box::new(prefilter));
        self
    }

    /// Computes the change records that turn `previous` into `next`.
    pub fn diff(&self, previous: &Value, next: &Value) -> Vec<ChangeRecord> {
        let mut walk = Walk {
            prefilter: self.prefilter.as_deref(),
            changes: Vec::new(),
            stack: Vec::new(),
        };
        // At the root there is no container to own the value, so only the
        // absent sentinel counts as undefined.
        let previous = Some(previous).filter(|v| !v.is_undefined());
        let next = Some(next).filter(|v| !v.is_undefined());
        walk.node(previous, next, &mut Path::root());
        trace!(records = walk.changes.len(), "diff computed");
        walk.changes
    }
}

impl std::fmt::Debug for Differ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Differ")
            .field("prefilter", &self.prefilter.is_some())
            .finish()
    }
}

/// Previous-side ancestor currently being compared.
struct Frame {
    previous: usize,
}

struct Walk<'a> {
    prefilter: Option<&'a dyn Prefilter>,
    changes: Vec<ChangeRecord>,
    stack: Vec<Frame>,
}

impl Walk<'_> {
    // `None` means the side does not own the location.
    fn node(&mut self, previous: Option<&Value>, next: Option<&Value>, path: &mut Path) {
        let (previous, next) = match (previous, next) {
            (None, None) => return,
            (None, Some(next)) => {
                self.changes.push(ChangeRecord::Created {
                    path: path.clone(),
                    next: next.clone(),
                });
                return;
            }
            (Some(previous), None) => {
                self.changes.push(ChangeRecord::Deleted {
                    path: path.clone(),
                    previous: previous.clone(),
                });
                return;
            }
            (Some(previous), Some(next)) => (previous, next),
        };

        if previous.kind() != next.kind() {
            self.edited(path, previous, next);
            return;
        }

        match (previous, next) {
            (Value::Array(a), Value::Array(b)) => {
                if self.enter(previous, next, path) {
                    self.array(a, b, path);
                    self.stack.pop();
                }
            }
            (Value::Object(a), Value::Object(b)) => {
                if self.enter(previous, next, path) {
                    self.object(a, b, path);
                    self.stack.pop();
                }
            }
            (Value::Number(a), Value::Number(b)) => {
                if a != b && !(a.is_nan() && b.is_nan()) {
                    self.edited(path, previous, next);
                }
            }
            // Dates compare by instant, the remaining scalars by value.
            _ => {
                if previous != next {
                    self.edited(path, previous, next);
                }
            }
        }
    }

    /// Pushes a frame and returns true if the containers need comparing.
    fn enter(&mut self, previous: &Value, next: &Value, path: &Path) -> bool {
        let (Some(previous_id), Some(next_id)) = (previous.container_id(), next.container_id())
        else {
            return false;
        };
        if self.stack.iter().any(|frame| frame.previous == previous_id) {
            if previous_id != next_id {
                self.edited(path, previous, next);
            }
            return false;
        }
        // A normalizing prefilter may still find differences under an
        // identical container.
        if previous_id == next_id && self.prefilter.is_none() {
            return false;
        }
        self.stack.push(Frame {
            previous: previous_id,
        });
        true
    }

    fn array(&mut self, previous: &Array, next: &Array, path: &mut Path) {
        let (before, after) = (previous.items(), next.items());
        let shared = before.len().min(after.len());

        for (index, (a, b)) in before.iter().zip(after).enumerate() {
            self.step(path, PathSegment::Index(index), Some(a), Some(b));
        }
        for index in (shared..before.len()).rev() {
            self.changes.push(ChangeRecord::ArrayItem {
                path: path.clone(),
                index,
                item: ItemChange::Deleted {
                    previous: before[index].clone(),
                },
            });
        }
        for (index, item) in after.iter().enumerate().skip(shared) {
            self.changes.push(ChangeRecord::ArrayItem {
                path: path.clone(),
                index,
                item: ItemChange::Created { next: item.clone() },
            });
        }
    }

    fn object(&mut self, previous: &Object, next: &Object, path: &mut Path) {
        for (key, a) in previous.iter() {
            self.step(path, PathSegment::Key(key.clone()), Some(a), next.get(key));
        }
        for (key, b) in next.iter() {
            if !previous.contains_key(key) {
                self.step(path, PathSegment::Key(key.clone()), None, Some(b));
            }
        }
    }

    fn step(
        &mut self,
        path: &mut Path,
        key: PathSegment,
        previous: Option<&Value>,
        next: Option<&Value>,
    ) {
        if let Some(prefilter) = self.prefilter {
            match prefilter.inspect(path, &key, previous, next) {
                PrefilterDecision::Compare => {}
                PrefilterDecision::Skip => return,
                PrefilterDecision::Normalize(a, b) => {
                    path.push(key);
                    self.node(previous.map(|_| &a), next.map(|_| &b), path);
                    path.pop();
                    return;
                }
            }
        }
        path.push(key);
        self.node(previous, next, path);
        path.pop();
    }

    fn edited(&mut self, path: &Path, previous: &Value, next: &Value) {
        self.changes.push(ChangeRecord::Edited {
            path: path.clone(),
            previous: previous.clone(),
            next: next.clone(),
        });
    }
}
