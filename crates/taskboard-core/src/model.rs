#![forbid(unsafe_code)]

//! Domain model: boards, lists, tasks, labels and sprints.
//!
//! Every reorderable entity implements [`Ordered`]; entities that live in a
//! sibling scope narrower than "everything" also implement [`Scoped`]. Field
//! names follow the remote store's camelCase documents so that the decode
//! boundary in `taskboard-runtime` can deserialize them directly.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Milliseconds in one calendar day.
pub const MS_PER_DAY: i64 = 86_400_000;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a board document.
    BoardId
);
define_id!(
    /// Identifier of a list (column / timeline row).
    ListId
);
define_id!(
    /// Identifier of a task card.
    TaskId
);
define_id!(
    /// Identifier of a label.
    LabelId
);
define_id!(
    /// Identifier of a sprint.
    SprintId
);
define_id!(
    /// Identifier of a user.
    UserId
);

// ---------------------------------------------------------------------------
// OrderKey
// ---------------------------------------------------------------------------

/// A fractional order key. Byte-wise comparison equals display order.
///
/// Construct keys through [`crate::order_key`]; [`OrderKey::from_raw`] is for
/// keys read back from the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(String);

impl OrderKey {
    /// Wrap a key string without validation.
    #[must_use]
    pub fn from_raw(key: String) -> Self {
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote documents use `""` for "not yet ordered".
fn empty_key_as_none<'de, D>(deserializer: D) -> Result<Option<OrderKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|k| !k.is_empty()).map(OrderKey))
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An entity positioned by a fractional [`OrderKey`].
pub trait Ordered {
    type Id: Clone + Eq + Hash + fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// `None` when the entity has not been ordered yet.
    fn order(&self) -> Option<&OrderKey>;

    fn set_order(&mut self, key: OrderKey);
}

/// An ordered entity whose siblings are those sharing the same scope value.
pub trait Scoped: Ordered {
    type Scope: Clone + Eq + Hash + fmt::Debug;

    fn scope(&self) -> &Self::Scope;

    fn set_scope(&mut self, scope: Self::Scope);
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A closed time interval on the timeline, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Span {
    /// Create a span, swapping the bounds if they are inverted.
    #[must_use]
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub const fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Move both bounds by `delta` milliseconds.
    #[must_use]
    pub const fn shifted(&self, delta: i64) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Start as a UTC datetime, if representable.
    #[must_use]
    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start)
    }

    /// End as a UTC datetime, if representable.
    #[must_use]
    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Board metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

/// Directory entry for the "my boards" / "shared with me" collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: BoardId,
    pub title: String,
    pub owner_id: UserId,
}

/// A list on a board: a kanban column and a timeline row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: ListId,
    pub board_id: BoardId,
    pub title: String,
    #[serde(default, deserialize_with = "empty_key_as_none")]
    pub order: Option<OrderKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub board_id: BoardId,
    pub list_id: ListId,
    pub title: String,
    #[serde(default, deserialize_with = "empty_key_as_none")]
    pub order: Option<OrderKey>,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub label_ids: Vec<LabelId>,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
}

impl Task {
    /// The task's timeline span; `None` unless both dates are set.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match (self.start_date, self.due_date) {
            (Some(start), Some(end)) => Some(Span::new(start, end)),
            _ => None,
        }
    }

    pub fn set_span(&mut self, span: Span) {
        self.start_date = Some(span.start);
        self.due_date = Some(span.end);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: LabelId,
    pub board_id: BoardId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "empty_key_as_none")]
    pub order: Option<OrderKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: SprintId,
    pub board_id: BoardId,
    pub name: String,
    #[serde(default, deserialize_with = "empty_key_as_none")]
    pub order: Option<OrderKey>,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
}

macro_rules! impl_ordered {
    ($ty:ty, $id:ty) => {
        impl Ordered for $ty {
            type Id = $id;

            fn id(&self) -> &$id {
                &self.id
            }

            fn order(&self) -> Option<&OrderKey> {
                self.order.as_ref()
            }

            fn set_order(&mut self, key: OrderKey) {
                self.order = Some(key);
            }
        }
    };
}

impl_ordered!(TaskList, ListId);
impl_ordered!(Task, TaskId);
impl_ordered!(Label, LabelId);
impl_ordered!(Sprint, SprintId);

impl Scoped for Task {
    type Scope = ListId;

    fn scope(&self) -> &ListId {
        &self.list_id
    }

    fn set_scope(&mut self, scope: ListId) {
        self.list_id = scope;
    }
}

macro_rules! impl_board_scoped {
    ($ty:ty) => {
        impl Scoped for $ty {
            type Scope = BoardId;

            fn scope(&self) -> &BoardId {
                &self.board_id
            }

            fn set_scope(&mut self, scope: BoardId) {
                self.board_id = scope;
            }
        }
    };
}

impl_board_scoped!(TaskList);
impl_board_scoped!(Label);
impl_board_scoped!(Sprint);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn span_requires_both_dates() {
        let mut task: Task = serde_json::from_value(json!({
            "id": "t1", "boardId": "b1", "listId": "l1", "title": "x", "order": "a0",
            "startDate": 1000
        }))
        .unwrap();
        assert_eq!(task.span(), None);
        task.due_date = Some(5000);
        assert_eq!(task.span(), Some(Span::new(1000, 5000)));
    }

    #[test]
    fn span_new_normalizes() {
        let s = Span::new(10, 5);
        assert_eq!((s.start, s.end), (5, 10));
        assert_eq!(s.duration(), 5);
        assert_eq!(s.shifted(3), Span::new(8, 13));
    }

    #[test]
    fn empty_order_decodes_as_missing() {
        let list: TaskList = serde_json::from_value(json!({
            "id": "l1", "boardId": "b1", "title": "Todo", "order": ""
        }))
        .unwrap();
        assert_eq!(list.order, None);
        let list: TaskList = serde_json::from_value(json!({
            "id": "l1", "boardId": "b1", "title": "Todo"
        }))
        .unwrap();
        assert_eq!(list.order, None);
    }

    #[test]
    fn scoped_accessors() {
        let mut task = Task {
            id: "t1".into(),
            board_id: "b1".into(),
            list_id: "l1".into(),
            title: "x".into(),
            order: None,
            start_date: None,
            due_date: None,
            label_ids: Vec::new(),
            sprint_id: None,
        };
        task.set_scope("l2".into());
        task.set_order(OrderKey::from_raw("a0".into()));
        assert_eq!(task.scope().as_str(), "l2");
        assert_eq!(task.order().map(OrderKey::as_str), Some("a0"));
    }
}
