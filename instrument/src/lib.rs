//! Column-oriented capture of game engine events.
//!
//! The engine emits structured `tracing` events, one target per event kind
//! (`purchase`, `completion`, `tier_unlock`, ...). [`EventSubscriber`] files
//! each event as a row of the table named after its target; columns appear
//! the first time a field is seen and earlier rows are back-filled with
//! defaults.
//!
//! ```ignore
//! let log = instrument::capture(|| {
//!     let report = idle_core::balance::run_playthrough(&config);
//! });
//! assert_eq!(log.count("tier_unlock"), 1);
//! let completions = log.table("completion").unwrap().to_dataframe()?;
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

// ============================================================================
// Columns and tables
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl EventColumn {
    /// Empty column of the value's type, back-filled to `rows` defaults
    fn for_value(value: &FieldValue, rows: usize) -> Self {
        match value {
            FieldValue::U64(_) => EventColumn::U64(vec![0; rows]),
            FieldValue::I64(_) => EventColumn::I64(vec![0; rows]),
            FieldValue::F64(_) => EventColumn::F64(vec![0.0; rows]),
            FieldValue::Bool(_) => EventColumn::Bool(vec![false; rows]),
            FieldValue::Str(_) => EventColumn::Str(vec![String::new(); rows]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EventColumn::U64(v) => v.len(),
            EventColumn::I64(v) => v.len(),
            EventColumn::F64(v) => v.len(),
            EventColumn::Bool(v) => v.len(),
            EventColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a value; a value of another type than the column stores the
    /// column's default instead
    fn push(&mut self, value: Option<FieldValue>) {
        match (self, value) {
            (EventColumn::U64(v), Some(FieldValue::U64(x))) => v.push(x),
            (EventColumn::I64(v), Some(FieldValue::I64(x))) => v.push(x),
            (EventColumn::F64(v), Some(FieldValue::F64(x))) => v.push(x),
            (EventColumn::Bool(v), Some(FieldValue::Bool(x))) => v.push(x),
            (EventColumn::Str(v), Some(FieldValue::Str(x))) => v.push(x),
            (EventColumn::U64(v), _) => v.push(0),
            (EventColumn::I64(v), _) => v.push(0),
            (EventColumn::F64(v), _) => v.push(0.0),
            (EventColumn::Bool(v), _) => v.push(false),
            (EventColumn::Str(v), _) => v.push(String::new()),
        }
    }

    /// Numeric columns widened to f64
    pub fn as_f64s(&self) -> Option<Vec<f64>> {
        match self {
            EventColumn::F64(v) => Some(v.clone()),
            EventColumn::U64(v) => Some(v.iter().map(|x| *x as f64).collect()),
            EventColumn::I64(v) => Some(v.iter().map(|x| *x as f64).collect()),
            EventColumn::Bool(_) | EventColumn::Str(_) => None,
        }
    }

    pub fn as_strs(&self) -> Option<&[String]> {
        match self {
            EventColumn::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Rows of one event kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub columns: BTreeMap<String, EventColumn>,
    pub rows: usize,
}

impl EventTable {
    /// Append one event; every column grows by exactly one entry
    pub fn append(&mut self, mut fields: BTreeMap<String, FieldValue>) {
        for (name, value) in &fields {
            if !self.columns.contains_key(name) {
                self.columns
                    .insert(name.clone(), EventColumn::for_value(value, self.rows));
            }
        }
        for (name, column) in self.columns.iter_mut() {
            column.push(fields.remove(name));
        }
        self.rows += 1;
    }

    pub fn column(&self, name: &str) -> Option<&EventColumn> {
        self.columns.get(name)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                EventColumn::U64(v) => Column::new(name.into(), v),
                EventColumn::I64(v) => Column::new(name.into(), v),
                EventColumn::F64(v) => Column::new(name.into(), v),
                EventColumn::Bool(v) => Column::new(name.into(), v),
                EventColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// Every captured table, keyed by event target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    pub tables: BTreeMap<String, EventTable>,
}

impl EventLog {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Number of events recorded under `target`
    pub fn count(&self, target: &str) -> usize {
        self.table(target).map(|t| t.rows).unwrap_or(0)
    }

    pub fn f64_column(&self, target: &str, field: &str) -> Vec<f64> {
        self.table(target)
            .and_then(|t| t.column(field))
            .and_then(EventColumn::as_f64s)
            .unwrap_or_default()
    }

    pub fn str_column(&self, target: &str, field: &str) -> Vec<String> {
        self.table(target)
            .and_then(|t| t.column(field))
            .and_then(EventColumn::as_strs)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Tables that convert cleanly, as polars DataFrames
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static LOG: RefCell<EventLog> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

#[derive(Default)]
struct RowVisitor {
    fields: BTreeMap<String, FieldValue>,
}

impl RowVisitor {
    fn put(&mut self, field: &Field, value: FieldValue) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, FieldValue::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, FieldValue::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, FieldValue::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, FieldValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, FieldValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, FieldValue::Str(format!("{value:?}")));
    }
}

/// Files INFO and WARN events into the thread-local [`EventLog`]; spans are ignored.
pub struct EventSubscriber;

impl Subscriber for EventSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        let target = event.metadata().target().to_string();
        LOG.with(|log| {
            log.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .append(visitor.fields);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`EventSubscriber`] process-wide. Later calls are no-ops.
pub fn install() {
    let _ = tracing::subscriber::set_global_default(EventSubscriber);
}

/// Take everything recorded on this thread, leaving the log empty
pub fn take() -> EventLog {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

pub fn reset() {
    LOG.with(|log| *log.borrow_mut() = EventLog::default());
}

/// Run `f` with [`EventSubscriber`] as this thread's subscriber and return
/// only the events it emitted
pub fn capture(f: impl FnOnce()) -> EventLog {
    reset();
    tracing::subscriber::with_default(EventSubscriber, f);
    take()
}
