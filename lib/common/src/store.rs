use crate::error::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

/// One column value as it travels across the store boundary: the
/// translator never emits a comparison between a `term_uuid` and a string
/// literal (spec.md §3's invariant), so every parameter the translator
/// binds is one of these, never raw RDF term text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    UuidArray(Vec<Uuid>),
    Null,
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

/// One row of a result set, column values in `SELECT`-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<SqlValue>);

impl Row {
    #[must_use]
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.0.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }
}

/// A streamed cursor over a `SELECT`'s result rows. Implementations fetch
/// in batches internally; callers pull one row at a time so the
/// materializer (spec.md §4.10) can interleave cache-resolve batches with
/// row consumption.
#[async_trait]
pub trait RowCursor: Send {
    async fn next_row(&mut self) -> Result<Option<Row>, StoreError>;

    /// Names of the columns in `Row` order, when the store reports them.
    fn column_names(&self) -> &[String];
}

/// A single update's transactional handle (spec.md §4.9: "all updates run
/// in a single store transaction"). Every method consumes `self` on the
/// terminal calls so a transaction cannot be used after it ends.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Executes DML and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// The toward-store surface required by spec.md §6: execute a parameterized
/// statement and receive a typed row cursor; run DDL; begin a transaction;
/// cancel in-flight work. The store must provide `WITH RECURSIVE`,
/// full-text search over a text column, a UUID type, array columns,
/// parameterized IN-lists, and at least read-committed isolation — this
/// trait assumes, but cannot itself enforce, those properties.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Runs a read-only `SELECT` (including `WITH RECURSIVE` CTEs) and
    /// returns a streaming cursor over its rows.
    async fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Box<dyn RowCursor>, StoreError>;

    /// Runs schema-management DDL (`CREATE`/`DROP`/index maintenance)
    /// outside of an update transaction.
    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError>;

    /// Begins the single writer transaction an update executes under.
    async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Requests cancellation of whatever statement is currently in flight
    /// on this store handle, per the cooperative cancellation model in
    /// spec.md §5. Implementations that cannot cancel mid-flight may
    /// treat this as a no-op; the caller's own deadline check is the
    /// authoritative guard.
    async fn cancel(&self) -> Result<(), StoreError>;
}
