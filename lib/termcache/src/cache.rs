use dashmap::DashMap;
use relquad_common::error::{RelquadError, RelquadResult, StoreError};
use relquad_common::{CacheConfig, RelationalStore, SqlValue};
use relquad_model::{TermKind, TermValue};
use relquad_schema::{columns, TermId};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Process-wide, read-mostly cache mapping terms to their content-addressed
/// UUIDs and back (spec.md §4.2). `resolve_batch` is local computation
/// (term UUIDs are a pure function of the term, per spec.md §4.1) so it
/// never touches the store; `resolve_uuids` is genuinely one-way and
/// always needs the store on a cache miss, since a UUIDv5 cannot be
/// inverted.
///
/// Concurrency: [`DashMap`]'s shard-striped locking gives the
/// reader-preferring behavior spec.md §4.2 asks for without a single
/// global lock; a short [`Mutex`]-guarded recency queue drives LRU
/// eviction and is only touched on insert, not on lookup.
#[derive(Debug)]
pub struct TermCache {
    forward: FxDashMap<TermValue, TermId>,
    reverse: FxDashMap<TermId, TermValue>,
    pinned: FxDashMap<TermId, ()>,
    recency: Mutex<Vec<TermId>>,
    max_entries: usize,
    len: AtomicUsize,
}

impl TermCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            forward: DashMap::with_hasher(BuildHasherDefault::default()),
            reverse: DashMap::with_hasher(BuildHasherDefault::default()),
            pinned: DashMap::with_hasher(BuildHasherDefault::default()),
            recency: Mutex::new(Vec::new()),
            max_entries: config.max_entries,
            len: AtomicUsize::new(0),
        }
    }

    /// Maps each of `terms` to its `TermId`, per spec.md §4.2. Pure and
    /// infallible: the id is a deterministic hash of the term, so there is
    /// nothing to fail on. Populates the reverse cache optimistically so a
    /// later `resolve_uuids` of the same term is a cache hit.
    #[must_use]
    pub fn resolve_batch(&self, terms: &[TermValue]) -> FxHashMap<TermValue, TermId> {
        let mut out = FxHashMap::with_capacity_and_hasher(terms.len(), rustc_hash::FxBuildHasher);
        for term in terms {
            let id = if let Some(existing) = self.forward.get(term) {
                *existing
            } else {
                let id = TermId::from_term(term);
                self.forward.insert(term.clone(), id);
                self.insert_reverse(id, term.clone());
                id
            };
            out.insert(term.clone(), id);
        }
        out
    }

    /// Resolves `uuids` back to their lexical terms (spec.md §4.10's
    /// materializer input), via the cache where possible and a single
    /// batched `IN`-list query against `store` for everything else. On
    /// store error the whole batch fails — the materializer never falls
    /// back to per-row lookups.
    pub async fn resolve_uuids(
        &self,
        store: &dyn RelationalStore,
        table: &str,
        uuids: &[TermId],
    ) -> RelquadResult<FxHashMap<TermId, TermValue>> {
        let mut resolved = FxHashMap::with_capacity_and_hasher(uuids.len(), rustc_hash::FxBuildHasher);
        let mut misses = Vec::new();
        for &id in uuids {
            if id == TermId::DEFAULT_GRAPH {
                continue;
            }
            match self.reverse.get(&id) {
                Some(term) => {
                    resolved.insert(id, term.clone());
                }
                None => misses.push(id),
            }
        }

        if misses.is_empty() {
            return Ok(resolved);
        }

        tracing::debug!(miss_count = misses.len(), "term cache miss, querying store");

        let placeholders: Vec<String> = (1..=misses.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "SELECT {uuid_col}, {text_col}, {type_col}, {lang_col}, {datatype_col} FROM {table} WHERE {uuid_col} IN ({list})",
            uuid_col = columns::term::TERM_UUID,
            text_col = columns::term::TERM_TEXT,
            type_col = columns::term::TERM_TYPE,
            lang_col = columns::term::LANG,
            datatype_col = columns::term::DATATYPE,
            list = placeholders.join(", "),
        );
        let params: Vec<SqlValue> = misses.iter().map(|id| SqlValue::Uuid(id.as_uuid())).collect();

        let mut cursor = store.execute_query(&sql, &params).await?;
        while let Some(row) = cursor.next_row().await? {
            let uuid = match row.get(0) {
                Some(SqlValue::Uuid(uuid)) => TermId::from_uuid(*uuid),
                other => {
                    return Err(RelquadError::Store(StoreError::other(format!(
                        "expected a term_uuid column, got {other:?}"
                    ))))
                }
            };
            let text = match row.get(1) {
                Some(SqlValue::Text(text)) => text.clone(),
                other => {
                    return Err(RelquadError::Store(StoreError::other(format!(
                        "expected a term_text column, got {other:?}"
                    ))))
                }
            };
            let kind = match row.get(2) {
                Some(SqlValue::Text(code)) => code
                    .chars()
                    .next()
                    .and_then(TermKind::from_code)
                    .ok_or_else(|| RelquadError::Store(StoreError::other(format!("invalid term_type {code}"))))?,
                other => {
                    return Err(RelquadError::Store(StoreError::other(format!(
                        "expected a term_type column, got {other:?}"
                    ))))
                }
            };
            let lang = match row.get(3) {
                Some(SqlValue::Text(lang)) => Some(lang.clone()),
                _ => None,
            };
            let datatype = match row.get(4) {
                Some(SqlValue::Text(datatype)) => Some(datatype.clone()),
                _ => None,
            };

            let term = TermValue::from_row_parts(kind, text, lang, datatype);
            self.insert_reverse(uuid, term.clone());
            self.forward.insert(term.clone(), uuid);
            resolved.insert(uuid, term);
        }

        Ok(resolved)
    }

    /// Preloads every term whose lexical form starts with `prefix` and
    /// marks it pinned, so it survives LRU eviction (spec.md §4.2).
    pub async fn warm(&self, store: &dyn RelationalStore, table: &str, prefix: &str) -> RelquadResult<usize> {
        let sql = format!(
            "SELECT {uuid_col}, {text_col}, {type_col}, {lang_col}, {datatype_col} FROM {table} WHERE {text_col} LIKE $1",
            uuid_col = columns::term::TERM_UUID,
            text_col = columns::term::TERM_TEXT,
            type_col = columns::term::TERM_TYPE,
            lang_col = columns::term::LANG,
            datatype_col = columns::term::DATATYPE,
        );
        let params = [SqlValue::Text(format!("{prefix}%"))];
        let mut cursor = store.execute_query(&sql, &params).await?;
        let mut warmed = 0usize;
        while let Some(row) = cursor.next_row().await? {
            let uuid = match row.get(0) {
                Some(SqlValue::Uuid(uuid)) => TermId::from_uuid(*uuid),
                _ => continue,
            };
            let text = match row.get(1) {
                Some(SqlValue::Text(text)) => text.clone(),
                _ => continue,
            };
            let kind = match row.get(2).and_then(|v| match v {
                SqlValue::Text(code) => code.chars().next(),
                _ => None,
            }) {
                Some(code) => match TermKind::from_code(code) {
                    Some(kind) => kind,
                    None => continue,
                },
                None => continue,
            };
            let lang = match row.get(3) {
                Some(SqlValue::Text(lang)) => Some(lang.clone()),
                _ => None,
            };
            let datatype = match row.get(4) {
                Some(SqlValue::Text(datatype)) => Some(datatype.clone()),
                _ => None,
            };
            let term = TermValue::from_row_parts(kind, text, lang, datatype);
            self.forward.insert(term.clone(), uuid);
            self.reverse.insert(uuid, term);
            self.pinned.insert(uuid, ());
            warmed += 1;
        }
        tracing::debug!(prefix, warmed, "warmed term cache");
        Ok(warmed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_reverse(&self, id: TermId, term: TermValue) {
        if self.reverse.insert(id, term).is_some() {
            return;
        }
        self.len.fetch_add(1, Ordering::Relaxed);

        let mut recency = self.recency.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        recency.push(id);

        if self.len() <= self.max_entries {
            return;
        }

        let pinned: FxHashSet<TermId> = self.pinned.iter().map(|entry| *entry.key()).collect();
        while self.len() > self.max_entries {
            let Some(position) = recency.iter().position(|candidate| !pinned.contains(candidate)) else {
                break;
            };
            let evicted = recency.remove(position);
            if self.reverse.remove(&evicted).is_some() {
                self.len.fetch_sub(1, Ordering::Relaxed);
            }
        }
    }
}
