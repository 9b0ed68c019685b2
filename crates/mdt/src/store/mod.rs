//! Record store for mdt.
//!
//! [`RecordStore`] exclusively owns the [`Document`] and keeps it equal to the
//! blob persisted in a [`Backend`]. Every mutation applies the change in
//! memory, serializes the whole document, and writes it under the storage
//! key. When the write fails the in-memory change is rolled back, so the two
//! never disagree.

pub mod backend;
pub mod document;
pub mod ids;
pub mod sqlite;

use std::sync::{Arc, Mutex};

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::agency::{Agency, AgencyTable};
use crate::config::{BackendKind, Config};
use crate::error::{Error, Result};
use crate::record::{check_field_names, FieldMap, Record, RecordFields, RecordKind, AGENCY_FIELD};

pub use backend::{Backend, FileBackend, MemoryBackend};
pub use document::Document;
pub use ids::IdGenerator;
pub use sqlite::SqliteBackend;

/// Storage key the browser terminal used for its document.
pub const DEFAULT_STORAGE_KEY: &str = "mdtData";

/// A record store shared across threads; the mutex serializes every call.
pub type SharedRecordStore = Arc<Mutex<RecordStore>>;

/// Owner of the document and its persisted copy.
#[derive(Debug)]
pub struct RecordStore {
    key: String,
    backend: Box<dyn Backend>,
    document: Document,
    ids: IdGenerator,
}

impl RecordStore {
    /// Load the document stored under `key`, creating it on first run.
    ///
    /// A missing blob is replaced by an empty document with the default
    /// agency table, which is persisted before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] if the blob exists but does not parse,
    /// [`Error::StoreRead`] if the medium cannot be read, or
    /// [`Error::PersistenceFailure`] if the first-run document cannot be
    /// written.
    pub fn open(backend: impl Backend + 'static, key: impl Into<String>) -> Result<Self> {
        Self::open_boxed(Box::new(backend), key.into())
    }

    fn open_boxed(backend: Box<dyn Backend>, key: String) -> Result<Self> {
        let blob = backend.read(&key).map_err(|source| Error::StoreRead {
            key: key.clone(),
            source,
        })?;

        let (document, fresh) = match blob {
            Some(json) => {
                let document = Document::from_json(&json).map_err(|source| Error::CorruptStore {
                    key: key.clone(),
                    source,
                })?;
                (document, false)
            }
            None => (Document::default(), true),
        };

        let mut store = Self {
            ids: IdGenerator::seeded_from(&document),
            key,
            backend,
            document,
        };

        if fresh {
            info!(
                "No document under '{}' in {} backend, initializing",
                store.key,
                store.backend.name()
            );
            store.persist()?;
        } else {
            info!(
                "Loaded document '{}' from {} backend ({} records)",
                store.key,
                store.backend.name(),
                store.document.all_records().count()
            );
        }
        Ok(store)
    }

    /// Open a store on a fresh memory backend.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible to match [`RecordStore::open`].
    pub fn open_in_memory() -> Result<Self> {
        Self::open(MemoryBackend::new(), DEFAULT_STORAGE_KEY)
    }

    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or the document
    /// cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.storage.key.clone();
        let backend: Box<dyn Backend> = match config.storage.backend {
            BackendKind::Sqlite => Box::new(SqliteBackend::open(config.storage_path())?),
            BackendKind::File => Box::new(FileBackend::new(config.storage_path())),
            BackendKind::Memory => Box::new(MemoryBackend::new()),
        };
        Self::open_boxed(backend, key)
    }

    /// Wrap the store for use from several threads.
    #[must_use]
    pub fn into_shared(self) -> SharedRecordStore {
        Arc::new(Mutex::new(self))
    }

    /// The storage key the document is persisted under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the backend in use.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The whole document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Create a record of `kind` from a field mapping.
    ///
    /// Fields the mapping leaves out are stored empty. The `agency` entry is
    /// required and must name a known agency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::InvalidAgency`] without
    /// changing anything, or [`Error::PersistenceFailure`] if the write fails.
    pub fn create(&mut self, kind: RecordKind, fields: &FieldMap) -> Result<Record> {
        let mut values = RecordFields::empty(kind);
        values.apply(fields)?;

        let agency = fields.get(AGENCY_FIELD).map_or("", String::as_str);
        self.agency(agency)?;

        let record = Record {
            id: self.ids.next_id(self.document.records(kind)),
            agency: agency.to_string(),
            timestamp: Utc::now().trunc_subsecs(3),
            fields: values,
        };

        self.document.records_mut(kind).push(record.clone());
        if let Err(err) = self.persist() {
            self.document.records_mut(kind).pop();
            warn!("Rolled back create of {} {}", kind, record.id);
            return Err(err);
        }

        debug!("Created {} {} for agency {}", kind, record.id, record.agency);
        Ok(record)
    }

    /// Overwrite the given fields of an existing record.
    ///
    /// The id and timestamp never change. An `agency` entry is validated the
    /// same way as on create.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::UnknownField`], or
    /// [`Error::InvalidAgency`] without changing anything, or
    /// [`Error::PersistenceFailure`] if the write fails.
    pub fn update(&mut self, kind: RecordKind, id: &str, fields: &FieldMap) -> Result<Record> {
        let index = self
            .position(kind, id)
            .ok_or_else(|| Error::not_found(kind, id))?;
        check_field_names(kind, fields)?;
        if let Some(agency) = fields.get(AGENCY_FIELD) {
            self.agency(agency)?;
        }

        let records = self.document.records_mut(kind);
        let previous = records[index].clone();
        let record = &mut records[index];
        record.fields.apply(fields)?;
        if let Some(agency) = fields.get(AGENCY_FIELD) {
            record.agency.clone_from(agency);
        }
        let updated = record.clone();

        if let Err(err) = self.persist() {
            self.document.records_mut(kind)[index] = previous;
            warn!("Rolled back update of {} {}", kind, id);
            return Err(err);
        }

        debug!("Updated {} {}", kind, id);
        Ok(updated)
    }

    /// Remove a record.
    ///
    /// Returns `true` if a record was removed, `false` if none had that id.
    /// The document is persisted either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceFailure`] if the write fails.
    pub fn delete(&mut self, kind: RecordKind, id: &str) -> Result<bool> {
        let removed = self
            .position(kind, id)
            .map(|index| (index, self.document.records_mut(kind).remove(index)));

        if let Err(err) = self.persist() {
            if let Some((index, record)) = removed {
                self.document.records_mut(kind).insert(index, record);
                warn!("Rolled back delete of {} {}", kind, id);
            }
            return Err(err);
        }

        if removed.is_some() {
            debug!("Deleted {} {}", kind, id);
        } else {
            debug!("Delete of {} {} found nothing", kind, id);
        }
        Ok(removed.is_some())
    }

    /// All records of `kind`, in insertion order.
    #[must_use]
    pub fn list(&self, kind: RecordKind) -> &[Record] {
        self.document.records(kind)
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, kind: RecordKind, id: &str) -> Option<&Record> {
        self.list(kind).iter().find(|record| record.id == id)
    }

    /// Records of `kind` with any searchable value containing `query`,
    /// ignoring case. Insertion order is kept; an empty query matches all.
    #[must_use]
    pub fn search(&self, kind: RecordKind, query: &str) -> Vec<&Record> {
        let needle = query.to_lowercase();
        self.list(kind)
            .iter()
            .filter(|record| record.matches(&needle))
            .collect()
    }

    /// Look up an agency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgency`] if `agency_id` is not in the table.
    pub fn agency(&self, agency_id: &str) -> Result<&Agency> {
        self.document
            .agencies()
            .get(agency_id)
            .ok_or_else(|| Error::invalid_agency(agency_id))
    }

    /// The agency table.
    #[must_use]
    pub fn agencies(&self) -> &AgencyTable {
        self.document.agencies()
    }

    /// Record counts for the status view.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let [citizens, vehicles, incidents, notes] =
            RecordKind::ALL.map(|kind| self.list(kind).len());
        StoreStats {
            citizens,
            vehicles,
            incidents,
            notes,
            agencies: self.agencies().len(),
        }
    }

    fn position(&self, kind: RecordKind, id: &str) -> Option<usize> {
        self.list(kind).iter().position(|record| record.id == id)
    }

    fn persist(&mut self) -> Result<()> {
        let json = self.document.to_json()?;
        self.backend
            .write(&self.key, &json)
            .map_err(|source| {
                warn!("Failed to persist '{}': {}", self.key, source);
                Error::PersistenceFailure {
                    key: self.key.clone(),
                    source,
                }
            })
    }
}

/// Record counts per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StoreStats {
    /// Number of citizen records.
    pub citizens: usize,
    /// Number of vehicle records.
    pub vehicles: usize,
    /// Number of incident records.
    pub incidents: usize,
    /// Number of note records.
    pub notes: usize,
    /// Number of agencies in the table.
    pub agencies: usize,
}

impl StoreStats {
    /// Count for one kind.
    #[must_use]
    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Citizen => self.citizens,
            RecordKind::Vehicle => self.vehicles,
            RecordKind::Incident => self.incidents,
            RecordKind::Note => self.notes,
        }
    }

    /// Total records across all kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.citizens + self.vehicles + self.incidents + self.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory backend whose writes can be switched to fail.
    #[derive(Debug, Clone, Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_writes: Arc<AtomicBool>,
    }

    impl Backend for FlakyBackend {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn read(&self, key: &str) -> io::Result<Option<String>> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::other("quota exceeded"));
            }
            self.inner.write(key, value)
        }
    }

    /// Backend sharing its entries with the test so the blob can be inspected.
    #[derive(Debug, Clone, Default)]
    struct SharedBackend(Arc<Mutex<MemoryBackend>>);

    impl Backend for SharedBackend {
        fn name(&self) -> &'static str {
            "shared"
        }

        fn read(&self, key: &str) -> io::Result<Option<String>> {
            self.0.lock().unwrap().read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
            self.0.lock().unwrap().write(key, value)
        }
    }

    fn create_test_store() -> RecordStore {
        crate::logging::init_test_logging();
        RecordStore::open_in_memory().expect("failed to create test store")
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn john_doe() -> FieldMap {
        fields(&[
            ("firstName", "John"),
            ("lastName", "Doe"),
            ("dob", "1990-01-01"),
            ("licenseNumber", "X123"),
            ("agency", "police"),
        ])
    }

    fn note(content: &str) -> FieldMap {
        fields(&[("content", content), ("agency", "ems")])
    }

    fn persisted(backend: &SharedBackend) -> Document {
        let blob = backend.0.lock().unwrap().get(DEFAULT_STORAGE_KEY).unwrap().to_string();
        Document::from_json(&blob).unwrap()
    }

    #[test]
    fn test_fresh_store_persists_default_document() {
        let backend = SharedBackend::default();
        let store = RecordStore::open(backend.clone(), DEFAULT_STORAGE_KEY).unwrap();

        assert_eq!(persisted(&backend), Document::default());
        assert_eq!(store.agencies().len(), 3);
        assert_eq!(store.key(), "mdtData");
        assert_eq!(store.backend_name(), "shared");
    }

    #[test]
    fn test_create_citizen_scenario() {
        let mut store = create_test_store();
        let record = store.create(RecordKind::Citizen, &john_doe()).unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.agency, "police");
        assert_eq!(record.kind(), RecordKind::Citizen);
        assert_eq!(record.get("firstName"), Some("John"));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp_iso()).is_ok());

        let citizens = store.list(RecordKind::Citizen);
        assert_eq!(citizens.len(), 1);
        assert_eq!(citizens[0], record);
    }

    #[test]
    fn test_create_fills_missing_fields_with_empty() {
        let mut store = create_test_store();
        let record = store
            .create(RecordKind::Vehicle, &fields(&[("make", "Vapid"), ("agency", "police")]))
            .unwrap();
        assert_eq!(record.get("make"), Some("Vapid"));
        assert_eq!(record.get("plateNumber"), Some(""));
    }

    #[test]
    fn test_create_invalid_agency_scenario() {
        let mut store = create_test_store();
        let err = store
            .create(
                RecordKind::Vehicle,
                &fields(&[
                    ("plateNumber", "46EEK572"),
                    ("make", "Vapid"),
                    ("model", "Stanier"),
                    ("color", "Black"),
                    ("agency", "unknown-agency"),
                ]),
            )
            .unwrap_err();

        assert!(matches!(err, Error::InvalidAgency { ref agency } if agency == "unknown-agency"));
        assert!(store.list(RecordKind::Vehicle).is_empty());
    }

    #[test]
    fn test_create_without_agency_is_invalid() {
        let mut store = create_test_store();
        let err = store
            .create(RecordKind::Note, &fields(&[("content", "x")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAgency { .. }));
    }

    #[test]
    fn test_create_unknown_field_rejected() {
        let mut store = create_test_store();
        let mut map = note("hello");
        map.insert("make".to_string(), "Vapid".to_string());

        let err = store.create(RecordKind::Note, &map).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
        assert!(store.list(RecordKind::Note).is_empty());
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let mut store = create_test_store();
        let ids: std::collections::HashSet<String> = (0..50)
            .map(|i| store.create(RecordKind::Note, &note(&format!("n{i}"))).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_create_persists_before_returning() {
        let backend = SharedBackend::default();
        let mut store = RecordStore::open(backend.clone(), DEFAULT_STORAGE_KEY).unwrap();
        store.create(RecordKind::Citizen, &john_doe()).unwrap();

        assert_eq!(&persisted(&backend), store.document());
    }

    #[test]
    fn test_update_preserves_id_and_timestamp() {
        let mut store = create_test_store();
        let created = store.create(RecordKind::Citizen, &john_doe()).unwrap();

        let updated = store
            .update(
                RecordKind::Citizen,
                &created.id,
                &fields(&[("lastName", "Smith"), ("agency", "fire")]),
            )
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.timestamp, created.timestamp);
        assert_eq!(updated.get("lastName"), Some("Smith"));
        assert_eq!(updated.get("firstName"), Some("John"));
        assert_eq!(updated.agency, "fire");
        assert_eq!(store.list(RecordKind::Citizen), [updated]);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut store = create_test_store();
        store.create(RecordKind::Note, &note("keep")).unwrap();
        let before = store.document().clone();

        let err = store
            .update(RecordKind::Note, "nope", &note("changed"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: RecordKind::Note, .. }));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_update_invalid_agency_changes_nothing() {
        let mut store = create_test_store();
        let created = store.create(RecordKind::Note, &note("keep")).unwrap();

        let err = store
            .update(
                RecordKind::Note,
                &created.id,
                &fields(&[("content", "changed"), ("agency", "sheriff")]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAgency { .. }));
        assert_eq!(store.get(RecordKind::Note, &created.id), Some(&created));
    }

    #[test]
    fn test_update_unknown_field_changes_nothing() {
        let mut store = create_test_store();
        let created = store.create(RecordKind::Note, &note("keep")).unwrap();

        let err = store
            .update(
                RecordKind::Note,
                &created.id,
                &fields(&[("content", "changed"), ("dob", "x")]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
        assert_eq!(store.get(RecordKind::Note, &created.id), Some(&created));
    }

    #[test]
    fn test_delete_first_of_two_notes_scenario() {
        let mut store = create_test_store();
        let first = store.create(RecordKind::Note, &note("first")).unwrap();
        let second = store.create(RecordKind::Note, &note("second")).unwrap();

        assert!(store.delete(RecordKind::Note, &first.id).unwrap());

        let notes = store.list(RecordKind::Note);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0], second);
    }

    #[test]
    fn test_delete_twice_is_not_an_error() {
        let mut store = create_test_store();
        let created = store.create(RecordKind::Citizen, &john_doe()).unwrap();

        assert!(store.delete(RecordKind::Citizen, &created.id).unwrap());
        assert!(!store.delete(RecordKind::Citizen, &created.id).unwrap());
        assert!(store.get(RecordKind::Citizen, &created.id).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut store = create_test_store();
        let first = store.create(RecordKind::Note, &note("a")).unwrap();
        store.delete(RecordKind::Note, &first.id).unwrap();
        let second = store.create(RecordKind::Note, &note("b")).unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.id.parse::<u64>().unwrap() > first.id.parse::<u64>().unwrap());
    }

    #[test]
    fn test_delete_only_touches_its_kind() {
        let mut store = create_test_store();
        let citizen = store.create(RecordKind::Citizen, &john_doe()).unwrap();
        store.delete(RecordKind::Note, &citizen.id).unwrap();
        assert_eq!(store.list(RecordKind::Citizen).len(), 1);
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let mut store = create_test_store();
        let alice = store
            .create(
                RecordKind::Citizen,
                &fields(&[("firstName", "Alice"), ("lastName", "Smith"), ("agency", "police")]),
            )
            .unwrap();
        store
            .create(
                RecordKind::Citizen,
                &fields(&[("firstName", "bob"), ("lastName", "Jones"), ("agency", "police")]),
            )
            .unwrap();
        let alfred = store
            .create(
                RecordKind::Citizen,
                &fields(&[("firstName", "ALFRED"), ("lastName", "Pal"), ("agency", "police")]),
            )
            .unwrap();

        let hits = store.search(RecordKind::Citizen, "AL");
        assert_eq!(hits, [&alice, &alfred]);

        let hits = store.search(RecordKind::Citizen, "nobody");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_empty_query_equals_list() {
        let mut store = create_test_store();
        for content in ["one", "two", "three"] {
            store.create(RecordKind::Note, &note(content)).unwrap();
        }

        let all: Vec<&Record> = store.list(RecordKind::Note).iter().collect();
        assert_eq!(store.search(RecordKind::Note, ""), all);
    }

    #[test]
    fn test_search_matches_agency_not_id() {
        let mut store = create_test_store();
        let created = store.create(RecordKind::Note, &note("plain")).unwrap();

        assert_eq!(store.search(RecordKind::Note, "EMS").len(), 1);
        assert!(store.search(RecordKind::Note, &created.id).is_empty());
    }

    #[test]
    fn test_agency_lookup() {
        let store = create_test_store();
        assert_eq!(store.agency("fire").unwrap(), &Agency::new("#FF0000", "FD"));
        assert!(matches!(
            store.agency("coast-guard"),
            Err(Error::InvalidAgency { .. })
        ));
    }

    #[test]
    fn test_reopen_sees_same_document() {
        let backend = SharedBackend::default();
        let mut store = RecordStore::open(backend.clone(), DEFAULT_STORAGE_KEY).unwrap();
        store.create(RecordKind::Citizen, &john_doe()).unwrap();
        store.create(RecordKind::Note, &note("n")).unwrap();
        let expected = store.document().clone();
        drop(store);

        let reopened = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(reopened.document(), &expected);
    }

    #[test]
    fn test_reopened_store_issues_later_ids() {
        let backend = SharedBackend::default();
        let mut store = RecordStore::open(backend.clone(), DEFAULT_STORAGE_KEY).unwrap();
        let first = store.create(RecordKind::Note, &note("a")).unwrap();
        drop(store);

        let mut reopened = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();
        let second = reopened.create(RecordKind::Note, &note("b")).unwrap();
        assert!(second.id.parse::<u64>().unwrap() > first.id.parse::<u64>().unwrap());
    }

    #[test]
    fn test_create_after_max_id_keeps_store_loadable() {
        let blob = format!(
            r##"{{"citizens":[],"vehicles":[],"incidents":[],
                "agencies":{{"ems":{{"color":"#00FF00","code":"EMS"}}}},
                "notes":[{{"id":"{}","content":"a","agency":"ems","timestamp":"2024-01-01T00:00:00Z"}}]}}"##,
            u64::MAX
        );
        let backend = SharedBackend::default();
        backend.0.lock().unwrap().write(DEFAULT_STORAGE_KEY, &blob).unwrap();

        let mut store = RecordStore::open(backend.clone(), DEFAULT_STORAGE_KEY).unwrap();
        let first = store.create(RecordKind::Note, &note("b")).unwrap();
        let second = store.create(RecordKind::Note, &note("c")).unwrap();
        assert_ne!(first.id, u64::MAX.to_string());
        assert_ne!(first.id, second.id);
        drop(store);

        let reopened = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(reopened.list(RecordKind::Note).len(), 3);
    }

    fn temp_config(name: &str, backend: BackendKind) -> (Config, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("mdt_store_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut config = Config::default();
        config.storage.backend = backend;
        config.storage.path = Some(match backend {
            BackendKind::Sqlite => dir.join("mdt.db"),
            BackendKind::File | BackendKind::Memory => dir.clone(),
        });
        (config, dir)
    }

    fn assert_reopen_through_config(name: &str, backend: BackendKind, expected_name: &str) {
        let (config, dir) = temp_config(name, backend);

        let mut store = RecordStore::from_config(&config).unwrap();
        assert_eq!(store.backend_name(), expected_name);
        store.create(RecordKind::Citizen, &john_doe()).unwrap();
        let note_id = store.create(RecordKind::Note, &note("first")).unwrap().id;
        store.create(RecordKind::Note, &note("second")).unwrap();
        store.delete(RecordKind::Note, &note_id).unwrap();
        let expected = store.document().clone();
        drop(store);

        let reopened = RecordStore::from_config(&config).unwrap();
        assert_eq!(reopened.backend_name(), expected_name);
        assert_eq!(reopened.document(), &expected);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_from_config_file_backend_reopens_same_document() {
        assert_reopen_through_config("file", BackendKind::File, "file");
    }

    #[test]
    fn test_from_config_sqlite_backend_reopens_same_document() {
        assert_reopen_through_config("sqlite", BackendKind::Sqlite, "sqlite");
    }

    #[test]
    fn test_from_config_memory_backend_starts_fresh() {
        let mut config = Config::default();
        config.storage.backend = BackendKind::Memory;
        config.storage.key = "terminal-2".to_string();

        let mut store = RecordStore::from_config(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.key(), "terminal-2");
        store.create(RecordKind::Note, &note("gone")).unwrap();

        let reopened = RecordStore::from_config(&config).unwrap();
        assert!(reopened.list(RecordKind::Note).is_empty());
    }

    #[test]
    fn test_corrupt_blob_fails_open() {
        let backend = MemoryBackend::with_entry(DEFAULT_STORAGE_KEY, "{\"citizens\": [");
        let err = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap_err();
        assert!(matches!(err, Error::CorruptStore { ref key, .. } if key == "mdtData"));
    }

    #[test]
    fn test_failed_first_write_fails_open() {
        let backend = FlakyBackend::default();
        backend.fail_writes.store(true, Ordering::SeqCst);
        let err = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap_err();
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn test_failed_write_rolls_back_create() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_writes.clone();
        let mut store = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = store.create(RecordKind::Citizen, &john_doe()).unwrap_err();

        assert!(err.is_persistence_failure());
        assert!(store.list(RecordKind::Citizen).is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back_update() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_writes.clone();
        let mut store = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();
        let created = store.create(RecordKind::Note, &note("before")).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = store
            .update(RecordKind::Note, &created.id, &note("after"))
            .unwrap_err();

        assert!(err.is_persistence_failure());
        assert_eq!(store.get(RecordKind::Note, &created.id), Some(&created));
    }

    #[test]
    fn test_failed_write_rolls_back_delete_in_place() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_writes.clone();
        let mut store = RecordStore::open(backend, DEFAULT_STORAGE_KEY).unwrap();
        for content in ["a", "b", "c"] {
            store.create(RecordKind::Note, &note(content)).unwrap();
        }
        let before = store.list(RecordKind::Note).to_vec();

        fail.store(true, Ordering::SeqCst);
        let err = store.delete(RecordKind::Note, &before[1].id).unwrap_err();

        assert!(err.is_persistence_failure());
        assert_eq!(store.list(RecordKind::Note), before.as_slice());

        fail.store(false, Ordering::SeqCst);
        assert!(store.delete(RecordKind::Note, &before[1].id).unwrap());
    }

    #[test]
    fn test_stats() {
        let mut store = create_test_store();
        store.create(RecordKind::Citizen, &john_doe()).unwrap();
        store.create(RecordKind::Note, &note("a")).unwrap();
        store.create(RecordKind::Note, &note("b")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.count(RecordKind::Citizen), 1);
        assert_eq!(stats.count(RecordKind::Vehicle), 0);
        assert_eq!(stats.count(RecordKind::Note), 2);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.agencies, 3);
    }

    #[test]
    fn test_shared_store_across_threads() {
        let shared = create_test_store().into_shared();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        shared
                            .lock()
                            .unwrap()
                            .create(RecordKind::Note, &note(&format!("{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = shared.lock().unwrap();
        let ids: std::collections::HashSet<&str> = store
            .list(RecordKind::Note)
            .iter()
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(ids.len(), 40);
    }
}
