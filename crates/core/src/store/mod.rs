//! CSV-backed persistence for the three fleet collections.

/// Multi-collection write groups.
pub mod changeset;
mod journal;

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::{
    config::AppConfig,
    models::{Booking, Client, Vehicle},
};

pub use changeset::Changeset;
use journal::{journal_path, RollbackJournal};

/// The persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `vehicles.csv` by default.
    Vehicles,
    /// `clients.csv` by default.
    Clients,
    /// `bookings.csv` by default.
    Bookings,
}

impl RecordKind {
    /// Every collection, in initialisation order.
    pub const ALL: [RecordKind; 3] = [Self::Vehicles, Self::Clients, Self::Bookings];

    /// Header row written at the top of the collection file.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Self::Vehicles => &["vehicle_id", "type", "status"],
            Self::Clients => &["client_id", "name", "contact"],
            Self::Bookings => &["client_id", "vehicle_id"],
        }
    }

    /// Lower-case name used in logs and messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Vehicles => "vehicles",
            Self::Clients => "clients",
            Self::Bookings => "bookings",
        }
    }
}

/// A row type stored in one of the collections.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Collection the record lives in.
    const KIND: RecordKind;
}

/// A record with a unique primary key.
pub trait Keyed: Record {
    /// The unique id of this record.
    fn key(&self) -> &str;
}

impl Record for Vehicle {
    const KIND: RecordKind = RecordKind::Vehicles;
}

impl Keyed for Vehicle {
    fn key(&self) -> &str {
        &self.vehicle_id
    }
}

impl Record for Client {
    const KIND: RecordKind = RecordKind::Clients;
}

impl Keyed for Client {
    fn key(&self) -> &str {
        &self.client_id
    }
}

impl Record for Booking {
    const KIND: RecordKind = RecordKind::Bookings;
}

/// Loads and saves collections as CSV files under the configured data directory.
///
/// Every call goes to disk; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct RecordStore {
    config: AppConfig,
}

impl RecordStore {
    /// Open the store, creating missing files and rolling back any interrupted commit.
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = Self { config };
        fs::create_dir_all(&store.config.data_dir).with_context(|| {
            format!("failed to create {}", store.config.data_dir.display())
        })?;
        store.recover()?;
        for kind in RecordKind::ALL {
            store.ensure_file(kind)?;
        }
        info!(data_dir = %store.config.data_dir.display(), "Record store opened");
        Ok(store)
    }

    /// Settings the store was opened with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the file backing `kind`.
    pub fn path(&self, kind: RecordKind) -> PathBuf {
        let file = match kind {
            RecordKind::Vehicles => &self.config.vehicles_file,
            RecordKind::Clients => &self.config.clients_file,
            RecordKind::Bookings => &self.config.bookings_file,
        };
        self.config.data_dir.join(file)
    }

    /// Load every record of `R`'s collection in file order.
    pub fn load<R: Record>(&self) -> Result<Vec<R>> {
        self.recover()?;
        self.ensure_file(R::KIND)?;
        let path = self.path(R::KIND);
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .clone();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            // +2: one for the header row, one for 1-based numbering.
            let line = index + 2;
            let mut row =
                row.with_context(|| format!("failed to read line {line} of {}", path.display()))?;
            while row.len() < headers.len() {
                row.push_field("");
            }
            let record = row
                .deserialize::<R>(Some(&headers))
                .with_context(|| format!("failed to parse line {line} of {}", path.display()))?;
            records.push(record);
        }
        debug!(kind = R::KIND.label(), count = records.len(), "Loaded collection");
        Ok(records)
    }

    /// Overwrite `R`'s collection with `records`.
    pub fn save<R: Record>(&self, records: &[R]) -> Result<()> {
        self.recover()?;
        let contents = render(records)?;
        let path = self.path(R::KIND);
        write_atomic(&path, contents.as_bytes())?;
        debug!(kind = R::KIND.label(), count = records.len(), "Saved collection");
        Ok(())
    }

    /// Apply every collection in `changeset`, or none of them.
    pub fn commit(&self, changeset: Changeset) -> Result<()> {
        self.commit_with(changeset, write_atomic)
    }

    fn commit_with(
        &self,
        changeset: Changeset,
        mut apply: impl FnMut(&Path, &[u8]) -> Result<()>,
    ) -> Result<()> {
        if changeset.is_empty() {
            return Ok(());
        }
        self.recover()?;

        let staged = changeset.into_staged();
        let targets: Vec<(RecordKind, PathBuf)> = staged
            .iter()
            .map(|entry| (entry.kind, self.path(entry.kind)))
            .collect();
        let journal = RollbackJournal::capture(
            targets.iter().map(|(kind, path)| (*kind, path.as_path())),
        )?;
        let journal_file = self.journal_path();
        journal.persist(&journal_file)?;

        for (entry, (_, path)) in staged.iter().zip(&targets) {
            if let Err(err) = apply(path.as_path(), entry.contents.as_bytes()) {
                error!(?err, kind = entry.kind.label(), "Commit failed; rolling back");
                // The journal stays on disk until a rollback succeeds.
                self.rollback(&journal)
                    .context("rollback failed; journal kept for recovery")?;
                RollbackJournal::discard(&journal_file)?;
                return Err(err.context("commit rolled back"));
            }
        }

        RollbackJournal::discard(&journal_file)?;
        debug!(collections = staged.len(), "Committed changeset");
        Ok(())
    }

    /// Roll back a commit left unfinished on disk. Returns whether one was found.
    ///
    /// Called before every load, save and commit, so a journal left by a failed
    /// rollback blocks further access until it can be applied.
    pub fn recover(&self) -> Result<bool> {
        let journal_file = self.journal_path();
        let Some(journal) = RollbackJournal::load(&journal_file)? else {
            return Ok(false);
        };
        warn!(
            collections = journal.entries.len(),
            started_at = %journal.started_at,
            "Rolling back interrupted commit"
        );
        self.rollback(&journal)?;
        RollbackJournal::discard(&journal_file)?;
        Ok(true)
    }

    fn rollback(&self, journal: &RollbackJournal) -> Result<()> {
        for entry in &journal.entries {
            let path = self.path(entry.kind);
            match &entry.previous {
                Some(previous) => write_atomic(&path, previous.as_bytes())?,
                None if path.exists() => fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?,
                None => {}
            }
        }
        Ok(())
    }

    fn ensure_file(&self, kind: RecordKind) -> Result<()> {
        let path = self.path(kind);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        write_atomic(&path, header_line(kind)?.as_bytes())?;
        info!(path = %path.display(), "Initialised empty {} collection", kind.label());
        Ok(())
    }

    fn journal_path(&self) -> PathBuf {
        journal_path(&self.config.data_dir)
    }
}

fn header_line(kind: RecordKind) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(kind.headers())?;
    into_string(writer)
}

/// Render `records` as a complete CSV document, header included.
pub(crate) fn render<R: Record>(records: &[R]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(R::KIND.headers())?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("failed to encode {} row", R::KIND.label()))?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .context("failed to flush csv buffer")?;
    String::from_utf8(bytes).context("csv output was not utf-8")
}

/// Replace `path` with `contents` via a synced sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))?;
    file.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleStatus;
    use anyhow::anyhow;
    use tempfile::tempdir;

    fn open(dir: &Path) -> Result<RecordStore> {
        RecordStore::open(AppConfig::with_data_dir(dir))
    }

    #[test]
    fn open_initialises_header_only_files() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;

        let vehicles = fs::read_to_string(store.path(RecordKind::Vehicles))?;
        assert_eq!(vehicles, "vehicle_id,type,status\n");
        let clients = fs::read_to_string(store.path(RecordKind::Clients))?;
        assert_eq!(clients, "client_id,name,contact\n");
        let bookings = fs::read_to_string(store.path(RecordKind::Bookings))?;
        assert_eq!(bookings, "client_id,vehicle_id\n");

        assert!(store.load::<Vehicle>()?.is_empty());
        Ok(())
    }

    #[test]
    fn save_and_load_preserve_order() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        let vehicles = vec![
            Vehicle::new("V2", "Bus"),
            Vehicle::new("V1", "Truck, flatbed"),
        ];
        store.save(&vehicles)?;
        assert_eq!(store.load::<Vehicle>()?, vehicles);

        store.save::<Vehicle>(&[])?;
        assert!(store.load::<Vehicle>()?.is_empty());
        assert_eq!(
            fs::read_to_string(store.path(RecordKind::Vehicles))?,
            "vehicle_id,type,status\n"
        );
        Ok(())
    }

    #[test]
    fn missing_fields_load_as_empty_strings() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        fs::write(
            store.path(RecordKind::Clients),
            "client_id,name,contact\nC1,Alice\nC2,Bob,555\n",
        )?;
        fs::write(
            store.path(RecordKind::Vehicles),
            "vehicle_id,type,status\nV1,Truck\nV2,Car,available\n",
        )?;

        let clients = store.load::<Client>()?;
        assert_eq!(clients[0].contact, "");
        assert_eq!(clients[1].contact, "555");

        let vehicles = store.load::<Vehicle>()?;
        assert_eq!(vehicles[0].status, VehicleStatus::Other(String::new()));
        assert_eq!(vehicles[1].status, VehicleStatus::Available);
        Ok(())
    }

    #[test]
    fn deleted_file_is_recreated_on_load() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        fs::remove_file(store.path(RecordKind::Bookings))?;
        assert!(store.load::<Booking>()?.is_empty());
        assert!(store.path(RecordKind::Bookings).exists());
        Ok(())
    }

    #[test]
    fn commit_applies_every_collection() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;

        let mut changeset = Changeset::new();
        changeset
            .stage(&[Vehicle::new("V1", "Truck")])?
            .stage(&[Booking::new("C1", "V1")])?;
        store.commit(changeset)?;

        assert_eq!(store.load::<Vehicle>()?.len(), 1);
        assert_eq!(store.load::<Booking>()?, vec![Booking::new("C1", "V1")]);
        assert!(!store.journal_path().exists());
        Ok(())
    }

    #[test]
    fn failed_commit_restores_prior_contents() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        store.save(&[Vehicle::new("V1", "Truck")])?;

        let mut booked = Vehicle::new("V1", "Truck");
        booked.status = VehicleStatus::Booked;
        let mut changeset = Changeset::new();
        changeset
            .stage(&[booked])?
            .stage(&[Booking::new("C1", "V1")])?;

        let mut writes = 0;
        let result = store.commit_with(changeset, |path, contents| {
            writes += 1;
            if writes == 2 {
                return Err(anyhow!("disk full"));
            }
            write_atomic(path, contents)
        });

        assert!(result.is_err());
        assert_eq!(store.load::<Vehicle>()?, vec![Vehicle::new("V1", "Truck")]);
        assert!(store.load::<Booking>()?.is_empty());
        assert!(!store.journal_path().exists());
        Ok(())
    }

    #[test]
    fn failed_rollback_blocks_writes_until_recovered() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        store.save(&[Vehicle::new("V1", "Truck")])?;
        let vehicles_path = store.path(RecordKind::Vehicles);

        let mut booked = Vehicle::new("V1", "Truck");
        booked.status = VehicleStatus::Booked;
        let mut changeset = Changeset::new();
        changeset
            .stage(&[booked])?
            .stage(&[Booking::new("C1", "V1")])?;

        // The first write leaves a directory where the vehicle file was, so
        // restoring it fails as well.
        let mut writes = 0;
        let result = store.commit_with(changeset, |path, _| {
            writes += 1;
            if writes == 1 {
                fs::remove_file(path)?;
                fs::create_dir(path)?;
                return Ok(());
            }
            Err(anyhow!("disk full"))
        });
        assert!(result.is_err());
        assert!(store.journal_path().exists());

        let both = [Vehicle::new("V1", "Truck"), Vehicle::new("V2", "Bus")];
        assert!(store.save(&both).is_err());
        assert!(store.load::<Vehicle>().is_err());
        assert!(store.journal_path().exists());

        fs::remove_dir(&vehicles_path)?;
        store.save(&both)?;
        assert!(!store.journal_path().exists());
        assert!(store.load::<Booking>()?.is_empty());

        let reopened = open(dir.path())?;
        assert_eq!(reopened.load::<Vehicle>()?, both.to_vec());
        Ok(())
    }

    #[test]
    fn open_rolls_back_interrupted_commit() -> Result<()> {
        let dir = tempdir()?;
        let store = open(dir.path())?;
        store.save(&[Vehicle::new("V1", "Truck")])?;

        // Simulate a crash after the vehicle file was replaced.
        let vehicles_path = store.path(RecordKind::Vehicles);
        let bookings_path = store.path(RecordKind::Bookings);
        let journal = RollbackJournal::capture([
            (RecordKind::Vehicles, vehicles_path.as_path()),
            (RecordKind::Bookings, bookings_path.as_path()),
        ])?;
        journal.persist(store.journal_path())?;
        let mut booked = Vehicle::new("V1", "Truck");
        booked.status = VehicleStatus::Booked;
        write_atomic(&vehicles_path, render(&[booked])?.as_bytes())?;

        let reopened = open(dir.path())?;
        assert_eq!(
            reopened.load::<Vehicle>()?,
            vec![Vehicle::new("V1", "Truck")]
        );
        assert!(!reopened.journal_path().exists());
        assert!(!reopened.recover()?);
        Ok(())
    }
}
