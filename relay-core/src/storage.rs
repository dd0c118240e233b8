//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `actors` - Persisted actor records (key: actor key, value: bincode)
//!
//! Each actor owns exactly one record here; no record is ever shared
//! across keys, so the store needs no locking beyond RocksDB's own.

use crate::error::{Error, Result};
use crate::Config;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const CF_ACTORS: &str = "actors";

/// Keyed record store for actor state
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create the database under the configured data directory
    pub fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(CF_ACTORS, Options::default())];

        let db = DB::open_cf_descriptors(&db_opts, &config.data_dir, cf_descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf_actors(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_ACTORS)
            .ok_or_else(|| Error::Storage("Missing column family: actors".to_string()))
    }

    /// Load the persisted record for an actor key, if any
    pub fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let cf = self.cf_actors()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist the record for an actor key. Write is synchronous; the
    /// caller acknowledges only after this returns.
    pub fn put_record<T: Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let cf = self.cf_actors()?;
        let bytes = bincode::serialize(record)?;
        self.db.put_cf(cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove the record for an actor key
    pub fn delete_record(&self, key: &str) -> Result<()> {
        let cf = self.cf_actors()?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }
}
