use crate::core::record::FundRecord;
use crate::store::{FundTable, StoreError, check_constraints};
use std::collections::HashSet;
use tracing::debug;

/// In-memory fund table with the same provisioning and chunk semantics as
/// the SQL destination.
#[derive(Debug, Default)]
pub struct MemoryTable {
    name: String,
    rows: Vec<FundRecord>,
    keys: HashSet<String>,
    provisioned: bool,
    commits: Vec<usize>,
}

impl MemoryTable {
    /// Creates a MemoryTable that still needs provisioning
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn rows(&self) -> &[FundRecord] {
        &self.rows
    }

    /// Sizes of the committed chunks since the last provision, in order
    pub fn commits(&self) -> &[usize] {
        &self.commits
    }
}

impl FundTable for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn provision(&mut self) -> Result<(), StoreError> {
        self.rows.clear();
        self.keys.clear();
        self.commits.clear();
        self.provisioned = true;
        debug!("Memory table {} provisioned", self.name);
        Ok(())
    }

    fn insert_chunk(&mut self, records: &[FundRecord]) -> Result<(), StoreError> {
        if !self.provisioned {
            return Err(StoreError::NotProvisioned(self.name.clone()));
        }

        let mut chunk_keys = HashSet::with_capacity(records.len());
        for record in records {
            check_constraints(record)?;
            let key = record.cnpj_fundo.as_str();
            if self.keys.contains(key) || !chunk_keys.insert(key) {
                return Err(StoreError::DuplicateKey(key.to_string()));
            }
        }

        self.keys
            .extend(records.iter().map(|r| r.cnpj_fundo.clone()));
        self.rows.extend_from_slice(records);
        self.commits.push(records.len());
        Ok(())
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        if !self.provisioned {
            return Err(StoreError::NotProvisioned(self.name.clone()));
        }
        Ok(self.rows.len() as u64)
    }
}
