use crate::core::error::PipelineError;
use crate::store::FundTable;
use tracing::info;

/// Leaves `table` empty with the current registry schema, whatever it held before.
pub fn provision<T: FundTable + ?Sized>(table: &mut T) -> Result<(), PipelineError> {
    table
        .provision()
        .map_err(|source| PipelineError::Provision {
            table: table.table_name().to_string(),
            source,
        })?;
    info!("Table {} provisioned", table.table_name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::store::memory::MemoryTable;

    struct BrokenTable;

    impl FundTable for BrokenTable {
        fn table_name(&self) -> &str {
            "BROKEN"
        }

        fn provision(&mut self) -> Result<(), StoreError> {
            Err(StoreError::InvalidTableName("BROKEN".to_string()))
        }

        fn insert_chunk(&mut self, _: &[crate::core::record::FundRecord]) -> Result<(), StoreError> {
            unreachable!("insert after failed provision")
        }

        fn row_count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_provision_failure_is_reported_with_table() {
        let err = provision(&mut BrokenTable).unwrap_err();
        assert!(matches!(err, PipelineError::Provision { ref table, .. } if table == "BROKEN"));
    }

    #[test]
    fn test_provision_memory_table() {
        let mut table = MemoryTable::new("FUNDOS");
        provision(&mut table).unwrap();
        assert_eq!(table.row_count().unwrap(), 0);
    }
}
