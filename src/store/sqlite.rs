use crate::core::record::{COLUMNS, FundRecord};
use crate::store::{FundTable, StoreError, validate_table_name};
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use tracing::debug;

/// Fund table in a SQLite database.
pub struct SqliteTable {
    conn: Connection,
    table: String,
    insert_sql: String,
}

impl SqliteTable {
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened SQLite database at {}", path.display());
        Ok(Self::with_connection(conn, table))
    }

    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        Ok(Self::with_connection(Connection::open_in_memory()?, table))
    }

    fn with_connection(conn: Connection, table: &str) -> Self {
        SqliteTable {
            conn,
            table: table.to_string(),
            insert_sql: insert_sql(table),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Column widths and the digits-only key are enforced with `CHECK`
/// clauses, since SQLite ignores declared lengths.
pub fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = COLUMNS
        .iter()
        .map(|c| {
            let mut checks = Vec::new();
            if let Some(max) = c.max_len() {
                checks.push(format!("length({}) <= {max}", c.name));
            }
            if c.primary_key {
                checks.push(format!("{} NOT GLOB '*[^0-9]*'", c.name));
            }

            let mut def = format!("    {} {}", c.name, c.kind);
            if c.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            if !checks.is_empty() {
                def.push_str(&format!(" CHECK ({})", checks.join(" AND ")));
            }
            def
        })
        .collect();
    format!("CREATE TABLE \"{table}\" (\n{}\n);", columns.join(",\n"))
}

pub fn insert_sql(table: &str) -> String {
    let names: Vec<&str> = COLUMNS.iter().map(|c| c.name).collect();
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO \"{table}\" ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    )
}

impl FundTable for SqliteTable {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn provision(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", self.table))?;
        tx.execute_batch(&create_table_sql(&self.table))?;
        tx.commit()?;
        debug!("Recreated table {}", self.table);
        Ok(())
    }

    fn insert_chunk(&mut self, records: &[FundRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                stmt.execute(params_from_iter(record.values()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn record(cnpj: &str) -> FundRecord {
        FundRecord {
            cnpj_fundo: cnpj.to_string(),
            denom_social: format!("Fundo {cnpj}"),
            ..Default::default()
        }
    }

    fn schema(table: &SqliteTable) -> Vec<(String, String, i64)> {
        let mut stmt = table
            .connection()
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")
            .unwrap();
        let columns = stmt
            .query_map([table.table_name()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        columns
    }

    #[test]
    fn test_provision_creates_fixed_schema() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();

        let columns = schema(&table);
        assert_eq!(columns.len(), COLUMNS.len());
        assert_eq!(columns[0], ("TP_FUNDO".to_string(), "VARCHAR(50)".to_string(), 0));
        assert_eq!(columns[1], ("CNPJ_FUNDO".to_string(), "VARCHAR(14)".to_string(), 1));
        assert_eq!(columns[2].1, "TEXT");
        assert_eq!(columns[25], ("VL_PATRIM_LIQ".to_string(), "DECIMAL(18,2)".to_string(), 0));
        assert_eq!(columns[30], ("PF_PJ_GESTOR".to_string(), "CHAR(2)".to_string(), 0));
        assert_eq!(table.row_count().unwrap(), 0);
    }

    #[test]
    fn test_provision_twice_on_populated_table_is_idempotent() {
        let mut fresh = SqliteTable::open_in_memory("FUNDOS").unwrap();
        fresh.provision().unwrap();

        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();
        table.insert_chunk(&[record("1"), record("2")]).unwrap();
        assert_eq!(table.row_count().unwrap(), 2);

        table.provision().unwrap();
        table.provision().unwrap();

        assert_eq!(table.row_count().unwrap(), 0);
        assert_eq!(schema(&table), schema(&fresh));
    }

    #[test]
    fn test_provision_replaces_foreign_definition() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table
            .connection()
            .execute_batch("CREATE TABLE FUNDOS (OLD TEXT); INSERT INTO FUNDOS VALUES ('x');")
            .unwrap();

        table.provision().unwrap();

        assert_eq!(schema(&table).len(), COLUMNS.len());
        assert_eq!(table.row_count().unwrap(), 0);
    }

    #[test]
    fn test_insert_chunk_binds_every_column() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();
        let mut fund = record("12345678000199");
        fund.dt_reg = NaiveDate::from_ymd_opt(2003, 4, 30);
        fund.cd_cvm = 2909;
        fund.taxa_adm = 1.5;
        fund.vl_patrim_liq = Decimal::new(123456, 2);
        fund.classe_anbima = "Renda Fixa".to_string();

        table.insert_chunk(&[fund]).unwrap();

        let (cnpj, dt_reg, dt_const, cd_cvm, taxa_adm, vl, anbima): (
            String,
            String,
            Option<String>,
            i64,
            f64,
            f64,
            String,
        ) = table
            .connection()
            .query_row(
                "SELECT CNPJ_FUNDO, DT_REG, DT_CONST, CD_CVM, TAXA_ADM, VL_PATRIM_LIQ, CLASSE_ANBIMA FROM FUNDOS",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .unwrap();
        assert_eq!(cnpj, "12345678000199");
        assert_eq!(dt_reg, "2003-04-30");
        assert_eq!(dt_const, None);
        assert_eq!(cd_cvm, 2909);
        assert_eq!(taxa_adm, 1.5);
        assert!((vl - 1234.56).abs() < 1e-9);
        assert_eq!(anbima, "Renda Fixa");
    }

    #[test]
    fn test_failed_chunk_is_rolled_back() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();
        table.insert_chunk(&[record("1")]).unwrap();

        let result = table.insert_chunk(&[record("2"), record("1")]);

        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        assert_eq!(table.row_count().unwrap(), 1);
    }

    #[test]
    fn test_schema_rejects_over_width_and_non_digit_values() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();

        let mut long_key = record("12345678000199");
        long_key.cnpj_fundo = "12345678000199XYZ-too-long".to_string();
        let mut letters_key = record("1");
        letters_key.cnpj_fundo = "1234567800019A".to_string();
        let mut wide_flag = record("2");
        wide_flag.fundo_cotas = "SIM".to_string();
        let mut wide_code = record("3");
        wide_code.pf_pj_gestor = "ABCDE".to_string();

        for bad in [long_key, letters_key, wide_flag, wide_code] {
            let result = table.insert_chunk(&[bad]);
            assert!(matches!(result, Err(StoreError::Sqlite(_))), "{result:?}");
        }
        assert_eq!(table.row_count().unwrap(), 0);

        let mut fits = record("12345678000199");
        fits.fundo_cotas = "S".to_string();
        fits.pf_pj_gestor = "PJ".to_string();
        fits.denom_social = "A".repeat(1000);
        table.insert_chunk(&[fits, record("")]).unwrap();
        assert_eq!(table.row_count().unwrap(), 2);
    }

    #[test]
    fn test_decimal_round_trips_at_largest_exact_value() {
        let mut table = SqliteTable::open_in_memory("FUNDOS").unwrap();
        table.provision().unwrap();
        let mut high = record("1");
        high.vl_patrim_liq = Decimal::from_str("9999999999999.99").unwrap();
        let mut low = record("2");
        low.vl_patrim_liq = Decimal::from_str("-9999999999999.99").unwrap();

        table.insert_chunk(&[high, low]).unwrap();

        let stored: Vec<(String, f64)> = {
            let mut stmt = table
                .connection()
                .prepare("SELECT typeof(VL_PATRIM_LIQ), VL_PATRIM_LIQ FROM FUNDOS ORDER BY CNPJ_FUNDO")
                .unwrap();
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            rows
        };
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].0, "real");
        assert_eq!(format!("{:.2}", stored[0].1), "9999999999999.99");
        assert_eq!(format!("{:.2}", stored[1].1), "-9999999999999.99");
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("fundos.db");

        let mut table = SqliteTable::open(&path, "FUNDOS").unwrap();
        table.provision().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_open_rejects_unsafe_table_name() {
        let result = SqliteTable::open_in_memory("FUNDOS\"; --");
        assert!(matches!(result, Err(StoreError::InvalidTableName(_))));
    }

    #[test]
    fn test_generated_sql() {
        let ddl = create_table_sql("FUNDOS");
        assert!(ddl.starts_with(
            "CREATE TABLE \"FUNDOS\" (\n    TP_FUNDO VARCHAR(50) CHECK (length(TP_FUNDO) <= 50),\n"
        ));
        assert!(ddl.contains(
            "    CNPJ_FUNDO VARCHAR(14) PRIMARY KEY CHECK (length(CNPJ_FUNDO) <= 14 AND CNPJ_FUNDO NOT GLOB '*[^0-9]*'),\n"
        ));
        assert!(ddl.contains("    DENOM_SOCIAL TEXT,\n"));
        assert!(ddl.contains("    VL_PATRIM_LIQ DECIMAL(18,2),\n"));
        assert!(ddl.ends_with("    CLASSE_ANBIMA VARCHAR(300) CHECK (length(CLASSE_ANBIMA) <= 300)\n);"));

        let insert = insert_sql("FUNDOS");
        assert!(insert.starts_with("INSERT INTO \"FUNDOS\" (TP_FUNDO, CNPJ_FUNDO, DENOM_SOCIAL,"));
        assert!(insert.ends_with("?40, ?41)"));
    }
}
