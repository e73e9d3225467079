//! Fund registry record and its fixed column catalogue

use chrono::NaiveDate;
use rusqlite::types::Value;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Display;

/// SQL shape of a registry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Bounded text, `VARCHAR(n)`
    Text(u16),
    /// Unbounded text
    LargeText,
    /// Fixed width code, `CHAR(n)`
    Char(u8),
    Date,
    Integer,
    Float,
    /// `DECIMAL(18,2)`
    Decimal,
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Text(len) => write!(f, "VARCHAR({len})"),
            ColumnKind::LargeText => write!(f, "TEXT"),
            ColumnKind::Char(len) => write!(f, "CHAR({len})"),
            ColumnKind::Date => write!(f, "DATE"),
            ColumnKind::Integer => write!(f, "INTEGER"),
            ColumnKind::Float => write!(f, "FLOAT"),
            ColumnKind::Decimal => write!(f, "DECIMAL(18,2)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub primary_key: bool,
}

impl ColumnDef {
    /// Character limit of bounded text columns.
    pub fn max_len(&self) -> Option<usize> {
        match self.kind {
            ColumnKind::Text(len) => Some(len.into()),
            ColumnKind::Char(len) => Some(len.into()),
            _ => None,
        }
    }
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        primary_key: false,
    }
}

pub const COLUMN_COUNT: usize = 41;

/// Position of `CNPJ_FUNDO` in [`COLUMNS`].
pub const IDENTIFIER_INDEX: usize = 1;

/// Registry columns in table order. Insert statements and [`FundRecord::values`]
/// follow this order.
pub const COLUMNS: [ColumnDef; COLUMN_COUNT] = [
    col("TP_FUNDO", ColumnKind::Text(50)),
    ColumnDef {
        name: "CNPJ_FUNDO",
        kind: ColumnKind::Text(14),
        primary_key: true,
    },
    col("DENOM_SOCIAL", ColumnKind::LargeText),
    col("DT_REG", ColumnKind::Date),
    col("DT_CONST", ColumnKind::Date),
    col("CD_CVM", ColumnKind::Integer),
    col("DT_CANCEL", ColumnKind::Date),
    col("SIT", ColumnKind::Text(50)),
    col("DT_INI_SIT", ColumnKind::Date),
    col("DT_INI_ATIV", ColumnKind::Date),
    col("DT_INI_EXERC", ColumnKind::Date),
    col("DT_FIM_EXERC", ColumnKind::Date),
    col("CLASSE", ColumnKind::Text(50)),
    col("DT_INI_CLASSE", ColumnKind::Date),
    col("RENTAB_FUNDO", ColumnKind::Text(200)),
    col("CONDOM", ColumnKind::Text(50)),
    col("FUNDO_COTAS", ColumnKind::Char(1)),
    col("FUNDO_EXCLUSIVO", ColumnKind::Char(1)),
    col("TRIB_LPRAZO", ColumnKind::Char(1)),
    col("PUBLICO_ALVO", ColumnKind::Text(50)),
    col("ENTID_INVEST", ColumnKind::Char(1)),
    col("TAXA_PERFM", ColumnKind::Float),
    col("INF_TAXA_PERFM", ColumnKind::LargeText),
    col("TAXA_ADM", ColumnKind::Float),
    col("INF_TAXA_ADM", ColumnKind::LargeText),
    col("VL_PATRIM_LIQ", ColumnKind::Decimal),
    col("DT_PATRIM_LIQ", ColumnKind::Date),
    col("DIRETOR", ColumnKind::Text(200)),
    col("CNPJ_ADMIN", ColumnKind::Text(18)),
    col("ADMIN", ColumnKind::Text(300)),
    col("PF_PJ_GESTOR", ColumnKind::Char(2)),
    col("CPF_CNPJ_GESTOR", ColumnKind::Text(20)),
    col("GESTOR", ColumnKind::Text(300)),
    col("CNPJ_AUDITOR", ColumnKind::Text(20)),
    col("AUDITOR", ColumnKind::Text(300)),
    col("CNPJ_CUSTODIANTE", ColumnKind::Text(20)),
    col("CUSTODIANTE", ColumnKind::Text(300)),
    col("CNPJ_CONTROLADOR", ColumnKind::Text(20)),
    col("CONTROLADOR", ColumnKind::Text(300)),
    col("INVEST_CEMPR_EXTER", ColumnKind::Char(1)),
    col("CLASSE_ANBIMA", ColumnKind::Text(300)),
];

pub fn column_names() -> impl Iterator<Item = &'static str> {
    COLUMNS.iter().map(|c| c.name)
}

/// One fund of the registry with every attribute populated.
///
/// Text and code attributes default to `""`, numeric attributes to zero and
/// dates to `None` when the source leaves them out.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FundRecord {
    pub tp_fundo: String,
    pub cnpj_fundo: String,
    pub denom_social: String,
    pub dt_reg: Option<NaiveDate>,
    pub dt_const: Option<NaiveDate>,
    pub cd_cvm: i64,
    pub dt_cancel: Option<NaiveDate>,
    pub sit: String,
    pub dt_ini_sit: Option<NaiveDate>,
    pub dt_ini_ativ: Option<NaiveDate>,
    pub dt_ini_exerc: Option<NaiveDate>,
    pub dt_fim_exerc: Option<NaiveDate>,
    pub classe: String,
    pub dt_ini_classe: Option<NaiveDate>,
    pub rentab_fundo: String,
    pub condom: String,
    pub fundo_cotas: String,
    pub fundo_exclusivo: String,
    pub trib_lprazo: String,
    pub publico_alvo: String,
    pub entid_invest: String,
    pub taxa_perfm: f64,
    pub inf_taxa_perfm: String,
    pub taxa_adm: f64,
    pub inf_taxa_adm: String,
    pub vl_patrim_liq: Decimal,
    pub dt_patrim_liq: Option<NaiveDate>,
    pub diretor: String,
    pub cnpj_admin: String,
    pub admin: String,
    pub pf_pj_gestor: String,
    pub cpf_cnpj_gestor: String,
    pub gestor: String,
    pub cnpj_auditor: String,
    pub auditor: String,
    pub cnpj_custodiante: String,
    pub custodiante: String,
    pub cnpj_controlador: String,
    pub controlador: String,
    pub invest_cempr_exter: String,
    pub classe_anbima: String,
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn date(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, |d| Value::Text(d.format("%Y-%m-%d").to_string()))
}

impl FundRecord {
    /// SQL parameter values in [`COLUMNS`] order.
    pub fn values(&self) -> [Value; COLUMN_COUNT] {
        [
            text(&self.tp_fundo),
            text(&self.cnpj_fundo),
            text(&self.denom_social),
            date(self.dt_reg),
            date(self.dt_const),
            Value::Integer(self.cd_cvm),
            date(self.dt_cancel),
            text(&self.sit),
            date(self.dt_ini_sit),
            date(self.dt_ini_ativ),
            date(self.dt_ini_exerc),
            date(self.dt_fim_exerc),
            text(&self.classe),
            date(self.dt_ini_classe),
            text(&self.rentab_fundo),
            text(&self.condom),
            text(&self.fundo_cotas),
            text(&self.fundo_exclusivo),
            text(&self.trib_lprazo),
            text(&self.publico_alvo),
            text(&self.entid_invest),
            Value::Real(self.taxa_perfm),
            text(&self.inf_taxa_perfm),
            Value::Real(self.taxa_adm),
            text(&self.inf_taxa_adm),
            Value::Text(self.vl_patrim_liq.to_string()),
            date(self.dt_patrim_liq),
            text(&self.diretor),
            text(&self.cnpj_admin),
            text(&self.admin),
            text(&self.pf_pj_gestor),
            text(&self.cpf_cnpj_gestor),
            text(&self.gestor),
            text(&self.cnpj_auditor),
            text(&self.auditor),
            text(&self.cnpj_custodiante),
            text(&self.custodiante),
            text(&self.cnpj_controlador),
            text(&self.controlador),
            text(&self.invest_cempr_exter),
            text(&self.classe_anbima),
        ]
    }
}
