use super::ui;
use crate::core::config::AppConfig;
use crate::core::{FundRecord, Normalized, PipelineError};
use crate::pipeline::{self, Source};
use crate::providers::CvmProvider;
use anyhow::Result;
use comfy_table::Cell;
use std::path::Path;

pub fn records_table(records: &[FundRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("CNPJ"),
        ui::header_cell("Name"),
        ui::header_cell("Type"),
        ui::header_cell("Status"),
        ui::header_cell("Class"),
        ui::header_cell("Registered"),
        ui::header_cell("Net assets"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(&record.cnpj_fundo),
            ui::text_cell(&record.denom_social),
            ui::text_cell(&record.tp_fundo),
            ui::text_cell(&record.sit),
            ui::text_cell(&record.classe),
            record
                .dt_reg
                .map_or_else(ui::empty_cell, |d| Cell::new(d.format("%Y-%m-%d"))),
            ui::number_cell(format!("{:.2}", record.vl_patrim_liq)),
        ]);
    }
    table.to_string()
}

pub fn json_lines(records: &[FundRecord]) -> Result<String> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

fn display(normalized: &Normalized, limit: usize) -> String {
    let shown = &normalized.records[..limit.min(normalized.records.len())];
    let stats = &normalized.stats;
    format!(
        "{}\n\n{}\n\n{}",
        ui::style_text("Fund registry preview", ui::StyleType::Title),
        records_table(shown),
        ui::style_text(
            &format!(
                "Showing {} of {} records ({} rows read, {} duplicates removed)",
                shown.len(),
                normalized.records.len(),
                stats.rows_read,
                stats.duplicates_removed
            ),
            ui::StyleType::Subtle
        )
    )
}

/// Fetches and normalizes the export without touching the database.
pub async fn run(config: &AppConfig, input: Option<&Path>, limit: usize, json: bool) -> Result<()> {
    let format = config.source.format()?;
    let download_path = config.download_path()?;

    let provider;
    let source = match input {
        Some(path) => Source::Local(path),
        None => {
            provider = CvmProvider::new(&config.source).map_err(PipelineError::from)?;
            Source::Remote(&provider)
        }
    };

    let source_file = pipeline::acquire(source, &download_path).await?;
    let normalized = pipeline::normalize_file(&source_file, &format)?;
    source_file.discard()?;

    if json {
        let shown = &normalized.records[..limit.min(normalized.records.len())];
        println!("{}", json_lines(shown)?);
    } else {
        println!("{}", display(&normalized, limit));
    }
    Ok(())
}
