use super::ui;
use crate::core::config::AppConfig;
use crate::pipeline::{self, Destination, PipelineOutcome};
use anyhow::Result;
use std::path::Path;

impl PipelineOutcome {
    pub fn display_summary(&self, table: &str, destination: Destination) -> String {
        let stats = &self.normalize;
        let target = match destination {
            Destination::Database => table.to_string(),
            Destination::Memory => format!("{table} (dry run)"),
        };

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Fund registry load", ui::StyleType::Title)
        );
        output.push_str(&format!(
            "Rows read:           {}\n",
            ui::style_text(&stats.rows_read.to_string(), ui::StyleType::Count)
        ));
        output.push_str(&format!(
            "Duplicates removed:  {}\n",
            ui::style_text(&stats.duplicates_removed.to_string(), ui::StyleType::Count)
        ));
        if stats.missing_identifiers > 0 {
            output.push_str(&format!(
                "Missing CNPJ_FUNDO:  {}\n",
                ui::style_text(&stats.missing_identifiers.to_string(), ui::StyleType::Warning)
            ));
        }
        output.push_str(&format!(
            "Loaded into {}: {} rows in {} chunks",
            target,
            ui::style_text(&self.load.rows.to_string(), ui::StyleType::Success),
            self.load.chunks
        ));
        output
    }
}

pub async fn run(config: &AppConfig, input: Option<&Path>, dry_run: bool) -> Result<()> {
    let destination = if dry_run {
        Destination::Memory
    } else {
        Destination::Database
    };

    let mut pb = None;
    let outcome = pipeline::run_with_config(config, input, destination, |progress| {
        let bar = pb.get_or_insert_with(|| ui::new_progress_bar(progress.total as u64));
        bar.set_message(format!(
            "chunk {}/{}",
            progress.chunk, progress.total_chunks
        ));
        bar.set_position(progress.loaded as u64);
    })
    .await;
    if let Some(bar) = pb {
        bar.finish_and_clear();
    }

    let outcome = outcome?;
    println!(
        "{}",
        outcome.display_summary(&config.database.table, destination)
    );
    Ok(())
}
