//! Prompts command handler.

use cardio_core::{config::AppConfig, AppResult};
use cardio_prompt::{list_prompts, load_prompt};
use clap::Args;

/// List available prompt definitions
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut prompts = Vec::new();
        for id in list_prompts(&config.workspace)? {
            match load_prompt(&config.workspace, &id) {
                Ok(def) => prompts.push((id, def.title)),
                Err(e) => tracing::warn!("Skipping prompt '{}': {}", id, e),
            }
        }

        if self.json {
            let output: Vec<_> = prompts
                .iter()
                .map(|(id, title)| serde_json::json!({ "id": id, "title": title }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for (id, title) in &prompts {
                println!("{:<24} {}", id, title);
            }
        }

        Ok(())
    }
}
