//! Ask command handler.
//!
//! Answers a medical question through the knowledge engine.

use cardio_core::{config::AppConfig, AppResult};
use cardio_knowledge::{KnowledgeEngine, UserContext};
use clap::Args;

/// Ask a question about cardiac health
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Risk prediction from the classifier (1 = high risk, 0 = low risk)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub prediction: Option<u8>,

    /// Estimated risk in percent
    #[arg(long, requires = "prediction")]
    pub risk: Option<f64>,

    /// Output as JSON ({"response", "source", "confidence"})
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let engine = KnowledgeEngine::from_app_config(config)?;
        let context = self.user_context();

        let answer = engine.answer(&self.question, context.as_ref()).await;
        engine.cleanup().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            println!("{}", answer.text);
            tracing::debug!(
                "Answer source: {}, confidence: {:.2}",
                answer.source.as_str(),
                answer.confidence
            );
        }

        Ok(())
    }

    fn user_context(&self) -> Option<UserContext> {
        self.prediction.map(|prediction| UserContext {
            prediction: Some(prediction),
            risk_percentage: self.risk,
        })
    }
}
