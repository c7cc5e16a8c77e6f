//! Ask command handler.
//!
//! Runs one question through the answering pipeline.

use super::print_json;
use clap::Args;
use regiguard_core::{config::AppConfig, AppResult};
use regiguard_knowledge::{Pipeline, PipelineResult, QueryRequest};

/// Ask a compliance question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Caller role (admin, officer, analyst)
    #[arg(short, long, default_value = "analyst")]
    pub role: String,

    /// Number of documents to ground the answer on
    #[arg(short = 'k', long = "k", visible_alias = "max-docs")]
    pub k: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let request = QueryRequest {
            question: self.question.clone(),
            role: self.role.clone(),
            k: self.k.unwrap_or(config.retrieval.default_k as i64),
        };

        let pipeline = Pipeline::from_config(config).await?;
        let result = pipeline.handle(request).await?;

        if self.json {
            print_json(&result)?;
        } else {
            print_result(&result);
        }

        Ok(())
    }
}

fn print_result(result: &PipelineResult) {
    println!("{}", result.answer);
    println!();

    if result.docs.is_empty() {
        println!("Sources: none");
    } else {
        println!("Sources:");
        for doc in &result.docs {
            println!(
                "  [{}] {} @ {} (distance {:.4})",
                doc.id, doc.access, doc.version, doc.score
            );
        }
    }

    println!();
    println!(
        "Intent: {} | Relevance: {:.2} ({})",
        result.plan.intent,
        result.relevance,
        if result.ok { "grounded" } else { "weakly grounded" }
    );
    println!("Query: {}", result.query_id);
}
