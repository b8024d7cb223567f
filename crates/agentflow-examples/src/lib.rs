//! Shared setup for the runnable demos.

use std::sync::Arc;

use agentflow_core::model::ChatModel;
use agentflow_core::settings::Settings;
use agentflow_llm::openai::OpenAIChatModel;
use agentflow_llm::retry::RetryChatModel;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The configured OpenAI model behind the default retry policy.
pub fn chat_model(settings: &Settings) -> Arc<dyn ChatModel> {
    Arc::new(RetryChatModel::new(OpenAIChatModel::from_settings(settings)))
}

/// Load settings and build the model in one go.
pub fn setup() -> agentflow_core::error::Result<(Settings, Arc<dyn ChatModel>)> {
    init_tracing();
    let settings = Settings::from_env()?;
    tracing::info!(model = %settings.model_name, "loaded settings");
    let model = chat_model(&settings);
    Ok((settings, model))
}
