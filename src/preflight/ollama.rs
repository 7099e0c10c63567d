//! Ollama preflight check.

use super::CheckResult;
use crate::models::config::Config;
use crate::services::ollama::OllamaClient;

/// Check that Ollama is running and serves the configured model.
pub async fn check(config: &Config) -> CheckResult {
    let client = match OllamaClient::with_config(config.ollama()) {
        Ok(c) => c,
        Err(e) => return CheckResult::fail("Ollama", &e.to_string(), "Check the [ai] settings"),
    };

    if !client.health_check().await {
        return CheckResult::fail(
            "Ollama",
            &format!("not running at {}", config.ai.base_url),
            "Start Ollama: ollama serve",
        );
    }

    match client.list_models().await {
        Ok(models) if models.is_empty() => CheckResult::fail(
            "Ollama",
            "running but no models",
            &format!("Pull a model: ollama pull {}", client.model()),
        ),
        Ok(models) => {
            let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
            let tagged = format!("{}:", client.model());
            if names
                .iter()
                .any(|n| *n == client.model() || n.starts_with(&tagged))
            {
                CheckResult::ok("Ollama", &format!("running (model: {})", client.model()))
            } else {
                CheckResult::fail(
                    "Ollama",
                    &format!("model {} missing (have: {})", client.model(), names.join(", ")),
                    &format!("Pull the model: ollama pull {}", client.model()),
                )
            }
        }
        Err(_) => CheckResult::ok("Ollama", "running"),
    }
}
