//! Wiring: turn an [`AppConfig`] into a ready router.

use std::sync::Arc;

use axum::Router;

use crate::config::AppConfig;
use crate::delivery::{Mailer, RelayConnector, SmtpRelay};
use crate::draft::create_deriver;
use crate::error::Result;
use crate::llm::create_provider;
use crate::routes::{AppState, opra_routes};

/// Build the shared state from configuration.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let llm = config.llm.as_ref().map(create_provider).transpose()?;
    let deriver = create_deriver(config.mode, llm, &config.sender_name, config.llm_timeout)?;

    let relay: Arc<dyn RelayConnector> = Arc::new(SmtpRelay::new(config.smtp.clone()));
    let mailer = Mailer::new(relay, config.smtp.timeout);

    Ok(AppState {
        deriver,
        mailer,
        sender: config.sender.clone(),
    })
}

/// Build the full router from configuration.
pub fn build_router(config: &AppConfig) -> Result<Router> {
    let state = build_state(config)?;
    Ok(opra_routes(state, config.max_upload_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::DraftMode;

    #[test]
    fn template_deployment_builds_without_backend() {
        let config = AppConfig::from_lookup(|key| match key {
            "OPRA_DRAFT_MODE" => Some("template".into()),
            "SENDER_EMAIL" => Some("records@firm.test".into()),
            "APP_PASSWORD" => Some("pw".into()),
            _ => None,
        })
        .unwrap();

        let state = build_state(&config).unwrap();
        assert_eq!(state.deriver.mode(), DraftMode::Template);
        assert_eq!(state.sender.email.to_string(), "records@firm.test");
    }

    #[test]
    fn structured_deployment_builds_with_backend() {
        let config = AppConfig::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("test-key".into()),
            "SENDER_EMAIL" => Some("records@firm.test".into()),
            "APP_PASSWORD" => Some("pw".into()),
            _ => None,
        })
        .unwrap();

        assert!(build_router(&config).is_ok());
    }
}
