//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::combat::{CombatManager, UuidIds};
use crate::config::Config;
use crate::strategy::{LoggingStrategyLayer, StrategyLayer, WebhookStrategyLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub combats: Arc<CombatManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // Resolutions go to the strategy server when one is configured
        let strategy: Arc<dyn StrategyLayer> = match &config.strategy_callback_url {
            Some(url) => {
                info!(url = %url, "Reporting combat results to strategy callback");
                Arc::new(WebhookStrategyLayer::new(url.clone(), config.internal_shared_secret.clone()))
            }
            None => {
                info!("No strategy callback configured, combat results are only logged");
                Arc::new(LoggingStrategyLayer)
            }
        };

        let combats = Arc::new(CombatManager::new(
            config.arena_rules(),
            Arc::new(UuidIds),
            strategy,
        ));

        Self::with_manager(config, combats)
    }

    /// State around an existing manager, for embedding and tests
    pub fn with_manager(config: Config, combats: Arc<CombatManager>) -> Self {
        Self {
            config: Arc::new(config),
            combats,
        }
    }
}
