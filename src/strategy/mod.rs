//! Boundary to the turn-based strategy layer
//!
//! When a combat ends the manager hands the result to a [`StrategyLayer`],
//! which owns the board: it removes the defeated unit, stores the winner's
//! HP and resumes turn sequencing.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::http::signature::{signature_header, SIGNATURE_HEADER};

/// Result of a combat as seen by the strategy layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CombatResolution {
    Victory {
        match_id: String,
        winning_player_id: String,
        winner_unit_id: String,
        loser_unit_id: String,
        winner_hp: f32,
    },
    /// Both units fell together (or tied on time); both leave the board
    Draw {
        match_id: String,
        unit_ids: Vec<String>,
    },
}

impl CombatResolution {
    pub fn match_id(&self) -> &str {
        match self {
            CombatResolution::Victory { match_id, .. } | CombatResolution::Draw { match_id, .. } => {
                match_id
            }
        }
    }
}

/// Receiver of combat results. Called from the tick, so it must not block.
pub trait StrategyLayer: Send + Sync {
    fn combat_resolved(&self, resolution: CombatResolution);
}

/// Strategy delivery errors
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Callback rejected with status {0}")]
    Status(u16),
}

/// Only logs results; used when no callback is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStrategyLayer;

impl StrategyLayer for LoggingStrategyLayer {
    fn combat_resolved(&self, resolution: CombatResolution) {
        info!(match_id = %resolution.match_id(), resolution = ?resolution, "Combat resolved");
    }
}

/// Forwards results over a channel, for in-process strategy layers
#[derive(Debug, Clone)]
pub struct ChannelStrategyLayer {
    tx: mpsc::UnboundedSender<CombatResolution>,
}

impl ChannelStrategyLayer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CombatResolution>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StrategyLayer for ChannelStrategyLayer {
    fn combat_resolved(&self, resolution: CombatResolution) {
        if let Err(e) = self.tx.send(resolution) {
            warn!(match_id = %e.0.match_id(), "Strategy channel closed, resolution dropped");
        }
    }
}

/// POSTs signed results to the strategy server
#[derive(Clone)]
pub struct WebhookStrategyLayer {
    client: Client,
    url: String,
    secret: String,
}

impl WebhookStrategyLayer {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self {
            client,
            url: url.into(),
            secret: secret.into(),
        }
    }

    async fn deliver(&self, resolution: &CombatResolution) -> Result<(), StrategyError> {
        let body = serde_json::to_vec(resolution)?;
        let header = signature_header(&self.secret, chrono::Utc::now().timestamp(), &body);

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, header)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl StrategyLayer for WebhookStrategyLayer {
    fn combat_resolved(&self, resolution: CombatResolution) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(match_id = %resolution.match_id(), "No runtime to deliver combat resolution");
            return;
        };

        let layer = self.clone();
        handle.spawn(async move {
            match layer.deliver(&resolution).await {
                Ok(()) => info!(match_id = %resolution.match_id(), "Combat resolution delivered"),
                Err(e) => error!(match_id = %resolution.match_id(), error = %e, "Combat resolution delivery failed"),
            }
        });
    }
}
