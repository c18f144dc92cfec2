//! Home Assistant REST API client.
//!
//! Only the handful of endpoints the diagnostic commands need are covered:
//! - `GET /api/` (liveness)
//! - `GET /api/states` and `GET /api/states/<entity_id>`
//! - `POST /api/services/<domain>/<service>`
//!
//! Every request carries the long-lived access token as a bearer token.
//! Nothing is retried; failures are surfaced as [`Error`].

mod client;
mod entity;
mod light;

pub use client::HubApi;
pub use client::HubClient;
pub use client::HubConfig;
pub use entity::domain_of;
pub use entity::Entity;
pub use entity::EntityGroups;
pub use light::LightCommand;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no hub access token: set ${var} or hub.token in the config file")]
    MissingCredential { var: String },

    #[error("invalid hub url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to hub failed")]
    Request(#[from] reqwest::Error),

    #[error("hub rejected the access token (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("hub returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid entity id '{entity_id}': {reason}")]
    InvalidEntityId { entity_id: String, reason: String },

    #[error("invalid light command: {0}")]
    InvalidCommand(String),

    #[error("failed to decode hub response")]
    Decode(#[source] serde_json::Error),
}
