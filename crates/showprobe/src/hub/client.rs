use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use super::entity::domain_of;
use super::Entity;
use super::EntityGroups;
use super::Error;
use super::LightCommand;
use super::Result;

/// Connection settings for a hub.
///
/// Built explicitly by the caller (see `config::HubSettings::resolve`); the
/// client never reads the environment itself.
#[derive(Clone)]
pub struct HubConfig {
    /// Base URL of the hub (e.g., "http://homeassistant.local:8123")
    pub url: String,

    /// Long-lived access token, sent as a bearer token
    pub token: String,
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Trait for hub API operations
///
/// The raw endpoints are required methods; the grouped listing and the light
/// helpers are built on top of them so alternative implementations only need
/// to speak the wire API.
#[async_trait]
pub trait HubApi: Send + Sync {
    /// `GET /api/`: returns the hub's status message
    async fn ping(&self) -> Result<String>;

    /// `GET /api/states`
    async fn get_states(&self) -> Result<Vec<Entity>>;

    /// `GET /api/states/<entity_id>`
    async fn get_state(&self, entity_id: &str) -> Result<Entity>;

    /// `POST /api/services/<domain>/<service>`
    ///
    /// Returns the states that changed while the service executed.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: serde_json::Value,
    ) -> Result<Vec<Entity>>;

    /// Fetch every entity and group them by domain
    async fn get_entities(&self) -> Result<EntityGroups> {
        let states = self.get_states().await?;
        debug!("Hub returned {} entities", states.len());
        EntityGroups::from_entities(states)
    }

    async fn turn_on_light(&self, command: &LightCommand) -> Result<Vec<Entity>> {
        command.validate()?;
        info!("Turning on {}", command.entity_id);
        let body = serde_json::to_value(command).map_err(Error::Decode)?;
        self.call_service("light", "turn_on", body).await
    }

    async fn turn_off_light(
        &self,
        entity_id: &str,
        transition: Option<f64>,
    ) -> Result<Vec<Entity>> {
        LightCommand::off(entity_id, transition).validate()?;
        info!("Turning off {}", entity_id);
        let mut body = serde_json::json!({ "entity_id": entity_id });
        if let Some(transition) = transition {
            body["transition"] = serde_json::json!(transition);
        }
        self.call_service("light", "turn_off", body).await
    }
}

#[derive(Deserialize)]
struct ApiStatus {
    message: String,
}

/// Hub client backed by reqwest
pub struct HubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl HubClient {
    pub fn new(config: HubConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url).map_err(|e| Error::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: config.url,
                reason: "not a base URL".to_string(),
            });
        }

        // Url::join replaces the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("showprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| Error::InvalidUrl {
            url: format!("{}{}", self.base, path),
            reason: e.to_string(),
        })
    }

    /// Map non-success statuses to errors and return the response body
    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized {
                status: status.as_u16(),
            }),
            s if !s.is_success() => Err(Error::Status {
                status: s.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response.text().await?),
        }
    }

    /// `api/states/<entity_id>` with the id escaped as a single path segment
    fn state_endpoint(&self, entity_id: &str) -> Result<Url> {
        let mut url = self.endpoint("api/states")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: self.base.to_string(),
                reason: "not a base URL".to_string(),
            })?
            .push(entity_id);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_url(self.endpoint(path)?).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(Error::Decode)
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn ping(&self) -> Result<String> {
        let status: ApiStatus = self.get_json("api/").await?;
        Ok(status.message)
    }

    async fn get_states(&self) -> Result<Vec<Entity>> {
        self.get_json("api/states").await
    }

    async fn get_state(&self, entity_id: &str) -> Result<Entity> {
        domain_of(entity_id)?;
        match self.get_url(self.state_endpoint(entity_id)?).await {
            Err(Error::Status { status: 404, .. }) => {
                Err(Error::EntityNotFound(entity_id.to_string()))
            }
            other => other,
        }
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: serde_json::Value,
    ) -> Result<Vec<Entity>> {
        let url = self.endpoint(&format!("api/services/{}/{}", domain, service))?;
        debug!("POST {} {}", url, body);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(Error::Decode)
    }
}
