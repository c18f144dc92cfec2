use serde::Serialize;

use super::entity::domain_of;
use super::Error;
use super::Result;

/// Service data for `light.turn_on`
///
/// Unset fields are left out of the request so the hub keeps its current
/// value for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LightCommand {
    pub entity_id: String,

    /// Red, green, blue, white channels (0-255)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgbw_color: Option<[u8; 4]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,

    /// Fade time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,

    /// Named effect supported by the light (e.g., "Light Board Control")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

impl LightCommand {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub(super) fn off(entity_id: &str, transition: Option<f64>) -> Self {
        Self {
            transition,
            ..Self::new(entity_id)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let domain = domain_of(&self.entity_id)?;
        if domain != "light" {
            return Err(Error::InvalidEntityId {
                entity_id: self.entity_id.clone(),
                reason: format!("expected a light entity, got domain '{}'", domain),
            });
        }

        if let Some(transition) = self.transition {
            if !transition.is_finite() || transition < 0.0 {
                return Err(Error::InvalidCommand(format!(
                    "transition must be a non-negative number of seconds, got {}",
                    transition
                )));
            }
        }

        if matches!(&self.effect, Some(effect) if effect.trim().is_empty()) {
            return Err(Error::InvalidCommand("effect name is empty".to_string()));
        }

        Ok(())
    }
}
