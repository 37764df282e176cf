//! Location source boundary
//!
//! The platform location provider lives outside this crate. The engine only
//! reacts to its authorization changes and issues start/stop intents through
//! the [`LocationSource`] trait. The source is passed in per call and never
//! stored, so there is no ownership cycle between the engine and the provider.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Location permission state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways
        )
    }

    /// True when the user still has to be asked or sent to settings
    pub fn needs_prompt(&self) -> bool {
        !self.is_authorized()
    }
}

/// Intents the engine can issue to the platform location provider
pub trait LocationSource {
    fn request_authorization(&mut self);
    fn start_updates(&mut self);
    fn stop_updates(&mut self);
}

/// Tracks authorization and whether updates are flowing
#[derive(Debug, Clone, Default)]
pub struct SensorLink {
    status: AuthorizationStatus,
    updating: bool,
}

impl SensorLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to a permission change: start updates once authorized
    pub fn on_authorization_changed(
        &mut self,
        status: AuthorizationStatus,
        source: &mut dyn LocationSource,
    ) {
        info!(?status, "[Sensor] authorization changed");
        self.status = status;
        if status.is_authorized() {
            self.start(source);
        } else if self.updating {
            self.stop(source);
        }
    }

    /// Ask for permission if it was never decided
    pub fn request_authorization(&mut self, source: &mut dyn LocationSource) {
        if self.status == AuthorizationStatus::NotDetermined {
            source.request_authorization();
        }
    }

    /// Start updates if authorized; returns whether updates are now flowing
    pub fn start(&mut self, source: &mut dyn LocationSource) -> bool {
        if !self.status.is_authorized() {
            return false;
        }
        if !self.updating {
            source.start_updates();
            self.updating = true;
        }
        true
    }

    pub fn stop(&mut self, source: &mut dyn LocationSource) {
        if self.updating {
            source.stop_updates();
            self.updating = false;
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.status
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }
}
