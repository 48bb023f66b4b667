//! Platform collaborator contracts.
//!
//! The scheduler never talks to the OS directly. Every platform concern
//! (device location, notification display, permission prompts, lifecycle)
//! comes in through one of these traits, so the core stays testable and the
//! real bindings live outside this crate. The [`sim`] module provides
//! deterministic doubles used by the CLI and the tests.

pub mod sim;

pub use sim::{LogNotifier, SimulatedLocationProvider, StaticPermissions};

use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, ProviderError};

/// Raw position reading from the device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat: f64,
    pub long: f64,
    /// Fix timestamp in epoch milliseconds.
    pub time: i64,
}

/// Result of a location permission query or prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
}

/// Notification authorization status code, as reported by the OS.
/// Value `1` means authorized; everything else is treated as denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStatus(pub i32);

impl AuthorizationStatus {
    pub const AUTHORIZED: AuthorizationStatus = AuthorizationStatus(1);

    pub fn is_authorized(self) -> bool {
        self.0 == 1
    }
}

/// App lifecycle phase, delivered over a `tokio::sync::watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppPhase {
    Active,
    Background,
    Inactive,
}

/// Notification channel configuration (Android-style channels; a no-op id
/// on platforms without channels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    pub high_importance: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            name: "Default Channel".into(),
            high_importance: true,
        }
    }
}

/// A notification ready for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub channel_id: String,
}

/// Device location provider.
///
/// The provider enforces the fetch timeout itself and reports expiry as
/// [`ProviderError::Timeout`].
pub trait LocationProvider: Send + Sync {
    fn current_position(
        &self,
        high_accuracy: bool,
        timeout_ms: u64,
    ) -> Result<PositionFix, ProviderError>;
}

/// OS permission prompt service.
///
/// Queries never fail outward; a denial is a value, not an error.
pub trait PermissionService: Send + Sync {
    /// Query location permission without prompting.
    fn check_location(&self) -> Permission;

    /// Prompt for location permission.
    fn request_location(&self) -> Permission;

    /// Prompt for notification permission (best-effort) and return the
    /// resulting authorization status.
    fn request_notification(&self) -> AuthorizationStatus;
}

/// OS local notification service.
pub trait NotificationService: Send + Sync {
    /// Create (or look up) a notification channel. Idempotent.
    fn create_channel(&self, config: &ChannelConfig) -> Result<String, NotificationError>;

    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}
