//! # Waylog Core Library
//!
//! This library provides the core logic for Waylog, a location-polling and
//! stationary-reminder tool. It implements a CLI-first philosophy where all
//! operations are available via a standalone CLI binary, with any GUI layer
//! being a thin shell over the same core library.
//!
//! ## Architecture
//!
//! - **Scheduler**: A tick-based state machine that requires the caller to
//!   feed it position fixes and countdown ticks -- no internal threads
//! - **Runtime**: Tokio-backed driver that owns the two repeating timer
//!   tasks (location fetch loop and notification countdown)
//! - **Storage**: SQLite-based location history and TOML-based settings
//! - **Platform**: Traits for the device location provider, OS notification
//!   service, and permission prompts, plus deterministic simulation doubles
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Core polling/notification state machine
//! - [`SchedulerRuntime`]: Timer ownership and platform wiring
//! - [`HistoryDb`]: Location history persistence
//! - [`Settings`]: Application settings management

pub mod error;
pub mod events;
pub mod platform;
pub mod runtime;
pub mod sample;
pub mod scheduler;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, NotificationError, ProviderError};
pub use events::Event;
pub use platform::{
    AppPhase, AuthorizationStatus, ChannelConfig, LocationProvider, NotificationRequest,
    NotificationService, Permission, PermissionService, PositionFix,
};
pub use runtime::SchedulerRuntime;
pub use sample::LocationSample;
pub use scheduler::{Movement, Scheduler};
pub use storage::{HistoryDb, Settings};
