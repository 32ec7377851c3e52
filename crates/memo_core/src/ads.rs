//! Ad slot capability.
//!
//! The ad integration is optional. Its presence is decided once at startup
//! and carried as a typed value, so the banner slot never checks for a
//! backend on its own.

use crate::config::AdConfig;
use log::info;

/// Label rendered in the banner slot when no ad backend is available.
pub const AD_PLACEHOLDER_LABEL: &str = "Ad Space";

/// Handle to a configured ad unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHandle {
    unit_id: String,
}

impl AdHandle {
    pub fn unit_id(&self) -> &str {
        self.unit_id.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdUnavailableReason {
    DisabledByConfig,
    MissingUnitId,
}

impl AdUnavailableReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisabledByConfig => "disabled_by_config",
            Self::MissingUnitId => "missing_unit_id",
        }
    }
}

/// Whether ads can be shown in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdCapability {
    Available(AdHandle),
    Unavailable(AdUnavailableReason),
}

impl AdCapability {
    /// Resolves the capability from configuration.
    pub fn from_config(config: &AdConfig) -> Self {
        let capability = if !config.enabled {
            Self::Unavailable(AdUnavailableReason::DisabledByConfig)
        } else {
            match config.unit_id.as_deref().map(str::trim) {
                Some(unit_id) if !unit_id.is_empty() => Self::Available(AdHandle {
                    unit_id: unit_id.to_string(),
                }),
                _ => Self::Unavailable(AdUnavailableReason::MissingUnitId),
            }
        };

        match &capability {
            Self::Available(_) => info!("event=ads_capability module=ads status=available"),
            Self::Unavailable(reason) => info!(
                "event=ads_capability module=ads status=unavailable reason={}",
                reason.as_str()
            ),
        }
        capability
    }

    /// Content for the banner slot.
    pub fn banner(&self) -> AdBanner {
        match self {
            Self::Available(handle) => AdBanner::Live {
                unit_id: handle.unit_id.clone(),
            },
            Self::Unavailable(_) => AdBanner::Placeholder {
                label: AD_PLACEHOLDER_LABEL.to_string(),
            },
        }
    }
}

/// What the banner slot renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdBanner {
    Live { unit_id: String },
    Placeholder { label: String },
}
