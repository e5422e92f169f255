//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `ZINEZONE_*` environment variables or a
//! configuration file, in OrthoConfig's usual precedence.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::ServiceOptions;
use crate::telemetry::TelemetrySettings;

const DEFAULT_COVER_PREFIX: &str = "zine-covers";
const DEFAULT_AVATAR_PREFIX: &str = "avatars";
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";
const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for the aggregation service and its telemetry.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ZINEZONE")]
pub struct ServiceSettings {
    /// Object-store folder for zine covers.
    pub cover_prefix: Option<String>,
    /// Object-store folder for avatars.
    pub avatar_prefix: Option<String>,
    /// Extension appended to uploaded images.
    pub image_extension: Option<String>,
    /// Use the built-in tags when the backend has none.
    pub tag_fallback: Option<bool>,
    /// Default `tracing` filter directive.
    pub log_filter: Option<String>,
    /// Emit JSON log lines instead of the compact format.
    #[ortho_config(default = false)]
    pub log_json: bool,
}

impl ServiceSettings {
    /// Configured cover folder, falling back to the default.
    pub fn cover_prefix(&self) -> &str {
        self.cover_prefix.as_deref().unwrap_or(DEFAULT_COVER_PREFIX)
    }

    /// Configured avatar folder, falling back to the default.
    pub fn avatar_prefix(&self) -> &str {
        self.avatar_prefix
            .as_deref()
            .unwrap_or(DEFAULT_AVATAR_PREFIX)
    }

    /// Configured image extension without a leading dot.
    pub fn image_extension(&self) -> &str {
        self.image_extension
            .as_deref()
            .map(|extension| extension.trim_start_matches('.'))
            .unwrap_or(DEFAULT_IMAGE_EXTENSION)
    }

    /// Whether the built-in tag fallback is enabled; on by default.
    pub fn tag_fallback(&self) -> bool {
        self.tag_fallback.unwrap_or(true)
    }

    /// Options for [`AggregationService`](crate::domain::AggregationService).
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            cover_prefix: self.cover_prefix().to_owned(),
            avatar_prefix: self.avatar_prefix().to_owned(),
            image_extension: self.image_extension().to_owned(),
            tag_fallback: self.tag_fallback(),
        }
    }

    /// Settings for [`init_tracing`](crate::telemetry::init_tracing).
    pub fn telemetry(&self) -> TelemetrySettings {
        TelemetrySettings {
            filter: self
                .log_filter
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
            json: self.log_json,
        }
    }
}
