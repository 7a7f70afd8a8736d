//! Configuration management for the practice growth engine
//!
//! Two layers:
//! - [`Settings`]: runtime settings (server, observability, practice profile)
//!   layered from `config/default`, `config/{env}` and `PRACTICE_GROWTH__*`
//!   environment variables
//! - [`GrowthConfig`]: engine thresholds, weights, sequence templates and the
//!   offer catalog, loaded from a YAML file named by
//!   `Settings::growth_config_path`

pub mod domain;
pub mod settings;

pub use domain::{
    age_tier_value, float_tier_points, tier_points, ActivityRule, AgeTier, ContentType,
    ConversionScoringConfig, CountAdjustment, EngagementScoringConfig, EvidenceWeights, FloatTier,
    GrowthConfig, IntentSignalConfig, LifecycleConfig, NoteKeywordRule, NpsInferenceConfig,
    NurtureConfig, OfferDefinition, PageKeywordSignal, PlatformScoreConfig, QualityScoringConfig,
    RatingAdjustment, ReactivationConfig, ReactivationScoringConfig, ReasonWeights, ReferralConfig,
    ReferralScoringConfig, ReputationConfig, ResponseConfig, ScoringConfig, SequenceStep,
    StaffMatchConfig, ThresholdTier, TimingConfig, UrgencyScoringConfig,
};
pub use settings::{
    load_settings, ObservabilityConfig, PracticeProfile, RuntimeEnvironment, ServerConfig,
    Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for practice_growth_core::Error {
    fn from(err: ConfigError) -> Self {
        practice_growth_core::Error::Config(err.to_string())
    }
}
