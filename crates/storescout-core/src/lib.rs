pub mod app_config;
pub mod config;
pub mod lexicon;
pub mod products;
pub mod regions;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use lexicon::{load_configured_lexicon, load_lexicon, ScoringLexicon};
pub use products::{
    ConfidenceBucket, MatchResult, MetadataCacheEntry, ProductIdentifier, ProductRecord,
    RawListing,
};
pub use regions::{find_region, Region, REFERENCE_CURRENCY, REGIONS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read lexicon file {path}: {source}")]
    LexiconFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lexicon file: {0}")]
    LexiconFileParse(#[from] serde_yaml::Error),

    #[error("lexicon validation failed: {0}")]
    Validation(String),
}
