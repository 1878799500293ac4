//! Ordered marker lists used by the relevance scorer.
//!
//! Markers are matched as lowercase substrings in list order; only the first
//! hit in each list counts, so order expresses priority.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AppConfig, ConfigError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringLexicon {
    /// Add-on, DLC, bundle and cosmetic markers.
    pub addon_markers: Vec<String>,
    /// Special-edition qualifiers.
    pub edition_markers: Vec<String>,
}

const DEFAULT_ADDON_MARKERS: &[&str] = &[
    "dlc",
    "add-on",
    "addon",
    "season pass",
    "expansion",
    "bundle",
    "pack",
    "soundtrack",
    "costume",
    "skin",
    "avatar",
    "theme",
    "currency",
    "coins",
    "credits",
    "upgrade",
];

const DEFAULT_EDITION_MARKERS: &[&str] = &[
    "deluxe",
    "ultimate",
    "goty",
    "game of the year",
    "gold edition",
    "premium",
    "complete edition",
    "definitive",
    "collector",
    "special edition",
];

impl Default for ScoringLexicon {
    fn default() -> Self {
        Self {
            addon_markers: DEFAULT_ADDON_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            edition_markers: DEFAULT_EDITION_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl ScoringLexicon {
    /// Lowercases and trims every marker, dropping empty ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |list: Vec<String>| {
            list.into_iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect()
        };
        Self {
            addon_markers: clean(self.addon_markers),
            edition_markers: clean(self.edition_markers),
        }
    }
}

/// Load a scoring lexicon from a YAML file.
///
/// The file must define both `addon_markers` and `edition_markers`; markers
/// are normalized to lowercase.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or has an empty list.
pub fn load_lexicon(path: &Path) -> Result<ScoringLexicon, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LexiconFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_lexicon(&content)
}

/// Loads the lexicon file named in `config`, or the built-in lexicon when
/// none is configured.
///
/// # Errors
///
/// Propagates [`load_lexicon`] errors for a configured path.
pub fn load_configured_lexicon(config: &AppConfig) -> Result<ScoringLexicon, ConfigError> {
    match config.lexicon_path.as_deref() {
        Some(path) => load_lexicon(path),
        None => Ok(ScoringLexicon::default()),
    }
}

fn parse_lexicon(content: &str) -> Result<ScoringLexicon, ConfigError> {
    let lexicon: ScoringLexicon = serde_yaml::from_str(content)?;
    let lexicon = lexicon.normalized();

    if lexicon.addon_markers.is_empty() {
        return Err(ConfigError::Validation(
            "addon_markers must contain at least one marker".to_string(),
        ));
    }
    if lexicon.edition_markers.is_empty() {
        return Err(ConfigError::Validation(
            "edition_markers must contain at least one marker".to_string(),
        ));
    }

    Ok(lexicon)
}
