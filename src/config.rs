use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::association::AssociationConfig;
use crate::detector::DetectorConfig;
use crate::error::Result;
use crate::export::ExportConfig;
use crate::manual::ManualConfig;

/// Session settings; every section falls back to its defaults when absent
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub association: AssociationConfig,
    pub detector: DetectorConfig,
    pub manual: ManualConfig,
    pub export: ExportConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.association.validate()?;
        self.detector.validate()?;
        self.manual.validate()?;

        Ok(())
    }
}
