//! Merchant configuration, resolved once and handed to [`Core`](crate::application::core::Core).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Test,
    Production,
}

impl Mode {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Test => "https://api.externalintegration.payex.com",
            Self::Production => "https://api.payex.com",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Forward log records to the platform adapter
    pub debug: bool,
    pub access_token: String,
    pub payee_id: String,
    pub payee_name: String,
    pub subsite: Option<String>,
    pub language: String,
    pub terms_url: String,
    pub logo_url: String,
    pub use_payer_info: bool,
    pub mode: Mode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            debug: true,
            access_token: String::new(),
            payee_id: String::new(),
            payee_name: String::new(),
            subsite: None,
            language: "en-US".to_string(),
            terms_url: String::new(),
            logo_url: String::new(),
            use_payer_info: true,
            mode: Mode::Test,
        }
    }
}

impl Configuration {
    /// Parses a JSON object; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn base_url(&self) -> &'static str {
        self.mode.base_url()
    }
}
