use std::time::Duration;

use crate::models::Language;

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
pub const API_BASE_ENV: &str = "RGPH_API_BASE";
pub const LANG_ENV: &str = "RGPH_LANG";

/// Runtime settings for the client and stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            language: Language::default(),
        }
    }
}

impl Config {
    /// Read `RGPH_API_BASE` and `RGPH_LANG` (then `LANG`) from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Config::default();
        if let Some(base) = get(API_BASE_ENV) {
            cfg.api_base = base.trim().to_string();
        }
        if let Some(lang) = get(LANG_ENV)
            .or_else(|| get("LANG"))
            .and_then(|tag| Language::from_tag(&tag))
        {
            cfg.language = lang;
        }
        cfg
    }
}
