//! Saved language choice, the CLI counterpart of the portal's `rgph_lang` cookie.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::PreferenceError;
use crate::models::Language;

pub const PREFERENCE_KEY: &str = "rgph_lang";

#[derive(Debug, Clone)]
pub struct LanguagePreference {
    path: PathBuf,
}

impl LanguagePreference {
    /// Preference file under the user's config directory (`<config>/rgph/rgph_lang`).
    pub fn user() -> Result<Self, PreferenceError> {
        let dir = dirs::config_dir().ok_or(PreferenceError::NoConfigDir)?;
        Ok(Self::at(dir.join("rgph").join(PREFERENCE_KEY)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved language; a missing or unreadable file yields `None`.
    pub fn load(&self) -> Option<Language> {
        let text = fs::read_to_string(&self.path).ok()?;
        let lang = Language::from_tag(&text);
        if lang.is_none() {
            warn!(
                "ignoring unrecognised language preference {:?} in {}",
                text.trim(),
                self.path.display()
            );
        }
        lang
    }

    pub fn save(&self, lang: Language) -> Result<(), PreferenceError> {
        let io = |source| PreferenceError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        fs::write(&self.path, lang.code()).map_err(io)
    }

    pub fn clear(&self) -> Result<(), PreferenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PreferenceError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}
