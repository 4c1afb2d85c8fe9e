//! Theme registry: built-in theme list, optionally replaced from the API.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::error;

use crate::error::ApiError;
use crate::models::{LocalizedText, Theme};
use crate::source::CensusSource;
use crate::store::lock;

#[derive(Debug, Default)]
struct ThemeState {
    themes: Vec<Theme>,
    active: Option<String>,
}

pub struct ThemeStore<S> {
    source: S,
    state: Mutex<ThemeState>,
    in_flight: AtomicUsize,
}

/// Decrements the refresh counter when dropped.
struct Refreshing<'a>(&'a AtomicUsize);

impl<'a> Refreshing<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Refreshing(counter)
    }
}

impl Drop for Refreshing<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn theme(slug: &str, fr: &str, ar: &str, en: &str, icon: &str, color: &str) -> Theme {
    Theme {
        slug: slug.into(),
        name: LocalizedText::localized([("fr", fr), ("ar", ar), ("en", en)]),
        name_ar: None,
        name_en: None,
        description: None,
        description_ar: None,
        description_en: None,
        icon: Some(icon.into()),
        color: Some(color.into()),
        order: None,
        extra: Default::default(),
    }
}

/// Themes known without asking the API.
pub fn default_themes() -> Vec<Theme> {
    vec![
        theme("demographie", "Démographie", "الديموغرافيا", "Demographics", "mdi-account-group", "#8B1A1A"),
        theme(
            "caracteristiques-economiques",
            "Caractéristiques économiques",
            "الخصائص الاقتصادية",
            "Economic characteristics",
            "mdi-briefcase",
            "#1A5276",
        ),
        theme(
            "education",
            "Éducation et analphabétisme",
            "التعليم والأمية",
            "Education and illiteracy",
            "mdi-school",
            "#1E8449",
        ),
        theme("sante", "Santé", "الصحة", "Health", "mdi-hospital", "#E74C3C"),
        theme("habitat", "Conditions d'habitat", "ظروف السكن", "Housing conditions", "mdi-home", "#F39C12"),
        theme("langue-maternelle", "Langue maternelle", "اللغة الأم", "Mother tongue", "mdi-translate", "#8E44AD"),
        theme(
            "pauvrete",
            "Pauvreté multidimensionnelle",
            "الفقر متعدد الأبعاد",
            "Multidimensional poverty",
            "mdi-chart-line",
            "#D35400",
        ),
    ]
}

impl<S: CensusSource> ThemeStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(ThemeState {
                themes: default_themes(),
                ..Default::default()
            }),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn themes(&self) -> Vec<Theme> {
        lock(&self.state).themes.clone()
    }

    pub fn theme_by_slug(&self, slug: &str) -> Option<Theme> {
        lock(&self.state).themes.iter().find(|t| t.slug == slug).cloned()
    }

    pub fn set_active_theme(&self, slug: Option<&str>) {
        lock(&self.state).active = slug.map(str::to_string);
    }

    pub fn active_theme(&self) -> Option<String> {
        lock(&self.state).active.clone()
    }

    /// True while any refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Replace the list with the API's. On failure the current list is kept.
    pub fn refresh(&self) -> Result<usize, ApiError> {
        let outcome = {
            let _guard = Refreshing::enter(&self.in_flight);
            self.source.themes().and_then(|r| r.into_result())
        };
        let mut state = lock(&self.state);
        match outcome {
            Ok(themes) => {
                state.themes = themes;
                Ok(state.themes.len())
            }
            Err(e) => {
                error!("Error fetching themes: {}", e);
                Err(e)
            }
        }
    }
}
