//! Localized display names.
//!
//! Names from the API are either plain strings or `{ "fr": .., "ar": .., "en": .. }`
//! objects. Resolution never fails: a missing translation falls through to the
//! next language, and finally to an empty string.

use crate::models::{Language, LocalizedText};

/// Order tried after the current language.
const FALLBACK_ORDER: [Language; 3] = [Language::Fr, Language::En, Language::Ar];

/// Pick the display string for `lang`.
///
/// - `None` → `""`
/// - plain string → returned as-is
/// - per-language map → `lang`, then `fr`, `en`, `ar`; empty or `null` entries are skipped
pub fn localized_name(name: Option<&LocalizedText>, lang: Language) -> String {
    match name {
        None => String::new(),
        Some(LocalizedText::Plain(s)) => s.clone(),
        Some(LocalizedText::Localized(map)) => std::iter::once(lang)
            .chain(FALLBACK_ORDER)
            .filter_map(|l| map.get(l.code()).and_then(Option::as_deref))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_default(),
    }
}

/// Like [`localized_name`], but honours the `nameAr` / `nameEn` sidecar fields
/// some endpoints send next to a plain French `name`.
pub fn localized_with_variants(
    name: Option<&LocalizedText>,
    name_ar: Option<&str>,
    name_en: Option<&str>,
    lang: Language,
) -> String {
    if matches!(name, None | Some(LocalizedText::Plain(_))) {
        let variant = match lang {
            Language::Ar => name_ar,
            Language::En => name_en,
            Language::Fr => None,
        };
        if let Some(v) = variant.filter(|v| !v.trim().is_empty()) {
            return v.to_string();
        }
    }
    localized_name(name, lang)
}
