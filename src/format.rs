//! Locale-aware number formatting for census values.

use num_format::{Locale, ToFormattedString};

use crate::models::Language;

/// `num_format` locale and decimal separator for a display language.
pub fn number_locale(lang: Language) -> (&'static Locale, char) {
    match lang {
        Language::Fr => (&Locale::fr, ','),
        Language::En | Language::Ar => (&Locale::en, '.'),
    }
}

/// Thousands-separated value with up to two decimals; `NA` for missing data.
pub fn format_value(v: Option<f64>, lang: Language) -> String {
    let Some(x) = v.filter(|x| x.is_finite()) else {
        return "NA".to_string();
    };
    let (locale, dec) = number_locale(lang);
    let cents = (x.abs() * 100.0).round() as i64;
    let mut s = (cents / 100).to_formatted_string(locale);
    let frac = cents % 100;
    if frac > 0 {
        let digits = format!("{:02}", frac);
        s.push(dec);
        s.push_str(digits.trim_end_matches('0'));
    }
    if x < 0.0 && cents > 0 {
        s.insert(0, '-');
    }
    s
}
