use serde::Serialize;

use crate::error::{CallError, CallResult};

/// A conversational language the agent can speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

const fn lang(code: &'static str, name: &'static str, native_name: &'static str) -> Language {
    Language {
        code,
        name,
        native_name,
    }
}

/// English plus the 22 scheduled languages of India; English is the default
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    lang("en", "English", "English"),
    lang("hi", "Hindi", "हिन्दी"),
    lang("bn", "Bengali", "বাংলা"),
    lang("as", "Assamese", "অসমীয়া"),
    lang("brx", "Bodo", "बड़ो"),
    lang("doi", "Dogri", "डोगरी"),
    lang("gu", "Gujarati", "ગુજરાતી"),
    lang("kn", "Kannada", "ಕನ್ನಡ"),
    lang("ks", "Kashmiri", "کٲشُر"),
    lang("gom", "Konkani", "कोंकणी"),
    lang("mai", "Maithili", "मैथिली"),
    lang("ml", "Malayalam", "മലയാളം"),
    lang("mni", "Manipuri", "মণিপুরী"),
    lang("mr", "Marathi", "मराठी"),
    lang("ne", "Nepali", "नेपाली"),
    lang("or", "Odia", "ଓଡ଼ିଆ"),
    lang("pa", "Punjabi", "ਪੰਜਾਬੀ"),
    lang("sa", "Sanskrit", "संस्कृतम्"),
    lang("sat", "Santali", "संताली"),
    lang("sd", "Sindhi", "سنڌي"),
    lang("ta", "Tamil", "தமிழ்"),
    lang("te", "Telugu", "తెలుగు"),
    lang("ur", "Urdu", "اردو"),
];

pub fn default_language() -> Language {
    SUPPORTED_LANGUAGES[0]
}

/// Look up a language by code, case-insensitively
pub fn find_language(code: &str) -> CallResult<Language> {
    let code = code.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
        .copied()
        .ok_or_else(|| CallError::UnknownLanguage(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_english_and_22_scheduled_languages() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 23);
        assert_eq!(default_language().code, "en");
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = SUPPORTED_LANGUAGES.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), SUPPORTED_LANGUAGES.len());
    }

    #[test]
    fn test_find_language() {
        assert_eq!(find_language("ta").unwrap().name, "Tamil");
        assert_eq!(find_language(" MAI ").unwrap().name, "Maithili");
        assert!(matches!(
            find_language("xx"),
            Err(CallError::UnknownLanguage(code)) if code == "xx"
        ));
    }
}
