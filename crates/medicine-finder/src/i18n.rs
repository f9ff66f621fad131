/// Static translation tables keyed by language code.
///
/// Lookups never fail: a missing language resolves to the default language and a
/// missing key falls back to the default language's entry, then to the caller's
/// fallback text.
use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::AppError;
use medfinder_common::api::{LanguageInfo, LanguageMetadata, TranslationValue};

const BUNDLED_TRANSLATIONS: &str = include_str!("../data/translations.json");

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Deserialize)]
struct LanguagePack {
    label: String,
    #[serde(default = "default_direction")]
    direction: String,
    strings: BTreeMap<String, TranslationValue>,
}

fn default_direction() -> String {
    "ltr".to_string()
}

#[derive(Debug, Clone)]
pub struct Translations {
    packs: BTreeMap<String, LanguagePack>,
}

impl Translations {
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json("bundled translations", BUNDLED_TRANSLATIONS)
    }

    /// Parse `{code: {label, direction, strings}}`. The default language must be present.
    pub fn from_json(source_name: &str, content: &str) -> Result<Self, AppError> {
        let packs: BTreeMap<String, LanguagePack> =
            serde_json::from_str(content).map_err(|e| AppError::data(source_name, e))?;
        let packs: BTreeMap<String, LanguagePack> = packs
            .into_iter()
            .map(|(code, pack)| (code.to_lowercase(), pack))
            .collect();
        if !packs.contains_key(DEFAULT_LANGUAGE) {
            return Err(AppError::data(
                source_name,
                format!("default language '{DEFAULT_LANGUAGE}' is missing"),
            ));
        }
        Ok(Self { packs })
    }

    /// Resolve a requested language to a supported code.
    ///
    /// "es" and "ES-mx" both resolve to "es"; anything unsupported resolves to "en".
    pub fn normalize_language<'a>(&'a self, language: Option<&str>) -> &'a str {
        let Some(code) = language.map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty())
        else {
            return DEFAULT_LANGUAGE;
        };
        if let Some((key, _)) = self.packs.get_key_value(&code) {
            return key;
        }
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match self.packs.get_key_value(primary) {
            Some((key, _)) => key,
            None => DEFAULT_LANGUAGE,
        }
    }

    fn lookup(&self, language: Option<&str>, key: &str) -> Option<&TranslationValue> {
        let code = self.normalize_language(language);
        self.packs
            .get(code)
            .and_then(|p| p.strings.get(key))
            .or_else(|| {
                self.packs
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|p| p.strings.get(key))
            })
    }

    /// Translate `key`, falling back to the default language and then to `fallback`.
    /// List entries are joined with spaces.
    pub fn translate(&self, language: Option<&str>, key: &str, fallback: &str) -> String {
        match self.lookup(language, key) {
            Some(TranslationValue::Text(text)) => text.clone(),
            Some(TranslationValue::List(items)) => items.join(" "),
            None => fallback.to_string(),
        }
    }

    /// Translate `key`, using the key itself as the last fallback.
    pub fn text(&self, language: Option<&str>, key: &str) -> String {
        self.translate(language, key, key)
    }

    /// Translate a list entry. A plain text entry becomes a one-element list.
    pub fn list(&self, language: Option<&str>, key: &str) -> Vec<String> {
        match self.lookup(language, key) {
            Some(TranslationValue::List(items)) => items.clone(),
            Some(TranslationValue::Text(text)) => vec![text.clone()],
            None => Vec::new(),
        }
    }

    /// Every string for a language, with default-language entries filling the gaps.
    pub fn strings(&self, language: Option<&str>) -> BTreeMap<String, TranslationValue> {
        let code = self.normalize_language(language);
        let mut merged = self
            .packs
            .get(DEFAULT_LANGUAGE)
            .map(|p| p.strings.clone())
            .unwrap_or_default();
        if let Some(pack) = self.packs.get(code) {
            merged.extend(pack.strings.clone());
        }
        merged
    }

    pub fn supported(&self) -> Vec<LanguageInfo> {
        self.packs
            .iter()
            .map(|(code, pack)| LanguageInfo {
                code: code.clone(),
                label: pack.label.clone(),
                direction: pack.direction.clone(),
            })
            .collect()
    }

    pub fn metadata(&self, language: Option<&str>) -> LanguageMetadata {
        LanguageMetadata {
            language: self.normalize_language(language).to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            supported: self.supported(),
        }
    }
}
