/// Education content: condition modules and long-form guides.
///
/// Module and guide text lives in the translation tables under
/// `education.modules.<topic>.*` and `education.guides.<slug>.*`. Guide sections are
/// stored as "Heading|Body" strings.
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::i18n::Translations;
use medfinder_common::api::{
    EducationContentResponse, EducationGuideView, EducationModuleView, EducationModulesResponse,
    GuideSection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationTopic {
    Diabetes,
    Hypertension,
    Asthma,
}

impl EducationTopic {
    pub const ALL: [EducationTopic; 3] = [
        EducationTopic::Diabetes,
        EducationTopic::Hypertension,
        EducationTopic::Asthma,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "diabetes" => Some(Self::Diabetes),
            "hypertension" => Some(Self::Hypertension),
            "asthma" => Some(Self::Asthma),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Diabetes => "diabetes",
            Self::Hypertension => "hypertension",
            Self::Asthma => "asthma",
        }
    }

    fn conditions(self) -> &'static [&'static str] {
        match self {
            Self::Diabetes => &["type-2-diabetes", "prediabetes"],
            Self::Hypertension => &["hypertension", "cardiovascular-risk"],
            Self::Asthma => &["asthma", "copd"],
        }
    }

    fn featured_medicines(self) -> &'static [&'static str] {
        match self {
            Self::Diabetes => &["Metformin", "Jardiance", "Farxiga", "Ozempic"],
            Self::Hypertension => &["Lisinopril", "Amlodipine", "Losartan"],
            Self::Asthma => &["Symbicort", "Advair Diskus", "Albuterol"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideSlug {
    GenericMedicines,
    ChronicConditions,
}

impl GuideSlug {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "generic-medicines" => Some(Self::GenericMedicines),
            "chronic-conditions" => Some(Self::ChronicConditions),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::GenericMedicines => "generic-medicines",
            Self::ChronicConditions => "chronic-conditions",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EducationContent {
    Module(EducationModuleView),
    Guide(EducationGuideView),
}

impl From<EducationContent> for EducationContentResponse {
    fn from(content: EducationContent) -> Self {
        match content {
            EducationContent::Module(module) => Self {
                kind: "module".to_string(),
                module: Some(module),
                guide: None,
            },
            EducationContent::Guide(guide) => Self {
                kind: "guide".to_string(),
                module: None,
                guide: Some(guide),
            },
        }
    }
}

pub struct EducationLibrary {
    catalog: Arc<Catalog>,
    translations: Arc<Translations>,
}

impl EducationLibrary {
    pub fn new(catalog: Arc<Catalog>, translations: Arc<Translations>) -> Self {
        Self {
            catalog,
            translations,
        }
    }

    /// A module in the requested language; missing strings come from the default language.
    pub fn module(&self, topic: EducationTopic, lang: Option<&str>) -> EducationModuleView {
        let t = &self.translations;
        let prefix = format!("education.modules.{}", topic.key());

        EducationModuleView {
            topic: topic.key().to_string(),
            title: t.text(lang, &format!("{prefix}.title")),
            summary: t.text(lang, &format!("{prefix}.summary")),
            conditions: topic.conditions().iter().map(|c| c.to_string()).collect(),
            featured_medicines: topic
                .featured_medicines()
                .iter()
                .filter(|name| self.catalog.find_by_name(name).is_some())
                .map(|name| name.to_string())
                .collect(),
            tips: t.list(lang, &format!("{prefix}.tips")),
            language: t.normalize_language(lang).to_string(),
        }
    }

    pub fn modules(&self, lang: Option<&str>) -> EducationModulesResponse {
        EducationModulesResponse {
            language: self.translations.normalize_language(lang).to_string(),
            modules: EducationTopic::ALL
                .iter()
                .map(|&topic| self.module(topic, lang))
                .collect(),
        }
    }

    pub fn guide(&self, slug: GuideSlug, lang: Option<&str>) -> EducationGuideView {
        let t = &self.translations;
        let prefix = format!("education.guides.{}", slug.slug());

        let sections = t
            .list(lang, &format!("{prefix}.sections"))
            .into_iter()
            .map(|entry| match entry.split_once('|') {
                Some((heading, body)) => GuideSection {
                    heading: heading.trim().to_string(),
                    body: body.trim().to_string(),
                },
                None => GuideSection {
                    heading: String::new(),
                    body: entry.trim().to_string(),
                },
            })
            .collect();

        EducationGuideView {
            slug: slug.slug().to_string(),
            title: t.text(lang, &format!("{prefix}.title")),
            sections,
            disclaimer: t.text(lang, "education.guides.disclaimer"),
            language: t.normalize_language(lang).to_string(),
        }
    }

    /// Look up a module topic or guide slug. Unknown keys are `NotFound`.
    pub fn content(&self, topic: &str, lang: Option<&str>) -> Result<EducationContent, AppError> {
        if let Some(topic) = EducationTopic::parse(topic) {
            return Ok(EducationContent::Module(self.module(topic, lang)));
        }
        if let Some(slug) = GuideSlug::parse(topic) {
            return Ok(EducationContent::Guide(self.guide(slug, lang)));
        }
        Err(AppError::not_found(format!(
            "unknown education topic: '{}'",
            topic.trim()
        )))
    }
}
