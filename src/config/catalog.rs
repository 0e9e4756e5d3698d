//! Mapping from user-facing category tags to the categories stored on POIs.

use crate::domain::filters::TagSet;
use std::collections::BTreeMap;

/// Category taxonomy loaded from configuration.
///
/// A token is either a group tag (`cibo`) expanding to several stored
/// categories, or a stored category name used on its own (`Musei`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    groups: BTreeMap<String, Vec<String>>,
}

impl CategoryCatalog {
    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(tag, categories)| (tag.trim().to_lowercase(), categories))
            .collect();
        Self { groups }
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    /// Canonical spelling of a known token, `None` for anything unknown.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let lowered = token.to_lowercase();
        if self.groups.contains_key(&lowered) {
            return Some(lowered);
        }
        self.groups
            .values()
            .flatten()
            .find(|category| category.eq_ignore_ascii_case(token))
            .cloned()
    }

    /// Catalog spelling of every known token, in selection order. Unknown
    /// tokens are dropped.
    pub fn canonicalize(&self, tags: &TagSet) -> TagSet {
        let mut canonical = TagSet::new();
        for token in tags.iter() {
            match self.resolve(token) {
                Some(name) => {
                    canonical.insert(name);
                }
                None => tracing::debug!("Dropping unknown category '{}'", token),
            }
        }
        canonical
    }

    /// Stored categories a selected token stands for.
    pub fn expand(&self, token: &str) -> Vec<String> {
        match self.groups.get(&token.to_lowercase()) {
            Some(categories) => categories.clone(),
            None => vec![token.to_string()],
        }
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        let table: [(&str, &[&str]); 8] = [
            (
                "cibo",
                &["Ristoranti", "Agriturismi", "Cantine", "Street Food", "Mercati"],
            ),
            ("cultura", &["Musei", "Monumenti", "Chiese", "Teatri", "Borghi"]),
            ("natura", &["Parchi", "Spiagge", "Sentieri", "Riserve Naturali"]),
            ("eventi", &["Eventi", "Sagre", "Concerti", "Festival", "Mostre"]),
            ("esperienze", &["Esperienze", "Tour", "Laboratori", "Degustazioni"]),
            ("benessere", &["Terme", "Spa"]),
            ("sport", &["Sport", "Cicloturismo", "Sport Acquatici"]),
            ("divertimento", &["Parchi Divertimento", "Locali", "Discoteche"]),
        ];
        Self::new(
            table
                .iter()
                .map(|(tag, categories)| {
                    (
                        tag.to_string(),
                        categories.iter().map(|c| c.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}
