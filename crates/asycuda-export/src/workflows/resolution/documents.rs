use super::tables;
use crate::workflows::reference::{description_key, ReferenceDataStore};
use serde::Serialize;
use std::collections::HashMap;

/// Where a prior-document reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    Product,
    Description,
    PartialDescription,
    Synthesized,
    Fallback,
}

/// Resolves prior-document references for export lines.
#[derive(Debug, Clone)]
pub struct DocumentReferenceResolver {
    products: HashMap<String, String>,
    descriptions: Vec<(String, String)>,
    offices: Vec<(String, String)>,
    default_office: String,
    fallback: String,
    year: i32,
}

impl DocumentReferenceResolver {
    /// Empty resolver using the standard office table and `year` for synthesized references.
    pub fn new(year: i32) -> Self {
        Self {
            products: HashMap::new(),
            descriptions: Vec::new(),
            offices: tables::OFFICE_BY_CHAPTER
                .iter()
                .map(|(chapter, office)| (chapter.to_string(), office.to_string()))
                .collect(),
            default_office: tables::DEFAULT_OFFICE.to_string(),
            fallback: tables::FALLBACK_DOCUMENT_REFERENCE.to_string(),
            year,
        }
    }

    pub fn from_store(store: &ReferenceDataStore, year: i32) -> Self {
        let mut resolver = Self::new(year);
        resolver.products = store.product_references().clone();
        resolver.descriptions = store.description_references().to_vec();
        resolver
    }

    pub fn add_product_reference(&mut self, product_code: &str, reference: &str) {
        let key = product_code.trim().to_ascii_uppercase();
        if !key.is_empty() {
            self.products.insert(key, reference.to_string());
        }
    }

    pub fn add_description_reference(&mut self, description: &str, reference: &str) {
        let key = description_key(description);
        if key.is_empty() {
            return;
        }
        match self.descriptions.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = reference.to_string(),
            None => self.descriptions.push((key, reference.to_string())),
        }
    }

    /// Maps a two-digit chapter to the office used when synthesizing references.
    pub fn add_office_mapping(&mut self, chapter: &str, office: &str) {
        let chapter = chapter.trim().to_string();
        let office = office.trim().to_ascii_uppercase();
        match self.offices.iter_mut().find(|(existing, _)| *existing == chapter) {
            Some(entry) => entry.1 = office,
            None => self.offices.push((chapter, office)),
        }
    }

    pub fn resolve(
        &self,
        product_code: Option<&str>,
        description: Option<&str>,
        code: Option<&str>,
    ) -> String {
        self.resolve_with_source(product_code, description, code).0
    }

    pub fn resolve_with_source(
        &self,
        product_code: Option<&str>,
        description: Option<&str>,
        code: Option<&str>,
    ) -> (String, ReferenceSource) {
        if let Some(reference) = product_code
            .map(|product| product.trim().to_ascii_uppercase())
            .filter(|product| !product.is_empty())
            .and_then(|product| self.products.get(&product))
        {
            return (reference.clone(), ReferenceSource::Product);
        }

        if let Some(description) = description
            .map(description_key)
            .filter(|description| !description.is_empty())
        {
            if let Some((_, reference)) = self
                .descriptions
                .iter()
                .find(|(known, _)| *known == description)
            {
                return (reference.clone(), ReferenceSource::Description);
            }
            if let Some((_, reference)) = self.descriptions.iter().find(|(known, _)| {
                known.contains(description.as_str()) || description.contains(known.as_str())
            }) {
                return (reference.clone(), ReferenceSource::PartialDescription);
            }
        }

        if let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) {
            return (self.synthesize(code), ReferenceSource::Synthesized);
        }

        (self.fallback.clone(), ReferenceSource::Fallback)
    }

    fn synthesize(&self, code: &str) -> String {
        let office = code
            .get(..2)
            .and_then(|chapter| {
                self.offices
                    .iter()
                    .find(|(known, _)| known == chapter)
                    .map(|(_, office)| office.as_str())
            })
            .unwrap_or(&self.default_office);

        let serial = if code.len() >= 6 {
            code.get(code.len() - 4..).unwrap_or("10000")
        } else {
            "10000"
        };
        let article = if code.len() >= 4 {
            code.get(code.len() - 2..).unwrap_or("1")
        } else {
            "1"
        };

        format!("{office} {} C {serial} art. {article}", self.year)
    }
}
