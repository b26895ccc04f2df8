mod loader;

use serde::Serialize;
use std::collections::HashMap;

pub use loader::{normalize_code, ReferenceFormat};

/// Everything the reference table knows about one classification code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeDetail {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl CodeDetail {
    /// `"<office> <year> C <serial>[ art. <line>]"`, when the record carries enough to build one.
    pub fn document_reference(&self) -> Option<String> {
        let office = self.office.as_deref()?;
        let year = self.year.as_deref()?;
        let serial = self.serial.as_deref()?;
        let mut reference = format!("{office} {year} C {serial}");
        if let Some(line) = self.line.as_deref() {
            reference.push_str(" art. ");
            reference.push_str(line);
        }
        Some(reference)
    }
}

/// Lookup tables loaded once per run and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataStore {
    descriptions: Vec<(String, String)>,
    description_index: HashMap<String, usize>,
    details: HashMap<String, CodeDetail>,
    products: HashMap<String, String>,
    product_references: HashMap<String, String>,
    description_references: Vec<(String, String)>,
    format: Option<ReferenceFormat>,
}

impl ReferenceDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `description → code`. A repeated description keeps its
    /// original position and takes the newer code.
    pub fn insert_description(&mut self, description: &str, code: &str) {
        let key = description_key(description);
        if key.is_empty() || code.is_empty() {
            return;
        }
        match self.description_index.get(&key) {
            Some(&position) => self.descriptions[position].1 = code.to_string(),
            None => {
                self.description_index
                    .insert(key.clone(), self.descriptions.len());
                self.descriptions.push((key, code.to_string()));
            }
        }
    }

    pub fn insert_detail(&mut self, detail: CodeDetail) {
        self.details.insert(detail.code.clone(), detail);
    }

    pub fn insert_product(&mut self, product_code: &str, code: &str) {
        let product_code = product_code.trim();
        if !product_code.is_empty() && !code.is_empty() {
            self.products
                .insert(product_code.to_ascii_uppercase(), code.to_string());
        }
    }

    /// Registers a prior-document reference under a product code and/or description.
    pub fn insert_document_reference(
        &mut self,
        product_code: Option<&str>,
        description: Option<&str>,
        reference: &str,
    ) {
        if let Some(product_code) = product_code.map(str::trim).filter(|p| !p.is_empty()) {
            self.product_references
                .insert(product_code.to_ascii_uppercase(), reference.to_string());
        }
        if let Some(description) = description.map(description_key).filter(|d| !d.is_empty()) {
            match self
                .description_references
                .iter_mut()
                .find(|(existing, _)| *existing == description)
            {
                Some(entry) => entry.1 = reference.to_string(),
                None => self
                    .description_references
                    .push((description, reference.to_string())),
            }
        }
    }

    pub fn code_for_description(&self, description: &str) -> Option<&str> {
        self.description_index
            .get(&description_key(description))
            .map(|&position| self.descriptions[position].1.as_str())
    }

    pub fn code_for_product(&self, product_code: &str) -> Option<&str> {
        self.products
            .get(&product_code.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn detail(&self, code: &str) -> Option<&CodeDetail> {
        self.details.get(code)
    }

    /// `(uppercased description, code)` pairs in load order.
    pub fn descriptions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.descriptions
            .iter()
            .map(|(description, code)| (description.as_str(), code.as_str()))
    }

    pub fn product_references(&self) -> &HashMap<String, String> {
        &self.product_references
    }

    /// `(uppercased description, reference)` pairs in load order.
    pub fn description_references(&self) -> &[(String, String)] {
        &self.description_references
    }

    pub fn format(&self) -> Option<ReferenceFormat> {
        self.format
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

pub(crate) fn description_key(description: &str) -> String {
    description.trim().to_uppercase()
}
