use super::settings::DeclarationSettings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Export regime requested on the declaration header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationType {
    #[serde(rename = "EX1")]
    PermanentExport,
    #[serde(rename = "EX2")]
    TemporaryExport,
    #[serde(rename = "EX3")]
    ReExport,
}

impl DeclarationType {
    pub const fn code(self) -> &'static str {
        match self {
            DeclarationType::PermanentExport => "EX1",
            DeclarationType::TemporaryExport => "EX2",
            DeclarationType::ReExport => "EX3",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DeclarationType::PermanentExport => "Permanent export",
            DeclarationType::TemporaryExport => "Temporary export",
            DeclarationType::ReExport => "Re-export",
        }
    }

    pub const fn ordered() -> [Self; 3] {
        [
            DeclarationType::PermanentExport,
            DeclarationType::TemporaryExport,
            DeclarationType::ReExport,
        ]
    }

    pub fn from_code(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.code() == normalized)
    }
}

/// Errors raised while constructing declaration parts or applying settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeclarationError {
    #[error("entity requires a non-empty {field}")]
    MissingEntityField { field: &'static str },
    #[error("invalid HS code format: '{0}'")]
    InvalidClassificationCode(String),
    #[error("invalid country of origin: '{0}'")]
    InvalidOrigin(String),
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("Net weight cannot exceed gross weight ({net} > {gross})")]
    NetExceedsGross { net: f64, gross: f64 },
    #[error("description must be at least 3 characters: '{0}'")]
    DescriptionTooShort(String),
    #[error("unknown declaration setting '{0}'")]
    UnknownSetting(String),
    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },
}

/// A party named on the declaration (exporter or declarant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address_line1: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, DeclarationError> {
        let entity = Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            address_line1: address_line1.into().trim().to_string(),
            address_line2: None,
            city: city.into().trim().to_string(),
            country: country.into().trim().to_ascii_uppercase(),
        };
        entity.check()?;
        Ok(entity)
    }

    pub fn with_address_line2(mut self, line: impl Into<String>) -> Self {
        let line = line.into();
        self.address_line2 = if line.trim().is_empty() {
            None
        } else {
            Some(line.trim().to_string())
        };
        self
    }

    /// Construction-time invariant: identifier, name and first address line are present.
    pub fn check(&self) -> Result<(), DeclarationError> {
        for (field, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("address_line1", &self.address_line1),
        ] {
            if value.trim().is_empty() {
                return Err(DeclarationError::MissingEntityField { field });
            }
        }
        Ok(())
    }
}

/// One declaration line.
///
/// Fields are public so callers can inspect and patch resolved lines; the
/// construction-time rules live in [`Item::check`] and run through
/// `TryFrom<ItemDraft>`. [`crate::workflows::validation::ValidationEngine`]
/// re-checks everything regardless of how the item was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_number: u32,
    pub hs_code: String,
    pub description: String,
    pub origin_country: String,
    pub gross_weight: f64,
    pub net_weight: f64,
    pub statistical_unit: String,
    pub quantity: f64,
    pub customs_value: f64,
    pub package_type: String,
    pub package_count: u32,
    pub marks_and_numbers: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_document: Option<String>,
}

/// Unchecked item fields, converted into an [`Item`] with `Item::try_from`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub item_number: u32,
    pub hs_code: String,
    pub description: String,
    pub origin_country: String,
    pub gross_weight: f64,
    pub net_weight: f64,
    pub statistical_unit: String,
    pub quantity: f64,
    pub customs_value: f64,
    pub package_type: String,
    pub package_count: u32,
    pub marks_and_numbers: String,
    pub previous_document: Option<String>,
}

impl Item {
    pub fn check(&self) -> Result<(), DeclarationError> {
        let code_ok = (6..=10).contains(&self.hs_code.len())
            && self.hs_code.chars().all(|c| c.is_ascii_digit());
        if !code_ok {
            return Err(DeclarationError::InvalidClassificationCode(
                self.hs_code.clone(),
            ));
        }

        let origin_ok = self.origin_country.len() == 2
            && self.origin_country.chars().all(|c| c.is_ascii_uppercase());
        if !origin_ok {
            return Err(DeclarationError::InvalidOrigin(self.origin_country.clone()));
        }

        for (field, value) in [
            ("gross weight", self.gross_weight),
            ("net weight", self.net_weight),
            ("quantity", self.quantity),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(DeclarationError::NonPositive { field, value });
            }
        }

        if self.net_weight > self.gross_weight {
            return Err(DeclarationError::NetExceedsGross {
                net: self.net_weight,
                gross: self.gross_weight,
            });
        }

        if self.package_count == 0 {
            return Err(DeclarationError::NonPositive {
                field: "package count",
                value: 0.0,
            });
        }

        if self.description.trim().chars().count() < 3 {
            return Err(DeclarationError::DescriptionTooShort(
                self.description.clone(),
            ));
        }

        Ok(())
    }
}

impl TryFrom<ItemDraft> for Item {
    type Error = DeclarationError;

    fn try_from(draft: ItemDraft) -> Result<Self, Self::Error> {
        let item = Item {
            item_number: draft.item_number,
            hs_code: draft.hs_code,
            description: draft.description,
            origin_country: draft.origin_country,
            gross_weight: draft.gross_weight,
            net_weight: draft.net_weight,
            statistical_unit: draft.statistical_unit,
            quantity: draft.quantity,
            customs_value: draft.customs_value,
            package_type: draft.package_type,
            package_count: draft.package_count,
            marks_and_numbers: draft.marks_and_numbers,
            previous_document: draft
                .previous_document
                .filter(|value| !value.trim().is_empty()),
        };
        item.check()?;
        Ok(item)
    }
}

/// Aggregates cached on the declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeclarationTotals {
    pub total_items: usize,
    pub total_packages: u64,
    pub total_gross_weight: f64,
    pub total_net_weight: f64,
    pub total_value: f64,
}

impl DeclarationTotals {
    fn from_items(items: &[Item]) -> Self {
        items.iter().fold(
            Self {
                total_items: items.len(),
                ..Self::default()
            },
            |mut totals, item| {
                totals.total_packages += u64::from(item.package_count);
                totals.total_gross_weight += item.gross_weight;
                totals.total_net_weight += item.net_weight;
                totals.total_value += item.customs_value;
                totals
            },
        )
    }
}

/// Caller-supplied header values; anything left as `None` is defaulted.
#[derive(Debug, Clone)]
pub struct DeclarationHeader {
    pub exporter: Arc<Entity>,
    pub declarant: Arc<Entity>,
    pub registration_number: Option<String>,
    pub commercial_reference: Option<String>,
    pub issue_date: Option<NaiveDate>,
}

impl DeclarationHeader {
    pub fn new(exporter: Arc<Entity>, declarant: Arc<Entity>) -> Self {
        Self {
            exporter,
            declarant,
            registration_number: None,
            commercial_reference: None,
            issue_date: None,
        }
    }
}

/// The aggregate root rendered by every encoder.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub registration_number: String,
    pub declaration_type: DeclarationType,
    pub customs_office: String,
    pub issue_date: NaiveDate,
    pub exporter: Arc<Entity>,
    pub declarant: Arc<Entity>,
    pub general_procedure_code: String,
    pub extended_procedure_code: String,
    pub destination_country: String,
    pub transport_mode: String,
    pub entry_exit_office: String,
    pub currency_code: String,
    pub exchange_rate: f64,
    pub commercial_reference: String,
    pub valuation_method: Option<String>,
    pub delivery_terms: Option<String>,
    pub place_of_loading: Option<String>,
    pub manifest_reference: Option<String>,
    pub warehouse_identification: Option<String>,
    pub declarant_signature: Option<String>,
    items: Vec<Item>,
    totals: DeclarationTotals,
}

impl Declaration {
    /// Builds an empty declaration whose header is `header` layered over `settings`.
    ///
    /// Registration number, commercial reference and issue date fall back to
    /// values derived from `now` when the header leaves them unset.
    pub fn from_header(
        header: DeclarationHeader,
        settings: &DeclarationSettings,
        now: chrono::NaiveDateTime,
    ) -> Self {
        let registration_number = header
            .registration_number
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("A{}", now.format("%Y%m%d%H%M")));
        let commercial_reference = header
            .commercial_reference
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("REF-{}", now.format("%Y%m%d")));

        Self {
            registration_number,
            declaration_type: settings.declaration_type,
            customs_office: settings.customs_office.clone(),
            issue_date: header.issue_date.unwrap_or_else(|| now.date()),
            exporter: header.exporter,
            declarant: header.declarant,
            general_procedure_code: settings.general_procedure_code.clone(),
            extended_procedure_code: settings.extended_procedure_code.clone(),
            destination_country: settings.destination_country.clone(),
            transport_mode: settings.transport_mode.clone(),
            entry_exit_office: settings.entry_exit_office.clone(),
            currency_code: settings.currency_code.clone(),
            exchange_rate: settings.exchange_rate,
            commercial_reference,
            valuation_method: non_empty(&settings.valuation_method),
            delivery_terms: non_empty(&settings.delivery_terms),
            place_of_loading: settings.place_of_loading.clone(),
            manifest_reference: settings.manifest_reference.clone(),
            warehouse_identification: settings.warehouse_identification.clone(),
            declarant_signature: settings.declarant_signature.clone(),
            items: Vec::new(),
            totals: DeclarationTotals::default(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Direct access to the item list. Cached totals are not refreshed until
    /// [`Declaration::calculate_totals`] runs again.
    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    /// Appends an item and keeps the cached totals current.
    pub fn add_item(&mut self, item: Item) {
        self.totals.total_items += 1;
        self.totals.total_packages += u64::from(item.package_count);
        self.totals.total_gross_weight += item.gross_weight;
        self.totals.total_net_weight += item.net_weight;
        self.totals.total_value += item.customs_value;
        self.items.push(item);
    }

    pub fn calculate_totals(&mut self) -> DeclarationTotals {
        self.totals = DeclarationTotals::from_items(&self.items);
        self.totals
    }

    pub fn totals(&self) -> DeclarationTotals {
        self.totals
    }

    pub fn total_packages(&self) -> u64 {
        self.totals.total_packages
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn entity(id: &str, name: &str) -> Arc<Entity> {
        Arc::new(
            Entity::new(id, name, "1 Rodney Bay Marina", "Gros Islet", "LC")
                .expect("valid entity"),
        )
    }

    pub(crate) fn draft(item_number: u32, hs_code: &str, description: &str) -> ItemDraft {
        ItemDraft {
            item_number,
            hs_code: hs_code.to_string(),
            description: description.to_string(),
            origin_country: "US".to_string(),
            gross_weight: 0.3,
            net_weight: 0.25,
            statistical_unit: "NMB".to_string(),
            quantity: 1.0,
            customs_value: 10.0,
            package_type: "PE".to_string(),
            package_count: 1,
            marks_and_numbers: "NO MARKS".to_string(),
            previous_document: Some("LCCAP 2025 C 10000 art. 1".to_string()),
        }
    }

    pub(crate) fn item(item_number: u32, hs_code: &str, description: &str) -> Item {
        Item::try_from(draft(item_number, hs_code, description)).expect("valid item")
    }

    pub(crate) fn declaration() -> Declaration {
        let header = DeclarationHeader {
            registration_number: Some("A202510011200".to_string()),
            commercial_reference: Some("REF-20251001".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2025, 10, 1),
            ..DeclarationHeader::new(
                entity("EXP001", "Island Duty Free Ltd"),
                entity("DEC001", "Harbour Brokers"),
            )
        };
        let now = NaiveDate::from_ymd_opt(2025, 10, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("valid timestamp");
        Declaration::from_header(header, &DeclarationSettings::default(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn declaration_type_round_trips_codes() {
        for kind in DeclarationType::ordered() {
            assert_eq!(DeclarationType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(
            DeclarationType::from_code(" ex3 "),
            Some(DeclarationType::ReExport)
        );
        assert_eq!(DeclarationType::from_code("IM4"), None);
    }

    #[test]
    fn entity_requires_identifier_name_and_address() {
        let error = Entity::new("", "Shop", "Street", "Castries", "LC").expect_err("missing id");
        assert_eq!(error, DeclarationError::MissingEntityField { field: "id" });

        let error = Entity::new("ID1", "Shop", "  ", "Castries", "LC").expect_err("missing addr");
        assert_eq!(
            error,
            DeclarationError::MissingEntityField {
                field: "address_line1"
            }
        );
    }

    #[test]
    fn item_rejects_net_weight_above_gross() {
        let mut draft = draft(1, "65040000", "STRAW HAT");
        draft.net_weight = 0.5;
        draft.gross_weight = 0.2;

        let error = Item::try_from(draft).expect_err("net above gross rejected");
        assert!(matches!(error, DeclarationError::NetExceedsGross { .. }));
        assert!(error
            .to_string()
            .to_ascii_lowercase()
            .contains("net weight cannot exceed gross weight"));
    }

    #[test]
    fn item_rejects_bad_codes_and_short_descriptions() {
        let error = Item::try_from(draft(1, "6504", "STRAW HAT")).expect_err("short code");
        assert!(matches!(error, DeclarationError::InvalidClassificationCode(_)));

        let error = Item::try_from(draft(1, "65040000", "HT")).expect_err("short description");
        assert!(matches!(error, DeclarationError::DescriptionTooShort(_)));

        let mut zero_quantity = draft(1, "65040000", "STRAW HAT");
        zero_quantity.quantity = 0.0;
        assert!(Item::try_from(zero_quantity).is_err());
    }

    #[test]
    fn header_defaults_generate_references_from_clock() {
        let header = DeclarationHeader::new(entity("E1", "Exporter"), entity("D1", "Declarant"));
        let now = NaiveDate::from_ymd_opt(2025, 3, 4)
            .and_then(|date| date.and_hms_opt(9, 7, 0))
            .expect("valid timestamp");
        let declaration = Declaration::from_header(header, &DeclarationSettings::default(), now);

        assert_eq!(declaration.registration_number, "A202503040907");
        assert_eq!(declaration.commercial_reference, "REF-20250304");
        assert_eq!(declaration.issue_date, now.date());
        assert_eq!(declaration.declaration_type, DeclarationType::ReExport);
        assert_eq!(declaration.currency_code, "XCD");
    }

    #[test]
    fn calculate_totals_sums_packages_and_values() {
        let mut declaration = declaration();
        for (index, (packages, value)) in [(1, 10.0), (2, 20.0), (3, 5.0)].into_iter().enumerate()
        {
            let mut item = item(index as u32 + 1, "62053000", "COTTON SHIRT");
            item.package_count = packages;
            item.quantity = f64::from(packages);
            item.customs_value = value;
            declaration.items_mut().push(item);
        }

        assert_eq!(declaration.total_packages(), 0, "direct mutation leaves cache stale");
        let totals = declaration.calculate_totals();
        assert_eq!(totals.total_packages, 6);
        assert_eq!(totals.total_value, 35.0);
        assert_eq!(totals.total_items, 3);
    }

    #[test]
    fn add_item_keeps_running_totals() {
        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "STRAW HAT"));
        declaration.add_item(item(2, "71179000", "SHELL NECKLACE"));

        let running = declaration.totals();
        assert_eq!(running, declaration.calculate_totals());
        assert_eq!(running.total_packages, 2);
    }
}
