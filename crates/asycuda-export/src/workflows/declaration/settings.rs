use super::domain::{DeclarationError, DeclarationType};
use crate::workflows::resolution::supplementary;
use serde::Serialize;

/// Header and line defaults applied whenever the caller does not override them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclarationSettings {
    pub declaration_type: DeclarationType,
    pub customs_office: String,
    pub general_procedure_code: String,
    pub extended_procedure_code: String,
    pub destination_country: String,
    pub transport_mode: String,
    pub entry_exit_office: String,
    pub currency_code: String,
    pub exchange_rate: f64,
    pub valuation_method: String,
    pub delivery_terms: String,
    pub place_of_loading: Option<String>,
    pub manifest_reference: Option<String>,
    pub warehouse_identification: Option<String>,
    pub declarant_signature: Option<String>,
    pub item_defaults: ItemDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDefaults {
    pub statistical_unit: String,
    pub package_type: String,
    pub marks_and_numbers: String,
    pub origin_country: String,
}

impl Default for ItemDefaults {
    fn default() -> Self {
        Self {
            statistical_unit: "NMB".to_string(),
            package_type: "PE".to_string(),
            marks_and_numbers: "NO MARKS".to_string(),
            origin_country: "US".to_string(),
        }
    }
}

impl Default for DeclarationSettings {
    fn default() -> Self {
        Self {
            declaration_type: DeclarationType::ReExport,
            customs_office: "LCVFP".to_string(),
            general_procedure_code: "3071".to_string(),
            extended_procedure_code: "113".to_string(),
            destination_country: "VC".to_string(),
            transport_mode: "VC".to_string(),
            entry_exit_office: "LCHB".to_string(),
            currency_code: "XCD".to_string(),
            exchange_rate: 1.0,
            valuation_method: "1".to_string(),
            delivery_terms: "CIF".to_string(),
            place_of_loading: None,
            manifest_reference: None,
            warehouse_identification: None,
            declarant_signature: None,
            item_defaults: ItemDefaults::default(),
        }
    }
}

/// Keys accepted by [`DeclarationSettings::apply_overrides`].
pub const SETTING_KEYS: &[&str] = &[
    "declaration_type",
    "customs_office",
    "general_procedure_code",
    "extended_procedure_code",
    "destination_country",
    "transport_mode",
    "entry_exit_office",
    "currency_code",
    "exchange_rate",
    "valuation_method",
    "delivery_terms",
    "place_of_loading",
    "manifest_reference",
    "warehouse_identification",
    "declarant_signature",
    "statistical_unit",
    "package_type",
    "marks_and_numbers",
    "origin_country",
    "vessel",
    "departure_port",
    "destination",
];

impl DeclarationSettings {
    /// Applies `key=value` overrides in order.
    ///
    /// `vessel`, `departure_port` and `destination` take free text and are
    /// translated to transport, office and country codes.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<(), DeclarationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in overrides {
            self.apply(key, value)?;
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), DeclarationError> {
        let key = key.trim().to_ascii_lowercase();
        let raw = value.trim();
        let code = raw.to_ascii_uppercase();
        let invalid = || DeclarationError::InvalidSetting {
            key: key.clone(),
            value: raw.to_string(),
        };

        match key.as_str() {
            "declaration_type" => {
                self.declaration_type = DeclarationType::from_code(raw).ok_or_else(invalid)?;
            }
            "customs_office" => self.customs_office = code,
            "general_procedure_code" => self.general_procedure_code = code,
            "extended_procedure_code" => self.extended_procedure_code = code,
            "destination_country" | "country_of_destination" => self.destination_country = code,
            "transport_mode" | "mode_of_transport" => self.transport_mode = code,
            "entry_exit_office" | "office_of_entry_exit" => self.entry_exit_office = code,
            "currency_code" => self.currency_code = code,
            "exchange_rate" => {
                self.exchange_rate = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|rate| rate.is_finite())
                    .ok_or_else(invalid)?;
            }
            "valuation_method" => self.valuation_method = raw.to_string(),
            "delivery_terms" => self.delivery_terms = code,
            "place_of_loading" => self.place_of_loading = optional(raw),
            "manifest_reference" => self.manifest_reference = optional(raw),
            "warehouse_identification" => self.warehouse_identification = optional(raw),
            "declarant_signature" => self.declarant_signature = optional(raw),
            "statistical_unit" => self.item_defaults.statistical_unit = code,
            "package_type" => self.item_defaults.package_type = code,
            "marks_and_numbers" => self.item_defaults.marks_and_numbers = raw.to_string(),
            "origin_country" | "country_of_origin" => self.item_defaults.origin_country = code,
            "vessel" => {
                if let Some(transport) = supplementary::transport_for_vessel(raw) {
                    self.transport_mode = transport.to_string();
                }
            }
            "departure_port" => {
                if let Some(office) = supplementary::office_for_port(raw) {
                    self.entry_exit_office = office.to_string();
                }
            }
            "destination" => {
                if let Some(country) = supplementary::country_for_place(raw) {
                    self.destination_country = country.to_string();
                }
            }
            _ => return Err(DeclarationError::UnknownSetting(key.clone())),
        }

        Ok(())
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
