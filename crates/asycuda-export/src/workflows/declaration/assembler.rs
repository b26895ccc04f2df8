use super::domain::{Declaration, DeclarationHeader, Item};
use super::settings::DeclarationSettings;
use chrono::{Local, NaiveDateTime};
use tracing::info;

/// Builds declarations from resolved items and header defaults.
#[derive(Debug, Clone, Default)]
pub struct DeclarationAssembler {
    settings: DeclarationSettings,
}

impl DeclarationAssembler {
    pub fn new(settings: DeclarationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DeclarationSettings {
        &self.settings
    }

    pub fn assemble<I>(&self, header: DeclarationHeader, items: I) -> Declaration
    where
        I: IntoIterator<Item = Item>,
    {
        self.assemble_at(header, items, Local::now().naive_local())
    }

    /// Same as [`DeclarationAssembler::assemble`] with an explicit clock for
    /// generated registration numbers and dates.
    pub fn assemble_at<I>(
        &self,
        header: DeclarationHeader,
        items: I,
        now: NaiveDateTime,
    ) -> Declaration
    where
        I: IntoIterator<Item = Item>,
    {
        let mut declaration = Declaration::from_header(header, &self.settings, now);
        for item in items {
            declaration.add_item(item);
        }
        let totals = declaration.calculate_totals();

        info!(
            registration = %declaration.registration_number,
            items = totals.total_items,
            packages = totals.total_packages,
            value = totals.total_value,
            "declaration assembled"
        );

        declaration
    }
}
