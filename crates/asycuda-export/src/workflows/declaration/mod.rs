pub mod assembler;
pub mod domain;
pub mod settings;

pub use assembler::DeclarationAssembler;
pub use domain::{
    Declaration, DeclarationError, DeclarationHeader, DeclarationTotals, DeclarationType, Entity,
    Item, ItemDraft,
};
pub use settings::{DeclarationSettings, ItemDefaults, SETTING_KEYS};
