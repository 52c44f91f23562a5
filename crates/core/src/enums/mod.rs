//! Canonical string enums: harvested from the raw documents, lifted out of
//! generated namespaces, and substituted for matching literal unions.

mod harvest;
mod lift;
mod registry;

pub use harvest::{harvest_enums, reserved_model_names};
pub use lift::{LiftReport, lift_enums};
pub use registry::{EnumEntry, EnumRegistry, enum_name_for_property};
