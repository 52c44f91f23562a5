use std::collections::{BTreeMap, BTreeSet};

use apiweave_common::naming::pascal_case;
use serde::Serialize;
use tracing::debug;

/// Global TypeScript type names an enum must not shadow.
const BUILTIN_TYPE_NAMES: &[&str] = &[
    "Array", "ArrayBuffer", "Awaited", "Blob", "Boolean", "Date", "Error", "Exclude", "Extract", "File",
    "FormData", "Function", "Headers", "Map", "NonNullable", "Number", "Object", "Omit", "Parameters",
    "Partial", "Pick", "Promise", "Readonly", "Record", "RegExp", "Request", "Required", "Response",
    "ReturnType", "Set", "String", "Symbol", "URL", "URLSearchParams",
];

/// A named string enumeration. Identity is the unordered value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumEntry {
    /// Exported type name.
    pub name: String,
    /// Member values.
    pub values: BTreeSet<String>,
    /// Where the value set was seen (`service:#/pointer` or a file path).
    pub sources: Vec<String>,
}

/// Canonical enums keyed by value set.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    entries: Vec<EnumEntry>,
    by_values: BTreeMap<BTreeSet<String>, usize>,
    /// Names that must not be given to an enum (existing model types).
    reserved: BTreeSet<String>,
}

impl EnumRegistry {
    /// Empty registry with no reserved names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry that never hands out a name in `reserved`.
    pub fn with_reserved(reserved: BTreeSet<String>) -> Self {
        Self {
            reserved,
            ..Self::default()
        }
    }

    /// Register a value set and return its canonical name.
    ///
    /// A value set seen before keeps its first name. A new value set whose
    /// preferred name is taken gets `<Parent><Name>`, then a numeric suffix.
    pub fn register<I>(&mut self, preferred: &str, parent: Option<&str>, values: I, source: &str) -> String
    where
        I: IntoIterator<Item = String>,
    {
        let values: BTreeSet<String> = values.into_iter().collect();
        if let Some(&index) = self.by_values.get(&values) {
            let entry = &mut self.entries[index];
            if !entry.sources.iter().any(|s| s == source) {
                entry.sources.push(source.to_string());
            }
            return entry.name.clone();
        }

        let name = self.unique_name(preferred, parent);
        debug!(name = %name, values = values.len(), source, "Registered enum.");
        self.by_values.insert(values.clone(), self.entries.len());
        self.entries.push(EnumEntry {
            name: name.clone(),
            values,
            sources: vec![source.to_string()],
        });
        name
    }

    fn unique_name(&self, preferred: &str, parent: Option<&str>) -> String {
        if !self.is_taken(preferred) {
            return preferred.to_string();
        }
        let base = match parent {
            Some(parent) => {
                let qualified = format!("{}{preferred}", pascal_case(parent));
                if !self.is_taken(&qualified) {
                    return qualified;
                }
                qualified
            }
            None => preferred.to_string(),
        };
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or(base)
    }

    fn is_taken(&self, name: &str) -> bool {
        BUILTIN_TYPE_NAMES.contains(&name)
            || self.reserved.contains(name)
            || self.entries.iter().any(|e| e.name == name)
    }

    /// Name registered for exactly this value set.
    pub fn lookup(&self, values: &BTreeSet<String>) -> Option<&str> {
        self.by_values
            .get(values)
            .map(|&index| self.entries[index].name.as_str())
    }

    /// Entry registered under `name`.
    pub fn get(&self, name: &str) -> Option<&EnumEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries sorted by name.
    pub fn sorted(&self) -> Vec<&EnumEntry> {
        let mut entries: Vec<&EnumEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Number of distinct value sets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before anything is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enum name for a property, applying the known domain mappings first.
pub fn enum_name_for_property(property: &str, parent: &str) -> String {
    if property == "role" && (parent.contains("CompanyRole") || parent.contains("RoleAssignment")) {
        return "CompanyRole".to_string();
    }
    if matches!(property, "roles" | "userRoles" | "userRole") {
        return "UserRole".to_string();
    }
    pascal_case(property)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_identity_is_the_value_set() {
        let mut registry = EnumRegistry::new();
        let first = registry.register("Status", Some("UserDto"), set(&["A", "B", "C"]), "identity:status");
        let second = registry.register("State", Some("BookingDto"), set(&["C", "A", "B"]), "booking:state");
        assert_eq!(first, "Status");
        assert_eq!(second, "Status");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Status").unwrap().sources.len(), 2);

        let key: BTreeSet<String> = set(&["B", "C", "A"]).into_iter().collect();
        assert_eq!(registry.lookup(&key), Some("Status"));
    }

    #[test]
    fn test_taken_names_are_qualified() {
        let mut registry = EnumRegistry::new();
        registry.register("Status", Some("UserDto"), set(&["A"]), "a");
        let qualified = registry.register("Status", Some("booking_dto"), set(&["B"]), "b");
        assert_eq!(qualified, "BookingDtoStatus");
        let numbered = registry.register("Status", Some("booking_dto"), set(&["C"]), "c");
        assert_eq!(numbered, "BookingDtoStatus2");
        let unparented = registry.register("Status", None, set(&["D"]), "d");
        assert_eq!(unparented, "Status2");
        let names: Vec<_> = registry.sorted().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["BookingDtoStatus", "BookingDtoStatus2", "Status", "Status2"]);
    }

    #[test]
    fn test_reserved_model_names_are_avoided() {
        let mut registry = EnumRegistry::with_reserved(BTreeSet::from(["UserRole".to_string()]));
        let name = registry.register("UserRole", Some("UserDto"), set(&["USER"]), "a");
        assert_eq!(name, "UserDtoUserRole");
    }

    #[test]
    fn test_builtin_type_names_are_avoided() {
        let mut registry = EnumRegistry::new();
        let preferred = enum_name_for_property("error", "PaymentDto");
        let error = registry.register(&preferred, Some("PaymentDto"), set(&["TIMEOUT"]), "a");
        assert_eq!(error, "PaymentDtoError");
        let record = registry.register(&enum_name_for_property("record", "X"), None, set(&["FULL"]), "b");
        assert_eq!(record, "Record2");
        assert!(registry.get("Error").is_none());
    }

    #[test]
    fn test_property_heuristics() {
        assert_eq!(enum_name_for_property("role", "CompanyRoleAssignmentDto"), "CompanyRole");
        assert_eq!(enum_name_for_property("role", "Booking_RoleAssignmentDto"), "CompanyRole");
        assert_eq!(enum_name_for_property("role", "UserDto"), "Role");
        assert_eq!(enum_name_for_property("roles", "UserDto"), "UserRole");
        assert_eq!(enum_name_for_property("userRoles", "X"), "UserRole");
        assert_eq!(enum_name_for_property("payment_status", "X"), "PaymentStatus");
    }
}
