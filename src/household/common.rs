/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Provides access to a human-friendly entity name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a presentation-ready label for CLI output or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Fresh identifier for a persisted record.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
