use crate::ids::TypeId;
use serde::{Deserialize, Serialize};

/// An accepted, regenerated component.
///
/// Immutable once committed; a later renaming/restructuring pass may rewrite
/// `output_directory` outside this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryItem {
    /// Type this component regenerates.
    pub type_id: TypeId,
    /// Unique accepted component name.
    pub name: String,
    /// Oracle-written description of what the component does.
    pub description: String,
    /// The regenerated source.
    pub source_text: String,
    /// Directory the source is persisted under.
    pub output_directory: String,
}

impl RegistryItem {
    /// Relative path the source text is persisted under.
    pub fn output_path(&self) -> String {
        if self.output_directory.is_empty() {
            format!("{}.cmp", self.name)
        } else {
            format!("{}/{}.cmp", self.output_directory, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_includes_directory() {
        let item = RegistryItem {
            type_id: TypeId::new(),
            name: "Badge".to_string(),
            description: String::new(),
            source_text: String::new(),
            output_directory: "ui".to_string(),
        };
        assert_eq!(item.output_path(), "ui/Badge.cmp");
    }

    #[test]
    fn output_path_without_directory() {
        let item = RegistryItem {
            type_id: TypeId::new(),
            name: "Badge".to_string(),
            description: String::new(),
            source_text: String::new(),
            output_directory: String::new(),
        };
        assert_eq!(item.output_path(), "Badge.cmp");
    }
}
