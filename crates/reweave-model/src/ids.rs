use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one instance in the observed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(
    /// Underlying UUID
    pub Uuid,
);

impl InstanceId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a deduplicated component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(
    /// Underlying UUID
    pub Uuid,
);

impl TypeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one blob of legacy source text.
///
/// Many types may share one code id (adapter layers collapse onto the
/// definition they wrap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CodeId(
    /// Underlying UUID
    pub Uuid,
);

impl CodeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
        assert_ne!(TypeId::new(), TypeId::new());
        assert_ne!(CodeId::new(), CodeId::new());
    }

    #[test]
    fn ids_roundtrip_serde() {
        let id = TypeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: TypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
