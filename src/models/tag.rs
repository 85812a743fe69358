use serde::{Deserialize, Serialize};

/// Row owned by the external tagging subsystem; modeled here only as far as
/// the recipe association table needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}
