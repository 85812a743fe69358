use serde::{Deserialize, Serialize};

/// Named grouping for recipes. Referenced (not owned) by recipes; deleting
/// a category clears the reference on its recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}
