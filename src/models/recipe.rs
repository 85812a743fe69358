use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted recipe record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL-safe unique identifier. Derived from the title on first save when
    /// not supplied; never regenerated afterwards, so a later title edit does
    /// not move the public URL.
    pub slug: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    /// When true, `preparation_steps` is rendered as markup rather than
    /// escaped.
    pub preparation_steps_is_html: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_published: bool,
    /// Path of the cover image relative to the media root, under the
    /// date-partitioned covers layout. Empty when no cover is set.
    pub cover: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
}

impl Recipe {
    /// Canonical detail-page path for this recipe.
    pub fn absolute_url(&self) -> String {
        format!("/recipes/{}/", self.id)
    }
}

/// Insert payload for a recipe; the repository fills in id, slug (when
/// absent) and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub slug: Option<String>,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    pub is_published: bool,
    pub cover: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
}

/// A published recipe decorated with the author display label
/// `"<first> <last> (<username>)"`. The label is built by SQL concatenation,
/// so it is `None` whenever the author reference or any name component is
/// NULL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedRecipe {
    pub recipe: Recipe,
    pub author_full_name: Option<String>,
}
