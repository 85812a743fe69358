use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::media;
use crate::models::{Author, Category, NewAuthor, NewRecipe, PublishedRecipe, Recipe, Tag};

use super::schema::SCHEMA;

/// Width covers are downscaled to after a successful save.
const COVER_MAX_WIDTH: u32 = 840;

const RECIPE_COLUMNS: &str = "id, title, description, slug, preparation_time, \
     preparation_time_unit, servings, servings_unit, preparation_steps, \
     preparation_steps_is_html, created_at, updated_at, is_published, cover, \
     category_id, author_id";

pub struct Repository {
    conn: Connection,
    media_root: PathBuf,
}

impl Repository {
    pub async fn new(db_path: &str, media_root: impl Into<PathBuf>) -> Result<Self> {
        let conn = Connection::open(db_path.to_string()).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            media_root: media_root.into(),
        })
    }

    // Category operations

    pub async fn insert_category(&self, name: String) -> Result<Category> {
        let category = self
            .conn
            .call(move |conn| {
                conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
                Ok(Category {
                    id: conn.last_insert_rowid(),
                    name,
                })
            })
            .await?;
        Ok(category)
    }

    pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let categories = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
                let categories = stmt
                    .query_map([], |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(categories)
            })
            .await?;
        Ok(categories)
    }

    /// Recipes referencing the category keep existing; their reference is
    /// cleared by the schema's ON DELETE SET NULL.
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Recipe operations

    /// Insert a new recipe and return the persisted record.
    ///
    /// When no slug is supplied one is derived from the title; both
    /// timestamps are set to now. A derived slug that collides with an
    /// existing one fails the UNIQUE constraint and surfaces as a database
    /// error. After the row is written the cover downscale hook runs.
    pub async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe> {
        let now = Utc::now();
        let slug = match recipe.slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slug::slugify(&recipe.title),
        };

        let saved = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO recipes (title, description, slug, preparation_time,
                           preparation_time_unit, servings, servings_unit, preparation_steps,
                           preparation_steps_is_html, created_at, updated_at, is_published,
                           cover, category_id, author_id)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
                    params![
                        recipe.title,
                        recipe.description,
                        slug,
                        recipe.preparation_time,
                        recipe.preparation_time_unit,
                        recipe.servings,
                        recipe.servings_unit,
                        recipe.preparation_steps,
                        recipe.preparation_steps_is_html,
                        now.to_rfc3339(),
                        now.to_rfc3339(),
                        recipe.is_published,
                        recipe.cover,
                        recipe.category_id,
                        recipe.author_id,
                    ],
                )?;
                Ok(Recipe {
                    id: conn.last_insert_rowid(),
                    title: recipe.title,
                    description: recipe.description,
                    slug,
                    preparation_time: recipe.preparation_time,
                    preparation_time_unit: recipe.preparation_time_unit,
                    servings: recipe.servings,
                    servings_unit: recipe.servings_unit,
                    preparation_steps: recipe.preparation_steps,
                    preparation_steps_is_html: recipe.preparation_steps_is_html,
                    created_at: now,
                    updated_at: now,
                    is_published: recipe.is_published,
                    cover: recipe.cover,
                    category_id: recipe.category_id,
                    author_id: recipe.author_id,
                })
            })
            .await?;

        self.process_cover(&saved)?;
        Ok(saved)
    }

    /// Write back an existing recipe and return it with its refreshed
    /// update timestamp.
    ///
    /// `created_at` is never touched. The slug is derived from the title
    /// only when the caller cleared it; an existing slug is kept as is, so
    /// a title edit does not move the public URL.
    pub async fn update_recipe(&self, mut recipe: Recipe) -> Result<Recipe> {
        if recipe.slug.is_empty() {
            recipe.slug = slug::slugify(&recipe.title);
        }
        recipe.updated_at = Utc::now();

        let recipe = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE recipes SET
                           title = ?1, description = ?2, slug = ?3, preparation_time = ?4,
                           preparation_time_unit = ?5, servings = ?6, servings_unit = ?7,
                           preparation_steps = ?8, preparation_steps_is_html = ?9,
                           updated_at = ?10, is_published = ?11, cover = ?12,
                           category_id = ?13, author_id = ?14
                       WHERE id = ?15"#,
                    params![
                        recipe.title,
                        recipe.description,
                        recipe.slug,
                        recipe.preparation_time,
                        recipe.preparation_time_unit,
                        recipe.servings,
                        recipe.servings_unit,
                        recipe.preparation_steps,
                        recipe.preparation_steps_is_html,
                        recipe.updated_at.to_rfc3339(),
                        recipe.is_published,
                        recipe.cover,
                        recipe.category_id,
                        recipe.author_id,
                        recipe.id,
                    ],
                )?;
                Ok(recipe)
            })
            .await?;

        self.process_cover(&recipe)?;
        Ok(recipe)
    }

    pub async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let recipe = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"
                ))?;
                let recipe = stmt
                    .query_row(params![id], |row| Ok(recipe_from_row(row)))
                    .optional()?;
                Ok(recipe)
            })
            .await?;
        Ok(recipe)
    }

    /// Slug-based lookup backing the recipe's public URL identity.
    pub async fn get_recipe_by_slug(&self, slug: &str) -> Result<Option<Recipe>> {
        let slug = slug.to_string();
        let recipe = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE slug = ?1"
                ))?;
                let recipe = stmt
                    .query_row(params![slug], |row| Ok(recipe_from_row(row)))
                    .optional()?;
                Ok(recipe)
            })
            .await?;
        Ok(recipe)
    }

    pub async fn delete_recipe(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                // Delete related data first
                conn.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", params![id])?;
                conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Duplicate-title check, run only when the caller asks for it (never
    /// as part of the save path).
    ///
    /// The lookup is case-insensitive. A match whose id differs from
    /// `excluding_id` fails with a validation error keyed by the `title`
    /// field; a record matching only itself passes, so editing a recipe
    /// without changing its title is not flagged.
    pub async fn validate_unique_title(
        &self,
        title: &str,
        excluding_id: Option<i64>,
    ) -> Result<()> {
        let title = title.to_string();
        let existing = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM recipes WHERE title = ?1 COLLATE NOCASE LIMIT 1",
                )?;
                let id = stmt
                    .query_row(params![title], |row| row.get::<_, i64>(0))
                    .optional()?;
                Ok(id)
            })
            .await?;

        match existing {
            Some(id) if Some(id) != excluding_id => Err(AppError::validation(
                "title",
                "Found recipes with the same title",
            )),
            _ => Ok(()),
        }
    }

    /// All published recipes, newest first, each decorated with the author
    /// display label built in SQL. SQLite `||` concatenation nulls the whole
    /// label when the author reference (or any name component) is NULL.
    pub async fn fetch_published_with_author_label(&self) -> Result<Vec<PublishedRecipe>> {
        let recipes = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT r.id, r.title, r.description, r.slug, r.preparation_time,
                              r.preparation_time_unit, r.servings, r.servings_unit,
                              r.preparation_steps, r.preparation_steps_is_html, r.created_at,
                              r.updated_at, r.is_published, r.cover, r.category_id, r.author_id,
                              a.first_name || ' ' || a.last_name || ' (' || a.username || ')'
                                  AS author_full_name
                       FROM recipes r
                       LEFT JOIN authors a ON r.author_id = a.id
                       WHERE r.is_published = 1
                       ORDER BY r.id DESC"#,
                )?;
                let recipes = stmt
                    .query_map([], |row| {
                        Ok(PublishedRecipe {
                            recipe: recipe_from_row(row),
                            author_full_name: row.get(16).unwrap(),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(recipes)
            })
            .await?;
        Ok(recipes)
    }

    // Tag association

    pub async fn insert_tag(&self, name: String) -> Result<Tag> {
        let tag = self
            .conn
            .call(move |conn| {
                conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
                Ok(Tag {
                    id: conn.last_insert_rowid(),
                    name,
                })
            })
            .await?;
        Ok(tag)
    }

    /// Replace the recipe's tag set with exactly `tag_ids`.
    pub async fn set_recipe_tags(&self, recipe_id: i64, tag_ids: Vec<i64>) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM recipe_tags WHERE recipe_id = ?1",
                    params![recipe_id],
                )?;
                for tag_id in &tag_ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)",
                        params![recipe_id, tag_id],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_recipe_tags(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let tags = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT t.id, t.name
                       FROM tags t
                       JOIN recipe_tags rt ON rt.tag_id = t.id
                       WHERE rt.recipe_id = ?1
                       ORDER BY t.name"#,
                )?;
                let tags = stmt
                    .query_map(params![recipe_id], |row| {
                        Ok(Tag {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(tags)
            })
            .await?;
        Ok(tags)
    }

    // Author identity

    pub async fn insert_author(&self, author: NewAuthor) -> Result<Author> {
        let author = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO authors (username, first_name, last_name) VALUES (?1, ?2, ?3)",
                    params![author.username, author.first_name, author.last_name],
                )?;
                Ok(Author {
                    id: conn.last_insert_rowid(),
                    username: author.username,
                    first_name: author.first_name,
                    last_name: author.last_name,
                })
            })
            .await?;
        Ok(author)
    }

    /// Best-effort cover downscale after a successful save.
    ///
    /// A cover not yet on disk (asset not flushed, or externally removed)
    /// is skipped and the save still counts as successful; any other resize
    /// failure propagates.
    fn process_cover(&self, recipe: &Recipe) -> Result<()> {
        let Some(cover) = recipe.cover.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let path = self.media_root.join(cover);
        if !path.exists() {
            debug!(cover, "cover file not on disk, skipping resize");
            return Ok(());
        }
        media::resize_to_width(&path, COVER_MAX_WIDTH)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn recipe_from_row(row: &Row) -> Recipe {
    Recipe {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        description: row.get(2).unwrap(),
        slug: row.get(3).unwrap(),
        preparation_time: row.get(4).unwrap(),
        preparation_time_unit: row.get(5).unwrap(),
        servings: row.get(6).unwrap(),
        servings_unit: row.get(7).unwrap(),
        preparation_steps: row.get(8).unwrap(),
        preparation_steps_is_html: row.get::<_, i64>(9).unwrap() != 0,
        created_at: row
            .get::<_, String>(10)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(11)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        is_published: row.get::<_, i64>(12).unwrap() != 0,
        cover: row.get(13).unwrap(),
        category_id: row.get(14).unwrap(),
        author_id: row.get(15).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    async fn test_repo() -> (Repository, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("recipes.db");
        let repo = Repository::new(db_path.to_str().unwrap(), dir.path())
            .await
            .unwrap();
        (repo, dir)
    }

    fn sample_recipe(title: &str) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            description: "A quick weeknight dinner".to_string(),
            preparation_time: 30,
            preparation_time_unit: "minutes".to_string(),
            servings: 4,
            servings_unit: "portions".to_string(),
            preparation_steps: "Chop everything, simmer, serve.".to_string(),
            ..NewRecipe::default()
        }
    }

    #[tokio::test]
    async fn derives_slug_from_title_on_insert() {
        let (repo, _dir) = test_repo().await;

        let recipe = repo
            .insert_recipe(sample_recipe("Feijão Tropeiro"))
            .await
            .unwrap();

        assert_eq!(recipe.slug, "feijao-tropeiro");
    }

    #[tokio::test]
    async fn explicit_slug_is_kept() {
        let (repo, _dir) = test_repo().await;

        let mut new = sample_recipe("Feijão Tropeiro");
        new.slug = Some("house-special".to_string());
        let recipe = repo.insert_recipe(new).await.unwrap();

        assert_eq!(recipe.slug, "house-special");
    }

    #[tokio::test]
    async fn title_edit_does_not_move_slug() {
        let (repo, _dir) = test_repo().await;

        let mut recipe = repo
            .insert_recipe(sample_recipe("Chili con Carne"))
            .await
            .unwrap();
        recipe.title = "Chili con Carne Deluxe".to_string();
        repo.update_recipe(recipe.clone()).await.unwrap();

        let reread = repo.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(reread.title, "Chili con Carne Deluxe");
        assert_eq!(reread.slug, "chili-con-carne");
    }

    #[tokio::test]
    async fn duplicate_slug_fails_insert() {
        let (repo, _dir) = test_repo().await;

        repo.insert_recipe(sample_recipe("Chili")).await.unwrap();

        let mut second = sample_recipe("Something Else");
        second.slug = Some("chili".to_string());
        assert!(repo.insert_recipe(second).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_title_validation_is_case_insensitive() {
        let (repo, _dir) = test_repo().await;

        repo.insert_recipe(sample_recipe("Chili")).await.unwrap();

        let err = repo
            .validate_unique_title("CHILI", None)
            .await
            .unwrap_err();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "title");
                assert_eq!(message, "Found recipes with the same title");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn editing_own_title_passes_validation() {
        let (repo, _dir) = test_repo().await;

        let recipe = repo.insert_recipe(sample_recipe("Chili")).await.unwrap();

        repo.validate_unique_title("Chili", Some(recipe.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_preserves_created_at() {
        let (repo, _dir) = test_repo().await;

        let recipe = repo.insert_recipe(sample_recipe("Moqueca")).await.unwrap();
        let created_at = recipe.created_at;

        let updated = repo.update_recipe(recipe).await.unwrap();
        assert_eq!(updated.created_at, created_at);
        assert!(updated.updated_at >= created_at);

        let reread = repo.get_recipe(updated.id).await.unwrap().unwrap();
        assert_eq!(reread.created_at, created_at);
    }

    #[tokio::test]
    async fn published_query_filters_orders_and_labels() {
        let (repo, _dir) = test_repo().await;

        let author = repo
            .insert_author(NewAuthor {
                username: "maria".to_string(),
                first_name: "Maria".to_string(),
                last_name: "Silva".to_string(),
            })
            .await
            .unwrap();

        let mut first = sample_recipe("Pão de Queijo");
        first.is_published = true;
        first.author_id = Some(author.id);
        let first = repo.insert_recipe(first).await.unwrap();

        repo.insert_recipe(sample_recipe("Unpublished Draft"))
            .await
            .unwrap();

        let mut third = sample_recipe("Brigadeiro");
        third.is_published = true;
        let third = repo.insert_recipe(third).await.unwrap();

        let published = repo.fetch_published_with_author_label().await.unwrap();
        assert_eq!(published.len(), 2);

        // Newest first
        assert_eq!(published[0].recipe.id, third.id);
        assert_eq!(published[1].recipe.id, first.id);

        // No author reference -> NULL label (SQLite || semantics)
        assert_eq!(published[0].author_full_name, None);
        assert_eq!(
            published[1].author_full_name.as_deref(),
            Some("Maria Silva (maria)")
        );
    }

    #[tokio::test]
    async fn deleting_category_clears_recipe_reference() {
        let (repo, _dir) = test_repo().await;

        let category = repo.insert_category("Desserts".to_string()).await.unwrap();
        let mut new = sample_recipe("Pudim");
        new.category_id = Some(category.id);
        let recipe = repo.insert_recipe(new).await.unwrap();

        repo.delete_category(category.id).await.unwrap();

        let reread = repo.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(reread.category_id, None);
    }

    #[tokio::test]
    async fn missing_cover_file_does_not_fail_save() {
        let (repo, _dir) = test_repo().await;

        let mut new = sample_recipe("Ghost Cover");
        new.cover = Some("recipes/covers/2024/01/01/missing.png".to_string());

        let recipe = repo.insert_recipe(new).await.unwrap();
        assert!(recipe.cover.is_some());
    }

    #[tokio::test]
    async fn wide_cover_is_downscaled_on_save() {
        let (repo, dir) = test_repo().await;

        let cover = "recipes/covers/2024/01/01/wide.png";
        let cover_path = dir.path().join(cover);
        std::fs::create_dir_all(cover_path.parent().unwrap()).unwrap();
        ImageBuffer::from_pixel(1680, 900, Rgb::<u8>([200, 90, 30]))
            .save(&cover_path)
            .unwrap();

        let mut new = sample_recipe("Wide Cover");
        new.cover = Some(cover.to_string());
        repo.insert_recipe(new).await.unwrap();

        let resized = image::open(&cover_path).unwrap();
        use image::GenericImageView;
        assert_eq!(resized.dimensions(), (840, 450));
    }

    #[tokio::test]
    async fn tag_association_is_replaced_as_a_set() {
        let (repo, _dir) = test_repo().await;

        let recipe = repo.insert_recipe(sample_recipe("Tagged")).await.unwrap();
        let vegan = repo.insert_tag("vegan".to_string()).await.unwrap();
        let quick = repo.insert_tag("quick".to_string()).await.unwrap();

        repo.set_recipe_tags(recipe.id, vec![vegan.id, quick.id])
            .await
            .unwrap();
        let tags = repo.get_recipe_tags(recipe.id).await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["quick", "vegan"]);

        repo.set_recipe_tags(recipe.id, vec![vegan.id]).await.unwrap();
        let tags = repo.get_recipe_tags(recipe.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "vegan");
    }

    #[tokio::test]
    async fn lookup_by_slug() {
        let (repo, _dir) = test_repo().await;

        let recipe = repo
            .insert_recipe(sample_recipe("Bolo de Cenoura"))
            .await
            .unwrap();

        let found = repo
            .get_recipe_by_slug("bolo-de-cenoura")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, recipe.id);

        assert!(repo.get_recipe_by_slug("nope").await.unwrap().is_none());
    }
}
