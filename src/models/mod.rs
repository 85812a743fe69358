mod author;
mod category;
mod recipe;
mod tag;

pub use author::{Author, NewAuthor};
pub use category::Category;
pub use recipe::{NewRecipe, PublishedRecipe, Recipe};
pub use tag::Tag;
