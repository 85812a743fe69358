use serde::{Deserialize, Serialize};

/// User identity row owned by the external auth subsystem. Only the fields
/// the published-recipe author label joins against are carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}
