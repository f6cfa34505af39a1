use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Body for both create and rename.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPayload {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryQuery {
    #[serde(rename = "name__icontains", skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
}

pub struct Categories;

impl Resource for Categories {
    const PATH: &'static str = "categories/";
    type Item = Category;
    type Create = CategoryPayload;
    type Patch = CategoryPayload;
}

/// Look up a category name by id, for display next to foreign keys.
pub fn category_name(categories: &[Category], id: i64) -> Option<&str> {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
}
