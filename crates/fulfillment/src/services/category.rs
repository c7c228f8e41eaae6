//! Category lookup against the external catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use common::CategoryId;
use domain::Category;

use crate::services::AdapterError;

/// Lookup into the catalog service.
///
/// The catalog is an external collaborator; the core only resolves a
/// category id into its identity and root for the evidence snapshot.
#[async_trait]
pub trait CategoryDirectory: Send + Sync {
    /// Resolves a category by id. `Ok(None)` means the catalog answered and
    /// the id does not exist.
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, AdapterError>;
}

/// Fixed in-process category tree.
///
/// Stands in for the catalog service in the binary and in tests; the real
/// catalog owns the data.
#[derive(Debug, Clone, Default)]
pub struct StaticCategories {
    categories: HashMap<CategoryId, Category>,
}

impl StaticCategories {
    /// Builds a directory from a flat list of categories.
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|category| (category.id, category))
                .collect(),
        }
    }
}

#[async_trait]
impl CategoryDirectory for StaticCategories {
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, AdapterError> {
        Ok(self.categories.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_categories() {
        let directory = StaticCategories::new([
            Category {
                id: CategoryId::new(1),
                parent_id: None,
                name: "apparel".to_string(),
            },
            Category {
                id: CategoryId::new(11),
                parent_id: Some(CategoryId::new(1)),
                name: "jackets".to_string(),
            },
        ]);

        let child = directory
            .category(CategoryId::new(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(child.root_id(), CategoryId::new(1));

        assert!(directory
            .category(CategoryId::new(99))
            .await
            .unwrap()
            .is_none());
    }
}
