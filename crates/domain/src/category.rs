//! Category data as seen from the external catalog.

use common::CategoryId;
use serde::{Deserialize, Serialize};

/// A catalog category.
///
/// The catalog itself is an external collaborator; the core only needs a
/// category's identity and its root for the evidence snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Parent category, absent for root categories.
    pub parent_id: Option<CategoryId>,
    pub name: String,
}

impl Category {
    /// Returns the root category id (itself when parentless).
    pub fn root_id(&self) -> CategoryId {
        self.parent_id.unwrap_or(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_of_a_root_category_is_itself() {
        let root = Category {
            id: CategoryId::new(1),
            parent_id: None,
            name: "apparel".to_string(),
        };
        assert_eq!(root.root_id(), CategoryId::new(1));
    }

    #[test]
    fn root_of_a_child_is_its_parent() {
        let child = Category {
            id: CategoryId::new(11),
            parent_id: Some(CategoryId::new(1)),
            name: "jackets".to_string(),
        };
        assert_eq!(child.root_id(), CategoryId::new(1));
    }
}
