use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Beauty,
    Sports,
    Books,
    Toys,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Fashion,
        Category::Home,
        Category::Beauty,
        Category::Sports,
        Category::Books,
        Category::Toys,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Fashion => "fashion",
            Category::Home => "home",
            Category::Beauty => "beauty",
            Category::Sports => "sports",
            Category::Books => "books",
            Category::Toys => "toys",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| AppError::BadRequest(format!("unknown category `{}`", s.trim())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub quantity: i32,
    pub category: Category,
    pub owner_id: Uuid,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewer_id: Uuid,
    pub rating: i16,
    /// Empty until the reviewer attaches one.
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(" Books ".parse::<Category>().unwrap(), Category::Books);
        assert_eq!("TOYS".parse::<Category>().unwrap(), Category::Toys);
        assert!("groceries".parse::<Category>().is_err());
    }

    #[test]
    fn category_round_trips_through_str() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }
}
