use serde::Deserialize;
use utoipa::ToSchema;

pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(PAGE_SIZE).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

// Query strings are flat, so the page fields are repeated rather than
// flattened (serde_urlencoded cannot flatten numeric fields).

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl SearchQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryQuery {
    pub category: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CategoryQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, PAGE_SIZE, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));
        let p = Pagination {
            page: Some(-2),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));
    }
}
