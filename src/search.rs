//! Ranked, paginated ID queries for list endpoints.
//!
//! Every plan renders to `SELECT <key> ... ORDER BY <score> DESC, <key> LIMIT
//! .. OFFSET ..` where the score is a fixed weighted sum of `pg_trgm`
//! similarities. The primary key is always the final sort key so repeated
//! calls over unchanged rows return the same order.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{error::AppError, users::repo_types::Role};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Zero-based page of `limit` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(0);
        if page < 0 {
            return Err(AppError::BadRequest("page must not be negative".into()));
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.limit)
    }
}

/// `?page=&limit=` shared by list endpoints without their own filters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RankTerm {
    weight: f64,
    expr: &'static str,
    term: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Static(&'static str),
    RoleIs(Role),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    from: &'static str,
    key: &'static str,
    conditions: Vec<Condition>,
    rank: Vec<RankTerm>,
    page: Page,
}

fn non_empty(term: Option<&str>) -> Option<String> {
    term.map(str::trim).filter(|t| !t.is_empty()).map(String::from)
}

const PUBLIC_PROFILE_CONDITIONS: &[&str] = &[
    "u.status = 'normal'",
    "coalesce(u.first_name, '') <> ''",
    "coalesce(u.last_name, '') <> ''",
    "u.birth_date IS NOT NULL",
    "coalesce(u.gender, '') <> ''",
    "coalesce(u.location, '') <> ''",
    "cardinality(u.interests) > 0",
];

impl SearchPlan {
    /// Complete profiles with normal status, ranked by
    /// `0.5 * sim(first_name) + 0.5 * sim(last_name)`.
    pub fn public_users(first_name: Option<&str>, last_name: Option<&str>, page: Page) -> Self {
        let first = non_empty(first_name);
        let last = non_empty(last_name);
        let rank = if first.is_some() || last.is_some() {
            vec![
                RankTerm {
                    weight: 0.5,
                    expr: "u.first_name",
                    term: first.unwrap_or_default(),
                },
                RankTerm {
                    weight: 0.5,
                    expr: "u.last_name",
                    term: last.unwrap_or_default(),
                },
            ]
        } else {
            Vec::new()
        };
        Self {
            from: "users u",
            key: "u.id",
            conditions: PUBLIC_PROFILE_CONDITIONS
                .iter()
                .copied()
                .map(Condition::Static)
                .collect(),
            rank,
            page,
        }
    }

    /// Users holding `role`, ranked by similarity to "first last".
    pub fn listers(role: Role, name: Option<&str>, page: Page) -> Self {
        Self {
            from: "users u JOIN user_roles r ON r.user_id = u.id",
            key: "u.id",
            conditions: vec![Condition::RoleIs(role)],
            rank: non_empty(name)
                .map(|term| {
                    vec![RankTerm {
                        weight: 1.0,
                        expr: "concat_ws(' ', u.first_name, u.last_name)",
                        term,
                    }]
                })
                .unwrap_or_default(),
            page,
        }
    }

    /// Properties ranked by similarity to the one-line address.
    pub fn properties(address: Option<&str>, page: Page) -> Self {
        Self {
            from: "properties p",
            key: "p.id",
            conditions: Vec::new(),
            rank: non_empty(address)
                .map(|term| {
                    vec![RankTerm {
                        weight: 1.0,
                        expr: "concat_ws(', ', p.address1, p.address2, p.city, p.zipcode, p.country)",
                        term,
                    }]
                })
                .unwrap_or_default(),
            page,
        }
    }

    /// Communities ranked by name, description, or `0.4 * name + 0.6 *
    /// description` when both are given.
    pub fn communities(name: Option<&str>, description: Option<&str>, page: Page) -> Self {
        let rank = match (non_empty(name), non_empty(description)) {
            (Some(name), Some(desc)) => vec![
                RankTerm {
                    weight: 0.4,
                    expr: "c.name",
                    term: name,
                },
                RankTerm {
                    weight: 0.6,
                    expr: "c.description",
                    term: desc,
                },
            ],
            (Some(name), None) => vec![RankTerm {
                weight: 1.0,
                expr: "c.name",
                term: name,
            }],
            (None, Some(desc)) => vec![RankTerm {
                weight: 1.0,
                expr: "c.description",
                term: desc,
            }],
            (None, None) => Vec::new(),
        };
        Self {
            from: "communities c",
            key: "c.id",
            conditions: Vec::new(),
            rank,
            page,
        }
    }

    pub fn is_ranked(&self) -> bool {
        !self.rank.is_empty()
    }

    pub fn query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", self.key, self.from));

        for (i, cond) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match cond {
                Condition::Static(sql) => {
                    qb.push(*sql);
                }
                Condition::RoleIs(role) => {
                    qb.push("r.role = ").push_bind(*role);
                }
            }
        }

        qb.push(" ORDER BY ");
        if self.is_ranked() {
            qb.push("(");
            for (i, term) in self.rank.iter().enumerate() {
                if i > 0 {
                    qb.push(" + ");
                }
                qb.push(format!("{:.1} * similarity({}, ", term.weight, term.expr))
                    .push_bind(term.term.clone())
                    .push(")");
            }
            qb.push(") DESC, ");
        }
        qb.push(self.key).push(" ASC");

        qb.push(" LIMIT ")
            .push_bind(self.page.limit)
            .push(" OFFSET ")
            .push_bind(self.page.offset());
        qb
    }

    pub async fn fetch_ids<T>(&self, db: &PgPool) -> sqlx::Result<Vec<T>>
    where
        T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + Send + Unpin,
    {
        self.query().build_query_scalar::<T>().fetch_all(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(plan: &SearchPlan) -> String {
        plan.query().sql().to_string()
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None).unwrap(), Page::default());
        assert_eq!(Page::new(Some(2), Some(500)).unwrap().limit, MAX_LIMIT);
        assert_eq!(Page::new(Some(0), Some(0)).unwrap().limit, 1);
        assert!(matches!(
            Page::new(Some(-1), None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn consecutive_pages_tile_a_double_page() {
        for n in [1_i64, 7, 20, 50] {
            let first = Page::new(Some(0), Some(n)).unwrap();
            let second = Page::new(Some(1), Some(n)).unwrap();
            let double = Page::new(Some(0), Some(2 * n)).unwrap();
            assert_eq!(first.offset(), double.offset());
            assert_eq!(second.offset(), first.offset() + first.limit);
            assert_eq!(first.limit + second.limit, double.limit);
        }
    }

    #[test]
    fn unfiltered_plans_use_primary_key_order() {
        let page = Page::default();
        assert_eq!(
            sql(&SearchPlan::properties(None, page)),
            "SELECT p.id FROM properties p ORDER BY p.id ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(
            sql(&SearchPlan::properties(Some("   "), page)),
            "SELECT p.id FROM properties p ORDER BY p.id ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(
            sql(&SearchPlan::communities(None, None, page)),
            "SELECT c.id FROM communities c ORDER BY c.id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn property_address_similarity() {
        let plan = SearchPlan::properties(Some("12 shore road"), Page::default());
        assert_eq!(
            sql(&plan),
            "SELECT p.id FROM properties p ORDER BY (1.0 * similarity(concat_ws(', ', p.address1, p.address2, p.city, p.zipcode, p.country), $1)) DESC, p.id ASC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn community_weights() {
        let page = Page::default();
        let both = sql(&SearchPlan::communities(Some("lake"), Some("quiet"), page));
        assert!(both.contains(
            "ORDER BY (0.4 * similarity(c.name, $1) + 0.6 * similarity(c.description, $2)) DESC, c.id ASC"
        ));

        let name_only = sql(&SearchPlan::communities(Some("lake"), None, page));
        assert!(name_only.contains("ORDER BY (1.0 * similarity(c.name, $1)) DESC, c.id ASC"));

        let desc_only = sql(&SearchPlan::communities(None, Some("quiet"), page));
        assert!(desc_only.contains("ORDER BY (1.0 * similarity(c.description, $1)) DESC"));
    }

    #[test]
    fn public_users_only_complete_normal_profiles() {
        let s = sql(&SearchPlan::public_users(None, None, Page::default()));
        assert!(s.starts_with("SELECT u.id FROM users u WHERE u.status = 'normal' AND "));
        assert!(s.contains("cardinality(u.interests) > 0"));
        assert!(s.ends_with("ORDER BY u.id ASC LIMIT $1 OFFSET $2"));

        let ranked = sql(&SearchPlan::public_users(Some("Ivan"), None, Page::default()));
        assert!(ranked.contains(
            "ORDER BY (0.5 * similarity(u.first_name, $1) + 0.5 * similarity(u.last_name, $2)) DESC, u.id ASC"
        ));
    }

    #[test]
    fn listers_filter_by_role_then_rank_by_full_name() {
        let s = sql(&SearchPlan::listers(Role::Lister, Some("ivan p"), Page::default()));
        assert_eq!(
            s,
            "SELECT u.id FROM users u JOIN user_roles r ON r.user_id = u.id WHERE r.role = $1 ORDER BY (1.0 * similarity(concat_ws(' ', u.first_name, u.last_name), $2)) DESC, u.id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn plans_are_deterministic() {
        let a = SearchPlan::communities(Some("lake"), Some("quiet"), Page::default());
        let b = SearchPlan::communities(Some(" lake "), Some("quiet"), Page::default());
        assert_eq!(a, b);
        assert_eq!(sql(&a), sql(&b));
    }
}
