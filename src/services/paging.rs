use sea_orm::{
    ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select,
    sea_query::{Expr, Func, SimpleExpr},
};

use crate::{error::AppResult, response::Meta, routes::params::Pagination};

/// Counts the filtered query, then fetches one page of it.
///
/// Ordering is left to the caller. A page past the end yields no items but the
/// metadata still reports the real total.
pub async fn paginate<E, C>(
    select: Select<E>,
    conn: &C,
    pagination: &Pagination,
    default_page_size: i64,
) -> AppResult<(Vec<E::Model>, Meta)>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: ConnectionTrait,
{
    let (page, per_page, offset) = pagination.normalize_with(default_page_size);
    let total = select.clone().count(conn).await? as i64;

    let items = if offset >= total {
        Vec::new()
    } else {
        select
            .limit(per_page as u64)
            .offset(offset as u64)
            .all(conn)
            .await?
    };

    Ok((items, Meta::new(page, per_page, total)))
}

/// `%value%` lowercased, for portable case-insensitive `LIKE`.
pub fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

/// `lower(table.column) LIKE pattern`, qualified so it stays unambiguous in joins.
pub fn contains_ci<E: EntityTrait>(column: E::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((E::default(), column)))).like(pattern)
}
