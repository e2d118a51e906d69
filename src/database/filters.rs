//! Query-string driven predicates for the recipe and ingredient lists.

use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::ApiError,
    form::QueryForm,
    schema::{BookmarkKind, Uuid},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecipeFilter {
    Author(Uuid),
    /// Recipe carries at least one of the slugs.
    Tags(Vec<String>),
    /// Recipe is bookmarked by the given user.
    Bookmarked(BookmarkKind, Uuid),
}

impl RecipeFilter {
    /// Builds the active filters. A bookmark switch only applies when it is on
    /// and the requester is known; otherwise it filters nothing.
    pub fn from_form(form: &QueryForm, requester: Option<Uuid>) -> Result<Vec<Self>, ApiError> {
        let mut filters = vec![];

        if let Some(author) = form.get_number::<Uuid>("author")? {
            filters.push(Self::Author(author));
        }

        let slugs = form.get_all("tags");
        if !slugs.is_empty() {
            filters.push(Self::Tags(slugs));
        }

        if let (true, Some(user_id)) = (form.get_flag("is_favorited"), requester) {
            filters.push(Self::Bookmarked(BookmarkKind::Favorite, user_id));
        }

        if let (true, Some(user_id)) = (form.get_flag("is_in_shopping_cart"), requester) {
            filters.push(Self::Bookmarked(BookmarkKind::ShoppingCart, user_id));
        }

        Ok(filters)
    }

    /// Appends ` AND <predicate>` against the recipe alias `r`.
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            RecipeFilter::Author(author) => {
                builder.push(" AND r.author_id = ");
                builder.push_bind(*author);
            }
            RecipeFilter::Tags(slugs) => {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
                );
                builder.push_bind(slugs.to_owned());
                builder.push("))");
            }
            RecipeFilter::Bookmarked(kind, user_id) => {
                builder.push(format!(
                    " AND EXISTS (SELECT 1 FROM {} b WHERE b.recipe_id = r.id AND b.user_id = ",
                    kind.table()
                ));
                builder.push_bind(*user_id);
                builder.push(")");
            }
        }
    }
}

/// `ILIKE` pattern matching names that start with `prefix`, wildcards in the
/// input taken literally.
pub fn ingredient_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Same predicate as [`ingredient_prefix_pattern`], evaluated in memory for
/// cached ingredient lists.
pub fn name_has_prefix(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}
