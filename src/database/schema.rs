use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, TAG_COLORS};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// Colour of a tag. Stored as the hex string, one of [`TAG_COLORS`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct TagColor(String);

impl TryFrom<String> for TagColor {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.to_uppercase();
        match TAG_COLORS.iter().find(|(hex, _)| *hex == value) {
            Some((hex, _)) => Ok(Self(hex.to_string())),
            None => Err(ApiError::field("color", "Invalid variant")),
        }
    }
}

impl From<TagColor> for String {
    fn from(value: TagColor) -> Self {
        value.0
    }
}

impl TagColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: TagColor,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Recipe row as selected by the paginated list query.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

/// An `IngredientInRecipe` join row joined with its ingredient.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipePart {
    #[serde(skip)]
    pub recipe_id: Uuid,
    #[serde(rename = "id")]
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A `TagsInRecipe` join row joined with its tag.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedRecipeTag {
    pub recipe_id: Uuid,
    #[sqlx(flatten)]
    pub tag: Tag,
}

/// The two user-recipe bookmark relations. Same shape, different table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookmarkKind {
    Favorite,
    ShoppingCart,
}

impl BookmarkKind {
    pub fn table(&self) -> &'static str {
        match self {
            BookmarkKind::Favorite => "favorites",
            BookmarkKind::ShoppingCart => "shopping_carts",
        }
    }

    pub fn already_added(&self) -> &'static str {
        match self {
            BookmarkKind::Favorite => "Recipe is already in favorites",
            BookmarkKind::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    pub fn not_added(&self) -> &'static str {
        match self {
            BookmarkKind::Favorite => "Recipe is not in favorites",
            BookmarkKind::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

/// One line of the aggregated shopping list.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}
