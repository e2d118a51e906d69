//! Read-side shapes returned by the API.

use serde::Serialize;

use crate::schema::{Recipe, RecipePart, Tag, User, Uuid};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserRead {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserRead {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

/// Returned once on registration; never carries the password.
#[derive(Serialize, Debug, Clone)]
pub struct UserCreated {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserCreated {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct RecipeMinified {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeMinified {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeRead {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct Subscription {
    #[serde(flatten)]
    pub user: UserRead,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct TokenRead {
    pub auth_token: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::UserRole;

    fn user() -> User {
        User {
            id: 7,
            username: String::from("cook"),
            email: String::from("cook@example.com"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("$argon2id$..."),
            role: UserRole::User,
        }
    }

    #[test]
    fn test_created_user_has_no_password() {
        let value = serde_json::to_value(UserCreated::from(user())).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["username"], json!("cook"));
    }

    #[test]
    fn test_subscription_flattens_user_fields() {
        let subscription = Subscription {
            user: UserRead::from_user(&user(), true),
            recipes: vec![],
            recipes_count: 4,
        };
        let value = serde_json::to_value(subscription).unwrap();

        assert_eq!(value["id"], json!(7));
        assert_eq!(value["is_subscribed"], json!(true));
        assert_eq!(value["recipes_count"], json!(4));
    }

    #[test]
    fn test_recipe_part_serializes_ingredient_id_as_id() {
        let part = RecipePart {
            recipe_id: 1,
            ingredient_id: 12,
            name: String::from("Milk"),
            measurement_unit: String::from("ml"),
            amount: 200,
        };
        let value = serde_json::to_value(part).unwrap();

        assert_eq!(
            value,
            json!({ "id": 12, "name": "Milk", "measurement_unit": "ml", "amount": 200 })
        );
    }
}
