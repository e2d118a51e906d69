//! Write-side request bodies and their validation.

use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::{
    error::ApiError,
    schema::{TagColor, Uuid},
    EMAIL_MAX_LENGTH, INGREDIENT_NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH, RECIPE_NAME_MAX_LENGTH,
    TAG_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"))
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"))
}

fn required(field: &str, value: &str, max_length: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::field(field, "This field may not be blank"));
    }
    if value.chars().count() > max_length {
        return Err(ApiError::field(
            field,
            &format!("Ensure this field has no more than {max_length} characters"),
        ));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

impl RecipePayload {
    /// Checks everything that can be checked without the database.
    /// Existence of the referenced ingredients and tags is verified on write.
    pub fn validate(&self, require_image: bool) -> Result<(), ApiError> {
        required("name", &self.name, RECIPE_NAME_MAX_LENGTH)?;
        required("text", &self.text, usize::MAX)?;

        if self.cooking_time < 1 {
            return Err(ApiError::field(
                "cooking_time",
                "Ensure this value is greater than or equal to 1",
            ));
        }

        if require_image && self.image.is_none() {
            return Err(ApiError::field("image", "This field is required"));
        }

        if self.ingredients.is_empty() {
            return Err(ApiError::field("ingredients", "Add at least one ingredient"));
        }
        if self.ingredients.iter().any(|part| part.amount < 1) {
            return Err(ApiError::field(
                "ingredients",
                "Ingredient amount must be at least 1",
            ));
        }
        let mut seen = HashSet::new();
        if !self.ingredients.iter().all(|part| seen.insert(part.id)) {
            return Err(ApiError::field("ingredients", "Ingredients must not repeat"));
        }

        if self.tags.is_empty() {
            return Err(ApiError::field("tags", "Add at least one tag"));
        }
        let mut seen = HashSet::new();
        if !self.tags.iter().all(|tag| seen.insert(*tag)) {
            return Err(ApiError::field("tags", "Tags must not repeat"));
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<Uuid> {
        self.ingredients.iter().map(|part| part.id).collect()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserPayload {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        required("email", &self.email, EMAIL_MAX_LENGTH)?;
        if !self.email.contains('@') {
            return Err(ApiError::field("email", "Enter a valid email address"));
        }

        required("username", &self.username, USERNAME_MAX_LENGTH)?;
        if !username_pattern().is_match(&self.username) {
            return Err(ApiError::field(
                "username",
                "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_",
            ));
        }

        required("first_name", &self.first_name, USERNAME_MAX_LENGTH)?;
        required("last_name", &self.last_name, USERNAME_MAX_LENGTH)?;
        validate_password("password", &self.password)
    }
}

pub fn validate_password(field: &str, password: &str) -> Result<(), ApiError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ApiError::field(
            field,
            &format!("This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters"),
        ));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone)]
pub struct PasswordPayload {
    pub new_password: String,
    pub current_password: String,
}

impl PasswordPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        required("current_password", &self.current_password, usize::MAX)?;
        validate_password("new_password", &self.new_password)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagPayload {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagPayload {
    pub fn color(&self) -> Result<TagColor, ApiError> {
        TagColor::try_from(self.color.trim().to_owned())
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        required("name", &self.name, TAG_NAME_MAX_LENGTH)?;
        required("slug", &self.slug, TAG_SLUG_MAX_LENGTH)?;
        if !slug_pattern().is_match(&self.slug) {
            return Err(ApiError::field(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens",
            ));
        }
        self.color().map(|_| ())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientPayload {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        required("name", &self.name, INGREDIENT_NAME_MAX_LENGTH)?;
        required(
            "measurement_unit",
            &self.measurement_unit,
            INGREDIENT_NAME_MAX_LENGTH,
        )
    }
}

/// A user may not subscribe to themselves.
pub fn validate_follow(user_id: Uuid, following_id: Uuid) -> Result<(), ApiError> {
    if user_id == following_id {
        return Err(ApiError::invalid("You can not subscribe to yourself"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> RecipePayload {
        RecipePayload {
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
            image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
            ingredients: vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 2 },
            ],
            tags: vec![1],
        }
    }

    fn field_of(error: ApiError) -> Option<String> {
        match error {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_recipe_passes() {
        assert!(recipe().validate(true).is_ok());
    }

    #[test]
    fn test_cooking_time_must_be_positive() {
        for cooking_time in [0, -5] {
            let payload = RecipePayload {
                cooking_time,
                ..recipe()
            };
            let error = payload.validate(true).unwrap_err();
            assert_eq!(field_of(error).as_deref(), Some("cooking_time"));

            // Same rule on update, where the image may be omitted.
            let payload = RecipePayload {
                cooking_time,
                image: None,
                ..recipe()
            };
            assert!(payload.validate(false).is_err());
        }
    }

    #[test]
    fn test_image_only_required_on_create() {
        let payload = RecipePayload {
            image: None,
            ..recipe()
        };
        assert_eq!(
            field_of(payload.validate(true).unwrap_err()).as_deref(),
            Some("image")
        );
        assert!(payload.validate(false).is_ok());
    }

    #[test]
    fn test_repeated_ingredient_is_rejected() {
        let payload = RecipePayload {
            ingredients: vec![
                IngredientAmount { id: 3, amount: 1 },
                IngredientAmount { id: 3, amount: 5 },
            ],
            ..recipe()
        };
        assert_eq!(
            field_of(payload.validate(true).unwrap_err()).as_deref(),
            Some("ingredients")
        );
    }

    #[test]
    fn test_empty_collections_are_rejected() {
        let payload = RecipePayload {
            ingredients: vec![],
            ..recipe()
        };
        assert!(payload.validate(true).is_err());

        let payload = RecipePayload {
            tags: vec![],
            ..recipe()
        };
        assert!(payload.validate(true).is_err());

        let payload = RecipePayload {
            tags: vec![2, 2],
            ..recipe()
        };
        assert!(payload.validate(true).is_err());
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let payload = RecipePayload {
            ingredients: vec![IngredientAmount { id: 1, amount: 0 }],
            ..recipe()
        };
        assert!(payload.validate(true).is_err());
    }

    #[test]
    fn test_self_follow_is_rejected() {
        assert!(validate_follow(4, 4).is_err());
        assert!(validate_follow(4, 5).is_ok());
    }

    #[test]
    fn test_user_payload_validation() {
        let user = UserPayload {
            email: String::from("cook@example.com"),
            username: String::from("cook.42"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("long enough"),
        };
        assert!(user.validate().is_ok());

        let bad_name = UserPayload {
            username: String::from("no spaces please"),
            ..user.clone()
        };
        assert_eq!(
            field_of(bad_name.validate().unwrap_err()).as_deref(),
            Some("username")
        );

        let short_password = UserPayload {
            password: String::from("short"),
            ..user.clone()
        };
        assert_eq!(
            field_of(short_password.validate().unwrap_err()).as_deref(),
            Some("password")
        );

        let bad_email = UserPayload {
            email: String::from("cook.example.com"),
            ..user
        };
        assert_eq!(
            field_of(bad_email.validate().unwrap_err()).as_deref(),
            Some("email")
        );
    }

    #[test]
    fn test_tag_payload_from_json() {
        let tag: TagPayload =
            serde_json::from_str(r##"{"name": "Breakfast", "color": "#008000", "slug": "breakfast"}"##)
                .unwrap();
        assert!(tag.validate().is_ok());

        assert_eq!(tag.color().unwrap().as_str(), "#008000");

        let bad_slug = TagPayload {
            slug: String::from("break fast"),
            ..tag
        };
        assert!(bad_slug.validate().is_err());
    }

    #[test]
    fn test_unknown_tag_color_is_a_field_error() {
        let tag: TagPayload =
            serde_json::from_str(r#"{"name": "Breakfast", "color": "purple", "slug": "breakfast"}"#)
                .unwrap();

        let error = tag.validate().unwrap_err();
        assert_eq!(
            error.body(),
            serde_json::json!({ "color": ["Invalid variant"] })
        );
    }
}
