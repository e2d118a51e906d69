use serde_json::{json, Map, Value};
use thiserror::Error;
use warp::{http::StatusCode, reject};

/// Unique constraints whose violation is a caller error rather than a fault.
/// (constraint, field, message)
const UNIQUE_CONSTRAINTS: &[(&str, Option<&str>, &str)] = &[
    (
        "users_username_key",
        Some("username"),
        "A user with that username already exists",
    ),
    (
        "users_email_key",
        Some("email"),
        "A user with that email already exists",
    ),
    ("tags_name_key", Some("name"), "A tag with that name already exists"),
    ("tags_color_key", Some("color"), "A tag with that color already exists"),
    ("tags_slug_key", Some("slug"), "A tag with that slug already exists"),
    (
        "ingredients_name_unit_key",
        None,
        "An ingredient with that name and measurement unit already exists",
    ),
    (
        "follows_user_following_key",
        None,
        "You are already subscribed to this user",
    ),
    (
        "favorites_user_recipe_key",
        None,
        "Recipe is already in favorites",
    ),
    (
        "shopping_carts_user_recipe_key",
        None,
        "Recipe is already in the shopping cart",
    ),
    (
        "recipe_ingredients_recipe_ingredient_key",
        Some("ingredients"),
        "Ingredients must not repeat",
    ),
    ("recipe_tags_recipe_tag_key", Some("tags"), "Tags must not repeat"),
];

#[derive(Debug)]
pub struct QueryError {
    info: String,
    constraint: Option<String>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            constraint: None,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let constraint = if e.is_unique_violation() {
                    e.constraint().map(String::from)
                } else {
                    None
                };

                Self {
                    info: format!("{e}"),
                    constraint,
                }
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        let known = value.constraint.as_deref().and_then(|constraint| {
            UNIQUE_CONSTRAINTS
                .iter()
                .find(|(name, _, _)| *name == constraint)
        });

        match known {
            Some((_, Some(field), message)) => ApiError::field(field, message),
            Some((_, None, message)) => ApiError::Conflict(message.to_string()),
            None => ApiError::Internal(value.info),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(value: CacheError) -> Self {
        ApiError::Internal(value.info)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: &str) -> Self {
        Self::Validation {
            field: Some(field.to_string()),
            message: message.to_string(),
        }
    }

    pub fn invalid(message: &str) -> Self {
        Self::Validation {
            field: None,
            message: message.to_string(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client. Internal details stay in the log.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation {
                field: Some(field),
                message,
            } => {
                let mut body = Map::new();
                body.insert(field.to_owned(), json!([message]));
                Value::Object(body)
            }
            ApiError::Internal(_) => json!({ "detail": "Internal server error" }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl reject::Reject for ApiError {}
