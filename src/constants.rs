pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Number of recipes embedded in a subscription entry when `recipes_limit` is absent.
pub const SUBSCRIPTION_RECIPES_LIMIT: i64 = 3;

pub const TAG_COLORS: &[(&str, &str)] = &[
    ("#0000FF", "Blue"),
    ("#FF0000", "Red"),
    ("#008000", "Green"),
    ("#FFFF00", "Yellow"),
];

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_NAME_MAX_LENGTH: usize = 30;
pub const TAG_SLUG_MAX_LENGTH: usize = 200;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Upper bound for request bodies; recipe images travel inline as base64.
pub const MAX_BODY_SIZE: u64 = 1024 * 1024 * 10;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
