use std::str::FromStr;

use crate::error::ApiError;

/// Query string pairs in request order. Keys may repeat (`?tags=a&tags=b`).
#[derive(Debug, Clone, Default)]
pub struct QueryForm {
    inner: Vec<(String, String)>,
}

impl QueryForm {
    pub fn from_query(raw: &str) -> Self {
        Self {
            inner: url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.pairs()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs()
            .filter(|(k, _)| *k == key)
            .map(|(_, value)| value.to_string())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| ApiError::field(key, "A valid integer is required")),
            None => Ok(None),
        }
    }

    /// `1`/`true` is on; anything else, or absence, is off.
    pub fn get_flag(&self, key: &str) -> bool {
        self.get_str(key)
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_are_kept() {
        let form = QueryForm::from_query("tags=breakfast&tags=lunch&page=2");
        assert_eq!(form.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(form.get_number::<i64>("page").unwrap(), Some(2));
    }

    #[test]
    fn test_values_are_percent_decoded() {
        let form = QueryForm::from_query("name=%D0%BC%D0%BE%D0%BB&x=a+b");
        assert_eq!(form.get_str("name"), Some("мол"));
        assert_eq!(form.get_str("x"), Some("a b"));
    }

    #[test]
    fn test_invalid_number_is_a_field_error() {
        let form = QueryForm::from_query("author=abc");
        assert!(form.get_number::<i32>("author").is_err());
        assert_eq!(form.get_number::<i32>("missing").unwrap(), None);
    }

    #[test]
    fn test_flags() {
        let form = QueryForm::from_query("is_favorited=1&is_in_shopping_cart=0&x=TRUE");
        assert!(form.get_flag("is_favorited"));
        assert!(!form.get_flag("is_in_shopping_cart"));
        assert!(form.get_flag("x"));
        assert!(!form.get_flag("absent"));
    }
}
