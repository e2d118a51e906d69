use serde::{Deserialize, Serialize};

use crate::{error::ApiError, form::QueryForm, MAX_PAGE_SIZE};

/// Page-number pagination parameters taken from `?page=&limit=`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    offset: i64,
    path: String,
    query: Vec<(String, String)>,
}

impl PageRequest {
    pub fn from_form(path: &str, form: &QueryForm, default_limit: i64) -> Result<Self, ApiError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        if page < 1 {
            return Err(ApiError::NotFound(String::from("Invalid page")));
        }

        let limit = form
            .get_number::<i64>("limit")?
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_SIZE);

        // Pages past what an OFFSET can address do not exist.
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| ApiError::NotFound(String::from("Invalid page")))?;

        let query = form
            .pairs()
            .filter(|(key, _)| *key != "page")
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            page,
            limit,
            offset,
            path: path.to_string(),
            query,
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    fn link(&self, page: i64) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.query {
            serializer.append_pair(key, value);
        }
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }

        let query = serializer.finish();
        if query.is_empty() {
            self.path.to_owned()
        } else {
            format!("{}?{}", self.path, query)
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: &PageRequest) -> Self {
        let next = if request.offset().saturating_add(rows.len() as i64) < total_rows {
            Some(request.link(request.page + 1))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.link(request.page - 1))
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    /// Replaces the reported `count`. Recipe lists report the size of the
    /// requester's shopping cart here (zero when anonymous).
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> PageRequest {
        PageRequest::from_form("/api/recipes", &QueryForm::from_query(query), 6).unwrap()
    }

    #[test]
    fn test_defaults() {
        let request = request("");
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 6);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(request("limit=0").limit, 1);
        assert_eq!(request("limit=5000").limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_zero_is_invalid() {
        let form = QueryForm::from_query("page=0");
        assert!(PageRequest::from_form("/api/recipes", &form, 6).is_err());
    }

    #[test]
    fn test_unaddressable_page_is_invalid() {
        let form = QueryForm::from_query("page=9223372036854775807");
        assert!(matches!(
            PageRequest::from_form("/api/recipes", &form, 6),
            Err(ApiError::NotFound(_))
        ));

        let form = QueryForm::from_query("page=9223372036854775807&limit=1");
        let request = PageRequest::from_form("/api/recipes", &form, 6).unwrap();
        assert_eq!(request.offset(), i64::MAX - 1);
    }

    #[test]
    fn test_links_keep_filters() {
        let request = request("tags=lunch&page=2&limit=2");
        let page = PageContext::from_rows(vec![3, 4], 5, &request);

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes?tags=lunch&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes?tags=lunch&limit=2")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let request = request("page=3&limit=2");
        let page = PageContext::from_rows(vec![5], 5, &request);
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn test_count_override() {
        let page = PageContext::from_rows(vec![1, 2], 2, &request("")).with_count(0);
        assert_eq!(page.count, 0);
        assert_eq!(page.results, vec![1, 2]);
    }
}
