use std::collections::HashMap;
use serde::Serialize;
use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Parse query parameters from a URI string.
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).cloned()
}

/// Extract `limit` and `page`, clamped to what the server will serve:
/// limit in 1..=MAX_PAGE_SIZE, page at least 1.
pub fn page_params(params: &HashMap<String, String>) -> (usize, usize) {
    let limit = params
        .get("limit")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = params
        .get("page")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    (limit, page)
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Pagination {
    pub current: usize,
    pub pages: usize,
    pub total: usize,
}

/// Slice one page out of an already-ordered listing, skipping
/// `(page-1)*limit` records.
pub fn paginate<T>(items: Vec<T>, limit: usize, page: usize) -> (Vec<T>, Pagination) {
    let total = items.len();
    let pages = total.div_ceil(limit);
    let page_items = items
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();
    (
        page_items,
        Pagination {
            current: page,
            pages,
            total,
        },
    )
}
