//! Helpers over submitted form and query values
//!
//! Handlers extract `Form<HashMap<String, String>>` and/or
//! `Query<HashMap<String, String>>` and wrap them in [`FormValues`]. Posted
//! values win over query values, and blank values count as missing.

use std::collections::HashMap;

use crate::crud::{DateRange, FilterValue, Row};
use crate::error::{Error, Result};

/// Posted and query-string values of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    posts: HashMap<String, String>,
    gets: HashMap<String, String>,
}

impl FormValues {
    pub fn new(posts: HashMap<String, String>, gets: HashMap<String, String>) -> Self {
        Self { posts, gets }
    }

    pub fn from_query(gets: HashMap<String, String>) -> Self {
        Self::new(HashMap::new(), gets)
    }

    pub fn from_form(posts: HashMap<String, String>) -> Self {
        Self::new(posts, HashMap::new())
    }

    /// Override a query value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.gets.insert(name.into(), value.into());
    }

    /// First non-empty value, posted before query
    pub fn get(&self, name: &str) -> Option<&str> {
        [&self.posts, &self.gets]
            .into_iter()
            .filter_map(|values| values.get(name))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// A value that must be present
    pub fn required(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::ValidationError(format!("{} is required", name)))
    }

    /// Integer value; `default` when missing or not a number
    pub fn int_value(&self, name: &str, default: i64) -> i64 {
        self.get(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Date range posted as `{"start": "...", "end": "..."}`
    pub fn date_range(&self, name: &str) -> Result<DateRange> {
        DateRange::parse_json(self.get(name).unwrap_or(""))
    }

    /// SET list of the named fields that were submitted non-empty
    pub fn update_map(&self, names: &[&str]) -> Row {
        names
            .iter()
            .filter_map(|name| {
                self.get(name)
                    .map(|value| (name.to_string(), FilterValue::from(value)))
            })
            .collect()
    }
}
