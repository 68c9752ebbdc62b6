// src/query.rs

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ParseClient;
use crate::error::{ParseError, ResourceError};
use crate::model::ParseModel;
use crate::resource::Resource;

/// A query against the collection of model `M`.
///
/// Built by chaining calls on an owned value; a terminal operation (`all`, `first`,
/// `count`) consumes it. Predicates are kept in a flat object, so a later predicate on a
/// field replaces an earlier one.
///
/// ```rust
/// use parse_resource::{parse_model, ParseModel, Validatable};
///
/// parse_model! {
///     pub struct Post("Post") {
///         author: String,
///     }
/// }
/// impl Validatable for Post {}
///
/// let query = Post::where_eq("author", "B").order("createdAt").limit(2);
/// let params = query.build_query_params();
/// assert!(params.contains(&("where".to_string(), r#"{"author":"B"}"#.to_string())));
/// assert!(params.contains(&("limit".to_string(), "2".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct Query<M> {
    conditions: Map<String, Value>,
    limit: Option<usize>,
    skip: Option<usize>,
    order: Option<String>,
    include: Option<String>,
    count_only: bool,
    // First predicate value that failed to serialize; reported by the terminal operation.
    error: Option<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: ParseModel> Default for Query<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ParseModel> Query<M> {
    pub fn new() -> Self {
        Query {
            conditions: Map::new(),
            limit: None,
            skip: None,
            order: None,
            include: None,
            count_only: false,
            error: None,
            _model: PhantomData,
        }
    }

    /// The predicates accumulated so far, as they will be sent in `where`.
    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    fn predicate_value<V: Serialize>(&mut self, key: &str, value: V) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(json_val) => Some(json_val),
            Err(e) => {
                log::warn!(
                    "Dropping {} query predicate on '{}': {}",
                    M::CLASS_NAME,
                    key,
                    e
                );
                self.error
                    .get_or_insert_with(|| format!("predicate on '{}': {}", key, e));
                None
            }
        }
    }

    // "field": value
    fn add_simple_condition<V: Serialize>(mut self, key: &str, value: V) -> Self {
        if let Some(json_val) = self.predicate_value(key, value) {
            self.conditions.insert(key.to_string(), json_val);
        }
        self
    }

    // "field": {"$op": value}
    fn add_operator_condition<V: Serialize>(mut self, key: &str, operator: &str, value: V) -> Self {
        if let Some(json_val) = self.predicate_value(key, value) {
            let mut op_map = Map::new();
            op_map.insert(operator.to_string(), json_val);
            self.conditions
                .insert(key.to_string(), Value::Object(op_map));
        }
        self
    }

    /// Constrains `key` to equal `value`.
    pub fn where_eq<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_simple_condition(key, value)
    }

    /// Adds an equality constraint per pair.
    pub fn where_all<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        pairs
            .into_iter()
            .fold(self, |query, (key, value)| query.where_eq(key.as_ref(), value))
    }

    pub fn not_equal_to<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_operator_condition(key, "$ne", value)
    }

    pub fn greater_than<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_operator_condition(key, "$gt", value)
    }

    pub fn greater_than_or_equal_to<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_operator_condition(key, "$gte", value)
    }

    pub fn less_than<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_operator_condition(key, "$lt", value)
    }

    pub fn less_than_or_equal_to<V: Serialize>(self, key: &str, value: V) -> Self {
        self.add_operator_condition(key, "$lte", value)
    }

    /// Matches objects whose `key` is one of `values`.
    pub fn contained_in<V: Serialize>(self, key: &str, values: Vec<V>) -> Self {
        self.add_operator_condition(key, "$in", values)
    }

    pub fn not_contained_in<V: Serialize>(self, key: &str, values: Vec<V>) -> Self {
        self.add_operator_condition(key, "$nin", values)
    }

    /// Matches array fields holding every one of `values`.
    pub fn contains_all<V: Serialize>(self, key: &str, values: Vec<V>) -> Self {
        self.add_operator_condition(key, "$all", values)
    }

    pub fn exists(self, key: &str) -> Self {
        self.add_operator_condition(key, "$exists", true)
    }

    pub fn does_not_exist(self, key: &str) -> Self {
        self.add_operator_condition(key, "$exists", false)
    }

    /// Matches string fields beginning with `prefix`, taken literally.
    pub fn starts_with(self, key: &str, prefix: &str) -> Self {
        self.add_operator_condition(key, "$regex", format!("^{}", regex::escape(prefix)))
    }

    /// Expands the pointer in `key` into the full related object.
    pub fn include_object(mut self, key: &str) -> Self {
        let current_include = self.include.take().unwrap_or_default();
        let mut include_parts: Vec<&str> = current_include
            .split(',')
            .filter(|s| !s.is_empty())
            .collect();
        include_parts.push(key);
        include_parts.sort_unstable();
        include_parts.dedup();
        self.include = Some(include_parts.join(","));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = Some(count);
        self
    }

    /// Sorts ascending by `key`, replacing any previous order.
    pub fn order(mut self, key: &str) -> Self {
        self.order = Some(key.to_string());
        self
    }

    pub fn order_descending(mut self, key: &str) -> Self {
        self.order = Some(format!("-{}", key));
        self
    }

    /// The query string parameters this query compiles to.
    pub fn build_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.conditions.is_empty() {
            if let Ok(where_json) = serde_json::to_string(&self.conditions) {
                params.push(("where".to_string(), where_json));
            }
        }
        if let Some(limit_val) = self.limit {
            params.push(("limit".to_string(), limit_val.to_string()));
        }
        if let Some(skip_val) = self.skip {
            params.push(("skip".to_string(), skip_val.to_string()));
        }
        if let Some(order_val) = &self.order {
            params.push(("order".to_string(), order_val.clone()));
        }
        if let Some(include_val) = &self.include {
            params.push(("include".to_string(), include_val.clone()));
        }
        if self.count_only {
            params.push(("count".to_string(), "1".to_string()));
        }
        params
    }

    fn check(&self) -> Result<(), ResourceError> {
        match &self.error {
            Some(message) => Err(ResourceError::Transport(ParseError::SerializationError(
                message.clone(),
            ))),
            None => Ok(()),
        }
    }

    /// Every matching object, at most `limit` of them.
    pub async fn all(self, client: &ParseClient) -> Result<Vec<Resource<M>>, ResourceError> {
        self.check()?;
        let params = self.build_query_params();
        let response = client.get(&M::collection_path(), &params).await?;
        let found: FindResponse = response.into_result()?;

        let mut results = found
            .results
            .into_iter()
            .map(Resource::<M>::from_remote)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(limit) = self.limit {
            if results.len() > limit {
                log::debug!(
                    "Backend returned {} {} rows for limit {}; truncating",
                    results.len(),
                    M::CLASS_NAME,
                    limit
                );
                results.truncate(limit);
            }
        }
        Ok(results)
    }

    pub async fn first(self, client: &ParseClient) -> Result<Option<Resource<M>>, ResourceError> {
        let results = self.limit(1).all(client).await?;
        Ok(results.into_iter().next())
    }

    /// Number of matching objects. Rows in the response, if any, are ignored.
    pub async fn count(mut self, client: &ParseClient) -> Result<u64, ResourceError> {
        self.check()?;
        self.limit = Some(0);
        self.count_only = true;

        let params = self.build_query_params();
        let response = client.get(&M::collection_path(), &params).await?;
        let counted: CountResponse = response.into_result()?;
        Ok(counted.count)
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    results: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}
