//! Ad-hoc filter expressions for list endpoints.
//!
//! Clients send a compact filter string such as
//! `status:Borrowed:equals|due_date:2024-01-01:lessthan`. The parser turns it
//! into [`FilterParams`]; [`translator`] resolves the field names against an
//! entity's static column list and renders bound SQL predicates.
//!
//! Parsing is permissive: a fragment that does not split into exactly
//! `field`, `value` and `operator` is dropped, and an unknown operator token
//! falls back to [`FilterOperator::Equals`].

pub mod translator;

pub use translator::{
    validate_filter_fields, validate_filter_values, Column, ColumnKind, FilterableEntity,
    Predicate, QueryFilter, ResolvedFilter, ResolvedFilters,
};

/// Comparison operators of the filter grammar (closed vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    In,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterOrEqual,
        FilterOperator::LessThan,
        FilterOperator::LessOrEqual,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::In,
    ];

    /// Map a grammar token to an operator. Unknown tokens map to `Equals`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "equals" => FilterOperator::Equals,
            "notequals" => FilterOperator::NotEquals,
            "greaterthan" => FilterOperator::GreaterThan,
            "greaterthanorequal" => FilterOperator::GreaterOrEqual,
            "lessthan" => FilterOperator::LessThan,
            "lessthanorequal" => FilterOperator::LessOrEqual,
            "contains" => FilterOperator::Contains,
            "startswith" => FilterOperator::StartsWith,
            "endswith" => FilterOperator::EndsWith,
            "in" => FilterOperator::In,
            _ => FilterOperator::Equals,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notequals",
            FilterOperator::GreaterThan => "greaterthan",
            FilterOperator::GreaterOrEqual => "greaterthanorequal",
            FilterOperator::LessThan => "lessthan",
            FilterOperator::LessOrEqual => "lessthanorequal",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startswith",
            FilterOperator::EndsWith => "endswith",
            FilterOperator::In => "in",
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// Right-hand side of a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    /// Pre-split membership list (only meaningful for `In`)
    List(Vec<String>),
}

impl FilterValue {
    /// Values for a membership test. A single value is split on `,`.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            FilterValue::Single(s) => s
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            FilterValue::List(values) => values.clone(),
        }
    }

    /// Scalar form; a list is joined back with `,`
    pub fn as_text(&self) -> String {
        match self {
            FilterValue::Single(s) => s.clone(),
            FilterValue::List(values) => values.join(","),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Single(s.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::List(values)
    }
}

/// One `(field, value, operator)` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParam {
    pub field: String,
    pub value: FilterValue,
    pub operator: FilterOperator,
}

impl FilterParam {
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>, operator: FilterOperator) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator,
        }
    }
}

/// Ordered list of filter triples, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams(Vec<FilterParam>);

impl FilterParams {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, param: FilterParam) {
        self.0.push(param);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterParam> {
        self.0.iter()
    }
}

impl From<Vec<FilterParam>> for FilterParams {
    fn from(params: Vec<FilterParam>) -> Self {
        Self(params)
    }
}

impl IntoIterator for FilterParams {
    type Item = FilterParam;
    type IntoIter = std::vec::IntoIter<FilterParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FilterParams {
    type Item = &'a FilterParam;
    type IntoIter = std::slice::Iter<'a, FilterParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The two delimiters of the filter grammar. They must differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterGrammar {
    /// Separates triples
    pub triple_separator: char,
    /// Separates field, value and operator inside a triple
    pub part_separator: char,
}

impl Default for FilterGrammar {
    fn default() -> Self {
        Self {
            triple_separator: '|',
            part_separator: ':',
        }
    }
}

impl FilterGrammar {
    pub fn new(triple_separator: char, part_separator: char) -> Self {
        Self {
            triple_separator,
            part_separator,
        }
    }

    /// Parse a filter string. Malformed fragments are dropped silently.
    pub fn parse(&self, input: &str) -> FilterParams {
        let mut params = FilterParams::new();
        if input.trim().is_empty() {
            return params;
        }

        for fragment in input.split(self.triple_separator) {
            let parts: Vec<&str> = fragment.split(self.part_separator).collect();
            if parts.len() != 3 {
                continue;
            }

            let field = parts[0].trim();
            if field.is_empty() {
                continue;
            }

            params.push(FilterParam {
                field: field.to_string(),
                value: FilterValue::Single(parts[1].trim().to_string()),
                operator: FilterOperator::from_token(parts[2]),
            });
        }

        params
    }
}

/// Parse with the default `|` / `:` grammar
pub fn parse_filter_string(input: &str) -> FilterParams {
    FilterGrammar::default().parse(input)
}
