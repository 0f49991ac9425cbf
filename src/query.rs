//! Read-query construction for the backend's generic entity-query API.
//!
//! The backend addresses entity collections by name and takes projection,
//! filter, ordering and paging as query-string parameters. `ReadQuery`
//! collects those and yields key/value pairs for reqwest's query encoder,
//! which percent-encodes the filter grammar (`==`, `&&`, quoted literals,
//! `+`/`-` sort prefixes) on the way out.

/// Result cap applied unless a caller overrides it. The backend refuses
/// unbounded queries, and the grids this service reads are well under this.
pub const DEFAULT_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct ReadQuery {
    fields: Vec<&'static str>,
    filter: Option<String>,
    sort_order: Option<&'static str>,
    start: usize,
    limit: usize,
    page: Option<usize>,
    extra: Vec<(&'static str, String)>,
}

impl ReadQuery {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            filter: None,
            sort_order: None,
            start: 0,
            limit: DEFAULT_LIMIT,
            page: None,
            extra: Vec::new(),
        }
    }

    /// Project the named columns, in order. Responses come back as
    /// positional rows, so callers index columns by this order. Without a
    /// projection the backend applies its collection default.
    pub fn fields(mut self, fields: &[&'static str]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    /// Raw filter expression in the backend's grammar.
    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    /// Sort expression, e.g. `+Building.Name,Name` or `-RequestNumber`.
    pub fn sort_order(mut self, order: &'static str) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Endpoint-specific parameter outside the common query vocabulary.
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.extra.push((key, value.into()));
        self
    }

    /// Key/value pairs ready for `reqwest::RequestBuilder::query`.
    pub fn into_params(self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.fields.is_empty() {
            params.push(("fields", self.fields.join(",")));
        }
        if let Some(filter) = self.filter {
            params.push(("filter", filter));
        }
        if let Some(sort_order) = self.sort_order {
            params.push(("sortOrder", sort_order.to_string()));
        }
        params.push(("start", self.start.to_string()));
        params.push(("limit", self.limit.to_string()));
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        params.extend(self.extra);
        params
    }
}

impl Default for ReadQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_carries_default_paging() {
        let params = ReadQuery::new().into_params();
        assert_eq!(
            params,
            vec![("start", "0".to_string()), ("limit", "500".to_string())]
        );
    }

    #[test]
    fn fields_join_in_declaration_order() {
        let params = ReadQuery::new()
            .fields(&["Id", "Name"])
            .fields(&["IsActive"])
            .into_params();
        assert_eq!(params[0], ("fields", "Id,Name,IsActive".to_string()));
    }

    #[test]
    fn filter_and_sort_pass_through_verbatim() {
        // Encoding is reqwest's job; the builder must not touch the text.
        let params = ReadQuery::new()
            .filter(r#"Id=="27e57397"&&IsActive==1"#)
            .sort_order("+Building.Name,Name")
            .into_params();
        assert!(params.contains(&("filter", r#"Id=="27e57397"&&IsActive==1"#.to_string())));
        assert!(params.contains(&("sortOrder", "+Building.Name,Name".to_string())));
    }

    #[test]
    fn page_and_extra_params_follow_paging() {
        let params = ReadQuery::new()
            .limit(25)
            .page(1)
            .param("isForWeekView", "false")
            .into_params();
        assert_eq!(
            params,
            vec![
                ("start", "0".to_string()),
                ("limit", "25".to_string()),
                ("page", "1".to_string()),
                ("isForWeekView", "false".to_string()),
            ]
        );
    }
}
