use crate::service::FileUpload;
use crate::transport::RequestBuilder;
use chrono::NaiveDate;
use std::fmt;

/// One `sort` key; renders as `+field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.descending { '-' } else { '+' };
        write!(f, "{}{}", prefix, self.field)
    }
}

/// Comma-joined sort expression, or `None` when there are no keys.
pub fn sort_expression(fields: &[SortField]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    Some(
        fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Filters and paging for `list_feedback`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFeedbackOptions {
    pub feedback_type: Option<String>,
    pub before: Option<NaiveDate>,
    pub after: Option<NaiveDate>,
    pub document_title: Option<String>,
    pub model_id: Option<String>,
    pub model_version: Option<String>,
    pub category_removed: Option<String>,
    pub category_added: Option<String>,
    pub category_not_changed: Option<String>,
    pub type_removed: Option<String>,
    pub type_added: Option<String>,
    pub type_not_changed: Option<String>,
    pub page_limit: Option<u64>,
    pub cursor: Option<String>,
    pub sort: Vec<SortField>,
    pub include_total: Option<bool>,
}

impl ListFeedbackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feedback_type(mut self, v: impl Into<String>) -> Self {
        self.feedback_type = Some(v.into());
        self
    }

    pub fn before(mut self, date: NaiveDate) -> Self {
        self.before = Some(date);
        self
    }

    pub fn after(mut self, date: NaiveDate) -> Self {
        self.after = Some(date);
        self
    }

    pub fn document_title(mut self, v: impl Into<String>) -> Self {
        self.document_title = Some(v.into());
        self
    }

    pub fn model_id(mut self, v: impl Into<String>) -> Self {
        self.model_id = Some(v.into());
        self
    }

    pub fn model_version(mut self, v: impl Into<String>) -> Self {
        self.model_version = Some(v.into());
        self
    }

    pub fn category_removed(mut self, v: impl Into<String>) -> Self {
        self.category_removed = Some(v.into());
        self
    }

    pub fn category_added(mut self, v: impl Into<String>) -> Self {
        self.category_added = Some(v.into());
        self
    }

    pub fn category_not_changed(mut self, v: impl Into<String>) -> Self {
        self.category_not_changed = Some(v.into());
        self
    }

    pub fn type_removed(mut self, v: impl Into<String>) -> Self {
        self.type_removed = Some(v.into());
        self
    }

    pub fn type_added(mut self, v: impl Into<String>) -> Self {
        self.type_added = Some(v.into());
        self
    }

    pub fn type_not_changed(mut self, v: impl Into<String>) -> Self {
        self.type_not_changed = Some(v.into());
        self
    }

    pub fn page_limit(mut self, limit: u64) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn include_total(mut self, include: bool) -> Self {
        self.include_total = Some(include);
        self
    }

    pub(crate) fn apply(self, builder: RequestBuilder) -> RequestBuilder {
        let date = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        builder
            .query_opt("feedback_type", self.feedback_type)
            .query_opt("before", self.before.map(date))
            .query_opt("after", self.after.map(date))
            .query_opt("document_title", self.document_title)
            .query_opt("model_id", self.model_id)
            .query_opt("model_version", self.model_version)
            .query_opt("category_removed", self.category_removed)
            .query_opt("category_added", self.category_added)
            .query_opt("category_not_changed", self.category_not_changed)
            .query_opt("type_removed", self.type_removed)
            .query_opt("type_added", self.type_added)
            .query_opt("type_not_changed", self.type_not_changed)
            .query_opt("page_limit", self.page_limit)
            .query_opt("cursor", self.cursor)
            .query_opt("sort", sort_expression(&self.sort))
            .query_opt("include_total", self.include_total)
    }
}

/// Analysis a batch applies to every document in its input bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFunction {
    HtmlConversion,
    ElementClassification,
    Tables,
}

impl BatchFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchFunction::HtmlConversion => "html_conversion",
            BatchFunction::ElementClassification => "element_classification",
            BatchFunction::Tables => "tables",
        }
    }
}

impl fmt::Display for BatchFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Rescan,
    Cancel,
}

impl BatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchAction::Rescan => "rescan",
            BatchAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of `create_batch`. Credentials files are sent as `application/json`.
#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    pub function: BatchFunction,
    pub input_credentials_file: FileUpload,
    pub input_bucket_location: String,
    pub input_bucket_name: String,
    pub output_credentials_file: FileUpload,
    pub output_bucket_location: String,
    pub output_bucket_name: String,
    pub model_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn sort_renders_prefixes() {
        let sort = [SortField::desc("created"), SortField::asc("comment")];
        assert_eq!(sort_expression(&sort).as_deref(), Some("-created,+comment"));
        assert_eq!(sort_expression(&[]), None);
    }

    #[test]
    fn options_only_send_set_fields() {
        let req = ListFeedbackOptions::new()
            .before(NaiveDate::from_ymd_opt(2018, 11, 5).unwrap())
            .page_limit(10)
            .include_total(true)
            .sort_by(SortField::desc("created"))
            .apply(RequestBuilder::new(Method::GET))
            .build();
        let query: Vec<(&str, &str)> = req
            .query()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("before", "2018-11-05"),
                ("page_limit", "10"),
                ("sort", "-created"),
                ("include_total", "true"),
            ]
        );
    }
}
