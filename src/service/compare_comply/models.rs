//! JSON models of the Compare & Comply V1 API.
//!
//! Every field is optional or defaulted: the service omits empty members and adds
//! new ones between versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of `convert_to_html`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlReturn {
    pub num_pages: Option<String>,
    pub author: Option<String>,
    pub publication_date: Option<String>,
    pub title: Option<String>,
    pub html: Option<String>,
}

/// Basic information about an input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub title: Option<String>,
    pub html: Option<String>,
    pub hash: Option<String>,
    pub label: Option<String>,
}

/// Character offsets of an element within the document's HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub begin: i64,
    pub end: i64,
}

/// An action/party pair identifying an element's nature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub nature: String,
    pub party: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeLabel {
    pub label: Option<Label>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provenance_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provenance_ids: Vec<String>,
}

/// A typed value (currency, date, location, ...) found in an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    pub location: Option<Location>,
}

/// A sentence-level element with its semantic labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    pub location: Option<Location>,
    pub text: Option<String>,
    pub types: Vec<TypeLabel>,
    pub categories: Vec<Category>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionTitle {
    pub text: Option<String>,
    pub location: Option<Location>,
    pub level: Option<i64>,
}

/// One cell of a table body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyCell {
    pub cell_id: Option<String>,
    pub location: Option<Location>,
    pub text: Option<String>,
    pub row_index_begin: Option<i64>,
    pub row_index_end: Option<i64>,
    pub column_index_begin: Option<i64>,
    pub column_index_end: Option<i64>,
    pub row_header_ids: Vec<String>,
    pub column_header_ids: Vec<String>,
}

/// Header cell shared by row, column and table headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderCell {
    pub cell_id: Option<String>,
    pub location: Option<Location>,
    pub text: Option<String>,
    pub row_index_begin: Option<i64>,
    pub row_index_end: Option<i64>,
    pub column_index_begin: Option<i64>,
    pub column_index_end: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    pub location: Option<Location>,
    pub text: Option<String>,
    pub section_title: Option<SectionTitle>,
    pub table_headers: Vec<HeaderCell>,
    pub row_headers: Vec<HeaderCell>,
    pub column_headers: Vec<HeaderCell>,
    pub body_cells: Vec<BodyCell>,
    /// Key/value structures; shape varies by model version.
    pub key_value_pairs: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub party: Option<String>,
    pub importance: Option<String>,
    pub role: Option<String>,
}

/// Result of `classify_elements`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyReturn {
    pub document: Option<Document>,
    pub model_id: Option<String>,
    pub model_version: Option<String>,
    pub elements: Vec<Element>,
    pub tables: Vec<Table>,
    pub parties: Vec<Party>,
    pub document_structure: Option<serde_json::Value>,
    pub effective_dates: Vec<serde_json::Value>,
    pub contract_amounts: Vec<serde_json::Value>,
    pub termination_dates: Vec<serde_json::Value>,
}

/// Result of `extract_tables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableReturn {
    pub document: Option<Document>,
    pub model_id: Option<String>,
    pub model_version: Option<String>,
    pub tables: Vec<Table>,
}

/// A pair of matched elements from the two compared documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignedElement {
    pub element_pair: Vec<ElementPair>,
    pub identical_text: Option<bool>,
    pub provenance_ids: Vec<String>,
    pub significant_elements: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPair {
    pub document_label: Option<String>,
    pub text: Option<String>,
    pub location: Option<Location>,
    pub types: Vec<TypeLabel>,
    pub categories: Vec<Category>,
    pub attributes: Vec<Attribute>,
}

/// An element present in only one of the compared documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnalignedElement {
    pub document_label: Option<String>,
    pub location: Option<Location>,
    pub text: Option<String>,
    pub types: Vec<TypeLabel>,
    pub categories: Vec<Category>,
    pub attributes: Vec<Attribute>,
}

/// Result of `compare_documents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareReturn {
    pub model_id: Option<String>,
    pub model_version: Option<String>,
    pub documents: Vec<Document>,
    pub aligned_elements: Vec<AlignedElement>,
    pub unaligned_elements: Vec<UnalignedElement>,
}

/// Brief identification of the document feedback refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Labels on an element, as submitted in feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsIn {
    pub types: Vec<TypeLabel>,
    pub categories: Vec<Category>,
}

/// Labels on an element, as echoed back with the service's diff classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsOut {
    pub types: Vec<TypeLabel>,
    pub categories: Vec<Category>,
    pub modification: Option<String>,
}

/// Feedback on one classified element, sent with `add_feedback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackDataInput {
    /// Usually `element_classification`.
    pub feedback_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<ShortDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub location: Location,
    pub text: String,
    pub original_labels: LabelsIn,
    pub updated_labels: LabelsIn,
}

/// Paging links attached to listed feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub refresh_cursor: Option<String>,
    pub next_cursor: Option<String>,
    pub refresh_url: Option<String>,
    pub next_url: Option<String>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackDataOutput {
    pub feedback_type: Option<String>,
    pub document: Option<ShortDoc>,
    pub model_id: Option<String>,
    pub model_version: Option<String>,
    pub location: Option<Location>,
    pub text: Option<String>,
    pub original_labels: Option<LabelsOut>,
    pub updated_labels: Option<LabelsOut>,
    pub pagination: Option<Pagination>,
}

/// Result of `add_feedback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackReturn {
    pub feedback_id: Option<String>,
    pub user_id: Option<String>,
    pub comment: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub feedback_data: Option<FeedbackDataOutput>,
}

/// Result of `delete_feedback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackDeleted {
    pub status: Option<i64>,
    pub message: Option<String>,
}

/// Result of `get_feedback`, and one entry of a [`FeedbackList`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetFeedback {
    pub feedback_id: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub feedback_data: Option<FeedbackDataOutput>,
}

/// Result of `list_feedback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackList {
    pub feedback: Vec<GetFeedback>,
}

impl FeedbackList {
    /// Cursor for the following page; `None` on the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination()
            .and_then(|p| p.next_cursor.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// Total number of matching items, when requested with `include_total`.
    pub fn total(&self) -> Option<i64> {
        self.pagination().and_then(|p| p.total)
    }

    fn pagination(&self) -> Option<&Pagination> {
        self.feedback
            .iter()
            .rev()
            .find_map(|f| f.feedback_data.as_ref()?.pagination.as_ref())
    }
}

/// Per-state document counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocCounts {
    pub total: Option<i64>,
    pub pending: Option<i64>,
    pub successful: Option<i64>,
    pub failed: Option<i64>,
}

/// State of one batch job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchStatus {
    pub function: Option<String>,
    pub input_bucket_location: Option<String>,
    pub input_bucket_name: Option<String>,
    pub output_bucket_location: Option<String>,
    pub output_bucket_name: Option<String>,
    pub batch_id: Option<String>,
    pub document_counts: Option<DocCounts>,
    pub status: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Result of `list_batches`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Batches {
    pub batches: Vec<BatchStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_return_tolerates_missing_members() {
        let json = r#"{
            "model_id": "contracts",
            "elements": [{
                "location": {"begin": 0, "end": 12},
                "text": "Buyer pays.",
                "types": [{"label": {"nature": "Obligation", "party": "Buyer"}, "provenance_ids": ["a"]}],
                "attributes": [{"type": "Currency", "text": "$5", "location": {"begin": 3, "end": 5}}]
            }]
        }"#;
        let parsed: ClassifyReturn = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.elements.len(), 1);
        let element = &parsed.elements[0];
        assert_eq!(element.types[0].label.as_ref().unwrap().party, "Buyer");
        assert_eq!(element.attributes[0].kind.as_deref(), Some("Currency"));
        assert!(element.categories.is_empty());
        assert!(parsed.tables.is_empty());
    }

    #[test]
    fn next_cursor_comes_from_last_pagination() {
        let json = r#"{"feedback": [
            {"feedback_id": "1", "feedback_data": {"pagination": {"next_cursor": "abc", "total": 3}}},
            {"feedback_id": "2"}
        ]}"#;
        let list: FeedbackList = serde_json::from_str(json).unwrap();
        assert_eq!(list.next_cursor(), Some("abc"));
        assert_eq!(list.total(), Some(3));

        let last: FeedbackList =
            serde_json::from_str(r#"{"feedback": [{"feedback_data": {"pagination": {"next_cursor": ""}}}]}"#)
                .unwrap();
        assert_eq!(last.next_cursor(), None);
    }

    #[test]
    fn batch_status_parses_timestamps() {
        let json = r#"{"batch_id": "b1", "status": "completed",
            "document_counts": {"total": 2, "successful": 2},
            "created": "2018-11-15T22:07:57Z"}"#;
        let status: BatchStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.document_counts.unwrap().successful, Some(2));
        assert!(status.created.is_some());
    }
}
