//! One [`Endpoint`] per Compare & Comply operation.

use super::models::*;
use super::options::{BatchAction, CreateBatchRequest, ListFeedbackOptions};
use crate::service::{Endpoint, FileUpload};
use crate::transport::{FormPart, RequestBuilder};
use crate::{Error, Result};
use crate::ErrorContext;
use reqwest::Method;
use serde::Serialize;
use url::Url;

fn require(value: &str, argument: &str, operation: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::missing_argument(argument, operation));
    }
    Ok(())
}

/// `<prefix>/<id>` with `id` percent-encoded as exactly one path segment.
fn resource_path(prefix: &str, id: &str, argument: &str, operation: &str) -> Result<String> {
    require(id, argument, operation)?;
    if id == "." || id == ".." {
        return Err(Error::invalid_argument_with_context(
            format!("`{}` is not a valid `{}` for `{}`", id, argument, operation),
            ErrorContext::new().with_field_path(argument),
        ));
    }
    let mut url = Url::parse("http://resource.invalid/")
        .map_err(|e| Error::invalid_argument(format!("cannot build resource path: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::invalid_argument("cannot build resource path"))?
        .pop_if_empty()
        .extend(prefix.split('/').filter(|s| !s.is_empty()))
        .push(id);
    Ok(url.path().to_string())
}

/// Single-file analysis calls share one request shape.
macro_rules! file_analysis_endpoint {
    ($name:ident, $output:ty, $op:literal, $path:literal) => {
        pub(crate) struct $name {
            pub file: FileUpload,
            pub model_id: Option<String>,
        }

        impl Endpoint for $name {
            type Output = $output;
            const OPERATION: &'static str = $op;

            fn function(&self) -> Result<String> {
                Ok($path.to_string())
            }

            fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
                Ok(base
                    .method(Method::POST)
                    .header("Accept", "application/json")
                    .form_part(self.file.into_part("file", $op)?)
                    .query_opt("model_id", self.model_id))
            }
        }
    };
}

file_analysis_endpoint!(ConvertToHtml, HtmlReturn, "convert_to_html", "/v1/html_conversion");
file_analysis_endpoint!(
    ClassifyElements,
    ClassifyReturn,
    "classify_elements",
    "/v1/element_classification"
);
file_analysis_endpoint!(ExtractTables, TableReturn, "extract_tables", "/v1/tables");

pub(crate) struct CompareDocuments {
    pub file_1: FileUpload,
    pub file_2: FileUpload,
    pub file_1_label: Option<String>,
    pub file_2_label: Option<String>,
    pub model_id: Option<String>,
}

impl Endpoint for CompareDocuments {
    type Output = CompareReturn;
    const OPERATION: &'static str = "compare_documents";

    fn function(&self) -> Result<String> {
        Ok("/v1/comparison".into())
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base
            .method(Method::POST)
            .header("Accept", "application/json")
            .form_part(self.file_1.into_part("file_1", Self::OPERATION)?)
            .form_part(self.file_2.into_part("file_2", Self::OPERATION)?)
            .query_opt("file_1_label", self.file_1_label)
            .query_opt("file_2_label", self.file_2_label)
            .query_opt("model_id", self.model_id))
    }
}

#[derive(Serialize)]
struct AddFeedbackBody<'a> {
    feedback_data: &'a FeedbackDataInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

pub(crate) struct AddFeedback {
    pub feedback_data: FeedbackDataInput,
    pub user_id: Option<String>,
    pub comment: Option<String>,
}

impl Endpoint for AddFeedback {
    type Output = FeedbackReturn;
    const OPERATION: &'static str = "add_feedback";

    fn function(&self) -> Result<String> {
        Ok("/v1/feedback".into())
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        require(
            &self.feedback_data.feedback_type,
            "feedback_data.feedback_type",
            Self::OPERATION,
        )?;
        let body = AddFeedbackBody {
            feedback_data: &self.feedback_data,
            user_id: self.user_id.as_deref().filter(|s| !s.is_empty()),
            comment: self.comment.as_deref().filter(|s| !s.is_empty()),
        };
        base.method(Method::POST).json(&body)
    }
}

pub(crate) struct DeleteFeedback {
    pub feedback_id: String,
    pub model_id: Option<String>,
}

impl Endpoint for DeleteFeedback {
    type Output = FeedbackDeleted;
    const OPERATION: &'static str = "delete_feedback";

    fn function(&self) -> Result<String> {
        resource_path("/v1/feedback", &self.feedback_id, "feedback_id", Self::OPERATION)
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base
            .method(Method::DELETE)
            .header("Accept", "application/json")
            .query_opt("model_id", self.model_id))
    }
}

pub(crate) struct GetFeedbackById {
    pub feedback_id: String,
    pub model_id: Option<String>,
}

impl Endpoint for GetFeedbackById {
    type Output = GetFeedback;
    const OPERATION: &'static str = "get_feedback";

    fn function(&self) -> Result<String> {
        resource_path("/v1/feedback", &self.feedback_id, "feedback_id", Self::OPERATION)
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base
            .method(Method::GET)
            .header("Accept", "application/json")
            .query_opt("model_id", self.model_id))
    }
}

pub(crate) struct ListFeedback {
    pub options: ListFeedbackOptions,
}

impl Endpoint for ListFeedback {
    type Output = FeedbackList;
    const OPERATION: &'static str = "list_feedback";

    fn function(&self) -> Result<String> {
        Ok("/v1/feedback".into())
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        if self.options.page_limit == Some(0) {
            return Err(Error::invalid_argument(
                "`page_limit` must be at least 1 for `list_feedback`",
            ));
        }
        Ok(self
            .options
            .apply(base.method(Method::GET).header("Accept", "application/json")))
    }
}

pub(crate) struct CreateBatch {
    pub request: CreateBatchRequest,
}

impl Endpoint for CreateBatch {
    type Output = BatchStatus;
    const OPERATION: &'static str = "create_batch";

    fn function(&self) -> Result<String> {
        Ok("/v1/batches".into())
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        let op = Self::OPERATION;
        let r = self.request;
        require(&r.input_bucket_location, "input_bucket_location", op)?;
        require(&r.input_bucket_name, "input_bucket_name", op)?;
        require(&r.output_bucket_location, "output_bucket_location", op)?;
        require(&r.output_bucket_name, "output_bucket_name", op)?;

        let as_json = |f: FileUpload| f.with_content_type("application/json");
        Ok(base
            .method(Method::POST)
            .header("Accept", "application/json")
            .query("function", r.function.as_str())
            .query_opt("model_id", r.model_id)
            .form_part(as_json(r.input_credentials_file).into_part("input_credentials_file", op)?)
            .form_part(FormPart::text("input_bucket_location", r.input_bucket_location))
            .form_part(FormPart::text("input_bucket_name", r.input_bucket_name))
            .form_part(as_json(r.output_credentials_file).into_part("output_credentials_file", op)?)
            .form_part(FormPart::text("output_bucket_location", r.output_bucket_location))
            .form_part(FormPart::text("output_bucket_name", r.output_bucket_name)))
    }
}

pub(crate) struct GetBatch {
    pub batch_id: String,
}

impl Endpoint for GetBatch {
    type Output = BatchStatus;
    const OPERATION: &'static str = "get_batch";

    fn function(&self) -> Result<String> {
        resource_path("/v1/batches", &self.batch_id, "batch_id", Self::OPERATION)
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base.method(Method::GET).header("Accept", "application/json"))
    }
}

pub(crate) struct ListBatches;

impl Endpoint for ListBatches {
    type Output = Batches;
    const OPERATION: &'static str = "list_batches";

    fn function(&self) -> Result<String> {
        Ok("/v1/batches".into())
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base.method(Method::GET).header("Accept", "application/json"))
    }
}

pub(crate) struct UpdateBatch {
    pub batch_id: String,
    pub action: BatchAction,
    pub model_id: Option<String>,
}

impl Endpoint for UpdateBatch {
    type Output = BatchStatus;
    const OPERATION: &'static str = "update_batch";

    fn function(&self) -> Result<String> {
        resource_path("/v1/batches", &self.batch_id, "batch_id", Self::OPERATION)
    }

    fn build_request(self, base: RequestBuilder) -> Result<RequestBuilder> {
        Ok(base
            .method(Method::PUT)
            .header("Accept", "application/json")
            .query("action", self.action.as_str())
            .query_opt("model_id", self.model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn base() -> RequestBuilder {
        RequestBuilder::new(Method::GET).query("version", "2018-10-15")
    }

    #[test]
    fn compare_documents_builds_two_file_parts() {
        let req = CompareDocuments {
            file_1: FileUpload::new("a.pdf", b"a".to_vec()),
            file_2: FileUpload::new("b.pdf", b"b".to_vec()).with_content_type("application/pdf"),
            file_1_label: Some("left".into()),
            file_2_label: None,
            model_id: None,
        }
        .build_request(base())
        .unwrap()
        .build();
        assert_eq!(req.method(), &Method::POST);
        let names: Vec<_> = req.form_parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["file_1", "file_2"]);
        assert_eq!(
            req.query().keys().collect::<Vec<_>>(),
            vec!["version", "file_1_label"]
        );
    }

    #[test]
    fn add_feedback_omits_empty_optionals() {
        let req = AddFeedback {
            feedback_data: FeedbackDataInput {
                feedback_type: "element_classification".into(),
                text: "x".into(),
                ..Default::default()
            },
            user_id: Some(String::new()),
            comment: Some("looks wrong".into()),
        }
        .build_request(base())
        .unwrap()
        .build();
        let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
        assert!(body.get("user_id").is_none());
        assert_eq!(body["comment"], "looks wrong");
        assert_eq!(body["feedback_data"]["feedback_type"], "element_classification");
        assert_eq!(
            req.headers().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn blank_ids_are_rejected() {
        let err = GetBatch { batch_id: "".into() }.function().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = DeleteFeedback {
            feedback_id: " ".into(),
            model_id: None,
        }
        .function()
        .unwrap_err();
        assert!(err.to_string().contains("feedback_id"));
    }

    #[test]
    fn ids_are_escaped_as_one_path_segment() {
        let get = |id: &str| {
            GetFeedbackById {
                feedback_id: id.into(),
                model_id: None,
            }
            .function()
        };
        assert_eq!(get("fb-1").unwrap(), "/v1/feedback/fb-1");
        assert_eq!(get("a#frag").unwrap(), "/v1/feedback/a%23frag");
        assert_eq!(get("a/b").unwrap(), "/v1/feedback/a%2Fb");
        assert_eq!(get("a?x=1").unwrap(), "/v1/feedback/a%3Fx=1");
        assert_eq!(get("..").unwrap_err().kind(), ErrorKind::InvalidArgument);

        let path = UpdateBatch {
            batch_id: "b 1/..".into(),
            action: BatchAction::Rescan,
            model_id: None,
        }
        .function()
        .unwrap();
        assert_eq!(path, "/v1/batches/b%201%2F..");
    }

    #[test]
    fn create_batch_marks_credentials_as_json() {
        let req = CreateBatch {
            request: CreateBatchRequest {
                function: super::super::options::BatchFunction::Tables,
                input_credentials_file: FileUpload::new("in.json", b"{}".to_vec()),
                input_bucket_location: "us-south".into(),
                input_bucket_name: "in".into(),
                output_credentials_file: FileUpload::new("out.json", b"{}".to_vec()),
                output_bucket_location: "us-south".into(),
                output_bucket_name: "out".into(),
                model_id: None,
            },
        }
        .build_request(base())
        .unwrap()
        .build();
        assert_eq!(req.query().get("function").map(String::as_str), Some("tables"));
        let creds = &req.form_parts()[0];
        assert_eq!(creds.name, "input_credentials_file");
        assert_eq!(creds.content_type.as_deref(), Some("application/json"));
        assert_eq!(req.form_parts().len(), 6);
    }

    #[test]
    fn create_batch_requires_bucket_fields() {
        let err = CreateBatch {
            request: CreateBatchRequest {
                function: super::super::options::BatchFunction::HtmlConversion,
                input_credentials_file: FileUpload::new("in.json", b"{}".to_vec()),
                input_bucket_location: "us-south".into(),
                input_bucket_name: "".into(),
                output_credentials_file: FileUpload::new("out.json", b"{}".to_vec()),
                output_bucket_location: "us-south".into(),
                output_bucket_name: "out".into(),
                model_id: None,
            },
        }
        .build_request(base())
        .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("input_bucket_name")
        );
    }
}
