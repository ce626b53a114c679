use super::endpoints::*;
use super::models::*;
use super::options::{BatchAction, CreateBatchRequest, ListFeedbackOptions};
use super::{DEFAULT_URL, SERVICE_ID};
use crate::auth::Credentials;
use crate::client::ClientContext;
use crate::config::Config;
use crate::service::{BaseService, DetailedResponse, FileUpload};
use crate::transport::CustomData;
use crate::{Error, ErrorContext, Result};

/// Compare & Comply V1: document conversion, classification, comparison,
/// classification feedback and batch processing.
///
/// Every operation returns `Err` when it rejects its arguments synchronously (the
/// callback is then never invoked) and `Ok(())` once the call is dispatched (the
/// callback then runs exactly once).
#[derive(Debug, Clone)]
pub struct CompareComplyService {
    base: BaseService,
}

impl CompareComplyService {
    /// `version_date` is the API version in `yyyy-mm-dd` form, e.g. `2018-10-15`.
    pub fn new(
        ctx: &ClientContext,
        version_date: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        Ok(Self {
            base: BaseService::new(ctx, SERVICE_ID, version_date, credentials, DEFAULT_URL)?,
        })
    }

    /// Use the `compare-comply` credentials from `config`, falling back to the environment.
    pub fn from_config(
        config: &Config,
        ctx: &ClientContext,
        version_date: impl Into<String>,
    ) -> Result<Self> {
        let credentials = config
            .credential_store()
            .resolve(SERVICE_ID)
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "no credentials configured",
                    ErrorContext::new()
                        .with_field_path("credentials")
                        .with_details(SERVICE_ID),
                )
            })?;
        Self::new(ctx, version_date, credentials)
    }

    pub fn version_date(&self) -> &str {
        self.base.version_date()
    }

    pub fn credentials(&self) -> &Credentials {
        self.base.credentials()
    }

    pub fn set_credentials(&mut self, credentials: Credentials) -> Result<()> {
        self.base.set_credentials(credentials)
    }

    pub fn disable_ssl_verification(&self) -> bool {
        self.base.disable_ssl_verification()
    }

    /// Skip certificate validation for calls made through this instance.
    pub fn set_disable_ssl_verification(&mut self, disable: bool) {
        self.base.set_disable_ssl_verification(disable);
    }

    /// Convert a document to HTML.
    pub fn convert_to_html(
        &self,
        file: FileUpload,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<HtmlReturn>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = ConvertToHtml {
            file,
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    /// Analyze a document's structural and semantic elements.
    pub fn classify_elements(
        &self,
        file: FileUpload,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<ClassifyReturn>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = ClassifyElements {
            file,
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    /// Extract table content from a document.
    pub fn extract_tables(
        &self,
        file: FileUpload,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<TableReturn>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = ExtractTables {
            file,
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    /// Compare two documents element by element.
    #[allow(clippy::too_many_arguments)]
    pub fn compare_documents(
        &self,
        file_1: FileUpload,
        file_2: FileUpload,
        file_1_label: Option<&str>,
        file_2_label: Option<&str>,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<CompareReturn>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = CompareDocuments {
            file_1,
            file_2,
            file_1_label: file_1_label.map(str::to_string),
            file_2_label: file_2_label.map(str::to_string),
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    /// Submit feedback on the classification of one element.
    pub fn add_feedback(
        &self,
        feedback_data: FeedbackDataInput,
        user_id: Option<&str>,
        comment: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<FeedbackReturn>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = AddFeedback {
            feedback_data,
            user_id: user_id.map(str::to_string),
            comment: comment.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    pub fn delete_feedback(
        &self,
        feedback_id: &str,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<FeedbackDeleted>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = DeleteFeedback {
            feedback_id: feedback_id.to_string(),
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    pub fn get_feedback(
        &self,
        feedback_id: &str,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<GetFeedback>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = GetFeedbackById {
            feedback_id: feedback_id.to_string(),
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    /// List feedback, one page at a time. Pass [`FeedbackList::next_cursor`] back in
    /// `options.cursor` to fetch the following page.
    pub fn list_feedback(
        &self,
        options: ListFeedbackOptions,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<FeedbackList>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        self.base
            .invoke(ListFeedback { options }, custom_data, callback)
    }

    /// Start a batch job over the documents in a cloud object storage bucket.
    pub fn create_batch(
        &self,
        request: CreateBatchRequest,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<BatchStatus>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        self.base.invoke(CreateBatch { request }, custom_data, callback)
    }

    pub fn get_batch(
        &self,
        batch_id: &str,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<BatchStatus>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = GetBatch {
            batch_id: batch_id.to_string(),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }

    pub fn list_batches(
        &self,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<Batches>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        self.base.invoke(ListBatches, custom_data, callback)
    }

    /// Rescan or cancel a batch job.
    pub fn update_batch(
        &self,
        batch_id: &str,
        action: BatchAction,
        model_id: Option<&str>,
        custom_data: CustomData,
        callback: impl FnOnce(DetailedResponse<BatchStatus>, Option<Error>, CustomData) + Send + 'static,
    ) -> Result<()> {
        let endpoint = UpdateBatch {
            batch_id: batch_id.to_string(),
            action,
            model_id: model_id.map(str::to_string),
        };
        self.base.invoke(endpoint, custom_data, callback)
    }
}
