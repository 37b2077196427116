//! JSON payloads returned by the resource API
//!
//! Every route answers a flat JSON object. Which keys are present decides the
//! meaning, so the payload is deserialized permissively and interpreted by
//! the typed accessors below.

use crate::error::ApiError;
use crate::types::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw response object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Rendered view fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Raw result fragment (diagram, back, generators) or a status word
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Id of a freshly created resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Server-side rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Guidance attached to a rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    /// Back-navigation instruction: selector of the list-open control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_list_show: Option<String>,
    /// Hidden creation form shipped with list payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_form: Option<String>,
    /// Anything else (list payloads, serialized models)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiResponse {
    /// Response with a template
    #[must_use]
    pub fn template(html: impl Into<String>) -> Self {
        Self {
            template: Some(html.into()),
            ..Self::default()
        }
    }

    /// Response with a raw result
    #[must_use]
    pub fn result(html: impl Into<String>) -> Self {
        Self {
            result: Some(html.into()),
            ..Self::default()
        }
    }

    /// Response carrying a created id
    #[must_use]
    pub fn created(id: impl Into<ResourceId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Rejection response
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Rejection with helper text
    #[must_use]
    pub fn error_with_helper(message: impl Into<String>, helper: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            helper: Some(helper.into()),
            ..Self::default()
        }
    }

    /// List-replay instruction
    #[must_use]
    pub fn list_replay(selector: impl Into<String>) -> Self {
        Self {
            resource_list_show: Some(selector.into()),
            ..Self::default()
        }
    }

    /// Turn `{ error }` into `ApiError::Rejected`
    ///
    /// # Errors
    /// `ApiError::Rejected` when the payload carries an error
    pub fn accepted(self) -> Result<Self, ApiError> {
        match self.error {
            Some(message) => Err(ApiError::Rejected {
                message,
                helper: self.helper,
            }),
            None => Ok(self),
        }
    }

    /// Accepted payload's template
    ///
    /// # Errors
    /// Rejection, or `ApiError::Missing("template")`
    pub fn into_template(self) -> Result<String, ApiError> {
        self.accepted()?.template.ok_or(ApiError::Missing("template"))
    }

    /// Accepted payload's result fragment
    ///
    /// # Errors
    /// Rejection, or `ApiError::Missing("result")`
    pub fn into_result(self) -> Result<String, ApiError> {
        self.accepted()?.result.ok_or(ApiError::Missing("result"))
    }

    /// Accepted payload's result, falling back to its template
    ///
    /// # Errors
    /// Rejection, or `ApiError::Missing("result")` when neither is present
    pub fn into_result_or_template(self) -> Result<String, ApiError> {
        let accepted = self.accepted()?;
        accepted
            .result
            .or(accepted.template)
            .ok_or(ApiError::Missing("result"))
    }

    /// Accepted payload's created id
    ///
    /// # Errors
    /// Rejection, or `ApiError::Missing("id")`
    pub fn into_created_id(self) -> Result<ResourceId, ApiError> {
        self.accepted()?.id.ok_or(ApiError::Missing("id"))
    }

    /// Interpret a `/back` payload
    ///
    /// # Errors
    /// Rejection, or `ApiError::Missing("template|resource_list_show|result")`
    pub fn into_back(self) -> Result<BackResponse, ApiError> {
        let accepted = self.accepted()?;
        if let Some(template) = accepted.template {
            return Ok(BackResponse::Template(template));
        }
        if let Some(selector) = accepted.resource_list_show {
            return Ok(BackResponse::ListReplay(selector));
        }
        if let Some(result) = accepted.result {
            return Ok(BackResponse::Fragment(result));
        }
        Err(ApiError::Missing("template|resource_list_show|result"))
    }
}

/// The three shapes `/back` can answer with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackResponse {
    /// Full resource view
    Template(String),
    /// Re-trigger the list-open control matching this selector
    ListReplay(String),
    /// Raw fragment, rendered only when non-empty
    Fragment(String),
}
