//! Typed facade over a [`Transport`]
//!
//! Each method issues exactly one exchange and interprets the payload shape
//! its route promises.

use crate::error::ApiError;
use crate::request::{ApiRequest, GeneratorKind};
use crate::response::{ApiResponse, BackResponse};
use crate::transport::Transport;
use crate::types::{FormData, ResourceId, ResourceRef};
use std::sync::Arc;

/// Payload of `GET /resources/{kind}`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPayload {
    /// Hidden creation form markup
    pub new_form: Option<String>,
    /// Selector of the control that reopens this list
    pub list_control: Option<String>,
    /// Remaining keys, handed to the external list widget
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Resource API client
#[derive(Clone)]
pub struct ResourceApi {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ResourceApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceApi").finish_non_exhaustive()
    }
}

impl ResourceApi {
    /// Create API client over a transport
    #[inline]
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Raw exchange
    ///
    /// # Errors
    /// `ApiError::Transport` on wire failure
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.transport.exchange(request).await?)
    }

    /// `GET /resources/{kind}`
    ///
    /// # Errors
    /// Transport failure or rejection
    pub async fn list(&self, kind: &str, redirected: bool) -> Result<ListPayload, ApiError> {
        let resp = self
            .send(ApiRequest::ListResources {
                kind: kind.to_string(),
                redirected,
            })
            .await?
            .accepted()?;
        Ok(ListPayload {
            new_form: resp.new_form,
            list_control: resp.resource_list_show,
            extra: resp.extra,
        })
    }

    /// `GET /show/{kind}/{id}` → template
    ///
    /// # Errors
    /// Transport failure, rejection, or missing template
    pub async fn show(&self, resource: &ResourceRef) -> Result<String, ApiError> {
        self.send(ApiRequest::ShowResource {
            resource: resource.clone(),
        })
        .await?
        .into_template()
    }

    /// `POST /resources/{kind}/{id}` with one attribute
    ///
    /// # Errors
    /// Transport failure or rejection
    pub async fn update_attribute(
        &self,
        resource: &ResourceRef,
        key: &str,
        value: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.update(resource, FormData::single(key, value)).await
    }

    /// `POST /resources/{kind}/{id}`
    ///
    /// # Errors
    /// Transport failure or rejection
    pub async fn update(&self, resource: &ResourceRef, form: FormData) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::UpdateResource {
            resource: resource.clone(),
            form,
        })
        .await?
        .accepted()
    }

    /// `DELETE /resources/{kind}/{id}`
    ///
    /// # Errors
    /// Transport failure or rejection
    pub async fn delete(&self, resource: &ResourceRef) -> Result<(), ApiError> {
        self.send(ApiRequest::DeleteResource {
            resource: resource.clone(),
        })
        .await?
        .accepted()
        .map(|_| ())
    }

    /// `POST /new/{kind}` → created id
    ///
    /// # Errors
    /// Transport failure, rejection, or missing id
    pub async fn create(&self, kind: &str, form: FormData) -> Result<ResourceId, ApiError> {
        self.send(ApiRequest::CreateResource {
            kind: kind.to_string(),
            form,
        })
        .await?
        .into_created_id()
    }

    /// `POST /new_association/...` → link template
    ///
    /// # Errors
    /// Transport failure, rejection, or missing template
    pub async fn link(
        &self,
        source: &ResourceRef,
        target: &ResourceRef,
        form: FormData,
    ) -> Result<String, ApiError> {
        self.send(ApiRequest::LinkAssociation {
            source: source.clone(),
            target: target.clone(),
            form,
        })
        .await?
        .into_template()
    }

    /// `POST /resources_delete`
    ///
    /// # Errors
    /// Transport failure or rejection
    pub async fn unlink(&self, form: FormData) -> Result<(), ApiError> {
        self.send(ApiRequest::Unlink { form })
            .await?
            .accepted()
            .map(|_| ())
    }

    /// `GET /diagram/{kind}/{id}` → result fragment
    ///
    /// # Errors
    /// Transport failure, rejection, or missing result
    pub async fn diagram(
        &self,
        resource: &ResourceRef,
        in_diagram: bool,
        group_id: Option<String>,
    ) -> Result<String, ApiError> {
        self.send(ApiRequest::Diagram {
            resource: resource.clone(),
            in_diagram,
            group_id,
        })
        .await?
        .into_result()
    }

    /// `GET /back`
    ///
    /// # Errors
    /// Transport failure, rejection, or an unrecognised shape
    pub async fn back(&self) -> Result<BackResponse, ApiError> {
        self.send(ApiRequest::Back).await?.into_back()
    }

    /// `POST /generate-*/{kind}/{id}` → result or template
    ///
    /// # Errors
    /// Transport failure or rejection (with helper text when provided)
    pub async fn generate(
        &self,
        generator: GeneratorKind,
        resource: &ResourceRef,
        form: FormData,
    ) -> Result<String, ApiError> {
        self.send(ApiRequest::Generate {
            generator,
            resource: resource.clone(),
            form,
        })
        .await?
        .into_result_or_template()
    }
}
