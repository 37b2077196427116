//! Typed routes of the resource API

use crate::types::{FormData, ResourceRef};
use std::fmt;

/// HTTP verb of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read
    Get,
    /// Create / update / action
    Post,
    /// Delete
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// Server-side generators whose output the console only displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    /// `/generate-report`
    Report,
    /// `/generate-graph`
    Graph,
    /// `/generate-comparison`
    Comparison,
}

impl GeneratorKind {
    fn route(self) -> &'static str {
        match self {
            GeneratorKind::Report => "generate-report",
            GeneratorKind::Graph => "generate-graph",
            GeneratorKind::Comparison => "generate-comparison",
        }
    }
}

impl std::str::FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(GeneratorKind::Report),
            "graph" => Ok(GeneratorKind::Graph),
            "comparison" => Ok(GeneratorKind::Comparison),
            other => Err(format!("unknown generator: {other}")),
        }
    }
}

/// One request/response exchange against the resource API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    /// `GET /resources/{kind}`
    ListResources {
        /// Resource kind
        kind: String,
        /// Set when the list is being reopened by back-navigation
        redirected: bool,
    },
    /// `GET /show/{kind}/{id}`
    ShowResource {
        /// Resource to render
        resource: ResourceRef,
    },
    /// `POST /resources/{kind}/{id}`
    UpdateResource {
        /// Resource to update
        resource: ResourceRef,
        /// Attributes to write
        form: FormData,
    },
    /// `DELETE /resources/{kind}/{id}`
    DeleteResource {
        /// Resource to delete
        resource: ResourceRef,
    },
    /// `POST /new/{kind}`
    CreateResource {
        /// Kind to create
        kind: String,
        /// Creation form
        form: FormData,
    },
    /// `POST /new_association/{srcKind}/{assocKind}/{srcId}/{assocId}`
    LinkAssociation {
        /// Owning resource
        source: ResourceRef,
        /// Associated resource
        target: ResourceRef,
        /// Submitted form, including `_association_name`
        form: FormData,
    },
    /// `POST /resources_delete`
    Unlink {
        /// `associationRef`, `resource`, `id`, `association`, `association_id`
        form: FormData,
    },
    /// `GET /diagram/{kind}/{id}?in_diagram={bool}`
    Diagram {
        /// Node resource
        resource: ResourceRef,
        /// Nested in-place expansion rather than a top-level render
        in_diagram: bool,
        /// Optional grouping filter
        group_id: Option<String>,
    },
    /// `GET /back`
    Back,
    /// `POST /generate-{report|graph|comparison}/{kind}/{id}`
    Generate {
        /// Which generator
        generator: GeneratorKind,
        /// Subject resource
        resource: ResourceRef,
        /// Generator options
        form: FormData,
    },
}

impl ApiRequest {
    /// HTTP verb
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::ListResources { .. }
            | ApiRequest::ShowResource { .. }
            | ApiRequest::Diagram { .. }
            | ApiRequest::Back => Method::Get,
            ApiRequest::DeleteResource { .. } => Method::Delete,
            ApiRequest::UpdateResource { .. }
            | ApiRequest::CreateResource { .. }
            | ApiRequest::LinkAssociation { .. }
            | ApiRequest::Unlink { .. }
            | ApiRequest::Generate { .. } => Method::Post,
        }
    }

    /// Unencoded path segments
    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        match self {
            ApiRequest::ListResources { kind, .. } => vec!["resources".into(), kind.clone()],
            ApiRequest::ShowResource { resource } => {
                vec!["show".into(), resource.kind.clone(), resource.id.to_string()]
            }
            ApiRequest::UpdateResource { resource, .. } | ApiRequest::DeleteResource { resource } => {
                vec!["resources".into(), resource.kind.clone(), resource.id.to_string()]
            }
            ApiRequest::CreateResource { kind, .. } => vec!["new".into(), kind.clone()],
            ApiRequest::LinkAssociation { source, target, .. } => vec![
                "new_association".into(),
                source.kind.clone(),
                target.kind.clone(),
                source.id.to_string(),
                target.id.to_string(),
            ],
            ApiRequest::Unlink { .. } => vec!["resources_delete".into()],
            ApiRequest::Diagram { resource, .. } => {
                vec!["diagram".into(), resource.kind.clone(), resource.id.to_string()]
            }
            ApiRequest::Back => vec!["back".into()],
            ApiRequest::Generate {
                generator,
                resource,
                ..
            } => vec![
                generator.route().into(),
                resource.kind.clone(),
                resource.id.to_string(),
            ],
        }
    }

    /// Path for logging
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// Query (GET) or form (POST/DELETE) parameters
    #[must_use]
    pub fn params(&self) -> FormData {
        match self {
            ApiRequest::ListResources { redirected, .. } if *redirected => {
                FormData::single("redirected", "true")
            }
            ApiRequest::Diagram {
                in_diagram,
                group_id,
                ..
            } => {
                let mut params = FormData::single("in_diagram", in_diagram.to_string());
                if let Some(group) = group_id {
                    params.push("group_id", group.clone());
                }
                params
            }
            ApiRequest::UpdateResource { form, .. }
            | ApiRequest::CreateResource { form, .. }
            | ApiRequest::LinkAssociation { form, .. }
            | ApiRequest::Unlink { form }
            | ApiRequest::Generate { form, .. } => form.clone(),
            _ => FormData::new(),
        }
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}
