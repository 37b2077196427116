//! Navigation
//!
//! Resource views replace the results region wholesale. The active tab
//! survives a re-render when the new view still has a tab with the same id;
//! a view reached through `/back` always opens on its first tab.
//! The back stack lives on the server; `/back` answers with one of three
//! shapes and the controller dispatches on it.

use crate::binder::Binding;
use crate::controller::Controller;
use crate::diagram::RenderContext;
use crate::error::ControllerError;
use rcc_transport::{BackResponse, FormData, ResourceRef};
use rcc_view::{Document, Element, Fragment, Node, Selector};
use serde::{Deserialize, Serialize};

/// Class of the element identifying a full resource view
pub const RESOURCE_VIEW_CLASS: &str = "resource-view";
/// Class of a tab control
pub const TAB_CLASS: &str = "nav-link";
/// Attribute set on back controls once used
pub const CLICKED_ATTR: &str = "data-clicked";

/// Where the user is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationContext {
    /// Resource shown in the results region
    pub current: Option<ResourceRef>,
    /// Id of the active tab
    pub active_tab: Option<String>,
    /// What the results region currently renders
    pub render_context: Option<RenderContext>,
}

/// Which tab to activate after a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabPreference {
    /// This tab if it still exists, else the first
    Keep(String),
    /// The first tab
    First,
}

impl TabPreference {
    /// Keep `tab` when known
    #[must_use]
    pub fn from_active(tab: Option<String>) -> Self {
        tab.map_or(Self::First, Self::Keep)
    }
}

/// Id of the tab currently marked active under `region_id`
#[must_use]
pub fn active_tab(document: &Document, region_id: &str) -> Option<String> {
    document
        .get(region_id)
        .ok()?
        .descendants()
        .find(|el| el.has_class(TAB_CLASS) && el.has_class("active"))
        .and_then(Element::id)
        .map(str::to_string)
}

/// Activate the preferred tab under `region`, returning the tab activated
pub fn restore_tab(region: &mut Element, preference: &TabPreference) -> Option<String> {
    let tabs: Vec<(String, Option<String>)> = region
        .descendants()
        .filter(|el| el.has_class(TAB_CLASS))
        .filter_map(|el| {
            let id = el.id()?.to_string();
            let pane = el
                .attr("data-target")
                .or_else(|| el.attr("href"))
                .map(|p| p.trim_start_matches('#').to_string())
                .filter(|p| !p.is_empty());
            Some((id, pane))
        })
        .collect();
    let chosen = match preference {
        TabPreference::Keep(id) if tabs.iter().any(|(t, _)| t == id) => id.clone(),
        _ => tabs.first()?.0.clone(),
    };
    for (tab, pane) in &tabs {
        let active = *tab == chosen;
        if let Some(el) = region.find_by_id_mut(tab) {
            set_active(el, active);
        }
        if let Some(el) = pane.as_deref().and_then(|p| region.find_by_id_mut(p)) {
            set_active(el, active);
        }
    }
    Some(chosen)
}

fn set_active(el: &mut Element, active: bool) {
    if active {
        el.add_class("active");
    } else {
        el.remove_class("active");
    }
}

/// Resource a rendered view is about, read from its marker element
#[must_use]
pub fn view_resource(fragment: &Fragment) -> Option<ResourceRef> {
    fragment
        .elements()
        .flat_map(|el| std::iter::once(el).chain(el.descendants()))
        .find(|el| el.has_class(RESOURCE_VIEW_CLASS))
        .and_then(|el| Some(ResourceRef::new(el.attr("data-resource")?, el.attr("data-id")?)))
}

/// What `/back` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// Rendered a full resource view
    View(Option<ResourceRef>),
    /// Re-opened the list of this kind
    List(String),
    /// Rendered a raw fragment
    Fragment,
    /// Nothing to render
    Empty,
    /// The list control named by the server is not on the page
    Unresolved(String),
}

/// A list opened in the results region
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList {
    /// Listed kind
    pub kind: String,
    /// Whether a creation form was rendered
    pub has_new_form: bool,
    /// Remaining payload keys, for the external list widget
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Controller {
    /// Show a resource in the results region
    ///
    /// # Errors
    /// Rejection or transport failure, already reported
    #[tracing::instrument(skip_all, fields(resource = %resource))]
    pub async fn show_resource(&self, resource: &ResourceRef) -> Result<(), ControllerError> {
        let html = match self.api.show(resource).await {
            Ok(html) => html,
            Err(e) => return self.fail(ControllerError::from_api(e)),
        };
        let fragment = Fragment::parse(&html);
        let shown = view_resource(&fragment).unwrap_or_else(|| resource.clone());
        let region = self.config.results_region.clone();
        let tab = self.with_scope(|scope| {
            TabPreference::from_active(
                active_tab(&scope.document, &region).or_else(|| scope.navigation.active_tab.clone()),
            )
        });
        self.render_view(fragment, Some(shown), tab)?;
        tracing::info!("resource shown");
        Ok(())
    }

    /// Render a full resource view and activate the preferred tab
    fn render_view(
        &self,
        fragment: Fragment,
        resource: Option<ResourceRef>,
        tab: TabPreference,
    ) -> Result<(), ControllerError> {
        let region = self.config.results_region.clone();
        let rendered = self.with_scope(|scope| {
            scope.render_region(&self.binder, &region, fragment.into_nodes(), tab)?;
            scope.navigation.render_context = resource
                .clone()
                .map(|resource| RenderContext::ResourceView { resource });
            scope.navigation.current = resource;
            Ok::<_, rcc_view::ViewError>(())
        });
        match rendered {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Activate a tab of the current view
    ///
    /// # Errors
    /// `ControllerError::Unbound` when `tab_id` is not a tab
    pub fn activate_tab(&self, tab_id: &str) -> Result<(), ControllerError> {
        let region = self.config.results_region.clone();
        self.with_scope(|scope| {
            if !matches!(scope.bindings.get(tab_id), Some(Binding::Tab { .. })) {
                return Err(ControllerError::Unbound(tab_id.to_string()));
            }
            let el = scope.document.get_mut(&region)?;
            scope.navigation.active_tab = restore_tab(el, &TabPreference::Keep(tab_id.to_string()));
            Ok(())
        })
    }

    /// Go back one step on the server-held navigation stack
    ///
    /// # Errors
    /// Rejection (`Unable to go back.`) or transport failure, already
    /// reported
    #[tracing::instrument(skip(self))]
    pub async fn go_back(&self) -> Result<BackOutcome, ControllerError> {
        self.with_scope(|scope| {
            let controls: Vec<String> = scope.bindings.back_controls().map(str::to_string).collect();
            for id in controls {
                if let Ok(el) = scope.document.get_mut(&id) {
                    el.set_attr(CLICKED_ATTR, "true");
                }
            }
        });

        let response = match self.api.back().await {
            Ok(response) => response,
            Err(e) => return self.fail(ControllerError::from_api(e)),
        };

        match response {
            BackResponse::Template(html) => {
                let fragment = Fragment::parse(&html);
                let resource = view_resource(&fragment);
                self.render_view(fragment, resource.clone(), TabPreference::First)?;
                Ok(BackOutcome::View(resource))
            }
            BackResponse::ListReplay(selector) => {
                let kind = self.with_scope(|scope| {
                    let parsed = Selector::parse(&selector).ok()?;
                    let id = match parsed.as_id() {
                        Some(id) => id.to_string(),
                        None => scope.document.select_first(&parsed)?.id()?.to_string(),
                    };
                    scope.bindings.list_kind(&id).map(str::to_string)
                });
                match kind {
                    Some(kind) => {
                        self.open_resource_list(&kind).await?;
                        Ok(BackOutcome::List(kind))
                    }
                    None => {
                        tracing::warn!(%selector, "back target list control not on page");
                        Ok(BackOutcome::Unresolved(selector))
                    }
                }
            }
            BackResponse::Fragment(html) => {
                let fragment = Fragment::parse(&html);
                if fragment.is_blank() {
                    tracing::debug!("back returned empty result");
                    return Ok(BackOutcome::Empty);
                }
                let region = self.config.results_region.clone();
                let rendered = self.with_scope(|scope| {
                    scope.navigation.current = None;
                    scope.navigation.render_context = None;
                    scope.render_region(&self.binder, &region, fragment.into_nodes(), TabPreference::First)
                });
                match rendered {
                    Ok(()) => Ok(BackOutcome::Fragment),
                    Err(e) => self.fail(e.into()),
                }
            }
        }
    }

    /// Open the list of a resource kind
    ///
    /// Passes `redirected` when a back control was used since the last
    /// list load.
    ///
    /// # Errors
    /// Rejection or transport failure, already reported
    #[tracing::instrument(skip(self))]
    pub async fn open_resource_list(&self, kind: &str) -> Result<ResourceList, ControllerError> {
        let redirected = self.with_scope(|scope| {
            let controls: Vec<String> = scope.bindings.back_controls().map(str::to_string).collect();
            let mut clicked = false;
            for id in controls {
                if let Ok(el) = scope.document.get_mut(&id) {
                    clicked |= el.remove_attr(CLICKED_ATTR).is_some_and(|v| v == "true");
                }
            }
            clicked
        });

        let payload = match self.api.list(kind, redirected).await {
            Ok(payload) => payload,
            Err(e) => return self.fail(ControllerError::from_api(e)),
        };

        let region = self.config.results_region.clone();
        let has_new_form = payload.new_form.is_some();
        let rendered = self.with_scope(|scope| {
            let label = scope
                .bindings
                .iter()
                .find(|(_, b)| matches!(b, Binding::ListControl(k) if k == kind))
                .and_then(|(id, _)| scope.document.get(id).ok())
                .map(|el| el.text_content().trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| kind.to_string());
            let list = list_markup(kind, &label, payload.new_form.as_deref());
            scope.navigation.current = None;
            scope.navigation.render_context = None;
            scope.render_region(&self.binder, &region, vec![Node::Element(list)], TabPreference::First)
        });
        if let Err(e) = rendered {
            return self.fail(e.into());
        }
        tracing::info!(redirected, has_new_form, "list opened");
        Ok(ResourceList {
            kind: kind.to_string(),
            has_new_form,
            extra: payload.extra,
        })
    }

    /// Create a resource and show it
    ///
    /// # Errors
    /// `ControllerError::Creation` on rejection, or transport failure;
    /// already reported
    #[tracing::instrument(skip(self, form))]
    pub async fn create_resource(&self, kind: &str, form: FormData) -> Result<ResourceRef, ControllerError> {
        let id = match self.api.create(kind, form).await {
            Ok(id) => id,
            Err(e) => return self.fail(ControllerError::from_create(e)),
        };
        let resource = ResourceRef::new(kind, id);
        tracing::info!(%resource, "resource created");
        self.show_resource(&resource).await?;
        Ok(resource)
    }

    /// Delete a resource and drop its row from the page
    ///
    /// # Errors
    /// Rejection or transport failure, already reported
    #[tracing::instrument(skip_all, fields(resource = %resource))]
    pub async fn delete_resource(&self, resource: &ResourceRef) -> Result<(), ControllerError> {
        if let Err(e) = self.api.delete(resource).await {
            return self.fail(ControllerError::from_api(e));
        }
        let region = self.config.results_region.clone();
        let cleared = self.with_scope(|scope| {
            let row = format!("row-{}-{}", resource.kind, resource.id);
            if scope.document.contains(&row) {
                scope.document.remove(&row)?;
                scope.rebind(&self.binder, &region)?;
                scope.recompute(&region)?;
            }
            if scope.navigation.current.as_ref() == Some(resource) {
                scope.navigation.current = None;
                scope.navigation.render_context = None;
                scope.render_region(&self.binder, &region, Vec::new(), TabPreference::First)?;
            }
            Ok::<_, rcc_view::ViewError>(())
        });
        match cleared {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Show or hide the creation panel of a toggle; returns visibility
    ///
    /// # Errors
    /// `ControllerError::Unbound` when `toggle_id` is not a toggle,
    /// `ControllerError::View` when its panel is gone
    pub fn toggle_new_form(&self, toggle_id: &str) -> Result<bool, ControllerError> {
        self.with_scope(|scope| {
            let panel = match scope.bindings.get(toggle_id) {
                Some(Binding::NewToggle { panel }) => panel.clone(),
                _ => return Err(ControllerError::Unbound(toggle_id.to_string())),
            };
            let el = scope.document.get_mut(&panel)?;
            let visible = el.remove_attr("hidden").is_some();
            if !visible {
                el.set_attr("hidden", "hidden");
            }
            Ok(visible)
        })
    }
}

/// List page: heading, optional creation toggle and panel, table slot
fn list_markup(kind: &str, label: &str, new_form: Option<&str>) -> Element {
    let mut list = Element::new("div")
        .with_class("resource-list")
        .with_attr("data-resource", kind)
        .with_child(Element::new("h3").with_text(label));
    if let Some(form) = new_form {
        let panel_id = format!("new-{kind}-panel");
        list = list
            .with_child(
                Element::new("a")
                    .with_id(format!("new-{kind}-link"))
                    .with_class("resource-new-link")
                    .with_attr("data-target", panel_id.as_str())
                    .with_text("(New)"),
            )
            .with_child({
                let mut panel = Element::new("div")
                    .with_id(panel_id)
                    .with_class("resource-new-panel")
                    .with_attr("hidden", "hidden");
                panel.children = Fragment::parse(form).into_nodes();
                panel
            });
    }
    list.with_child(
        Element::new("div")
            .with_id(format!("{kind}-list"))
            .with_class("resource-list-table"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABS: &str = r##"<div id="results">
        <a id="tab-info" class="nav-link active" data-target="pane-info">Info</a>
        <a id="tab-markets" class="nav-link" href="#pane-markets">Markets</a>
        <div id="pane-info" class="tab-pane active"></div>
        <div id="pane-markets" class="tab-pane"></div>
      </div>"##;

    #[test]
    fn keeps_requested_tab_and_pane() {
        let mut doc = Document::parse(TABS);
        let chosen = restore_tab(doc.root_mut(), &TabPreference::Keep("tab-markets".into()));
        assert_eq!(chosen.as_deref(), Some("tab-markets"));
        assert!(doc.get("tab-markets").unwrap().has_class("active"));
        assert!(doc.get("pane-markets").unwrap().has_class("active"));
        assert!(!doc.get("tab-info").unwrap().has_class("active"));
        assert!(!doc.get("pane-info").unwrap().has_class("active"));
        assert_eq!(active_tab(&doc, "results").as_deref(), Some("tab-markets"));
    }

    #[test]
    fn unknown_tab_falls_back_to_first() {
        let mut doc = Document::parse(TABS);
        let chosen = restore_tab(doc.root_mut(), &TabPreference::Keep("tab-gone".into()));
        assert_eq!(chosen.as_deref(), Some("tab-info"));
    }

    #[test]
    fn no_tabs_no_choice() {
        let mut doc = Document::parse(r#"<div id="results"><p>x</p></div>"#);
        assert_eq!(restore_tab(doc.root_mut(), &TabPreference::First), None);
    }

    #[test]
    fn view_marker_names_resource() {
        let fragment =
            Fragment::parse(r#"<div><section class="resource-view" data-resource="Region" data-id="9"></section></div>"#);
        assert_eq!(view_resource(&fragment), Some(ResourceRef::new("Region", 9u64)));
        assert_eq!(view_resource(&Fragment::parse("<p>x</p>")), None);
    }

    #[test]
    fn list_markup_hides_new_form() {
        let list = list_markup("Market", "Markets", Some("<form id=\"f\"></form>"));
        let panel = list.find_by_id("new-Market-panel").unwrap();
        assert!(panel.has_attr("hidden"));
        assert!(panel.find_by_id("f").is_some());
        assert!(list_markup("Market", "Markets", None).find_by_id("new-Market-link").is_none());
    }
}
