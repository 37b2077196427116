//! Editable fields and their editor widgets
//!
//! A field element carries its identity and current value as data
//! attributes. Display text is always `"{label}: {value}"`.

use rcc_transport::ResourceRef;
use rcc_view::{Element, Node};
use serde::{Deserialize, Serialize};

/// Class of an editable field element
pub const FIELD_CLASS: &str = "resource-data-field";
/// Class present while a field accepts edits
pub const EDITABLE_CLASS: &str = "editable";
/// Class present while a field shows its editor
pub const EDITING_CLASS: &str = "editing";
/// Class of the editor input element
pub const EDITOR_INPUT_CLASS: &str = "field-editor";

/// Field value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Free text
    Text,
    /// Multi-line text
    Textarea,
    /// Numeric input
    Number,
    /// Checkbox
    Boolean,
    /// Select over fixed options
    Enum,
}

impl FieldType {
    /// Parse the `data-field-type` attribute; unknown types edit as text
    #[must_use]
    pub fn from_attr(raw: Option<&str>) -> Self {
        match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("number" | "numeric" | "integer" | "double" | "float") => Self::Number,
            Some("boolean" | "bool" | "checkbox") => Self::Boolean,
            Some("enum" | "select") => Self::Enum,
            Some("textarea" | "longtext" | "multiline") => Self::Textarea,
            _ => Self::Text,
        }
    }
}

/// Truthiness of a stored boolean value
///
/// Only the empty string and `"false"` are false.
#[inline]
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    !(value.is_empty() || value == "false")
}

/// Wire form of a checkbox state
#[inline]
#[must_use]
pub fn boolean_wire(checked: bool) -> &'static str {
    if checked {
        "true"
    } else {
        "false"
    }
}

/// Everything needed to edit one attribute of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Id of the field element
    pub element_id: String,
    /// Owning resource
    pub resource: ResourceRef,
    /// Attribute key sent to the server
    pub attribute_key: String,
    /// Attribute label shown to the user
    pub attribute_label: String,
    /// Value type
    pub field_type: FieldType,
    /// Last committed value
    pub current_value: String,
    /// Options of an enum field
    pub options: Vec<String>,
}

impl FieldDescriptor {
    /// Read a descriptor from a field element
    ///
    /// Returns `None` unless the element has an id, a resource and an
    /// attribute key.
    #[must_use]
    pub fn from_element(el: &Element) -> Option<Self> {
        let element_id = el.id()?.to_string();
        let kind = el.attr("data-resource")?;
        let id = el.attr("data-id")?;
        let attribute_key = el.attr("data-attr")?.to_string();
        let attribute_label = el
            .attr("data-attrname")
            .unwrap_or(&attribute_key)
            .to_string();
        let options = el
            .attr("data-options")
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default();
        Some(Self {
            element_id,
            resource: ResourceRef::new(kind, id),
            attribute_key,
            attribute_label,
            field_type: FieldType::from_attr(el.attr("data-field-type")),
            current_value: el.attr("data-val").unwrap_or_default().to_string(),
            options,
        })
    }

    /// Display text for a value
    #[must_use]
    pub fn display_text(&self, value: &str) -> String {
        format!("{}: {}", self.attribute_label, value)
    }

    /// Editor widget initialised from the current value
    #[must_use]
    pub fn widget(&self) -> Widget {
        match self.field_type {
            FieldType::Boolean => Widget::Checkbox {
                checked: is_truthy(&self.current_value),
            },
            FieldType::Enum => Widget::Select {
                options: self.options.clone(),
                selected: self.current_value.clone(),
            },
            FieldType::Number => Widget::NumberInput {
                value: self.current_value.clone(),
            },
            FieldType::Text => Widget::TextInput {
                value: self.current_value.clone(),
            },
            FieldType::Textarea => Widget::TextArea {
                value: self.current_value.clone(),
            },
        }
    }

    /// Normalise an input value into what the server expects
    #[must_use]
    pub fn wire_value(&self, input: &str) -> String {
        match self.field_type {
            FieldType::Boolean => boolean_wire(is_truthy(input)).to_string(),
            _ => input.to_string(),
        }
    }

    /// Show the field in display mode with `value`
    pub fn render_display(&self, el: &mut Element, value: &str) {
        el.remove_class(EDITING_CLASS);
        el.remove_attr("data-open");
        el.set_attr("data-val", value);
        el.set_text(self.display_text(value));
    }

    /// Replace the field content with its editor
    pub fn render_editor(&self, el: &mut Element) {
        el.add_class(EDITING_CLASS);
        el.set_attr("data-open", "true");
        let label = Element::new("label")
            .with_text(format!("{}: ", self.attribute_label))
            .with_child(self.widget().to_element(&self.element_id));
        el.children = vec![Node::Element(label)];
    }
}

/// Editor widget for a field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// `<input type="text">`
    TextInput {
        /// Initial value
        value: String,
    },
    /// `<textarea>`
    TextArea {
        /// Initial value
        value: String,
    },
    /// `<input type="number">`
    NumberInput {
        /// Initial value
        value: String,
    },
    /// `<input type="checkbox">`
    Checkbox {
        /// Initial state
        checked: bool,
    },
    /// `<select>`
    Select {
        /// Option values
        options: Vec<String>,
        /// Selected value
        selected: String,
    },
}

impl Widget {
    /// Initial input value as sent on commit
    #[must_use]
    pub fn initial_value(&self) -> String {
        match self {
            Self::TextInput { value } | Self::TextArea { value } | Self::NumberInput { value } => {
                value.clone()
            }
            Self::Checkbox { checked } => boolean_wire(*checked).to_string(),
            Self::Select { selected, .. } => selected.clone(),
        }
    }

    /// Markup element for the widget
    #[must_use]
    pub fn to_element(&self, field_id: &str) -> Element {
        let input_id = format!("{field_id}-input");
        match self {
            Self::TextInput { value } => Element::new("input")
                .with_id(input_id)
                .with_class(EDITOR_INPUT_CLASS)
                .with_attr("type", "text")
                .with_attr("value", value.as_str()),
            Self::TextArea { value } => Element::new("textarea")
                .with_id(input_id)
                .with_class(EDITOR_INPUT_CLASS)
                .with_text(value.as_str()),
            Self::NumberInput { value } => Element::new("input")
                .with_id(input_id)
                .with_class(EDITOR_INPUT_CLASS)
                .with_attr("type", "number")
                .with_attr("value", value.as_str()),
            Self::Checkbox { checked } => {
                let input = Element::new("input")
                    .with_id(input_id)
                    .with_class(EDITOR_INPUT_CLASS)
                    .with_attr("type", "checkbox");
                if *checked {
                    input.with_attr("checked", "checked")
                } else {
                    input
                }
            }
            Self::Select { options, selected } => {
                let mut select = Element::new("select")
                    .with_id(input_id)
                    .with_class(EDITOR_INPUT_CLASS);
                for option in options {
                    let mut opt = Element::new("option")
                        .with_attr("value", option.as_str())
                        .with_text(option.as_str());
                    if option == selected {
                        opt.set_attr("selected", "selected");
                    }
                    select.children.push(Node::Element(opt));
                }
                select
            }
        }
    }
}
