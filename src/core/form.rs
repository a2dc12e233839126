//! Modal forms
//!
//! A [`Form`] describes a Discord modal; submitted values come back as
//! [`FormValues`]. Fields can carry a pre-filled value so a form re-opened
//! after a validation error keeps what the user typed.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use serenity::builder::CreateComponents;
use serenity::model::application::component::InputTextStyle;
use std::collections::HashMap;

/// Discord limit on text inputs in one modal
pub const MAX_FIELDS: usize = 5;
/// Discord limit on modal titles
pub const MAX_TITLE_LEN: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    Short,
    Paragraph,
}

impl From<FieldStyle> for InputTextStyle {
    fn from(style: FieldStyle) -> Self {
        match style {
            FieldStyle::Short => InputTextStyle::Short,
            FieldStyle::Paragraph => InputTextStyle::Paragraph,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub custom_id: String,
    pub label: String,
    pub style: FieldStyle,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub required: bool,
    pub max_length: Option<u64>,
}

impl FormField {
    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style: FieldStyle::Short,
            placeholder: None,
            value: None,
            required: true,
            max_length: None,
        }
    }

    pub fn paragraph(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            style: FieldStyle::Paragraph,
            ..Self::short(custom_id, label)
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Pre-fill the field; empty values are ignored
    pub fn value(mut self, value: Option<&str>) -> Self {
        self.value = value.filter(|v| !v.is_empty()).map(str::to_string);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn new(custom_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            title: title.into().chars().take(MAX_TITLE_LEN).collect(),
            fields: Vec::new(),
        }
    }

    /// Add a field; fields beyond the Discord limit are dropped
    pub fn field(mut self, field: FormField) -> Self {
        if self.fields.len() < MAX_FIELDS {
            self.fields.push(field);
        }
        self
    }

    /// One action row per text input
    pub fn to_components(&self) -> CreateComponents {
        let mut components = CreateComponents::default();
        for field in &self.fields {
            components.create_action_row(|row| {
                row.create_input_text(|input| {
                    input
                        .custom_id(&field.custom_id)
                        .label(&field.label)
                        .style(field.style.into())
                        .required(field.required);
                    if let Some(placeholder) = &field.placeholder {
                        input.placeholder(placeholder);
                    }
                    if let Some(value) = &field.value {
                        input.value(value);
                    }
                    if let Some(max_length) = field.max_length {
                        input.max_length(max_length);
                    }
                    input
                })
            });
        }
        components
    }
}

/// Values submitted through a form, keyed by field id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(HashMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, custom_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(custom_id.into(), value.into());
    }

    /// Submitted value, empty when the field was left out
    pub fn get(&self, custom_id: &str) -> &str {
        self.0.get(custom_id).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_limit() {
        let form = (0..7).fold(Form::new("task:form", "New task"), |form, i| {
            form.field(FormField::short(format!("f{i}"), "Field"))
        });
        assert_eq!(form.fields.len(), MAX_FIELDS);
    }

    #[test]
    fn test_title_truncated() {
        let form = Form::new("x", "t".repeat(60));
        assert_eq!(form.title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_prefill_ignores_empty() {
        let field = FormField::short("title", "Title").value(Some(""));
        assert!(field.value.is_none());
        let field = FormField::short("title", "Title").value(Some("Buy milk"));
        assert_eq!(field.value.as_deref(), Some("Buy milk"));
    }

    #[test]
    fn test_form_values_lookup() {
        let values: FormValues = [("title", "Buy milk")].into_iter().collect();
        assert_eq!(values.get("title"), "Buy milk");
        assert_eq!(values.get("description"), "");
    }
}
