//! Button keyboards and rendered screens
//!
//! Handlers render a [`Screen`] (text plus button rows) and the Discord layer
//! turns it into message components. Keeping the layout platform-neutral lets
//! every menu be unit tested without a gateway connection.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Pagination helpers shared by the list screens
//! - 1.0.0: Initial release

use serenity::builder::CreateComponents;
use serenity::model::application::component::ButtonStyle;

/// Discord limit on buttons in one action row
pub const MAX_ROW_WIDTH: usize = 5;
/// Discord limit on action rows in one message
pub const MAX_ROWS: usize = 5;
/// Discord limit on custom id length
pub const MAX_CUSTOM_ID_LEN: usize = 100;
/// Discord limit on button label length
pub const MAX_LABEL_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl From<Style> for ButtonStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Primary => ButtonStyle::Primary,
            Style::Secondary => ButtonStyle::Secondary,
            Style::Success => ButtonStyle::Success,
            Style::Danger => ButtonStyle::Danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub custom_id: String,
    pub style: Style,
    pub disabled: bool,
}

impl Button {
    pub fn new(label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self {
            label: truncate_chars(&label.into(), MAX_LABEL_LEN),
            custom_id: custom_id.into(),
            style: Style::Secondary,
            disabled: false,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Rows of buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a full row of buttons, splitting it when it exceeds the row width
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        for chunk in buttons.chunks(MAX_ROW_WIDTH) {
            if !chunk.is_empty() {
                self.rows.push(chunk.to_vec());
            }
        }
        self
    }

    /// Lay out buttons in rows of the given widths; the last width repeats
    /// for any remaining buttons
    pub fn adjusted(buttons: Vec<Button>, widths: &[usize]) -> Self {
        let mut keyboard = Self::new();
        let mut iter = buttons.into_iter().peekable();
        let mut width_index = 0;

        while iter.peek().is_some() {
            let width = widths
                .get(width_index)
                .or_else(|| widths.last())
                .copied()
                .unwrap_or(1)
                .clamp(1, MAX_ROW_WIDTH);
            let row: Vec<Button> = iter.by_ref().take(width).collect();
            keyboard.rows.push(row);
            width_index += 1;
        }

        keyboard
    }

    /// Append all rows of another keyboard
    pub fn extend(mut self, other: Keyboard) -> Self {
        self.rows.extend(other.rows);
        self
    }

    pub fn rows(&self) -> &[Vec<Button>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Find a button by custom id
    pub fn find(&self, custom_id: &str) -> Option<&Button> {
        self.buttons().find(|b| b.custom_id == custom_id)
    }

    /// Check Discord component limits
    pub fn validate(&self) -> Result<(), String> {
        if self.rows.len() > MAX_ROWS {
            return Err(format!("{} rows exceed the limit of {MAX_ROWS}", self.rows.len()));
        }
        for button in self.buttons() {
            if button.custom_id.is_empty() || button.custom_id.len() > MAX_CUSTOM_ID_LEN {
                return Err(format!("invalid custom id '{}'", button.custom_id));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for button in self.buttons() {
            if !seen.insert(button.custom_id.as_str()) {
                return Err(format!("duplicate custom id '{}'", button.custom_id));
            }
        }
        Ok(())
    }

    /// Build serenity components, dropping rows beyond the Discord limit
    pub fn to_components(&self) -> CreateComponents {
        let mut components = CreateComponents::default();
        for row in self.rows.iter().take(MAX_ROWS) {
            components.create_action_row(|action_row| {
                for button in row {
                    action_row.create_button(|b| {
                        b.custom_id(&button.custom_id)
                            .label(&button.label)
                            .style(button.style.into())
                            .disabled(button.disabled)
                    });
                }
                action_row
            });
        }
        components
    }
}

/// Rendered message: text plus its keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Screen {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, Keyboard::new())
    }
}

/// One page of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Zero-based page index, clamped into range
    pub index: usize,
    pub total_pages: usize,
    /// Position of the first item in the full list
    pub offset: usize,
}

impl<'a, T> Page<'a, T> {
    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }
}

/// Slice out page `index`; out-of-range pages clamp to the last one
pub fn paginate<T>(items: &[T], index: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let index = index.min(total_pages - 1);
    let offset = index * per_page;
    let end = (offset + per_page).min(items.len());

    Page {
        items: &items[offset.min(end)..end],
        index,
        total_pages,
        offset,
    }
}

/// Previous / indicator / next buttons; `page_id` builds the id for a page
/// and `indicator_id` is used for the disabled page counter
pub fn nav_row<T>(page: &Page<'_, T>, page_id: impl Fn(usize) -> String, indicator_id: &str) -> Vec<Button> {
    if page.total_pages <= 1 {
        return Vec::new();
    }

    let mut row = Vec::with_capacity(3);
    if page.has_prev() {
        row.push(Button::new("⬅️", page_id(page.index - 1)));
    }
    row.push(
        Button::new(format!("📄 {}/{}", page.index + 1, page.total_pages), indicator_id)
            .disabled(true),
    );
    if page.has_next() {
        row.push(Button::new("➡️", page_id(page.index + 1)));
    }
    row
}

/// Truncate to at most `max` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
