//! Changes applied to a bug through its HTML edit form.

use crate::browser::{Form, ScraperResult};

/// Name of the whiteboard control in the bug form.
pub const WHITEBOARD_FIELD: &str = "status_whiteboard";

/// Set of changes for [`Bugzilla::update_bug`](super::Bugzilla::update_bug).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugUpdate {
    /// Form controls to overwrite, in order
    pub fields: Vec<(String, String)>,
    pub whiteboard_add: Option<String>,
    pub whiteboard_remove: Option<String>,
}

impl BugUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a form control
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Append a word to the whiteboard unless already present
    pub fn whiteboard_add(mut self, add: impl Into<String>) -> Self {
        self.whiteboard_add = Some(add.into());
        self
    }

    /// Remove every occurrence of a substring from the whiteboard
    pub fn whiteboard_remove(mut self, remove: impl Into<String>) -> Self {
        self.whiteboard_remove = Some(remove.into());
        self
    }

    pub fn touches_whiteboard(&self) -> bool {
        self.whiteboard_add.is_some() || self.whiteboard_remove.is_some()
    }

    /// Apply the plain field values; returns whether anything was set.
    pub fn apply_fields(&self, form: &mut Form) -> ScraperResult<bool> {
        for (name, value) in &self.fields {
            form.set(name, value.as_str())?;
        }
        Ok(!self.fields.is_empty())
    }

    /// Apply the whiteboard edits, see [`update_whiteboard`].
    pub fn apply_whiteboard(&self, form: &mut Form) -> ScraperResult<bool> {
        if !self.touches_whiteboard() {
            return Ok(false);
        }
        update_whiteboard(
            form,
            self.whiteboard_remove.as_deref(),
            self.whiteboard_add.as_deref(),
        )
    }
}

/// Edit the whiteboard in a bug form.
///
/// `remove` is dropped everywhere it occurs, `add` is appended after a space
/// when not already contained. Unchecks `addselfcc` so the edit does not add
/// the account to the CC list. Returns whether the whiteboard changed.
pub fn update_whiteboard(
    form: &mut Form,
    remove: Option<&str>,
    add: Option<&str>,
) -> ScraperResult<bool> {
    let original = form
        .get(WHITEBOARD_FIELD)
        .unwrap_or_default()
        .to_string();
    let mut whiteboard = original.clone();

    if let Some(remove) = remove {
        if whiteboard.contains(remove) {
            whiteboard = whiteboard.replace(remove, "");
        }
    }

    if let Some(add) = add {
        if !whiteboard.contains(add) {
            whiteboard = format!("{} {}", whiteboard, add);
        }
    }

    let changed = whiteboard != original;
    form.set(WHITEBOARD_FIELD, whiteboard)?;

    if form.has_control("addselfcc") {
        form.clear("addselfcc")?;
    }

    Ok(changed)
}
