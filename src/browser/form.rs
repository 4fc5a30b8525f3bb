//! HTML form model.
//!
//! A [`Form`] is a detached copy of a form found on a page. Values are edited
//! in place and the form is then handed back to
//! [`WebScraper::submit`](super::WebScraper::submit), which encodes the
//! successful controls the way a browser would.

use super::error::{ScraperError, ScraperResult};

/// Kind of a form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Hidden,
    Password,
    Checkbox,
    Radio,
    Submit,
    Image,
    File,
    Reset,
    Textarea,
    Select { multiple: bool },
    /// Any other `<input type>` or a plain `<button type="button">`
    Other(String),
}

impl ControlKind {
    /// Map an `<input type="...">` value to a kind.
    pub fn from_input_type(input_type: &str) -> Self {
        match input_type.to_ascii_lowercase().as_str() {
            "text" | "" => ControlKind::Text,
            "hidden" => ControlKind::Hidden,
            "password" => ControlKind::Password,
            "checkbox" => ControlKind::Checkbox,
            "radio" => ControlKind::Radio,
            "submit" => ControlKind::Submit,
            "image" => ControlKind::Image,
            "file" => ControlKind::File,
            "reset" => ControlKind::Reset,
            other => ControlKind::Other(other.to_string()),
        }
    }

    /// Whether the control carries free-form text (HTML5 input types such
    /// as `email` or `date` included).
    fn is_textual(&self) -> bool {
        matches!(
            self,
            ControlKind::Text
                | ControlKind::Hidden
                | ControlKind::Password
                | ControlKind::Textarea
        ) || matches!(self, ControlKind::Other(kind) if kind != "button")
    }
}

/// A single named control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub name: String,
    pub kind: ControlKind,
    /// Current values: one for text controls, the checked value for
    /// checkboxes and radios (empty when unchecked), the selected options
    /// for selects.
    pub values: Vec<String>,
    /// Possible values for checkboxes, radios and selects.
    pub options: Vec<String>,
    pub disabled: bool,
}

impl Control {
    pub fn new(name: impl Into<String>, kind: ControlKind, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
            options: Vec::new(),
            disabled: false,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// First current value.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    fn check_options(&self, values: &[String]) -> ScraperResult<()> {
        if !matches!(self.kind, ControlKind::Select { .. }) {
            return Ok(());
        }
        match values.iter().find(|value| !self.options.contains(*value)) {
            Some(value) => Err(invalid_option(&self.name, value)),
            None => Ok(()),
        }
    }
}

fn invalid_option(control: &str, value: &str) -> ScraperError {
    ScraperError::InvalidOption {
        control: control.to_string(),
        value: value.to_string(),
    }
}

/// A form found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub name: Option<String>,
    pub id: Option<String>,
    /// Raw `action` attribute, resolved against the page URL on submit
    pub action: String,
    /// Uppercase HTTP method (`GET` or `POST`)
    pub method: String,
    pub controls: Vec<Control>,
}

impl Form {
    pub fn new(
        name: Option<String>,
        id: Option<String>,
        action: impl Into<String>,
        method: &str,
    ) -> Self {
        let method = match method.to_ascii_uppercase().as_str() {
            "POST" => "POST",
            _ => "GET",
        };
        Self {
            name,
            id,
            action: action.into(),
            method: method.to_string(),
            controls: Vec::new(),
        }
    }

    /// First control with the given name.
    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|control| control.name == name)
    }

    fn control_mut(&mut self, name: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|control| control.name == name)
    }

    pub fn has_control(&self, name: &str) -> bool {
        self.control(name).is_some()
    }

    /// First value of the named control.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.control(name).and_then(Control::value)
    }

    /// Set the value of a control.
    ///
    /// For a radio group the matching button is checked and its siblings
    /// unchecked. Selects and radio groups only accept one of their options.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> ScraperResult<()> {
        let value = value.into();
        let kind = self
            .control(name)
            .map(|control| control.kind.clone())
            .ok_or_else(|| ScraperError::ControlNotFound(name.to_string()))?;

        match kind {
            ControlKind::Radio => {
                let offered = self
                    .controls
                    .iter()
                    .filter(|c| c.name == name)
                    .any(|c| c.options.contains(&value));
                if !offered {
                    return Err(invalid_option(name, &value));
                }
                for control in self.controls.iter_mut().filter(|c| c.name == name) {
                    control.values = if control.options.contains(&value) {
                        vec![value.clone()]
                    } else {
                        Vec::new()
                    };
                }
            }
            _ => {
                if let Some(control) = self.control_mut(name) {
                    control.check_options(std::slice::from_ref(&value))?;
                    control.values = vec![value];
                }
            }
        }
        Ok(())
    }

    /// Replace all values of a control (multi-selects).
    pub fn set_values(&mut self, name: &str, values: Vec<String>) -> ScraperResult<()> {
        let control = self
            .control_mut(name)
            .ok_or_else(|| ScraperError::ControlNotFound(name.to_string()))?;
        control.check_options(&values)?;
        control.values = values;
        Ok(())
    }

    /// Uncheck a checkbox or empty any other control.
    pub fn clear(&mut self, name: &str) -> ScraperResult<()> {
        let mut found = false;
        for control in self.controls.iter_mut().filter(|c| c.name == name) {
            control.values.clear();
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(ScraperError::ControlNotFound(name.to_string()))
        }
    }

    /// Name/value pairs a browser would send when submitting the form with
    /// its first submit button.
    pub fn successful_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut submit_seen = false;

        for control in self.controls.iter().filter(|c| !c.disabled) {
            match &control.kind {
                ControlKind::Submit => {
                    if !submit_seen {
                        submit_seen = true;
                        pairs.push((
                            control.name.clone(),
                            control.value().unwrap_or_default().to_string(),
                        ));
                    }
                }
                ControlKind::Checkbox | ControlKind::Radio | ControlKind::Select { .. } => {
                    for value in &control.values {
                        pairs.push((control.name.clone(), value.clone()));
                    }
                }
                kind if kind.is_textual() => {
                    pairs.push((
                        control.name.clone(),
                        control.value().unwrap_or_default().to_string(),
                    ));
                }
                _ => {}
            }
        }

        pairs
    }
}
