//! Variable substitution for configured command lines.

use std::collections::HashMap;
use std::path::Path;

/// Variable substitution context for command templates.
///
/// Supports variable substitution in strings using the `{varname}` syntax.
///
/// # Example
///
/// ```
/// use dvrflow_av::TemplateContext;
/// use std::path::Path;
///
/// let ctx = TemplateContext::new().with_input(Path::new("/tmp/recording.ts"));
///
/// assert_eq!(ctx.substitute("--device={input}"), "--device=/tmp/recording.ts");
/// assert_eq!(ctx.substitute("--filesystem={dirname}"), "--filesystem=/tmp");
/// ```
#[derive(Debug, Clone)]
pub struct TemplateContext {
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty template context.
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    /// Set input-file variables.
    ///
    /// This adds the following variables:
    /// - `{input}` - Full path to the input file
    /// - `{filename}` - Input file name with extension
    /// - `{filestem}` - Input file name without extension
    /// - `{dirname}` - Input file parent directory
    pub fn with_input(mut self, input: &Path) -> Self {
        self.vars
            .insert("input".to_string(), input.display().to_string());

        if let Some(name) = input.file_name() {
            self.vars
                .insert("filename".to_string(), name.to_string_lossy().to_string());
        }
        if let Some(stem) = input.file_stem() {
            self.vars
                .insert("filestem".to_string(), stem.to_string_lossy().to_string());
        }
        if let Some(parent) = input.parent() {
            self.vars
                .insert("dirname".to_string(), parent.display().to_string());
        }

        self
    }

    /// Add a custom variable.
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Substitute variables in a string.
    ///
    /// Unknown variables are left untouched.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = template.to_string();
        for (key, value) in &self.vars {
            result = result.replace(&format!("{{{}}}", key), value);
        }
        result
    }

    /// Substitute variables in a list of strings.
    pub fn substitute_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.substitute(t)).collect()
    }
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self::new()
    }
}
