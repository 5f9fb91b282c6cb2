//! Template types for typed variable injection.
//!
//! A `Template<V>` pairs embedded text with the variable set that may be
//! substituted into it, so call sites cannot forget a placeholder.

use std::marker::PhantomData;

/// Variables that can be applied to template content.
pub trait TemplateVars {
    /// Substitute this variable set into `content`.
    fn apply(&self, content: &str) -> String;
}

/// An embedded text template with typed variables.
pub struct Template<V: TemplateVars> {
    content: &'static str,
    _vars: PhantomData<V>,
}

impl<V: TemplateVars> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _vars: PhantomData,
        }
    }

    /// Raw template text, placeholders intact.
    pub fn raw(&self) -> &'static str {
        self.content
    }

    /// Render the template with the given variables.
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}
