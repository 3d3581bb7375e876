//! Template-variable substitution.
//!
//! The dashboard host owns the variables; the datasource only asks it to
//! rewrite every string a target carries before the target is parsed.
use std::fmt;

/// Rewrites template variables in a string.
pub trait TemplateSrv: Send + Sync {
    /// Returns `input` with all template variables replaced.
    fn replace(&self, input: &str) -> String;
}

impl<F> TemplateSrv for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn replace(&self, input: &str) -> String {
        self(input)
    }
}

/// Leaves every string untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TemplateSrv for Identity {
    fn replace(&self, input: &str) -> String {
        input.to_string()
    }
}

impl fmt::Debug for dyn TemplateSrv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TemplateSrv")
    }
}
