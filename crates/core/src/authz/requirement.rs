//! What a route demands from the caller's grants.

use std::fmt;

/// Permission requirement of a gated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Exactly this permission code.
    Permission(String),
    /// Any one of these codes.
    AnyOf(Vec<String>),
}

impl Requirement {
    /// Requires a single permission code.
    #[must_use]
    pub fn permission(code: impl Into<String>) -> Self {
        Self::Permission(code.into())
    }

    /// Requires any one of `codes`.
    #[must_use]
    pub fn any_of(codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::AnyOf(codes.into_iter().map(Into::into).collect())
    }

    /// Whether a grant of `code` satisfies this requirement.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.codes().iter().any(|required| required == code)
    }

    /// The accepted codes.
    #[must_use]
    pub fn codes(&self) -> &[String] {
        match self {
            Self::Permission(code) => std::slice::from_ref(code),
            Self::AnyOf(codes) => codes,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.codes().join(" | "))
    }
}
