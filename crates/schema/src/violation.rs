use std::fmt;

/// Leading token of every rendered violation list.
pub const VIOLATION_MARKER: &str = "jsonschema: ";

/// What a payload got wrong at one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Required,
    InvalidType { expected: &'static str, found: &'static str },
    NotAllowed,
    NotInEnum { allowed: Vec<&'static str> },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("is required"),
            Self::InvalidType { expected, found } => {
                write!(f, "invalid type: expected {expected}, found {found}")
            },
            Self::NotAllowed => f.write_str("is not an allowed field"),
            Self::NotInEnum { allowed } => write!(f, "must be one of: {}", allowed.join(", ")),
        }
    }
}

/// One violation: a dot-joined path of wire names plus the broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    path: String,
    rule: Rule,
}

impl Violation {
    #[must_use]
    pub fn new(path: &str, rule: Rule) -> Self {
        Self { path: path.to_owned(), rule }
    }

    /// Location of the violation; empty for the document root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn rule(&self) -> &Rule {
        &self.rule
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(root)" } else { &self.path };
        write!(f, "- {path}: {}", self.rule)
    }
}

/// Non-empty, ordered list of violations found in one payload.
///
/// Renders as the marker followed by one line per violation:
///
/// ```text
/// jsonschema: - value.Embed.A: is required
/// - value.Extra: is not an allowed field
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub(crate) const fn new(found: Vec<Violation>) -> Self {
        Self(found)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(VIOLATION_MARKER)?;
        for violation in &self.0 {
            writeln!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}
