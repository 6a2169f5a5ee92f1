use std::fmt;

use thiserror::Error;

/// Broad classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An engine invariant was violated. Aborts the whole run.
    Configuration,
    /// A declaration is wrong. Abandons only the affected container.
    UserInput,
    /// A named module could not be found.
    MissingDependency,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::UserInput => write!(f, "user input"),
            Self::MissingDependency => write!(f, "missing dependency"),
        }
    }
}

/// Errors produced while resolving container content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{container}: unsupported arch {arch:?}")]
    UnknownArch { container: String, arch: String },

    #[error("module {module:?} has no variant assigned for container {container:?}")]
    MissingVariant { container: String, module: String },

    #[error("{container}: {property}: {message}")]
    Property {
        container: String,
        property: String,
        message: String,
    },

    #[error("{container}: {message}")]
    Module { container: String, message: String },

    #[error("{container}: apex file {dest} is provided by two different files {first} and {second}")]
    Conflict {
        container: String,
        dest: String,
        first: String,
        second: String,
    },

    #[error("{container}: {property}: depends on undefined module {name:?}")]
    MissingDependency {
        container: String,
        property: String,
        name: String,
    },
}

impl ResolveError {
    /// An error against a declared property of the container.
    pub fn property(container: &str, property: &str, message: impl Into<String>) -> Self {
        Self::Property {
            container: container.to_string(),
            property: property.to_string(),
            message: message.into(),
        }
    }

    /// An error against the container as a whole.
    pub fn module(container: &str, message: impl Into<String>) -> Self {
        Self::Module {
            container: container.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownArch { .. } | Self::MissingVariant { .. } => ErrorKind::Configuration,
            Self::Property { .. } | Self::Module { .. } | Self::Conflict { .. } => {
                ErrorKind::UserInput
            }
            Self::MissingDependency { .. } => ErrorKind::MissingDependency,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Every error reported against one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerErrors {
    pub container: String,
    pub errors: Vec<ResolveError>,
}

impl ContainerErrors {
    pub fn new(container: &str, errors: Vec<ResolveError>) -> Self {
        Self {
            container: container.to_string(),
            errors,
        }
    }

    /// Whether any of the errors must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(ResolveError::is_fatal)
    }
}

impl fmt::Display for ContainerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) while resolving {}",
            self.errors.len(),
            self.container
        )?;
        for e in &self.errors {
            write!(f, "\n  [{}] {e}", e.kind())?;
        }
        Ok(())
    }
}

impl std::error::Error for ContainerErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let arch = ResolveError::UnknownArch {
            container: "com.android.foo".into(),
            arch: "mips".into(),
        };
        assert_eq!(arch.kind(), ErrorKind::Configuration);
        assert!(arch.is_fatal());

        let prop = ResolveError::property("com.android.foo", "key", "missing");
        assert_eq!(prop.kind(), ErrorKind::UserInput);
        assert_eq!(prop.to_string(), "com.android.foo: key: missing");
    }

    #[test]
    fn test_container_errors_display_lists_all() {
        let errs = ContainerErrors::new("com.android.foo", vec![
            ResolveError::property("com.android.foo", "key", "missing"),
            ResolveError::module("com.android.foo", "executable bin1 is static"),
        ]);
        let text = errs.to_string();
        assert!(text.starts_with("2 error(s) while resolving com.android.foo"));
        assert!(text.contains("executable bin1 is static"));
        assert!(!errs.is_fatal());
    }
}
