//! Error handling for the derived-data engine
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so repository-layer callers can tell a
//!    configuration problem from a transient or internal one
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Configuration**: [`DerivedDataError::AmbiguousBranchConfiguration`],
//!   [`DerivedDataError::MissingConfigurationProperty`],
//!   [`DerivedDataError::UnknownNodeType`], [`DerivedDataError::InvalidConfiguration`].
//!   Never retried; they surface to the caller of `compute`/`save`.
//! - **Plugins**: [`DerivedDataError::UnknownFunction`], [`DerivedDataError::FunctionFailed`].
//!   Abort the `compute` call for the node being derived.
//! - **Permissions**: [`DerivedDataError::AccessDenied`]. Property persistence
//!   catches these and reports the property as not written.
//! - **Internal**: [`DerivedDataError::MissingFrozenVariant`],
//!   [`DerivedDataError::PathOutsideNode`]. Propagated untouched.
//! - **Repository**: item lookup, path and check-in failures raised by a
//!   [`Session`](crate::repository::Session) implementation.
//!
//! Use [`user_friendly_error`] to turn any error into an [`ErrorContext`] for
//! display.
//!
//! # Examples
//!
//! ```rust,no_run
//! use derived_data::core::{DerivedDataError, ErrorContext};
//!
//! let context = ErrorContext::new(DerivedDataError::UnknownNodeType {
//!     name: "myproject:newsdocument".to_string(),
//! })
//! .with_suggestion("Register the node type before configuring functions for it");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, DerivedDataError>;

/// The main error type for derived-data operations.
#[derive(Error, Debug)]
pub enum DerivedDataError {
    /// Exactly one of the two variants involved in a property access carries
    /// branch information.
    ///
    /// A function reading across variants must either be branch-aware on both
    /// sides or on neither; anything else cannot be resolved unambiguously.
    #[error(
        "Ambiguous branch configuration: modified variant '{modified_variant}' and accessed variant '{accessed_variant}' disagree on branch information"
    )]
    AmbiguousBranchConfiguration {
        /// Path of the variant enclosing the node being derived
        modified_variant: String,
        /// Path of the variant enclosing the accessed property
        accessed_variant: String,
    },

    /// A required property is missing from a configuration node
    #[error("Configuration node '{node}' is missing required property '{property}'")]
    MissingConfigurationProperty {
        /// Path of the configuration node
        node: String,
        /// Name of the missing property
        property: String,
    },

    /// A node type name is not registered in the repository
    #[error("No such node type: {name}")]
    UnknownNodeType {
        /// The unknown node type name
        name: String,
    },

    /// Generic configuration problem
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem
        message: String,
    },

    /// No factory is registered for a function implementation identifier
    #[error("No derived-data function registered for '{implementation_id}'")]
    UnknownFunction {
        /// The implementation identifier that was looked up
        implementation_id: String,
        /// Closest registered identifier, if any
        suggestion: Option<String>,
    },

    /// A derivation function failed to construct or compute
    #[error("Derived-data function '{function}' failed: {reason}")]
    FunctionFailed {
        /// Name of the function definition
        function: String,
        /// Failure reason reported by the function
        reason: String,
    },

    /// The session lacks the permission required for an operation
    #[error("Access denied: {permission} on {path}")]
    AccessDenied {
        /// Path the permission was checked against
        path: String,
        /// The missing permission
        permission: String,
    },

    /// Cross-branch resolution expected a labelled version that does not exist
    #[error("No version labelled '{label}' in the history of variant '{variant}'")]
    MissingFrozenVariant {
        /// Path of the variant whose history was searched
        variant: String,
        /// The version label that was looked up
        label: String,
    },

    /// A property path does not lie below the node it should be relative to
    #[error("Property path '{property_path}' is not below node '{node_path}'")]
    PathOutsideNode {
        /// Absolute path of the node
        node_path: String,
        /// Absolute path of the property
        property_path: String,
    },

    /// A node or property does not exist
    #[error("Item not found: {path}")]
    ItemNotFound {
        /// Path or identifier that was looked up
        path: String,
    },

    /// A node already exists where one is being created
    #[error("Item already exists: {path}")]
    ItemExists {
        /// Path of the existing item
        path: String,
    },

    /// A write targeted a node below a checked-in versionable node
    #[error("Node is checked in: {path}")]
    CheckedIn {
        /// Path of the checked-in versionable node
        path: String,
    },

    /// A path could not be parsed or applied
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// Why it is invalid
        reason: String,
    },

    /// Generic repository failure
    #[error("Repository error: {message}")]
    Repository {
        /// Description of the failure
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Any other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl DerivedDataError {
    /// Whether this error belongs to the configuration class.
    ///
    /// Configuration errors are not retried and are reported to the caller of
    /// `compute`/`save` as-is.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousBranchConfiguration { .. }
                | Self::MissingConfigurationProperty { .. }
                | Self::UnknownNodeType { .. }
                | Self::InvalidConfiguration { .. }
        )
    }

    /// Shorthand for [`DerivedDataError::ItemNotFound`].
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::ItemNotFound {
            path: path.into(),
        }
    }

    /// Shorthand for [`DerivedDataError::Repository`].
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }
}

/// Error wrapper carrying user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DerivedDataError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: DerivedDataError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Recognizes [`DerivedDataError`] (also when wrapped in `anyhow` context),
/// [`std::io::Error`] and TOML/JSON parse errors; anything else becomes
/// [`DerivedDataError::Other`] with the full context chain as message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(derived) = cause.downcast_ref::<DerivedDataError>() {
            return create_error_context(derived);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let context = ErrorContext::new(DerivedDataError::Other {
            message: format!("{error:#}"),
        });
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => context
                .with_suggestion("Check that the snapshot or configuration file exists"),
            std::io::ErrorKind::PermissionDenied => {
                context.with_suggestion("Check the file permissions of the snapshot")
            }
            _ => context,
        };
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(DerivedDataError::Other {
            message: format!("{error:#}"),
        })
        .with_suggestion("Check the TOML syntax of the engine configuration file");
    }

    if error.downcast_ref::<serde_json::Error>().is_some() {
        return ErrorContext::new(DerivedDataError::Other {
            message: format!("{error:#}"),
        })
        .with_suggestion("The repository snapshot must be a JSON document written by this tool");
    }

    ErrorContext::new(DerivedDataError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &DerivedDataError) -> ErrorContext {
    match error {
        DerivedDataError::AmbiguousBranchConfiguration {
            modified_variant,
            accessed_variant,
        } => ErrorContext::new(DerivedDataError::AmbiguousBranchConfiguration {
            modified_variant: modified_variant.clone(),
            accessed_variant: accessed_variant.clone(),
        })
        .with_details("Only one of the two documents carries the hippo:branchInfo mixin")
        .with_suggestion(
            "Add branch information to both documents or restrict the function to non-branched content",
        ),
        DerivedDataError::UnknownFunction {
            implementation_id,
            suggestion,
        } => {
            let context = ErrorContext::new(DerivedDataError::UnknownFunction {
                implementation_id: implementation_id.clone(),
                suggestion: suggestion.clone(),
            });
            match suggestion {
                Some(candidate) => context.with_suggestion(format!("Did you mean '{candidate}'?")),
                None => context.with_suggestion(
                    "Register the implementation in the function registry before running the engine",
                ),
            }
        }
        DerivedDataError::MissingFrozenVariant {
            variant,
            label,
        } => ErrorContext::new(DerivedDataError::MissingFrozenVariant {
            variant: variant.clone(),
            label: label.clone(),
        })
        .with_details("Cross-branch reads use the version labelled '<branchId>-<state>'")
        .with_suggestion("Label the matching version or make the function branch-local"),
        DerivedDataError::UnknownNodeType {
            name,
        } => ErrorContext::new(DerivedDataError::UnknownNodeType {
            name: name.clone(),
        })
        .with_suggestion("Register the node type or fix 'hipposys:nodetype' in the function definition"),
        other => ErrorContext::new(DerivedDataError::Other {
            message: other.to_string(),
        }),
    }
}
