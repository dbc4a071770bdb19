use thiserror::Error;

use crate::declarations::DeclarationKind;
use crate::metadata::ClassId;

/// Misconfigured declaration; raised immediately by the declaring call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error("{class}: missing required option '{option}'")]
    MissingRequiredOption {
        class: ClassId,
        option: &'static str,
    },
    #[error("{class} is already declared as a {existing}")]
    KindAlreadySet {
        class: ClassId,
        existing: DeclarationKind,
    },
}

/// Non-fatal problem found while assembling; the offending entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error(
        "Can't find type metadata on {class} declaration, did you forget to decorate it? \
         Declare it with component, directive or pipe."
    )]
    MissingDeclarationKind { class: ClassId },
    #[error("{class} is marked as a {kind} but its registration metadata is missing")]
    MissingDeclarationMetadata { class: ClassId, kind: DeclarationKind },
    #[error(
        "Can't find injectable metadata on provider {class}, did you forget to declare it \
         with injectable?"
    )]
    MissingServiceMetadata { class: ClassId },
}

impl Diagnostic {
    /// The declaration or provider the diagnostic is about.
    pub fn class(&self) -> ClassId {
        match self {
            Diagnostic::MissingDeclarationKind { class }
            | Diagnostic::MissingDeclarationMetadata { class, .. }
            | Diagnostic::MissingServiceMetadata { class } => *class,
        }
    }
}

/// Assembly failure; aborts the rest of the module's assembly.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to create module '{module}'")]
    ModuleCreation {
        module: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("host rejected {kind} '{name}' in module '{module}'")]
    HostRegistration {
        module: String,
        kind: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("module '{module}' has invalid entries:\n{diagnostics:#?}")]
    Diagnostics {
        module: String,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Dependency lookup failure inside a constructor or factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("no value injected for dependency '{token}'")]
    MissingDependency { token: String },
    #[error("dependency '{token}' is not a {expected}")]
    TypeMismatch {
        token: String,
        expected: &'static str,
    },
}
