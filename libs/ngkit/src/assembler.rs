//! Module assembler.
//!
//! Reads the metadata accumulated in a [`MetadataStore`] and registers a module's
//! declarations, providers, constants, decorators and lifecycle blocks against the
//! host, in that fixed order.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::annotate::{Dependency, Factory};
use crate::contracts::{HostFramework, ModuleHandle};
use crate::dispatch::{diagnose, dispatch, kind_of, register_service};
use crate::error::{AssembleError, Diagnostic};
use crate::metadata::{keys, ClassId, MetadataStore};

/// The type a module is assembled for.
///
/// `config` and `run` are optional lifecycle blocks; their factories carry the
/// dependency tokens the host resolves for them.
pub trait NgModule: 'static {
    /// Module identifier; defaults to the type's own name.
    fn name() -> String {
        ClassId::of::<Self>().short_name().to_string()
    }

    fn config() -> Option<Factory<()>> {
        None
    }

    fn run() -> Option<Factory<()>> {
        None
    }
}

/// A module dependency: a bare module name or an already assembled module.
#[derive(Debug, Clone)]
pub enum ModuleImport {
    Name(String),
    Module(ModuleHandle),
}

impl ModuleImport {
    pub fn name(&self) -> &str {
        match self {
            ModuleImport::Name(name) => name,
            ModuleImport::Module(handle) => handle.name(),
        }
    }
}

impl From<&str> for ModuleImport {
    fn from(name: &str) -> Self {
        ModuleImport::Name(name.to_string())
    }
}

impl From<String> for ModuleImport {
    fn from(name: String) -> Self {
        ModuleImport::Name(name)
    }
}

impl From<&ModuleHandle> for ModuleImport {
    fn from(handle: &ModuleHandle) -> Self {
        ModuleImport::Module(handle.clone())
    }
}

impl From<ModuleHandle> for ModuleImport {
    fn from(handle: ModuleHandle) -> Self {
        ModuleImport::Module(handle)
    }
}

/// What goes into a module.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    pub declarations: Vec<ClassId>,
    pub imports: Vec<ModuleImport>,
    pub exports: Vec<ClassId>,
    pub providers: Vec<ClassId>,
    pub constants: BTreeMap<String, Value>,
    pub decorators: Vec<(String, Factory<Dependency>)>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declaration<T: 'static>(mut self) -> Self {
        self.declarations.push(ClassId::of::<T>());
        self
    }

    pub fn declarations(mut self, classes: impl IntoIterator<Item = ClassId>) -> Self {
        self.declarations.extend(classes);
        self
    }

    pub fn import(mut self, import: impl Into<ModuleImport>) -> Self {
        self.imports.push(import.into());
        self
    }

    pub fn export<T: 'static>(mut self) -> Self {
        self.exports.push(ClassId::of::<T>());
        self
    }

    pub fn provider<T: 'static>(mut self) -> Self {
        self.providers.push(ClassId::of::<T>());
        self
    }

    pub fn providers(mut self, classes: impl IntoIterator<Item = ClassId>) -> Self {
        self.providers.extend(classes);
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn decorator(mut self, name: impl Into<String>, factory: Factory<Dependency>) -> Self {
        self.decorators.push((name.into(), factory));
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Fail before touching the host when any entry would produce a diagnostic.
    pub strict: bool,
}

/// Result of a successful assembly.
#[derive(Debug, Clone)]
pub struct Assembly {
    handle: ModuleHandle,
    diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    pub fn handle(&self) -> &ModuleHandle {
        &self.handle
    }

    pub fn into_handle(self) -> ModuleHandle {
        self.handle
    }

    /// Entries that were skipped.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Assemble module `M` with default (lenient) options.
pub fn assemble<M: NgModule>(
    host: &dyn HostFramework,
    store: &MetadataStore,
    config: ModuleConfig,
) -> Result<Assembly, AssembleError> {
    assemble_with::<M>(host, store, config, AssembleOptions::default())
}

pub fn assemble_with<M: NgModule>(
    host: &dyn HostFramework,
    store: &MetadataStore,
    config: ModuleConfig,
    options: AssembleOptions,
) -> Result<Assembly, AssembleError> {
    let name = M::name();

    if options.strict {
        let diagnostics: Vec<Diagnostic> = config
            .declarations
            .iter()
            .filter_map(|class| diagnose(store, *class))
            .chain(
                config
                    .providers
                    .iter()
                    .filter(|class| !store.contains(keys::SERVICE, **class))
                    .map(|class| Diagnostic::MissingServiceMetadata { class: *class }),
            )
            .collect();
        if !diagnostics.is_empty() {
            return Err(AssembleError::Diagnostics {
                module: name,
                diagnostics,
            });
        }
    }

    // 1) imports
    let requires: Vec<String> = config
        .imports
        .iter()
        .map(|import| import.name().to_string())
        .collect();

    // 2) module
    tracing::info!(module = %name, ?requires, "creating module");
    let module = host
        .module(&name, &requires)
        .map_err(|source| AssembleError::ModuleCreation {
            module: name.clone(),
            source,
        })?;

    let mut diagnostics = Vec::new();

    // 3) declarations
    for class in &config.declarations {
        if let Some(diagnostic) = dispatch(module.as_ref(), store, *class)? {
            diagnostics.push(diagnostic);
        }
    }

    // 4) providers
    for class in &config.providers {
        if let Some(diagnostic) = register_service(module.as_ref(), store, *class)? {
            diagnostics.push(diagnostic);
        }
    }

    for (constant, value) in config.constants {
        tracing::debug!(module = %name, %constant, "registering constant");
        module
            .constant(&constant, value)
            .map_err(|source| AssembleError::HostRegistration {
                module: name.clone(),
                kind: "constant",
                name: constant.clone(),
                source,
            })?;
    }

    for (decorated, factory) in config.decorators {
        tracing::debug!(module = %name, service = %decorated, "registering decorator");
        module
            .decorator(&decorated, factory)
            .map_err(|source| AssembleError::HostRegistration {
                module: name.clone(),
                kind: "decorator",
                name: decorated.clone(),
                source,
            })?;
    }

    for class in &config.exports {
        if !config.declarations.contains(class) || kind_of(store, *class).is_none() {
            tracing::warn!(module = %name, export = %class, "export is not a declaration of this module");
        }
    }

    // 5) lifecycle blocks
    if let Some(block) = M::config() {
        tracing::debug!(module = %name, inject = ?block.inject(), "registering config block");
        module
            .config(block)
            .map_err(|source| AssembleError::HostRegistration {
                module: name.clone(),
                kind: "config",
                name: name.clone(),
                source,
            })?;
    }
    if let Some(block) = M::run() {
        tracing::debug!(module = %name, inject = ?block.inject(), "registering run block");
        module
            .run(block)
            .map_err(|source| AssembleError::HostRegistration {
                module: name.clone(),
                kind: "run",
                name: name.clone(),
                source,
            })?;
    }

    // 6) publish
    if !diagnostics.is_empty() {
        tracing::warn!(module = %name, skipped = diagnostics.len(), "module assembled with skipped entries");
    } else {
        tracing::info!(module = %name, "module assembled");
    }
    Ok(Assembly {
        handle: ModuleHandle::new(module),
        diagnostics,
    })
}
