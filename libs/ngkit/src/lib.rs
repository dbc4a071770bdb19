//! # ngkit - Declarative UI building blocks for DI-based front-end hosts
//!
//! Components, directives, pipes and services are declared as plain Rust types,
//! their metadata is recorded in a [`MetadataStore`], and [`assemble`] turns the
//! accumulated metadata into registration calls against a host module.
//!
//! ## Features
//!
//! - **Metadata store**: per-class, typed key/value metadata
//! - **Explicit injection**: `Injectable::INJECT` lists dependencies in parameter order
//! - **Declarations**: `component`, `directive`, `pipe`, `injectable`, `input`, `output`
//! - **Best-effort assembly**: undecorated declarations are reported and skipped;
//!   host rejections abort the module
//!
//! ## Example
//!
//! ```rust,ignore
//! use ngkit::{assemble, decorators, ComponentOptions, InMemoryHost, MetadataStore, ModuleConfig, NgModule};
//!
//! let store = MetadataStore::new();
//! decorators::input::<UserCard>(&store, "user", None);
//! decorators::component::<UserCard>(&store, ComponentOptions::new("userCard"))?;
//!
//! struct AppModule;
//! impl NgModule for AppModule {}
//!
//! let host = InMemoryHost::new();
//! let app = assemble::<AppModule>(&host, &store, ModuleConfig::new().declaration::<UserCard>())?;
//! ```

pub use anyhow::Result;

// Re-export inventory for `declare!`
pub use inventory;

pub mod annotate;
pub mod assembler;
pub mod contracts;
pub mod declarations;
pub mod decorators;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod metadata;

pub use annotate::{annotate, ClassRef, Dependency, DependencyTokens, Deps, Factory, Injectable};
pub use assembler::{
    assemble, assemble_with, AssembleOptions, Assembly, ModuleConfig, ModuleImport, NgModule,
};
pub use contracts::{HostFramework, HostModule, ModuleHandle};
pub use declarations::{
    Binding, BindingDirection, Bindings, BoundFn, ComponentDefinition, ComponentOptions,
    ComponentTransclude, DeclarationKind, DirectiveCapabilities, DirectiveController,
    DirectiveDefinition, DirectiveOptions, DirectiveScope, PipeOptions, PipeTransform, Provider,
    ProviderRef, Require, Transclude, TransformFn,
};
pub use error::{AssembleError, DeclareError, Diagnostic, InjectError};
pub use host::{InMemoryHost, InMemoryModule, Registration};
pub use metadata::{ClassId, MetadataKey, MetadataStore};
