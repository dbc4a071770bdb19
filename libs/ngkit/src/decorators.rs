//! Declaration functions.
//!
//! Each call writes one class's metadata into a [`MetadataStore`]. Member-level calls
//! (`input`, `output`) are expected before the class-level call (`component`,
//! `directive`); bindings can also be passed directly through the options.

use std::sync::Arc;

use crate::annotate::{annotate, ClassRef, Dependency, Deps, Injectable};
use crate::declarations::{
    Binding, Bindings, BoundFn, ComponentDefinition, ComponentOptions, DeclarationKind,
    DeclarationRecipe, DirectiveController, DirectiveDefinition, DirectiveOptions,
    DirectiveRecipe, DirectiveScope, PipeOptions, PipeRecipe, PipeTransform, Provider,
    ProviderGet, ServiceRecipe, TransformFn,
};
use crate::error::DeclareError;
use crate::metadata::{keys, ClassId, MetadataStore};

/// Mark `property` of `T` as a one-way input binding.
pub fn input<T: 'static>(store: &MetadataStore, property: &str, alias: Option<&str>) {
    add_binding(store, ClassId::of::<T>(), property, Binding::input(alias));
}

/// Mark `property` of `T` as an event output binding.
pub fn output<T: 'static>(store: &MetadataStore, property: &str, alias: Option<&str>) {
    add_binding(store, ClassId::of::<T>(), property, Binding::output(alias));
}

fn add_binding(store: &MetadataStore, class: ClassId, property: &str, binding: Binding) {
    if let Some(kind) = store.read(keys::KIND, class) {
        tracing::warn!(
            declaration = %class,
            %kind,
            property,
            "binding added after the class was declared; it will not reach the registered options"
        );
    }
    store.update(keys::BINDINGS, class, |bindings: &mut Bindings| {
        bindings.insert(property, binding);
    });
}

/// Declare `T` as a component.
pub fn component<T: Injectable>(
    store: &MetadataStore,
    mut options: ComponentOptions,
) -> Result<(), DeclareError> {
    let class = ClassId::of::<T>();
    require_option(class, "selector", &options.selector)?;
    ensure_undeclared(store, class)?;

    let bindings = merge_bindings(store, class, options.bindings.take());
    let definition = ComponentDefinition {
        controller: ClassRef::of::<T>(),
        bindings,
        template: options.template,
        template_url: options.template_url,
        transclude: options.transclude,
        require: options.require,
        controller_as: options.controller_as,
    };

    record(
        store,
        class,
        DeclarationKind::Component,
        options.selector,
        DeclarationRecipe::Component(definition),
    );
    Ok(())
}

/// Declare `T` as a directive. Bindings become the directive's isolate scope.
pub fn directive<T: DirectiveController>(
    store: &MetadataStore,
    mut options: DirectiveOptions,
) -> Result<(), DeclareError> {
    let class = ClassId::of::<T>();
    require_option(class, "selector", &options.selector)?;
    ensure_undeclared(store, class)?;

    let bindings = merge_bindings(store, class, options.bindings.take());
    let definition = DirectiveDefinition {
        scope: bindings.map(DirectiveScope::Isolate).or(options.scope),
        multi_element: options.multi_element,
        priority: options.priority,
        require: options.require,
        restrict: options.restrict,
        template: options.template,
        template_namespace: options.template_namespace,
        template_url: options.template_url,
        terminal: options.terminal,
        transclude: options.transclude,
        controller_as: options.controller_as,
        bind_to_controller: options.bind_to_controller,
        ..Default::default()
    };
    let recipe = DirectiveRecipe {
        definition,
        controller: ClassRef::of::<T>(),
        capabilities: T::capabilities,
        bind_compile: bind_compile::<T>,
        bind_link: bind_link::<T>,
    };

    record(
        store,
        class,
        DeclarationKind::Directive,
        options.selector,
        DeclarationRecipe::Directive(recipe),
    );
    Ok(())
}

/// Declare `T` as a pipe (host filter).
pub fn pipe<T: PipeTransform>(store: &MetadataStore, options: PipeOptions) -> Result<(), DeclareError> {
    let class = ClassId::of::<T>();
    require_option(class, "name", &options.name)?;
    ensure_undeclared(store, class)?;

    let recipe = PipeRecipe {
        class,
        inject: annotate::<T>(),
        bind_transform: bind_transform::<T>,
    };

    record(
        store,
        class,
        DeclarationKind::Pipe,
        options.name,
        DeclarationRecipe::Pipe(recipe),
    );
    Ok(())
}

/// Declare `T` as a plain service named `name` (the type's own identifier when `None`).
pub fn injectable<T: Injectable>(store: &MetadataStore, name: Option<&str>) {
    record_service(
        store,
        name,
        ClassRef::of::<T>(),
        None,
    );
}

/// Declare `T` as a provider: a service whose value is produced by `$get`.
pub fn injectable_provider<T: Provider>(store: &MetadataStore, name: Option<&str>) {
    record_service(
        store,
        name,
        ClassRef::of::<T>(),
        Some(ProviderGet {
            inject: crate::annotate::DependencyTokens::new(T::GET_INJECT.iter().copied()),
            call: provider_get::<T>,
        }),
    );
}

/// Service metadata lives under its own key so a class that is also a declaration
/// keeps its selector.
fn record_service(
    store: &MetadataStore,
    name: Option<&str>,
    class: ClassRef,
    get: Option<ProviderGet>,
) {
    let id = class.id();
    let name = name.unwrap_or(id.short_name()).to_string();
    tracing::debug!(service = %id, %name, provider = get.is_some(), "declared service");
    store.attach(keys::SERVICE, ServiceRecipe { name, class, get }, id);
}

// -------- helpers --------

fn require_option(class: ClassId, option: &'static str, value: &str) -> Result<(), DeclareError> {
    if value.trim().is_empty() {
        return Err(DeclareError::MissingRequiredOption { class, option });
    }
    Ok(())
}

fn ensure_undeclared(store: &MetadataStore, class: ClassId) -> Result<(), DeclareError> {
    match store.read(keys::KIND, class) {
        Some(existing) => Err(DeclareError::KindAlreadySet { class, existing }),
        None => Ok(()),
    }
}

/// Collected bindings with explicit ones merged on top; written back so the store
/// keeps the complete map. `None` when the class has no bindings at all.
fn merge_bindings(
    store: &MetadataStore,
    class: ClassId,
    explicit: Option<Bindings>,
) -> Option<Bindings> {
    if let Some(explicit) = explicit {
        store.update(keys::BINDINGS, class, |bindings: &mut Bindings| {
            bindings.merge(explicit)
        });
    }
    store
        .read(keys::BINDINGS, class)
        .filter(|bindings| !bindings.is_empty())
}

fn record(
    store: &MetadataStore,
    class: ClassId,
    kind: DeclarationKind,
    name: String,
    recipe: DeclarationRecipe,
) {
    tracing::debug!(declaration = %class, %kind, %name, "declared");
    store.attach(keys::NAME, name, class);
    store.attach(keys::KIND, kind, class);
    store.attach(keys::OPTIONS, recipe, class);
}

fn bind_compile<T: DirectiveController>(deps: &Deps<'_>) -> anyhow::Result<BoundFn> {
    let instance = Arc::new(T::construct(deps)?);
    Ok(BoundFn::new(move |args| instance.compile(args)))
}

fn bind_link<T: DirectiveController>(deps: &Deps<'_>) -> anyhow::Result<BoundFn> {
    let instance = Arc::new(T::construct(deps)?);
    Ok(BoundFn::new(move |args| instance.link(args)))
}

fn bind_transform<T: PipeTransform>(deps: &Deps<'_>) -> anyhow::Result<TransformFn> {
    let instance = Arc::new(T::construct(deps)?);
    Ok(TransformFn::new(move |input, args| {
        instance.transform(input, args)
    }))
}

fn provider_get<T: Provider>(provider: &Dependency, deps: &Deps<'_>) -> anyhow::Result<Dependency> {
    let provider = provider
        .clone()
        .downcast::<T>()
        .map_err(|_| anyhow::anyhow!("provider instance is not a {}", ClassId::of::<T>()))?;
    provider.get(deps)
}
