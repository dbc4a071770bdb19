//! Declaration dispatcher and registration strategies.

use crate::annotate::{Deps, Factory};
use crate::contracts::HostModule;
use crate::declarations::{
    ComponentDefinition, DeclarationKind, DeclarationRecipe, DirectiveDefinition, DirectiveRecipe,
    PipeRecipe, ProviderRef, TransformFn,
};
use crate::error::{AssembleError, Diagnostic};
use crate::metadata::{keys, ClassId, MetadataStore};

/// Check that `class` carries everything its registration needs.
pub fn diagnose(store: &MetadataStore, class: ClassId) -> Option<Diagnostic> {
    resolve(store, class).err()
}

fn resolve(
    store: &MetadataStore,
    class: ClassId,
) -> Result<(String, DeclarationRecipe), Diagnostic> {
    let kind = store
        .read(keys::KIND, class)
        .ok_or(Diagnostic::MissingDeclarationKind { class })?;
    match (store.read(keys::NAME, class), store.read(keys::OPTIONS, class)) {
        (Some(name), Some(recipe)) if recipe.kind() == kind => Ok((name, recipe)),
        _ => Err(Diagnostic::MissingDeclarationMetadata { class, kind }),
    }
}

/// Route one declaration to its registration strategy.
///
/// A declaration without usable metadata yields a diagnostic and registers nothing;
/// a host rejection is returned as an error.
pub fn dispatch(
    module: &dyn HostModule,
    store: &MetadataStore,
    class: ClassId,
) -> Result<Option<Diagnostic>, AssembleError> {
    let (name, recipe) = match resolve(store, class) {
        Ok(resolved) => resolved,
        Err(diagnostic) => {
            tracing::error!(module = module.name(), declaration = %class, "{diagnostic}");
            return Ok(Some(diagnostic));
        }
    };

    match recipe {
        DeclarationRecipe::Component(definition) => register_component(module, name, definition)?,
        DeclarationRecipe::Directive(recipe) => register_directive(module, class, name, recipe)?,
        DeclarationRecipe::Pipe(recipe) => register_pipe(module, name, recipe)?,
    }
    Ok(None)
}

fn host_error(
    module: &dyn HostModule,
    kind: &'static str,
    name: &str,
) -> impl FnOnce(anyhow::Error) -> AssembleError {
    let module = module.name().to_string();
    let name = name.to_string();
    move |source| AssembleError::HostRegistration {
        module,
        kind,
        name,
        source,
    }
}

fn register_component(
    module: &dyn HostModule,
    name: String,
    definition: ComponentDefinition,
) -> Result<(), AssembleError> {
    tracing::debug!(module = module.name(), component = %name, "registering component");
    module
        .component(&name, definition)
        .map_err(host_error(module, "component", &name))
}

/// Factory invoked by the host injector with the controller's dependencies.
///
/// Each invocation starts from a fresh copy of the declared definition and picks
/// `compile`, else `link`, else the raw controller class.
pub fn directive_factory(class: ClassId, recipe: DirectiveRecipe) -> Factory<DirectiveDefinition> {
    let inject = recipe.controller.inject().clone();
    Factory::new(inject, move |deps: &Deps<'_>| {
        let mut definition = recipe.definition.clone();
        let capabilities = (recipe.capabilities)();
        if capabilities.compile {
            definition.compile = Some((recipe.bind_compile)(deps)?);
            tracing::info!(directive = %class, "Directive is registered with compile function");
        } else if capabilities.link {
            definition.link = Some((recipe.bind_link)(deps)?);
            tracing::info!(directive = %class, "Directive is registered with link function");
        } else {
            definition.controller = Some(recipe.controller.clone());
            tracing::info!(directive = %class, "Directive is registered with controller class");
        }
        Ok(definition)
    })
}

fn register_directive(
    module: &dyn HostModule,
    class: ClassId,
    name: String,
    recipe: DirectiveRecipe,
) -> Result<(), AssembleError> {
    tracing::debug!(module = module.name(), directive = %name, "registering directive");
    module
        .directive(&name, directive_factory(class, recipe))
        .map_err(host_error(module, "directive", &name))
}

/// Factory returning `transform` bound to one new pipe instance per invocation.
pub fn pipe_factory(recipe: PipeRecipe) -> Factory<TransformFn> {
    let inject = recipe.inject.clone();
    Factory::new(inject, move |deps: &Deps<'_>| {
        tracing::trace!(pipe = %recipe.class, "instantiating pipe");
        (recipe.bind_transform)(deps)
    })
}

fn register_pipe(
    module: &dyn HostModule,
    name: String,
    recipe: PipeRecipe,
) -> Result<(), AssembleError> {
    tracing::debug!(module = module.name(), pipe = %name, "registering filter");
    module
        .filter(&name, pipe_factory(recipe))
        .map_err(host_error(module, "filter", &name))
}

/// Register one provider entry: `provider` when it exposes `$get`, `service` otherwise.
pub fn register_service(
    module: &dyn HostModule,
    store: &MetadataStore,
    class: ClassId,
) -> Result<Option<Diagnostic>, AssembleError> {
    let Some(recipe) = store.read(keys::SERVICE, class) else {
        let diagnostic = Diagnostic::MissingServiceMetadata { class };
        tracing::error!(module = module.name(), provider = %class, "{diagnostic}");
        return Ok(Some(diagnostic));
    };
    let name = recipe.name;

    match recipe.get {
        Some(get) => {
            tracing::debug!(module = module.name(), provider = %name, "registering provider");
            module
                .provider(&name, ProviderRef::new(recipe.class, get))
                .map_err(host_error(module, "provider", &name))?;
        }
        None => {
            tracing::debug!(module = module.name(), service = %name, "registering service");
            module
                .service(&name, recipe.class)
                .map_err(host_error(module, "service", &name))?;
        }
    }
    Ok(None)
}

/// Kind recorded for `class`, if any.
pub fn kind_of(store: &MetadataStore, class: ClassId) -> Option<DeclarationKind> {
    store.read(keys::KIND, class)
}
