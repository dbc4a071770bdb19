//! In-memory host framework.
//!
//! Records every registration in call order, enforces the host's naming rules and
//! keeps a small value table so registered factories can be invoked in tests and
//! tooling. It does not compile templates or run change detection.

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, OnceLock},
};

use crate::annotate::{ClassRef, Dependency, DependencyTokens, Factory};
use crate::contracts::{HostFramework, HostModule};
use crate::declarations::{ComponentDefinition, DirectiveDefinition, ProviderRef, TransformFn};
use crate::metadata::ClassId;

/// Component and directive names: camelCase, starting with a lowercase letter.
const DIRECTIVE_NAME: &str = r"^[a-z][A-Za-z0-9_]*$";
/// Filter, service, constant and module names.
const IDENTIFIER: &str = r"^[A-Za-z_$][A-Za-z0-9_$.\-]*$";

fn directive_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIRECTIVE_NAME).expect("valid directive name pattern"))
}

fn identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER).expect("valid identifier pattern"))
}

/// One recorded registration call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Registration {
    Component {
        name: String,
        options: ComponentDefinition,
    },
    Directive {
        name: String,
        inject: DependencyTokens,
    },
    Filter {
        name: String,
        inject: DependencyTokens,
    },
    Service {
        name: String,
        class: ClassId,
        inject: DependencyTokens,
    },
    Provider {
        name: String,
        class: ClassId,
        inject: DependencyTokens,
        get_inject: DependencyTokens,
    },
    Constant {
        name: String,
        value: Value,
    },
    Decorator {
        name: String,
        inject: DependencyTokens,
    },
    Config {
        inject: DependencyTokens,
    },
    Run {
        inject: DependencyTokens,
    },
}

impl Registration {
    /// Registered name; lifecycle blocks have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Registration::Component { name, .. }
            | Registration::Directive { name, .. }
            | Registration::Filter { name, .. }
            | Registration::Service { name, .. }
            | Registration::Provider { name, .. }
            | Registration::Constant { name, .. }
            | Registration::Decorator { name, .. } => Some(name.as_str()),
            Registration::Config { .. } | Registration::Run { .. } => None,
        }
    }
}

type Values = Arc<RwLock<HashMap<String, Dependency>>>;

/// Host framework keeping modules in memory.
#[derive(Default)]
pub struct InMemoryHost {
    modules: RwLock<HashMap<String, Arc<InMemoryModule>>>,
    external: RwLock<HashSet<String>>,
    values: Values,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `name` as an import without assembling it (third-party modules).
    pub fn with_external_module(self, name: impl Into<String>) -> Self {
        self.external.write().insert(name.into());
        self
    }

    /// Make `value` injectable under `token` for factory invocations.
    pub fn provide_value(&self, token: impl Into<String>, value: Dependency) {
        self.values.write().insert(token.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Arc<InMemoryModule>> {
        self.modules.read().get(name).cloned()
    }

    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl HostFramework for InMemoryHost {
    fn module(&self, name: &str, requires: &[String]) -> anyhow::Result<Arc<dyn HostModule>> {
        if !identifier().is_match(name) {
            anyhow::bail!("invalid module name '{name}'");
        }
        let mut modules = self.modules.write();
        {
            let external = self.external.read();
            for dep in requires {
                if !modules.contains_key(dep) && !external.contains(dep) {
                    anyhow::bail!("module '{name}' requires unknown module '{dep}'");
                }
            }
        }
        if modules.contains_key(name) {
            tracing::debug!(module = name, "replacing existing module");
        }
        let module = Arc::new(InMemoryModule {
            name: name.to_string(),
            requires: requires.to_vec(),
            state: RwLock::new(ModuleState::default()),
            values: self.values.clone(),
        });
        modules.insert(name.to_string(), module.clone());
        let module: Arc<dyn HostModule> = module;
        Ok(module)
    }
}

#[derive(Default)]
struct ModuleState {
    registrations: Vec<Registration>,
    // component and directive names share one namespace, as do injector names
    directive_names: HashSet<String>,
    filter_names: HashSet<String>,
    injector_names: HashSet<String>,
    components: HashMap<String, ComponentDefinition>,
    directives: HashMap<String, Factory<DirectiveDefinition>>,
    filters: HashMap<String, Factory<TransformFn>>,
    services: HashMap<String, ClassRef>,
    providers: HashMap<String, ProviderRef>,
    constants: HashMap<String, Value>,
    decorators: Vec<(String, Factory<Dependency>)>,
    config_blocks: Vec<Factory<()>>,
    run_blocks: Vec<Factory<()>>,
}

/// A module created by [`InMemoryHost`].
pub struct InMemoryModule {
    name: String,
    requires: Vec<String>,
    state: RwLock<ModuleState>,
    values: Values,
}

fn claim(names: &mut HashSet<String>, kind: &str, name: &str, pattern: &Regex) -> anyhow::Result<()> {
    if !pattern.is_match(name) {
        anyhow::bail!("invalid {kind} name '{name}'");
    }
    if !names.insert(name.to_string()) {
        anyhow::bail!("{kind} '{name}' is already registered");
    }
    Ok(())
}

impl HostModule for InMemoryModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn component(&self, name: &str, options: ComponentDefinition) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.directive_names, "component", name, directive_name())?;
        s.registrations.push(Registration::Component {
            name: name.to_string(),
            options: options.clone(),
        });
        s.components.insert(name.to_string(), options);
        Ok(())
    }

    fn directive(&self, name: &str, factory: Factory<DirectiveDefinition>) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.directive_names, "directive", name, directive_name())?;
        s.registrations.push(Registration::Directive {
            name: name.to_string(),
            inject: factory.inject().clone(),
        });
        s.directives.insert(name.to_string(), factory);
        Ok(())
    }

    fn filter(&self, name: &str, factory: Factory<TransformFn>) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.filter_names, "filter", name, identifier())?;
        s.registrations.push(Registration::Filter {
            name: name.to_string(),
            inject: factory.inject().clone(),
        });
        s.filters.insert(name.to_string(), factory);
        Ok(())
    }

    fn service(&self, name: &str, class: ClassRef) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.injector_names, "service", name, identifier())?;
        s.registrations.push(Registration::Service {
            name: name.to_string(),
            class: class.id(),
            inject: class.inject().clone(),
        });
        s.services.insert(name.to_string(), class);
        Ok(())
    }

    fn provider(&self, name: &str, provider: ProviderRef) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.injector_names, "provider", name, identifier())?;
        s.registrations.push(Registration::Provider {
            name: name.to_string(),
            class: provider.class().id(),
            inject: provider.class().inject().clone(),
            get_inject: provider.get_inject().clone(),
        });
        s.providers.insert(name.to_string(), provider);
        Ok(())
    }

    fn constant(&self, name: &str, value: Value) -> anyhow::Result<()> {
        let mut s = self.state.write();
        claim(&mut s.injector_names, "constant", name, identifier())?;
        s.registrations.push(Registration::Constant {
            name: name.to_string(),
            value: value.clone(),
        });
        s.constants.insert(name.to_string(), value);
        Ok(())
    }

    fn decorator(&self, name: &str, factory: Factory<Dependency>) -> anyhow::Result<()> {
        if !identifier().is_match(name) {
            anyhow::bail!("invalid decorator target '{name}'");
        }
        let mut s = self.state.write();
        s.registrations.push(Registration::Decorator {
            name: name.to_string(),
            inject: factory.inject().clone(),
        });
        s.decorators.push((name.to_string(), factory));
        Ok(())
    }

    fn config(&self, block: Factory<()>) -> anyhow::Result<()> {
        let mut s = self.state.write();
        s.registrations.push(Registration::Config {
            inject: block.inject().clone(),
        });
        s.config_blocks.push(block);
        Ok(())
    }

    fn run(&self, block: Factory<()>) -> anyhow::Result<()> {
        let mut s = self.state.write();
        s.registrations.push(Registration::Run {
            inject: block.inject().clone(),
        });
        s.run_blocks.push(block);
        Ok(())
    }
}

impl InMemoryModule {
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Registrations in call order.
    pub fn registrations(&self) -> Vec<Registration> {
        self.state.read().registrations.clone()
    }

    pub fn component_definition(&self, name: &str) -> Option<ComponentDefinition> {
        self.state.read().components.get(name).cloned()
    }

    pub fn constant_value(&self, name: &str) -> Option<Value> {
        self.state.read().constants.get(name).cloned()
    }

    /// Resolve `tokens` against the host value table, in order.
    pub fn resolve(&self, tokens: &DependencyTokens) -> anyhow::Result<Vec<Dependency>> {
        let values = self.values.read();
        tokens
            .iter()
            .map(|token| {
                values
                    .get(token)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("unknown provider: {token}"))
            })
            .collect()
    }

    /// Invoke a directive factory the way the host injector would.
    pub fn instantiate_directive(&self, name: &str) -> anyhow::Result<DirectiveDefinition> {
        let factory = self
            .state
            .read()
            .directives
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown directive: {name}"))?;
        factory.invoke(&self.resolve(factory.inject())?)
    }

    /// Invoke a filter factory; the returned transform keeps its pipe instance.
    pub fn instantiate_filter(&self, name: &str) -> anyhow::Result<TransformFn> {
        let factory = self
            .state
            .read()
            .filters
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown filter: {name}"))?;
        factory.invoke(&self.resolve(factory.inject())?)
    }

    /// Instantiate a service; providers are constructed and then asked for `$get`.
    pub fn instantiate_service(&self, name: &str) -> anyhow::Result<Dependency> {
        let (service, provider) = {
            let s = self.state.read();
            (s.services.get(name).cloned(), s.providers.get(name).cloned())
        };
        if let Some(class) = service {
            return class.instantiate(&self.resolve(class.inject())?);
        }
        if let Some(provider) = provider {
            let instance = provider
                .class()
                .instantiate(&self.resolve(provider.class().inject())?)?;
            return provider.get(&instance, &self.resolve(provider.get_inject())?);
        }
        anyhow::bail!("unknown service: {name}")
    }

    /// Apply the registered decorators of `name` to `delegate`, in registration order.
    ///
    /// Each decorator receives the current value as `$delegate`.
    pub fn decorate(&self, name: &str, delegate: Dependency) -> anyhow::Result<Dependency> {
        let decorators: Vec<Factory<Dependency>> = self
            .state
            .read()
            .decorators
            .iter()
            .filter(|(target, _)| target == name)
            .map(|(_, f)| f.clone())
            .collect();
        let mut current = delegate;
        for factory in decorators {
            let values = {
                let table = self.values.read();
                factory
                    .inject()
                    .iter()
                    .map(|token| match token {
                        "$delegate" => Ok(current.clone()),
                        other => table
                            .get(other)
                            .cloned()
                            .ok_or_else(|| anyhow::anyhow!("unknown provider: {other}")),
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?
            };
            current = factory.invoke(&values)?;
        }
        Ok(current)
    }

    /// Run every config block, then every run block.
    pub fn run_lifecycle(&self) -> anyhow::Result<()> {
        let (config, run) = {
            let s = self.state.read();
            (s.config_blocks.clone(), s.run_blocks.clone())
        };
        for block in config.iter().chain(run.iter()) {
            block.invoke(&self.resolve(block.inject())?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_validated_per_namespace() {
        let host = InMemoryHost::new();
        let module = host.module("app", &[]).unwrap();

        module.constant("apiUrl", Value::from("/api")).unwrap();
        let err = module.constant("apiUrl", Value::from("/v2")).unwrap_err();
        assert!(err.to_string().contains("already registered"));

        let err = module.constant("api url", Value::Null).unwrap_err();
        assert!(err.to_string().contains("invalid constant name"));
    }

    #[test]
    fn unknown_import_is_rejected() {
        let host = InMemoryHost::new().with_external_module("ngSanitize");
        assert!(host.module("app", &["ngSanitize".to_string()]).is_ok());

        let Err(err) = host.module("other", &["ngRoute".to_string()]) else {
            panic!("expected unknown import error");
        };
        assert!(err.to_string().contains("unknown module 'ngRoute'"));
    }

    #[test]
    fn recreating_a_module_replaces_it() {
        let host = InMemoryHost::new();
        let first = host.module("app", &[]).unwrap();
        first.constant("a", Value::Null).unwrap();

        host.module("app", &[]).unwrap();
        let current = host.get("app").unwrap();
        assert!(current.registrations().is_empty());
        assert_eq!(host.module_names(), vec!["app"]);
    }

    #[test]
    fn lifecycle_blocks_run_with_resolved_values() {
        let host = InMemoryHost::new();
        let seen = Arc::new(RwLock::new(Vec::<String>::new()));
        host.provide_value("seen", seen.clone());

        let module = host.module("app", &[]).unwrap();
        module
            .config(Factory::with_tokens(&["seen"], |deps| {
                deps.get::<RwLock<Vec<String>>>("seen")?
                    .write()
                    .push("config".into());
                Ok(())
            }))
            .unwrap();
        module
            .run(Factory::with_tokens(&["seen"], |deps| {
                deps.get::<RwLock<Vec<String>>>("seen")?
                    .write()
                    .push("run".into());
                Ok(())
            }))
            .unwrap();

        host.get("app").unwrap().run_lifecycle().unwrap();
        assert_eq!(*seen.read(), vec!["config", "run"]);
    }
}
