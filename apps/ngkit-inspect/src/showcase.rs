//! Sample declarations and modules assembled by `ngkit-inspect`.

use ngkit::{
    assemble_with, decorators, AssembleError, AssembleOptions, Assembly, Bindings,
    ComponentOptions, ComponentTransclude, DeclareError, Dependency, Deps,
    DirectiveCapabilities, DirectiveController, DirectiveOptions, Factory, HostFramework,
    Injectable, MetadataStore, ModuleConfig, NgModule, PipeOptions, PipeTransform, Provider,
    Require,
};
use serde_json::{json, Value};
use std::sync::Arc;

// ---- common ----

pub struct Truncate;

impl Injectable for Truncate {
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Truncate)
    }
}

impl PipeTransform for Truncate {
    fn transform(&self, input: &Value, args: &[Value]) -> anyhow::Result<Value> {
        let text = input.as_str().unwrap_or_default();
        let limit = args.first().and_then(Value::as_u64).unwrap_or(20) as usize;
        if text.chars().count() <= limit {
            return Ok(json!(text));
        }
        let cut: String = text.chars().take(limit).collect();
        Ok(json!(format!("{cut}…")))
    }
}

pub struct Tooltip;

impl Injectable for Tooltip {
    const INJECT: &'static [&'static str] = &["$document"];
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Tooltip)
    }
}

impl DirectiveController for Tooltip {
    fn capabilities() -> DirectiveCapabilities {
        DirectiveCapabilities {
            compile: false,
            link: true,
        }
    }

    fn link(&self, args: &[Value]) -> anyhow::Result<Value> {
        Ok(json!({ "attached": args.len() }))
    }
}

pub struct Highlight;

impl Injectable for Highlight {
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Highlight)
    }
}

impl DirectiveController for Highlight {}

pub struct Greeter {
    _log: Option<Dependency>,
}

impl Injectable for Greeter {
    const INJECT: &'static [&'static str] = &["$log"];
    fn construct(deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            _log: deps.raw(0).cloned(),
        })
    }
}

fn declare_common(store: &MetadataStore) -> Result<(), DeclareError> {
    decorators::pipe::<Truncate>(store, PipeOptions::new("truncate"))?;

    decorators::input::<Tooltip>(store, "text", Some("tooltip"));
    decorators::directive::<Tooltip>(store, DirectiveOptions::new("tooltip").restrict("A"))?;

    decorators::directive::<Highlight>(
        store,
        DirectiveOptions::new("highlight")
            .restrict("A")
            .priority(10)
            .require(Require::One("?ngModel".into())),
    )?;

    decorators::injectable::<Greeter>(store, Some("greeter"));
    Ok(())
}
ngkit::declare!(declare_common);

// ---- showcase ----

pub struct UserCard;

impl Injectable for UserCard {
    const INJECT: &'static [&'static str] = &["greeter"];
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(UserCard)
    }
}

pub struct AutoFocus;

impl Injectable for AutoFocus {
    const INJECT: &'static [&'static str] = &["$timeout"];
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(AutoFocus)
    }
}

impl DirectiveController for AutoFocus {
    fn capabilities() -> DirectiveCapabilities {
        DirectiveCapabilities {
            compile: true,
            link: true,
        }
    }

    fn compile(&self, _args: &[Value]) -> anyhow::Result<Value> {
        Ok(json!({ "focus": true }))
    }

    fn link(&self, _args: &[Value]) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

pub struct ApiConfig {
    base_url: String,
}

impl Injectable for ApiConfig {
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: "/api".into(),
        })
    }
}

impl Provider for ApiConfig {
    const GET_INJECT: &'static [&'static str] = &["$http"];

    fn get(&self, _deps: &Deps<'_>) -> anyhow::Result<Dependency> {
        let url: Dependency = Arc::new(self.base_url.clone());
        Ok(url)
    }
}

fn declare_showcase(store: &MetadataStore) -> Result<(), DeclareError> {
    decorators::input::<UserCard>(store, "user", None);
    decorators::output::<UserCard>(store, "onSelect", Some("select"));
    decorators::component::<UserCard>(
        store,
        ComponentOptions::new("userCard")
            .template("<div class=\"card\">{{$ctrl.user.name}}</div>")
            .transclude(ComponentTransclude::Flag(true))
            .require("list", "^userList")
            .bindings(Bindings::new().input("compact", Some("dense"))),
    )?;

    decorators::directive::<AutoFocus>(store, DirectiveOptions::new("autoFocus").restrict("A"))?;

    decorators::injectable_provider::<ApiConfig>(store, Some("apiConfig"));
    Ok(())
}
ngkit::declare!(declare_showcase);

// ---- drafts: deliberately incomplete ----

/// Listed as a declaration but never declared.
pub struct LegacyWidget;

/// Listed as a provider but never declared injectable.
pub struct LegacyService;

// ---- modules ----

pub struct CommonModule;

impl NgModule for CommonModule {
    fn name() -> String {
        "common".into()
    }
}

pub struct ShowcaseModule;

impl NgModule for ShowcaseModule {
    fn name() -> String {
        "showcase".into()
    }

    fn config() -> Option<Factory<()>> {
        Some(Factory::with_tokens(&["$compileProvider"], |_deps| Ok(())))
    }

    fn run() -> Option<Factory<()>> {
        Some(Factory::with_tokens(&["greeter", "apiConfig"], |_deps| Ok(())))
    }
}

pub struct DraftsModule;

impl NgModule for DraftsModule {
    fn name() -> String {
        "drafts".into()
    }
}

/// External modules the showcase depends on without assembling them.
pub const EXTERNAL_MODULES: &[&str] = &["ngSanitize"];

/// Assemble every sample module into `host`, dependencies first.
pub fn assemble_all(
    host: &dyn HostFramework,
    store: &MetadataStore,
    options: AssembleOptions,
    with_drafts: bool,
) -> Result<Vec<Assembly>, AssembleError> {
    let common = assemble_with::<CommonModule>(
        host,
        store,
        ModuleConfig::new()
            .declaration::<Truncate>()
            .declaration::<Tooltip>()
            .declaration::<Highlight>()
            .export::<Truncate>()
            .provider::<Greeter>()
            .constant("appVersion", json!(env!("CARGO_PKG_VERSION"))),
        options,
    )?;

    let showcase = assemble_with::<ShowcaseModule>(
        host,
        store,
        ModuleConfig::new()
            .import(common.handle())
            .import("ngSanitize")
            .declaration::<UserCard>()
            .declaration::<AutoFocus>()
            .provider::<ApiConfig>()
            .decorator(
                "greeter",
                Factory::with_tokens(&["$delegate"], |deps| {
                    deps.raw(0)
                        .cloned()
                        .ok_or_else(|| anyhow::anyhow!("missing $delegate"))
                }),
            ),
        options,
    )?;

    let mut assemblies = vec![common, showcase];
    if with_drafts {
        assemblies.push(assemble_with::<DraftsModule>(
            host,
            store,
            ModuleConfig::new()
                .declaration::<LegacyWidget>()
                .provider::<LegacyService>(),
            options,
        )?);
    }
    Ok(assemblies)
}
