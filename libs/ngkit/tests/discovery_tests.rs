//! Declarations submitted with `declare!` are collected by `MetadataStore::discover`.

use ngkit::{
    assemble, decorators, ClassId, ComponentOptions, DeclarationKind, DeclareError, Deps,
    InMemoryHost, Injectable, MetadataStore, ModuleConfig, NgModule, PipeOptions, PipeTransform,
};
use serde_json::{json, Value};

struct Badge;
impl Injectable for Badge {
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Badge)
    }
}

struct Trim;
impl Injectable for Trim {
    fn construct(_deps: &Deps<'_>) -> anyhow::Result<Self> {
        Ok(Trim)
    }
}
impl PipeTransform for Trim {
    fn transform(&self, input: &Value, _args: &[Value]) -> anyhow::Result<Value> {
        Ok(json!(input.as_str().unwrap_or_default().trim()))
    }
}

fn declare_badge(store: &MetadataStore) -> Result<(), DeclareError> {
    decorators::input::<Badge>(store, "label", None);
    decorators::component::<Badge>(store, ComponentOptions::new("badge").template("{{$ctrl.label}}"))
}
ngkit::declare!(declare_badge);

fn declare_trim(store: &MetadataStore) -> Result<(), DeclareError> {
    decorators::pipe::<Trim>(store, PipeOptions::new("trim"))
}
ngkit::declare!(declare_trim);

struct WidgetsModule;
impl NgModule for WidgetsModule {}

#[test]
fn discover_collects_every_submitted_declaration() {
    let store = MetadataStore::discover().unwrap();

    assert_eq!(
        store.read(ngkit::metadata::keys::KIND, ClassId::of::<Badge>()),
        Some(DeclarationKind::Component)
    );
    assert_eq!(
        store.read(ngkit::metadata::keys::KIND, ClassId::of::<Trim>()),
        Some(DeclarationKind::Pipe)
    );
}

#[test]
fn discovered_store_assembles() {
    let store = MetadataStore::discover().unwrap();
    let host = InMemoryHost::new();

    let assembly = assemble::<WidgetsModule>(
        &host,
        &store,
        ModuleConfig::new().declaration::<Badge>().declaration::<Trim>(),
    )
    .unwrap();
    assert!(assembly.is_clean());

    let module = host.get("WidgetsModule").unwrap();
    assert_eq!(
        module.registrations().len(),
        2,
        "one component and one filter"
    );
    let trim = module.instantiate_filter("trim").unwrap();
    assert_eq!(trim.apply(&json!("  x "), &[]).unwrap(), json!("x"));
}

#[test]
fn each_discover_builds_an_independent_store() {
    let first = MetadataStore::discover().unwrap();
    let second = MetadataStore::discover().unwrap();
    first.clear();

    assert!(first.is_empty());
    assert!(second.contains(ngkit::metadata::keys::KIND, ClassId::of::<Badge>()));
}
