//! Declaration shapes: kinds, bindings, decorator options and the definition
//! records handed to the host.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::annotate::{ClassRef, Dependency, DependencyTokens, Deps, Injectable};
use crate::metadata::ClassId;

/// What a declaration registers as. Set exactly once per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Component,
    Directive,
    Pipe,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclarationKind::Component => "component",
            DeclarationKind::Directive => "directive",
            DeclarationKind::Pipe => "pipe",
        })
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingDirection {
    OneWayInput,
    EventOutput,
}

impl BindingDirection {
    /// Host binding symbol.
    pub fn symbol(&self) -> char {
        match self {
            BindingDirection::OneWayInput => '<',
            BindingDirection::EventOutput => '&',
        }
    }
}

/// One data or event channel of a component/directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub direction: BindingDirection,
    /// Externally visible attribute name; the property name is used when absent.
    pub alias: Option<String>,
}

impl Binding {
    pub fn input(alias: Option<&str>) -> Self {
        Self {
            direction: BindingDirection::OneWayInput,
            alias: alias.map(str::to_owned),
        }
    }

    pub fn output(alias: Option<&str>) -> Self {
        Self {
            direction: BindingDirection::EventOutput,
            alias: alias.map(str::to_owned),
        }
    }

    /// Host syntax: `<`, `<alias`, `&`, `&alias`.
    pub fn to_host_syntax(&self) -> String {
        let mut out = String::with_capacity(1 + self.alias.as_ref().map_or(0, String::len));
        out.push(self.direction.symbol());
        if let Some(alias) = &self.alias {
            out.push_str(alias);
        }
        out
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_host_syntax())
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_host_syntax())
    }
}

/// Property name → binding. Keys are unique; later inserts overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Binding>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, property: &str, alias: Option<&str>) -> Self {
        self.insert(property, Binding::input(alias));
        self
    }

    pub fn output(mut self, property: &str, alias: Option<&str>) -> Self {
        self.insert(property, Binding::output(alias));
        self
    }

    pub fn insert(&mut self, property: &str, binding: Binding) -> Option<Binding> {
        self.0.insert(property.to_string(), binding)
    }

    /// Entries of `other` win on equal keys.
    pub fn merge(&mut self, other: Bindings) {
        self.0.extend(other.0);
    }

    pub fn get(&self, property: &str) -> Option<&Binding> {
        self.0.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Option value shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transclude {
    Flag(bool),
    /// Transclude the whole element (directives only).
    Element,
    /// Named slots: slot name → element selector.
    Slots(BTreeMap<String, String>),
}

impl Serialize for Transclude {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Transclude::Flag(b) => serializer.serialize_bool(*b),
            Transclude::Element => serializer.serialize_str("element"),
            Transclude::Slots(slots) => slots.serialize(serializer),
        }
    }
}

/// Component transclusion: a flag or named slots. Whole-element transclusion is
/// only available to directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ComponentTransclude {
    Flag(bool),
    Slots(BTreeMap<String, String>),
}

impl From<ComponentTransclude> for Transclude {
    fn from(value: ComponentTransclude) -> Self {
        match value {
            ComponentTransclude::Flag(b) => Transclude::Flag(b),
            ComponentTransclude::Slots(slots) => Transclude::Slots(slots),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Require {
    One(String),
    Many(Vec<String>),
    Named(BTreeMap<String, String>),
}

/// Directive scope: shared with the parent, a child scope, or an isolate scope
/// described by bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveScope {
    Shared,
    Child,
    Isolate(Bindings),
}

impl Serialize for DirectiveScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DirectiveScope::Shared => serializer.serialize_bool(false),
            DirectiveScope::Child => serializer.serialize_bool(true),
            DirectiveScope::Isolate(bindings) => bindings.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// Decorator options
// ---------------------------------------------------------------------------

/// Arguments of [`component`](crate::decorators::component).
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    pub selector: String,
    pub template: Option<String>,
    pub template_url: Option<String>,
    pub transclude: Option<ComponentTransclude>,
    pub require: Option<BTreeMap<String, String>>,
    pub controller_as: Option<String>,
    /// Merged on top of bindings collected with `input`/`output`.
    pub bindings: Option<Bindings>,
}

impl ComponentOptions {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Default::default()
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = Some(url.into());
        self
    }

    pub fn transclude(mut self, transclude: ComponentTransclude) -> Self {
        self.transclude = Some(transclude);
        self
    }

    pub fn require(mut self, name: impl Into<String>, controller: impl Into<String>) -> Self {
        self.require
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), controller.into());
        self
    }

    pub fn controller_as(mut self, alias: impl Into<String>) -> Self {
        self.controller_as = Some(alias.into());
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = Some(bindings);
        self
    }
}

/// Arguments of [`directive`](crate::decorators::directive).
#[derive(Debug, Clone, Default)]
pub struct DirectiveOptions {
    pub selector: String,
    pub multi_element: Option<bool>,
    pub priority: Option<i32>,
    pub require: Option<Require>,
    pub restrict: Option<String>,
    pub scope: Option<DirectiveScope>,
    pub template: Option<String>,
    pub template_namespace: Option<String>,
    pub template_url: Option<String>,
    pub terminal: Option<bool>,
    pub transclude: Option<Transclude>,
    pub controller_as: Option<String>,
    pub bind_to_controller: Option<bool>,
    /// Merged on top of bindings collected with `input`/`output`; installed as the
    /// isolate scope.
    pub bindings: Option<Bindings>,
}

impl DirectiveOptions {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Default::default()
        }
    }

    pub fn restrict(mut self, restrict: impl Into<String>) -> Self {
        self.restrict = Some(restrict.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = Some(terminal);
        self
    }

    pub fn multi_element(mut self, multi_element: bool) -> Self {
        self.multi_element = Some(multi_element);
        self
    }

    pub fn require(mut self, require: Require) -> Self {
        self.require = Some(require);
        self
    }

    pub fn scope(mut self, scope: DirectiveScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = Some(url.into());
        self
    }

    pub fn template_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.template_namespace = Some(namespace.into());
        self
    }

    pub fn transclude(mut self, transclude: Transclude) -> Self {
        self.transclude = Some(transclude);
        self
    }

    pub fn controller_as(mut self, alias: impl Into<String>) -> Self {
        self.controller_as = Some(alias.into());
        self
    }

    pub fn bind_to_controller(mut self, bind: bool) -> Self {
        self.bind_to_controller = Some(bind);
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = Some(bindings);
        self
    }
}

/// Arguments of [`pipe`](crate::decorators::pipe).
#[derive(Debug, Clone, Default)]
pub struct PipeOptions {
    pub name: String,
}

impl PipeOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ---------------------------------------------------------------------------
// Definitions handed to the host
// ---------------------------------------------------------------------------

/// Component options record registered with the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDefinition {
    pub controller: ClassRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Bindings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transclude: Option<ComponentTransclude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_as: Option<String>,
}

/// Directive definition object returned by a directive factory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectiveDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<ClassRef>,
    #[serde(skip)]
    pub compile: Option<BoundFn>,
    #[serde(skip)]
    pub link: Option<BoundFn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<DirectiveScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_element: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<Require>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transclude: Option<Transclude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_to_controller: Option<bool>,
}

/// A host-invoked operation bound to one controller instance (`compile`, `link`).
#[derive(Clone)]
pub struct BoundFn(Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>);

impl BoundFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for BoundFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoundFn")
    }
}

/// A pipe's `transform` bound to one pipe instance.
#[derive(Clone)]
pub struct TransformFn(Arc<dyn Fn(&Value, &[Value]) -> anyhow::Result<Value> + Send + Sync>);

impl TransformFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, input: &Value, args: &[Value]) -> anyhow::Result<Value> {
        (self.0)(input, args)
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransformFn")
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Which hooks a directive controller implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectiveCapabilities {
    pub compile: bool,
    pub link: bool,
}

/// Controller of a directive.
///
/// `capabilities()` advertises which of `compile`/`link` are implemented; the
/// directive factory prefers `compile`, then `link`, then registers the class itself
/// as the directive controller.
pub trait DirectiveController: Injectable {
    fn capabilities() -> DirectiveCapabilities {
        DirectiveCapabilities::default()
    }

    fn compile(&self, _args: &[Value]) -> anyhow::Result<Value> {
        anyhow::bail!("{} does not implement compile", ClassId::of::<Self>())
    }

    fn link(&self, _args: &[Value]) -> anyhow::Result<Value> {
        anyhow::bail!("{} does not implement link", ClassId::of::<Self>())
    }
}

/// A value transform (host filter).
pub trait PipeTransform: Injectable {
    fn transform(&self, input: &Value, args: &[Value]) -> anyhow::Result<Value>;
}

/// A configurable service exposing a `$get` factory.
pub trait Provider: Injectable {
    /// Dependencies of `get`, resolved when the host instantiates the service.
    const GET_INJECT: &'static [&'static str] = &[];

    fn get(&self, deps: &Deps<'_>) -> anyhow::Result<Dependency>;
}

// ---------------------------------------------------------------------------
// Recipes stored in the metadata store
// ---------------------------------------------------------------------------

pub(crate) type BindHookFn = fn(&Deps<'_>) -> anyhow::Result<BoundFn>;
pub(crate) type BindTransformFn = fn(&Deps<'_>) -> anyhow::Result<TransformFn>;
pub(crate) type ProviderGetFn = fn(&Dependency, &Deps<'_>) -> anyhow::Result<Dependency>;

/// Everything a registration strategy needs, captured at declaration time.
#[derive(Debug, Clone)]
pub enum DeclarationRecipe {
    Component(ComponentDefinition),
    Directive(DirectiveRecipe),
    Pipe(PipeRecipe),
}

impl DeclarationRecipe {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            DeclarationRecipe::Component(_) => DeclarationKind::Component,
            DeclarationRecipe::Directive(_) => DeclarationKind::Directive,
            DeclarationRecipe::Pipe(_) => DeclarationKind::Pipe,
        }
    }
}

#[derive(Clone)]
pub struct DirectiveRecipe {
    pub(crate) definition: DirectiveDefinition,
    pub(crate) controller: ClassRef,
    pub(crate) capabilities: fn() -> DirectiveCapabilities,
    pub(crate) bind_compile: BindHookFn,
    pub(crate) bind_link: BindHookFn,
}

impl DirectiveRecipe {
    pub fn definition(&self) -> &DirectiveDefinition {
        &self.definition
    }

    pub fn controller(&self) -> &ClassRef {
        &self.controller
    }
}

impl fmt::Debug for DirectiveRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRecipe")
            .field("definition", &self.definition)
            .field("controller", &self.controller)
            .field("capabilities", &(self.capabilities)())
            .finish()
    }
}

#[derive(Clone)]
pub struct PipeRecipe {
    pub(crate) class: ClassId,
    pub(crate) inject: DependencyTokens,
    pub(crate) bind_transform: BindTransformFn,
}

impl fmt::Debug for PipeRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeRecipe")
            .field("class", &self.class)
            .field("inject", &self.inject)
            .finish()
    }
}

/// `$get` of a provider: its tokens and the call bound to a provider instance.
#[derive(Clone)]
pub struct ProviderGet {
    pub(crate) inject: DependencyTokens,
    pub(crate) call: ProviderGetFn,
}

impl fmt::Debug for ProviderGet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGet")
            .field("inject", &self.inject)
            .finish()
    }
}

/// Registered through `service` unless it exposes `$get`, then through `provider`.
#[derive(Debug, Clone)]
pub struct ServiceRecipe {
    pub(crate) name: String,
    pub(crate) class: ClassRef,
    pub(crate) get: Option<ProviderGet>,
}

impl ServiceRecipe {
    /// Injector name; kept apart from the declaration name of the same class.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn is_provider(&self) -> bool {
        self.get.is_some()
    }
}

/// Provider class plus its `$get`, as handed to the host.
#[derive(Debug, Clone)]
pub struct ProviderRef {
    class: ClassRef,
    get: ProviderGet,
}

impl ProviderRef {
    pub(crate) fn new(class: ClassRef, get: ProviderGet) -> Self {
        Self { class, get }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn get_inject(&self) -> &DependencyTokens {
        &self.get.inject
    }

    /// Call `$get` on an already constructed provider instance.
    pub fn get(&self, provider: &Dependency, values: &[Dependency]) -> anyhow::Result<Dependency> {
        let deps = Deps::new(self.get.inject.as_slice(), values);
        (self.get.call)(provider, &deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_host_syntax_keeps_direction_and_alias() {
        assert_eq!(Binding::input(None).to_host_syntax(), "<");
        assert_eq!(Binding::input(Some("userName")).to_host_syntax(), "<userName");
        assert_eq!(Binding::output(Some("onSave")).to_host_syntax(), "&onSave");
    }

    #[test]
    fn bindings_merge_overwrites_equal_keys() {
        let mut collected = Bindings::new().input("value", None).output("change", None);
        collected.merge(Bindings::new().input("value", Some("model")));

        assert_eq!(collected.len(), 2);
        assert_eq!(collected.get("value"), Some(&Binding::input(Some("model"))));
        assert_eq!(collected.get("change"), Some(&Binding::output(None)));
    }

    #[test]
    fn option_shapes_serialize_to_host_values() {
        let scope = DirectiveScope::Isolate(Bindings::new().input("item", Some("source")));
        assert_eq!(
            serde_json::to_value(&scope).unwrap(),
            serde_json::json!({"item": "<source"})
        );
        assert_eq!(
            serde_json::to_value(DirectiveScope::Child).unwrap(),
            serde_json::json!(true)
        );
        assert_eq!(
            serde_json::to_value(Transclude::Element).unwrap(),
            serde_json::json!("element")
        );
        assert_eq!(
            serde_json::to_value(ComponentTransclude::Flag(true)).unwrap(),
            serde_json::json!(true)
        );
        let slots = BTreeMap::from([("title".to_string(), "?cardTitle".to_string())]);
        assert_eq!(
            Transclude::from(ComponentTransclude::Slots(slots.clone())),
            Transclude::Slots(slots)
        );
        assert_eq!(
            serde_json::to_value(Require::Many(vec!["^form".into(), "ngModel".into()])).unwrap(),
            serde_json::json!(["^form", "ngModel"])
        );
    }
}
