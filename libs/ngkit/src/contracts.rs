use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::annotate::{ClassRef, Dependency, Factory};
use crate::declarations::{ComponentDefinition, DirectiveDefinition, ProviderRef, TransformFn};

/// Host framework entry point: creates modules.
pub trait HostFramework: Send + Sync {
    /// Create (or replace) the module `name` depending on the modules in `requires`.
    fn module(&self, name: &str, requires: &[String]) -> anyhow::Result<Arc<dyn HostModule>>;
}

/// Registration surface of one host module.
///
/// Every call may be rejected (duplicate name, malformed name); the assembler
/// propagates the rejection without retrying.
pub trait HostModule: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn component(&self, name: &str, options: ComponentDefinition) -> anyhow::Result<()>;

    fn directive(&self, name: &str, factory: Factory<DirectiveDefinition>) -> anyhow::Result<()>;

    fn filter(&self, name: &str, factory: Factory<TransformFn>) -> anyhow::Result<()>;

    fn service(&self, name: &str, class: ClassRef) -> anyhow::Result<()>;

    fn provider(&self, name: &str, provider: ProviderRef) -> anyhow::Result<()>;

    fn constant(&self, name: &str, value: Value) -> anyhow::Result<()>;

    /// Decorate the service `name`; the factory receives the original as `$delegate`.
    fn decorator(&self, name: &str, factory: Factory<Dependency>) -> anyhow::Result<()>;

    fn config(&self, block: Factory<()>) -> anyhow::Result<()>;

    fn run(&self, block: Factory<()>) -> anyhow::Result<()>;
}

/// A created host module. Pass it in another module's imports to depend on it.
#[derive(Clone)]
pub struct ModuleHandle {
    name: Arc<str>,
    module: Arc<dyn HostModule>,
}

impl ModuleHandle {
    pub fn new(module: Arc<dyn HostModule>) -> Self {
        Self {
            name: Arc::from(module.name()),
            module,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Arc<dyn HostModule> {
        &self.module
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name)
            .finish()
    }
}
