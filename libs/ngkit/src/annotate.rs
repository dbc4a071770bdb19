//! Dependency tokens and the invocables that carry them.
//!
//! Tokens are authored explicitly (`Injectable::INJECT`) and resolved positionally by
//! the host injector. Nothing here infers names from parameter lists.

use std::{any::Any, fmt, sync::Arc};

use crate::error::InjectError;
use crate::metadata::ClassId;

/// A value supplied by the host injector.
pub type Dependency = Arc<dyn Any + Send + Sync>;

/// Ordered list of dependency tokens. Order matches the constructor's parameter order.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DependencyTokens(Arc<[Arc<str>]>);

impl DependencyTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self(Arc::from(Vec::<Arc<str>>::new()))
    }

    pub fn as_slice(&self) -> &[Arc<str>] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|t| t.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(|t| t.as_ref())
    }

    pub fn position(&self, token: &str) -> Option<usize> {
        self.0.iter().position(|t| t.as_ref() == token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}

impl Default for DependencyTokens {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for DependencyTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl serde::Serialize for DependencyTokens {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl From<&[&str]> for DependencyTokens {
    fn from(tokens: &[&str]) -> Self {
        Self::new(tokens.iter().copied())
    }
}

/// A type the host injector can construct.
///
/// `INJECT` lists the constructor's dependencies in parameter order; `construct`
/// receives them through [`Deps`] in that same order.
pub trait Injectable: Sized + Send + Sync + 'static {
    const INJECT: &'static [&'static str] = &[];

    fn construct(deps: &Deps<'_>) -> anyhow::Result<Self>;
}

/// Ordered dependency tokens of `T`.
pub fn annotate<T: Injectable>() -> DependencyTokens {
    DependencyTokens::new(T::INJECT.iter().copied())
}

/// Positional view over injected values, labelled by their tokens.
#[derive(Clone, Copy)]
pub struct Deps<'a> {
    tokens: &'a [Arc<str>],
    values: &'a [Dependency],
}

impl<'a> Deps<'a> {
    pub fn new(tokens: &'a [Arc<str>], values: &'a [Dependency]) -> Self {
        Self { tokens, values }
    }

    pub fn empty() -> Deps<'static> {
        Deps {
            tokens: &[],
            values: &[],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Untyped access by position.
    pub fn raw(&self, index: usize) -> Option<&'a Dependency> {
        self.values.get(index)
    }

    /// Typed access by position.
    pub fn at<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, InjectError> {
        let token = self
            .tokens
            .get(index)
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("#{index}"));
        let value = self
            .values
            .get(index)
            .ok_or_else(|| InjectError::MissingDependency {
                token: token.clone(),
            })?;
        value
            .clone()
            .downcast::<T>()
            .map_err(|_| InjectError::TypeMismatch {
                token,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Typed access by token name.
    pub fn get<T: Any + Send + Sync>(&self, token: &str) -> Result<Arc<T>, InjectError> {
        let index = self
            .tokens
            .iter()
            .position(|t| t.as_ref() == token)
            .ok_or_else(|| InjectError::MissingDependency {
                token: token.to_string(),
            })?;
        self.at(index)
    }
}

type InvokeFn<T> = dyn Fn(&Deps<'_>) -> anyhow::Result<T> + Send + Sync;

/// An invocable that carries its own dependency tokens.
///
/// The host resolves `inject()` and calls `invoke` with the values in the same order.
pub struct Factory<T> {
    inject: DependencyTokens,
    call: Arc<InvokeFn<T>>,
}

impl<T> Factory<T> {
    pub fn new<F>(inject: DependencyTokens, f: F) -> Self
    where
        F: Fn(&Deps<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            inject,
            call: Arc::new(f),
        }
    }

    /// Shorthand for `Factory::new(DependencyTokens::from(tokens), f)`.
    pub fn with_tokens<F>(tokens: &[&str], f: F) -> Self
    where
        F: Fn(&Deps<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(DependencyTokens::from(tokens), f)
    }

    pub fn inject(&self) -> &DependencyTokens {
        &self.inject
    }

    pub fn invoke(&self, values: &[Dependency]) -> anyhow::Result<T> {
        let deps = Deps::new(self.inject.as_slice(), values);
        (self.call)(&deps)
    }
}

impl<T> Clone for Factory<T> {
    fn clone(&self) -> Self {
        Self {
            inject: self.inject.clone(),
            call: self.call.clone(),
        }
    }
}

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("inject", &self.inject)
            .finish_non_exhaustive()
    }
}

type ConstructFn = fn(&Deps<'_>) -> anyhow::Result<Dependency>;

fn construct_erased<T: Injectable>(deps: &Deps<'_>) -> anyhow::Result<Dependency> {
    let instance: Dependency = Arc::new(T::construct(deps)?);
    Ok(instance)
}

/// The raw class handed to the host: identity, tokens and a type-erased constructor.
///
/// Equality is identity of the class.
#[derive(Clone)]
pub struct ClassRef {
    id: ClassId,
    inject: DependencyTokens,
    construct: ConstructFn,
}

impl ClassRef {
    pub fn of<T: Injectable>() -> Self {
        Self {
            id: ClassId::of::<T>(),
            inject: annotate::<T>(),
            construct: construct_erased::<T>,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn inject(&self) -> &DependencyTokens {
        &self.inject
    }

    /// Construct an instance with values resolved in `inject()` order.
    pub fn instantiate(&self, values: &[Dependency]) -> anyhow::Result<Dependency> {
        let deps = Deps::new(self.inject.as_slice(), values);
        (self.construct)(&deps)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassRef {}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRef")
            .field("id", &self.id)
            .field("inject", &self.inject)
            .finish()
    }
}

impl serde::Serialize for ClassRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.id, serializer)
    }
}
