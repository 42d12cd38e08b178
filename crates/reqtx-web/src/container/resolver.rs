use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use reqtx_core::error::{Result, TxError};
use reqtx_core::Lifetime;

use crate::context::RequestItems;

/// Value of a named resolution argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Text(String),
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v.into())
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Text(v.to_string())
    }
}

/// Named extra arguments for a resolution, plus the request scope (if any).
///
/// Arguments never take part in caching decisions.
#[derive(Debug, Clone, Default)]
pub struct ResolveArgs {
    named: BTreeMap<String, ArgValue>,
    scope: Option<RequestItems>,
}

impl ResolveArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    pub fn in_scope(mut self, items: RequestItems) -> Self {
        self.scope = Some(items);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.named.get(name)
    }

    pub fn order(&self) -> Option<i64> {
        match self.named.get("order") {
            Some(ArgValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<&RequestItems> {
        self.scope.as_ref()
    }
}

/// The slice of a dependency container the pipeline relies on.
#[async_trait]
pub trait Resolver<T: ?Sized + Send + Sync + 'static>: Send + Sync {
    /// Declared lifetime; never changes at runtime.
    fn lifetime(&self) -> Lifetime;

    async fn resolve(&self, args: &ResolveArgs) -> Result<Arc<T>>;

    /// Hand a borrowed instance back to the container.
    fn release(&self, _instance: Arc<T>) {}
}

type Factory<T> = Arc<dyn Fn(&ResolveArgs) -> Result<Arc<T>> + Send + Sync>;

/// Resolver backed by a factory closure and a declared lifetime.
///
/// - `Singleton`: the factory runs once, every caller shares the instance.
/// - `Scoped`: one instance per request scope, stored in the scope's items.
/// - `Transient`: the factory runs on every resolution.
pub struct FactoryResolver<T: ?Sized> {
    lifetime: Lifetime,
    factory: Factory<T>,
    singleton: OnceCell<Arc<T>>,
    created: AtomicU64,
    released: AtomicU64,
}

impl<T: ?Sized + Send + Sync + 'static> FactoryResolver<T> {
    pub fn new<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&ResolveArgs) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            lifetime,
            factory: Arc::new(factory),
            singleton: OnceCell::new(),
            created: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    pub fn singleton<F>(factory: F) -> Self
    where
        F: Fn(&ResolveArgs) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Singleton, factory)
    }

    pub fn scoped<F>(factory: F) -> Self
    where
        F: Fn(&ResolveArgs) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Scoped, factory)
    }

    pub fn transient<F>(factory: F) -> Self
    where
        F: Fn(&ResolveArgs) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Transient, factory)
    }

    /// Number of instances produced by the factory.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    fn create(&self, args: &ResolveArgs) -> Result<Arc<T>> {
        let instance = (self.factory)(args)?;
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(instance)
    }

    fn scope_key() -> String {
        format!("reqtx.scoped.{}", std::any::type_name::<T>())
    }
}

#[async_trait]
impl<T: ?Sized + Send + Sync + 'static> Resolver<T> for FactoryResolver<T> {
    fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    async fn resolve(&self, args: &ResolveArgs) -> Result<Arc<T>> {
        match self.lifetime {
            Lifetime::Singleton => self
                .singleton
                .get_or_try_init(|| async { self.create(args) })
                .await
                .cloned(),
            Lifetime::Scoped => {
                let scope = args.scope().ok_or_else(|| {
                    TxError::Resolution(format!(
                        "scoped component {} resolved outside a request scope",
                        std::any::type_name::<T>()
                    ))
                })?;
                let key = Self::scope_key();
                if let Some(existing) = scope.get::<Arc<T>>(&key) {
                    return Ok(existing);
                }
                let fresh = self.create(args)?;
                scope
                    .get_or_insert_with(&key, || fresh)
                    .ok_or_else(|| TxError::Resolution(format!("scope slot {key} holds a foreign value")))
            }
            Lifetime::Transient => self.create(args),
        }
    }

    fn release(&self, _instance: Arc<T>) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}
