//! Backend registry: the explicit table of operations a proxy may dispatch
//! to, each paired with its exposure markers, plus named utility objects and
//! the optional role annotation lookups used when building request contexts.

pub mod membership;
pub mod subman;

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::gate::OperationDescriptor;

pub type Kwargs = Map<String, Value>;
pub type OperationFn = Arc<dyn Fn(&mut RequestContext, &[Value], &Kwargs) -> Result<Value> + Send + Sync>;
pub type LookupFn = Arc<dyn Fn(i64) -> BTreeSet<i64> + Send + Sync>;
pub type Utility = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct Operation {
    name: String,
    descriptor: OperationDescriptor,
    handler: OperationFn,
}

impl Operation {
    pub fn name(&self) -> &str { &self.name }
    pub fn descriptor(&self) -> &OperationDescriptor { &self.descriptor }

    pub fn invoke(&self, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        (self.handler)(ctx, args, kwargs)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).field("descriptor", &self.descriptor).finish()
    }
}

/// Per-role annotation lookups. Each one is optional; an absent lookup means
/// the matching enrichment is skipped.
#[derive(Clone, Default)]
pub struct Annotators {
    pub organizer: Option<LookupFn>,
    pub moderator: Option<LookupFn>,
    pub presider: Option<LookupFn>,
}

pub struct Backend {
    realm: String,
    operations: BTreeMap<String, Operation>,
    utilities: HashMap<String, Utility>,
    annotators: Annotators,
}

impl Backend {
    pub fn builder<S: Into<String>>(realm: S) -> BackendBuilder {
        BackendBuilder {
            backend: Backend {
                realm: realm.into(),
                operations: BTreeMap::new(),
                utilities: HashMap::new(),
                annotators: Annotators::default(),
            },
        }
    }

    pub fn realm(&self) -> &str { &self.realm }
    pub fn operation(&self, name: &str) -> Option<&Operation> { self.operations.get(name) }
    pub fn operations(&self) -> impl Iterator<Item = &Operation> { self.operations.values() }
    pub fn utility(&self, name: &str) -> Option<&Utility> { self.utilities.get(name) }
    pub fn annotators(&self) -> &Annotators { &self.annotators }
}

pub struct BackendBuilder {
    backend: Backend,
}

impl BackendBuilder {
    pub fn operation<F>(mut self, name: &str, descriptor: OperationDescriptor, f: F) -> Self
    where
        F: Fn(&mut RequestContext, &[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        let op = Operation { name: name.to_string(), descriptor, handler: Arc::new(f) };
        self.backend.operations.insert(name.to_string(), op);
        self
    }

    pub fn public<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext, &[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.operation(name, OperationDescriptor::PUBLIC, f)
    }

    pub fn internal<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext, &[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.operation(name, OperationDescriptor::INTERNAL, f)
    }

    pub fn private<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext, &[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.operation(name, OperationDescriptor::PRIVATE, f)
    }

    pub fn utility<T: Any + Send + Sync>(mut self, name: &str, obj: Arc<T>) -> Self {
        self.backend.utilities.insert(name.to_string(), obj);
        self
    }

    pub fn organizer_lookup<F: Fn(i64) -> BTreeSet<i64> + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.backend.annotators.organizer = Some(Arc::new(f));
        self
    }

    pub fn moderator_lookup<F: Fn(i64) -> BTreeSet<i64> + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.backend.annotators.moderator = Some(Arc::new(f));
        self
    }

    pub fn presider_lookup<F: Fn(i64) -> BTreeSet<i64> + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.backend.annotators.presider = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Backend { self.backend }
}

// ---- argument helpers shared by backend operations ----

/// Integer argument taken from position `idx` or keyword `key`.
pub fn int_arg(args: &[Value], kwargs: &Kwargs, idx: usize, key: &str) -> Option<i64> {
    args.get(idx).or_else(|| kwargs.get(key)).and_then(Value::as_i64)
}

pub fn str_arg<'a>(args: &'a [Value], kwargs: &'a Kwargs, idx: usize, key: &str) -> Option<&'a str> {
    args.get(idx).or_else(|| kwargs.get(key)).and_then(Value::as_str)
}
