use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, trace};

use crate::assumption::Assumption;
use crate::class::Class;
use crate::config::EnvironmentStorage;
use crate::fields;
use crate::frame::Context;
use crate::instance::Instance;
use crate::invokable::Return;
use crate::layout::Layout;
use crate::method::Method;
use crate::reflection::dispatch::invoke_meta;
use crate::reflection::ReflectiveOp;
use crate::universe::Universe;
use crate::value::Value;
use crate::SOMRef;

/// Find the meta-method an environment provides for `op`, if any.
///
/// This reads the environment's slots directly, so it is never itself intercepted.
/// Only instances of `Environment` (or of its subclasses) act as environments.
pub fn method_for(universe: &Universe, environment: &Value, op: ReflectiveOp) -> Option<Rc<Method>> {
    let environment = match environment {
        Value::Instance(environment) => environment,
        _ => return None,
    };
    let class = environment.borrow().class();
    if !Class::inherits_from(&class, &universe.core.environment_class) {
        return None;
    }
    let metaobject = fields::read_field(environment, op.slot().field_index());
    if metaobject.is_nil() {
        return None;
    }
    metaobject.lookup_method(universe, universe.selectors.reflective(op))
}

fn lookup_uncached(
    universe: &Universe,
    op: ReflectiveOp,
    receiver: &Value,
    context: &Context,
) -> Option<Rc<Method>> {
    method_for(universe, universe.reflection.global_environment(), op)
        .or_else(|| method_for(universe, &context.environment, op))
        .or_else(|| match receiver {
            Value::Instance(instance) => {
                instance.borrow_mut().update_layout();
                let environment = instance
                    .borrow()
                    .environment(universe.config.environment_storage);
                method_for(universe, &environment, op)
            }
            _ => None,
        })
}

/// Intercept `op` without any node-owned cache, for operations performed by primitives.
pub fn intercept_uncached(
    universe: &mut Universe,
    op: ReflectiveOp,
    receiver: &Value,
    context: &Context,
    operands: impl FnOnce() -> Vec<Value>,
) -> Option<Return> {
    if !universe.reflection.is_active() || context.is_meta() {
        return None;
    }
    let method = lookup_uncached(universe, op, receiver, context)?;
    let mut args = vec![receiver.clone()];
    args.extend(operands());
    Some(invoke_meta(universe, &method, args, context))
}

struct GlobalEntry {
    assumption: Assumption,
    epoch: u64,
    method: Option<Rc<Method>>,
}

struct EnvironmentEntry {
    environment: Value,
    epoch: u64,
    method: Option<Rc<Method>>,
}

/// Remembers the decisions taken for a bounded number of environments.
#[derive(Default)]
struct EnvironmentCache {
    entries: Vec<EnvironmentEntry>,
    megamorphic: bool,
}

impl EnvironmentCache {
    fn resolve(
        &mut self,
        universe: &Universe,
        environment: &Value,
        op: ReflectiveOp,
        limit: usize,
    ) -> Option<Rc<Method>> {
        if self.megamorphic {
            return method_for(universe, environment, op);
        }
        let epoch = universe.reflection.epoch();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.environment == *environment)
        {
            if entry.epoch != epoch {
                entry.method = method_for(universe, environment, op);
                entry.epoch = epoch;
            }
            return entry.method.clone();
        }
        let method = method_for(universe, environment, op);
        if self.entries.len() < limit {
            self.entries.push(EnvironmentEntry {
                environment: environment.clone(),
                epoch,
                method: method.clone(),
            });
        } else {
            debug!("semantic check for '{}' went megamorphic", op.selector());
            self.entries.clear();
            self.megamorphic = true;
        }
        method
    }
}

struct LayoutEntry {
    layout: Rc<Layout>,
    epoch: u64,
    method: Option<Rc<Method>>,
}

struct TypeEntry {
    class: SOMRef<Class>,
    environment: Value,
    epoch: u64,
    method: Option<Rc<Method>>,
}

/// Object-tier caches, keyed by layout first, then by (class, environment).
#[derive(Default)]
struct ObjectCache {
    layouts: Vec<LayoutEntry>,
    types: Vec<TypeEntry>,
    environments: EnvironmentCache,
    megamorphic: bool,
}

/// Decides whether an operation is intercepted, and by which meta-method.
///
/// Three tiers are consulted in order: the global environment, the environment of the
/// current activation, then the environment of the receiver. Nothing is ever intercepted
/// at meta level, nor while reflection is switched off.
pub struct SemanticCheck {
    operation: ReflectiveOp,
    global: RefCell<Option<GlobalEntry>>,
    activation: RefCell<EnvironmentCache>,
    object: RefCell<ObjectCache>,
}

impl SemanticCheck {
    pub fn new(operation: ReflectiveOp) -> Self {
        Self {
            operation,
            global: RefCell::new(None),
            activation: RefCell::new(EnvironmentCache::default()),
            object: RefCell::new(ObjectCache::default()),
        }
    }

    pub fn operation(&self) -> ReflectiveOp {
        self.operation
    }

    /// Find the meta-method intercepting this operation on `receiver`, if any.
    pub fn lookup(
        &self,
        universe: &Universe,
        receiver: &Value,
        context: &Context,
    ) -> Option<Rc<Method>> {
        if !universe.reflection.is_active() || context.is_meta() {
            return None;
        }
        if !universe.config.optimized_semantic_checks {
            return lookup_uncached(universe, self.operation, receiver, context);
        }
        if let Some(method) = self.global_tier(universe) {
            return Some(method);
        }
        if !context.environment.is_nil() {
            let method = self.activation.borrow_mut().resolve(
                universe,
                &context.environment,
                self.operation,
                universe.config.semantic_cache_size,
            );
            if method.is_some() {
                return method;
            }
        }
        match receiver {
            Value::Instance(instance) => self.object_tier(universe, instance),
            _ => None,
        }
    }

    /// Run the intercepting meta-method, if any, with `receiver` followed by `operands` as arguments.
    ///
    /// Returns `None` when the operation is not intercepted and its default semantics apply.
    pub fn intercept(
        &self,
        universe: &mut Universe,
        receiver: &Value,
        context: &Context,
        operands: impl FnOnce() -> Vec<Value>,
    ) -> Option<Return> {
        let method = self.lookup(universe, receiver, context)?;
        trace!(
            "'{}' intercepted by {}",
            self.operation.selector(),
            method.qualified_name()
        );
        let mut args = vec![receiver.clone()];
        args.extend(operands());
        Some(invoke_meta(universe, &method, args, context))
    }

    fn global_tier(&self, universe: &Universe) -> Option<Rc<Method>> {
        let reflection = &universe.reflection;
        if reflection.global_deactivated().is_valid() {
            return None;
        }
        if let Some(entry) = self.global.borrow().as_ref() {
            if entry.assumption.is_valid() && entry.epoch == reflection.epoch() {
                return entry.method.clone();
            }
        }
        let method = method_for(universe, reflection.global_environment(), self.operation);
        *self.global.borrow_mut() = Some(GlobalEntry {
            assumption: reflection.global_activated().clone(),
            epoch: reflection.epoch(),
            method: method.clone(),
        });
        method
    }

    fn object_tier(&self, universe: &Universe, instance: &SOMRef<Instance>) -> Option<Rc<Method>> {
        let config = &universe.config;
        let mut cache = self.object.borrow_mut();

        if config.environment_storage == EnvironmentStorage::InObject {
            let environment = instance.borrow().environment(EnvironmentStorage::InObject);
            if environment.is_nil() {
                return None;
            }
            return cache.environments.resolve(
                universe,
                &environment,
                self.operation,
                config.object_environment_cache_size,
            );
        }

        let layout = loop {
            let layout = instance.borrow().layout().clone();
            if layout.is_valid() {
                break layout;
            }
            instance.borrow_mut().update_layout();
        };
        if cache.megamorphic {
            return method_for(universe, layout.environment(), self.operation);
        }

        let epoch = universe.reflection.epoch();
        if let Some(entry) = cache
            .layouts
            .iter_mut()
            .find(|entry| Rc::ptr_eq(&entry.layout, &layout))
        {
            if entry.epoch != epoch {
                entry.method = method_for(universe, layout.environment(), self.operation);
                entry.epoch = epoch;
            }
            return entry.method.clone();
        }

        cache.layouts.retain(|entry| entry.layout.is_valid());
        if cache.layouts.len() < config.semantic_cache_size {
            let method = method_for(universe, layout.environment(), self.operation);
            cache.layouts.push(LayoutEntry {
                layout: layout.clone(),
                epoch,
                method: method.clone(),
            });
            return method;
        }

        let class = instance.borrow().class();
        let environment = layout.environment();
        if let Some(entry) = cache
            .types
            .iter_mut()
            .find(|entry| Rc::ptr_eq(&entry.class, &class) && entry.environment == *environment)
        {
            if entry.epoch != epoch {
                entry.method = method_for(universe, environment, self.operation);
                entry.epoch = epoch;
            }
            return entry.method.clone();
        }
        let method = method_for(universe, environment, self.operation);
        if cache.types.len() < config.object_type_cache_size {
            cache.types.push(TypeEntry {
                class,
                environment: environment.clone(),
                epoch,
                method: method.clone(),
            });
        } else {
            debug!(
                "object tier of '{}' went megamorphic",
                self.operation.selector()
            );
            cache.layouts.clear();
            cache.types.clear();
            cache.megamorphic = true;
        }
        method
    }
}

impl fmt::Debug for SemanticCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticCheck")
            .field("operation", &self.operation)
            .finish()
    }
}
