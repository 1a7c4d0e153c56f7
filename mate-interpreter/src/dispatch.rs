//!
//! Per-call-site message dispatch.
//!
//! A call site starts out uninitialized and performs plain lookups while it warms up.
//! It then grows a chain of guarded entries, most recent first, each mapping one kind
//! of receiver to the method (or `doesNotUnderstand:arguments:` handling) it resolves to.
//! Once the chain is full, the whole chain is dropped and the site goes megamorphic for good.
//!
//! Entries remember the method epoch they were resolved under: redefining any method
//! drops them, so a warm site never answers differently from a cold one.
//!

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::class::Class;
use crate::error::{MateError, Retry};
use crate::frame::Context;
use crate::interner::Interned;
use crate::invokable::{Invoke, Return};
use crate::layout::Layout;
use crate::method::Method;
use crate::nodes::BlockBody;
use crate::universe::Universe;
use crate::value::Value;
use crate::SOMRef;

/// Decides whether a cached entry applies to a receiver.
#[derive(Debug, Clone)]
enum Guard {
    True,
    False,
    /// Receivers other than objects, booleans and blocks, by class.
    Class(SOMRef<Class>),
    /// Objects, by layout, or by class if their layout changed since (objects carrying an environment).
    Layout {
        layout: Rc<Layout>,
        class: SOMRef<Class>,
    },
    BlockClass(SOMRef<Class>),
    /// Blocks created from one particular block expression.
    BlockMethod(Rc<BlockBody>),
}

impl Guard {
    fn for_receiver(universe: &Universe, receiver: &Value) -> Self {
        match receiver {
            Value::Boolean(true) => Self::True,
            Value::Boolean(false) => Self::False,
            Value::Instance(instance) => {
                let instance = instance.borrow();
                Self::Layout {
                    layout: instance.layout().clone(),
                    class: instance.class(),
                }
            }
            Value::Block(block) => Self::BlockClass(block.class(universe)),
            receiver => Self::Class(receiver.class(universe)),
        }
    }

    fn matches(&self, universe: &Universe, receiver: &Value) -> Result<bool, Retry> {
        match (self, receiver) {
            (Self::True, Value::Boolean(value)) => Ok(*value),
            (Self::False, Value::Boolean(value)) => Ok(!*value),
            (Self::Layout { layout, class }, receiver) => {
                if !layout.is_valid() {
                    return Err(Retry::InvalidCacheEntry);
                }
                match receiver {
                    Value::Instance(instance) => {
                        let instance = instance.borrow();
                        Ok(Rc::ptr_eq(instance.layout(), layout)
                            || Rc::ptr_eq(&instance.class, class))
                    }
                    _ => Ok(false),
                }
            }
            (Self::BlockClass(class), Value::Block(block)) => {
                Ok(Rc::ptr_eq(&block.class(universe), class))
            }
            (Self::BlockMethod(body), Value::Block(block)) => Ok(Rc::ptr_eq(&block.body, body)),
            (Self::Class(_), Value::Instance(_))
            | (Self::Class(_), Value::Block(_))
            | (Self::Class(_), Value::Boolean(_)) => Ok(false),
            (Self::Class(class), receiver) => Ok(Rc::ptr_eq(&receiver.class(universe), class)),
            _ => Ok(false),
        }
    }
}

/// What a matching entry does with the send.
#[derive(Debug, Clone)]
enum Target {
    Method(Rc<Method>),
    DoesNotUnderstand,
    /// Evaluate the receiver block directly.
    Block,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    guard: Guard,
    target: Target,
    epoch: u64,
}

#[derive(Debug)]
enum DispatchState {
    Uninitialized { calls: usize },
    Cached(Vec<CacheEntry>),
    Megamorphic,
}

/// The observable state of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Uninitialized,
    /// Holds this many entries.
    Cached(usize),
    Megamorphic,
}

enum Step {
    /// Look the method up from scratch.
    Indirect,
    Target(Target),
}

/// The dispatch state owned by one message send.
#[derive(Debug)]
pub struct CallSite {
    selector: Interned,
    state: RefCell<DispatchState>,
}

impl CallSite {
    pub fn new(selector: Interned) -> Self {
        Self {
            selector,
            state: RefCell::new(DispatchState::Uninitialized { calls: 0 }),
        }
    }

    pub fn selector(&self) -> Interned {
        self.selector
    }

    pub fn kind(&self) -> DispatchKind {
        match &*self.state.borrow() {
            DispatchState::Uninitialized { .. } => DispatchKind::Uninitialized,
            DispatchState::Cached(entries) => DispatchKind::Cached(entries.len()),
            DispatchState::Megamorphic => DispatchKind::Megamorphic,
        }
    }

    /// Send this site's selector, with `args` (receiver first).
    pub fn dispatch(&self, universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        let receiver = match args.first() {
            Some(receiver) => receiver.clone(),
            None => return Return::Exception(MateError::MissingReceiver),
        };
        match self.step(universe, &receiver) {
            Step::Indirect => match receiver.lookup_method(universe, self.selector) {
                Some(method) => method.invoke(universe, args, context),
                None => self.does_not_understand(universe, args, context),
            },
            Step::Target(Target::Method(method)) => method.invoke(universe, args, context),
            Step::Target(Target::DoesNotUnderstand) => {
                self.does_not_understand(universe, args, context)
            }
            Step::Target(Target::Block) => match receiver {
                Value::Block(block) => block.invoke(universe, args, context),
                _ => self.does_not_understand(universe, args, context),
            },
        }
    }

    fn does_not_understand(
        &self,
        universe: &mut Universe,
        mut args: Vec<Value>,
        context: &Context,
    ) -> Return {
        let receiver = args.remove(0);
        universe.does_not_understand(receiver, self.selector, args, context)
    }

    /// Walk the chain, specializing it if needed. The state is no longer borrowed once this returns.
    fn step(&self, universe: &Universe, receiver: &Value) -> Step {
        let mut state = self.state.borrow_mut();
        loop {
            match &mut *state {
                DispatchState::Uninitialized { calls } => {
                    if *calls < universe.config.dispatch_warmup {
                        *calls += 1;
                        return Step::Indirect;
                    }
                    *state = DispatchState::Cached(Vec::new());
                }
                DispatchState::Megamorphic => return Step::Indirect,
                DispatchState::Cached(entries) => {
                    let epoch = universe.method_epoch;
                    let before = entries.len();
                    entries.retain(|entry| entry.epoch == epoch);
                    if entries.len() != before {
                        debug!(
                            "call site of '#{}' dropped {} stale entries",
                            universe.lookup_symbol(self.selector),
                            before - entries.len()
                        );
                    }
                    let mut idx = 0;
                    while idx < entries.len() {
                        match entries[idx].guard.matches(universe, receiver) {
                            Ok(true) => return Step::Target(entries[idx].target.clone()),
                            Ok(false) => idx += 1,
                            Err(_) => {
                                entries.remove(idx);
                                idx = 0;
                            }
                        }
                    }
                    if entries.len() >= universe.config.inline_cache_size {
                        debug!(
                            "call site of '#{}' went megamorphic",
                            universe.lookup_symbol(self.selector)
                        );
                        *state = DispatchState::Megamorphic;
                        return Step::Indirect;
                    }
                    let entry = self.specialize(universe, receiver);
                    let target = entry.target.clone();
                    entries.insert(0, entry);
                    return Step::Target(target);
                }
            }
        }
    }

    fn specialize(&self, universe: &Universe, receiver: &Value) -> CacheEntry {
        if let Value::Instance(instance) = receiver {
            instance.borrow_mut().update_layout();
        }
        let method = receiver.lookup_method(universe, self.selector);
        let epoch = universe.method_epoch;
        match (method, receiver) {
            (Some(method), Value::Block(block))
                if method.is_primitive() && universe.selectors.is_block_value(self.selector) =>
            {
                CacheEntry {
                    guard: Guard::BlockMethod(block.body.clone()),
                    target: Target::Block,
                    epoch,
                }
            }
            (Some(method), receiver) => CacheEntry {
                guard: Guard::for_receiver(universe, receiver),
                target: Target::Method(method),
                epoch,
            },
            (None, receiver) => CacheEntry {
                guard: Guard::for_receiver(universe, receiver),
                target: Target::DoesNotUnderstand,
                epoch,
            },
        }
    }
}

/// The dispatch state owned by one `super` send.
///
/// The lexical superclass never changes, so the method is resolved once per method epoch.
#[derive(Debug)]
pub struct SuperCallSite {
    selector: Interned,
    /// The resolved method, with the method epoch it was resolved under.
    method: RefCell<Option<(u64, Rc<Method>)>>,
}

impl SuperCallSite {
    pub fn new(selector: Interned) -> Self {
        Self {
            selector,
            method: RefCell::new(None),
        }
    }

    pub fn selector(&self) -> Interned {
        self.selector
    }

    /// Send this site's selector to `args[0]`, starting lookup from `super_class`.
    pub fn dispatch(
        &self,
        universe: &mut Universe,
        super_class: &SOMRef<Class>,
        args: Vec<Value>,
        context: &Context,
    ) -> Return {
        let epoch = universe.method_epoch;
        let cached = match &*self.method.borrow() {
            Some((resolved, method)) if *resolved == epoch => Some(method.clone()),
            _ => None,
        };
        let method = match cached {
            Some(method) => method,
            None => match super_class.borrow().lookup_method(self.selector) {
                Some(method) => {
                    *self.method.borrow_mut() = Some((epoch, method.clone()));
                    method
                }
                None => {
                    return Return::Exception(MateError::SuperLookupFailure {
                        class: super_class.borrow().name().to_string(),
                        selector: universe.lookup_symbol(self.selector).to_string(),
                    })
                }
            },
        };
        method.invoke(universe, args, context)
    }
}
