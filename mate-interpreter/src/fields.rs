use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::frame::Context;
use crate::instance::Instance;
use crate::invokable::Return;
use crate::layout::Layout;
use crate::reflection::semantics::SemanticCheck;
use crate::universe::Universe;
use crate::value::Value;
use crate::SOMRef;

/// Read a field of an object without caching, migrating the object first if its layout went stale.
///
/// Fields that were never written read as `nil`.
pub fn read_field(instance: &SOMRef<Instance>, field: usize) -> Value {
    loop {
        let result = instance.borrow().read_field(field);
        match result {
            Ok(value) => return value,
            Err(_) => {
                instance.borrow_mut().update_layout();
            }
        }
    }
}

/// Write a field of an object without caching, migrating the object first if its layout went stale.
pub fn write_field(instance: &SOMRef<Instance>, field: usize, value: Value) {
    loop {
        let result = instance.borrow_mut().write_field(field, value.clone());
        match result {
            Ok(()) => return,
            Err(_) => {
                instance.borrow_mut().update_layout();
            }
        }
    }
}

/// Get the current, valid layout of an object.
fn current_layout(instance: &SOMRef<Instance>) -> Rc<Layout> {
    loop {
        let layout = instance.borrow().layout().clone();
        if layout.is_valid() {
            return layout;
        }
        instance.borrow_mut().update_layout();
    }
}

enum ReadCache {
    /// Storage locations per layout, `None` for layouts that do not define the field.
    Cached(Vec<(Rc<Layout>, Option<usize>)>),
    Uncached,
}

/// Reads one field, remembering where it lives for a bounded number of layouts.
///
/// Class receivers are served from their class-side variables instead.
pub struct FieldReader {
    index: usize,
    layout_check: Option<SemanticCheck>,
    cache: RefCell<ReadCache>,
}

impl FieldReader {
    pub fn new(index: usize, layout_check: Option<SemanticCheck>) -> Self {
        Self {
            index,
            layout_check,
            cache: RefCell::new(ReadCache::Cached(Vec::new())),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn read(&self, universe: &mut Universe, receiver: &Value, context: &Context) -> Return {
        if let Some(check) = &self.layout_check {
            let operands = || vec![Value::Integer(self.index as i64 + 1)];
            if let Some(ret) = check.intercept(universe, receiver, context, operands) {
                return ret;
            }
        }
        let value = match receiver {
            Value::Instance(instance) => self.read_instance(universe, instance),
            Value::Class(class) => class.borrow().lookup_local(self.index).unwrap_or(Value::Nil),
            _ => Value::Nil,
        };
        Return::Local(value)
    }

    fn read_instance(&self, universe: &Universe, instance: &SOMRef<Instance>) -> Value {
        let layout = current_layout(instance);
        let mut cache = self.cache.borrow_mut();
        let location = match &mut *cache {
            ReadCache::Cached(entries) => {
                match entries.iter().find(|(cached, _)| Rc::ptr_eq(cached, &layout)) {
                    Some((_, location)) => *location,
                    None => {
                        entries.retain(|(cached, _)| cached.is_valid());
                        let location = layout.location_of(self.index);
                        if entries.len() < universe.config.field_cache_size {
                            entries.push((layout, location));
                        } else {
                            debug!("reader of field {} went uncached", self.index);
                            *cache = ReadCache::Uncached;
                        }
                        location
                    }
                }
            }
            ReadCache::Uncached => layout.location_of(self.index),
        };
        location
            .map(|location| instance.borrow().read_location(location))
            .unwrap_or(Value::Nil)
    }
}

impl fmt::Debug for FieldReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldReader")
            .field("index", &self.index)
            .finish()
    }
}

#[derive(Clone)]
enum WriteAction {
    /// The field is defined: overwrite it.
    Store(usize),
    /// The field is not defined yet: move to the next layout, appending the value.
    Define(Rc<Layout>),
}

enum WriteCache {
    Cached(Vec<(Rc<Layout>, WriteAction)>),
    Uncached,
}

/// Writes one field, remembering what to do for a bounded number of layouts.
pub struct FieldWriter {
    index: usize,
    layout_check: Option<SemanticCheck>,
    cache: RefCell<WriteCache>,
}

impl FieldWriter {
    pub fn new(index: usize, layout_check: Option<SemanticCheck>) -> Self {
        Self {
            index,
            layout_check,
            cache: RefCell::new(WriteCache::Cached(Vec::new())),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Write `value`, answering the written value.
    pub fn write(
        &self,
        universe: &mut Universe,
        receiver: &Value,
        value: Value,
        context: &Context,
    ) -> Return {
        if let Some(check) = &self.layout_check {
            let operands = || vec![Value::Integer(self.index as i64 + 1), value.clone()];
            if let Some(ret) = check.intercept(universe, receiver, context, operands) {
                return ret;
            }
        }
        match receiver {
            Value::Instance(instance) => self.write_instance(universe, instance, value.clone()),
            Value::Class(class) => {
                class.borrow_mut().assign_local(self.index, value.clone());
            }
            _ => {}
        }
        Return::Local(value)
    }

    fn write_instance(&self, universe: &Universe, instance: &SOMRef<Instance>, value: Value) {
        let layout = current_layout(instance);
        let action = {
            let mut cache = self.cache.borrow_mut();
            match &mut *cache {
                WriteCache::Cached(entries) => {
                    match entries.iter().find(|(cached, _)| Rc::ptr_eq(cached, &layout)) {
                        Some((_, action)) => action.clone(),
                        None => {
                            entries.retain(|(cached, _)| cached.is_valid());
                            let action = self.action_for(&layout);
                            if entries.len() < universe.config.field_cache_size {
                                entries.push((layout, action.clone()));
                            } else {
                                debug!("writer of field {} went uncached", self.index);
                                *cache = WriteCache::Uncached;
                            }
                            action
                        }
                    }
                }
                WriteCache::Uncached => self.action_for(&layout),
            }
        };
        let mut instance = instance.borrow_mut();
        match action {
            WriteAction::Store(location) => instance.write_location(location, value),
            WriteAction::Define(next) => instance.define_field(next, value),
        }
    }

    fn action_for(&self, layout: &Rc<Layout>) -> WriteAction {
        match layout.location_of(self.index) {
            Some(location) => WriteAction::Store(location),
            None => WriteAction::Define(layout.with_field(self.index)),
        }
    }
}

impl fmt::Debug for FieldWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldWriter")
            .field("index", &self.index)
            .finish()
    }
}
