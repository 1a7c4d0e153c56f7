use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::interner::Interned;
use crate::layout::Layout;
use crate::method::Method;
use crate::value::Value;
use crate::{SOMRef, SOMWeakRef};

/// Metaclasses own their class strongly, everything else points back weakly.
#[derive(Debug, Clone)]
pub enum MaybeWeak<A> {
    Strong(SOMRef<A>),
    Weak(SOMWeakRef<A>),
}

/// A class or a metaclass, as known to the universe.
pub struct Class {
    pub name: String,
    pub class: MaybeWeak<Class>,
    pub super_class: SOMWeakRef<Class>,
    /// The names of the fields of this class' instances, inherited ones first.
    pub fields: IndexSet<Interned>,
    /// The class-side variables, stored on the class object itself.
    pub locals: IndexMap<Interned, Value>,
    pub methods: IndexMap<Interned, Rc<Method>>,
    /// The layout new instances start out with.
    pub layout: Rc<Layout>,
    /// Whether this is a metaclass.
    pub is_static: bool,
}

impl Class {
    /// Create a class without any superclass, class, fields or methods yet.
    pub fn new(name: impl Into<String>, is_static: bool) -> Self {
        Self {
            name: name.into(),
            class: MaybeWeak::Weak(Weak::new()),
            super_class: Weak::new(),
            fields: IndexSet::new(),
            locals: IndexMap::new(),
            methods: IndexMap::new(),
            layout: Layout::root(),
            is_static,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the class of this class.
    pub fn class(&self) -> SOMRef<Self> {
        match self.class {
            MaybeWeak::Weak(ref weak) => weak.upgrade().unwrap_or_else(|| {
                panic!("metaclass dropped, cannot upgrade ref ({})", self.name())
            }),
            MaybeWeak::Strong(ref owned) => owned.clone(),
        }
    }

    /// Set the class of this class (as a weak reference).
    pub fn set_class(&mut self, class: &SOMRef<Self>) {
        self.class = MaybeWeak::Weak(Rc::downgrade(class));
    }

    /// Set the class of this class (as a strong reference).
    pub fn set_class_owned(&mut self, class: &SOMRef<Self>) {
        self.class = MaybeWeak::Strong(class.clone());
    }

    /// Get the superclass of this class.
    pub fn super_class(&self) -> Option<SOMRef<Self>> {
        self.super_class.upgrade()
    }

    /// Whether `class` is `ancestor` or one of its subclasses.
    pub fn inherits_from(class: &SOMRef<Self>, ancestor: &SOMRef<Self>) -> bool {
        let mut current = Some(class.clone());
        while let Some(class) = current {
            if Rc::ptr_eq(&class, ancestor) {
                return true;
            }
            current = class.borrow().super_class();
        }
        false
    }

    /// Set the superclass of this class (as a weak reference).
    pub fn set_super_class(&mut self, class: &SOMRef<Self>) {
        self.super_class = Rc::downgrade(class);
    }

    /// Search for a given method within this class.
    pub fn lookup_method(&self, signature: Interned) -> Option<Rc<Method>> {
        self.methods.get(&signature).cloned().or_else(|| {
            self.super_class
                .upgrade()?
                .borrow()
                .lookup_method(signature)
        })
    }

    /// Get the index of an instance field, by name.
    pub fn field_index(&self, name: Interned) -> Option<usize> {
        self.fields.get_index_of(&name)
    }

    /// Search for a class-side variable.
    pub fn lookup_local(&self, idx: usize) -> Option<Value> {
        self.locals.values().nth(idx).cloned()
    }

    /// Assign a value to a class-side variable.
    pub fn assign_local(&mut self, idx: usize, value: Value) -> Option<()> {
        let local = self.locals.values_mut().nth(idx)?;
        *local = value;
        Some(())
    }

    /// Get the layout new instances start out with.
    pub fn layout(&self) -> Rc<Layout> {
        self.layout.clone()
    }

    /// Invalidate every layout of this class' instances and start over from a fresh root.
    ///
    /// Existing instances migrate lazily, the next time one of their fields is accessed.
    pub fn renew_layout(&mut self) {
        self.layout.invalidate();
        self.layout = Layout::root();
        debug!(
            "class '{}' now instantiates with layout #{}",
            self.name,
            self.layout.id()
        );
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}
