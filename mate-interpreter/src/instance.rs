use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::Class;
use crate::config::EnvironmentStorage;
use crate::error::Retry;
use crate::layout::Layout;
use crate::value::Value;
use crate::SOMRef;

/// Represents a generic (non-primitive) class instance.
///
/// Fields are stored in definition order: a field only gets a storage slot once it is first written,
/// and the instance's layout records which field lives in which slot.
#[derive(Clone)]
pub struct Instance {
    /// The class of which this is an instance from.
    pub class: SOMRef<Class>,
    /// Where this instance keeps its fields.
    pub layout: Rc<Layout>,
    /// The field values, indexed by storage location.
    pub storage: Vec<Value>,
    /// The environment installed on this instance, when environments live in objects.
    pub environment: Value,
}

impl Instance {
    /// Construct an instance for a given class.
    pub fn from_class(class: SOMRef<Class>) -> Self {
        let layout = class.borrow().layout();
        Self {
            class,
            layout,
            storage: Vec::new(),
            environment: Value::Nil,
        }
    }

    /// Get the class of which this is an instance from.
    pub fn class(&self) -> SOMRef<Class> {
        self.class.clone()
    }

    /// Get the superclass of this instance's class.
    pub fn super_class(&self) -> Option<SOMRef<Class>> {
        self.class.borrow().super_class()
    }

    pub fn layout(&self) -> &Rc<Layout> {
        &self.layout
    }

    /// Get the environment installed on this instance, `Nil` if none.
    pub fn environment(&self, storage: EnvironmentStorage) -> Value {
        match storage {
            EnvironmentStorage::InLayout => self.layout.environment().clone(),
            EnvironmentStorage::InObject => self.environment.clone(),
        }
    }

    /// Install an environment on this instance (`Nil` removes it).
    pub fn set_environment(&mut self, storage: EnvironmentStorage, environment: Value) {
        match storage {
            EnvironmentStorage::InLayout => {
                self.layout = self.layout.with_environment(environment);
            }
            EnvironmentStorage::InObject => self.environment = environment,
        }
    }

    /// Read a field through the layout, without any caching.
    pub(crate) fn read_field(&self, field: usize) -> Result<Value, Retry> {
        self.layout.check()?;
        Ok(self
            .layout
            .location_of(field)
            .and_then(|location| self.storage.get(location).cloned())
            .unwrap_or(Value::Nil))
    }

    /// Write a field through the layout, defining it if needed, without any caching.
    pub(crate) fn write_field(&mut self, field: usize, value: Value) -> Result<(), Retry> {
        self.layout.check()?;
        match self.layout.location_of(field) {
            Some(location) => self.write_location(location, value),
            None => {
                let layout = self.layout.with_field(field);
                self.define_field(layout, value);
            }
        }
        Ok(())
    }

    /// Read the value at a given storage location.
    pub fn read_location(&self, location: usize) -> Value {
        self.storage.get(location).cloned().unwrap_or(Value::Nil)
    }

    /// Write the value at a given storage location.
    pub fn write_location(&mut self, location: usize, value: Value) {
        if let Some(slot) = self.storage.get_mut(location) {
            *slot = value;
        }
    }

    /// Move to `layout`, which defines exactly one more field than the current one, and store its value.
    pub fn define_field(&mut self, layout: Rc<Layout>, value: Value) {
        debug_assert_eq!(layout.len(), self.storage.len() + 1);
        self.storage.push(value);
        self.layout = layout;
    }

    /// Migrate this instance off an invalidated layout.
    ///
    /// The new layout is reached from the class' current root by replaying this instance's
    /// environment and field definitions, so every value keeps its storage location.
    /// Returns whether a migration happened.
    pub fn update_layout(&mut self) -> bool {
        if self.layout.is_valid() {
            return false;
        }
        let root = self.class.borrow().layout();
        let mut layout = root.with_environment(self.layout.environment().clone());
        for field in self.layout.fields() {
            layout = layout.with_field(field);
        }
        debug!(
            "migrated an instance of '{}' from layout #{} to layout #{}",
            self.class.borrow().name(),
            self.layout.id(),
            layout.id()
        );
        self.layout = layout;
        true
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.borrow().name())
            .field("layout", &self.layout.id())
            .finish()
    }
}
