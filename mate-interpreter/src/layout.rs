use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexSet;
use log::debug;

use crate::assumption::Assumption;
use crate::error::Retry;
use crate::value::Value;

static NEXT_LAYOUT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, PartialEq)]
enum Transition {
    AddField(usize),
    Environment(Value),
}

/// An identity-stable description of where an object keeps its fields.
///
/// Two objects sharing a layout keep every field at the same storage location.
/// Layouts are shared through `Rc` and compared by pointer: the `Rc` itself is the token.
/// Each class owns a root layout, from which all its instances' layouts are reached
/// through cached transitions (defining a field, installing an environment).
pub struct Layout {
    id: usize,
    /// Defined field indices, in storage order.
    fields: IndexSet<usize>,
    /// The environment installed on objects with this layout (only used when environments live in layouts).
    environment: Value,
    valid: Assumption,
    transitions: RefCell<Vec<(Transition, Rc<Layout>)>>,
}

impl Layout {
    /// Create a fresh, empty layout.
    pub fn root() -> Rc<Self> {
        Rc::new(Self::with_parts(IndexSet::new(), Value::Nil))
    }

    fn with_parts(fields: IndexSet<usize>, environment: Value) -> Self {
        Self {
            id: NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed),
            fields,
            environment,
            valid: Assumption::new("layout valid"),
            transitions: RefCell::new(Vec::new()),
        }
    }

    /// A process-unique number, for diagnostics.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.valid.is_valid()
    }

    pub(crate) fn check(&self) -> Result<(), Retry> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Retry::StaleLayout)
        }
    }

    /// The environment installed through this layout, `Nil` if none.
    pub fn environment(&self) -> &Value {
        &self.environment
    }

    /// Get the storage location of a field, if that field is defined.
    pub fn location_of(&self, field: usize) -> Option<usize> {
        self.fields.get_index_of(&field)
    }

    /// The defined field indices, in storage order.
    pub fn fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields.iter().copied()
    }

    /// The number of defined fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn transition(
        self: &Rc<Self>,
        transition: Transition,
        build: impl FnOnce() -> Layout,
    ) -> Rc<Layout> {
        let cached = self
            .transitions
            .borrow()
            .iter()
            .find(|(key, _)| *key == transition)
            .map(|(_, layout)| layout.clone());
        if let Some(layout) = cached {
            return layout;
        }
        let layout = Rc::new(build());
        if !self.is_valid() {
            layout.valid.invalidate();
        }
        self.transitions
            .borrow_mut()
            .push((transition, layout.clone()));
        layout
    }

    /// Get the layout of an object with this layout once `field` is defined.
    pub fn with_field(self: &Rc<Self>, field: usize) -> Rc<Layout> {
        if self.fields.contains(&field) {
            return self.clone();
        }
        self.transition(Transition::AddField(field), || {
            let mut fields = self.fields.clone();
            fields.insert(field);
            Layout::with_parts(fields, self.environment.clone())
        })
    }

    /// Get the layout of an object with this layout once `environment` is installed on it.
    pub fn with_environment(self: &Rc<Self>, environment: Value) -> Rc<Layout> {
        if self.environment == environment {
            return self.clone();
        }
        self.transition(Transition::Environment(environment.clone()), || {
            Layout::with_parts(self.fields.clone(), environment)
        })
    }

    /// Invalidate this layout and every layout reachable from it.
    pub fn invalidate(&self) {
        if self.valid.invalidate() {
            debug!("invalidated layout #{}", self.id);
        }
        for (_, layout) in self.transitions.borrow().iter() {
            layout.invalidate();
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::Layout;

    #[test]
    fn transitions_are_shared() {
        let root = Layout::root();
        let with_x = root.with_field(2);
        let with_x_again = root.with_field(2);

        assert!(Rc::ptr_eq(&with_x, &with_x_again));
        assert!(Rc::ptr_eq(&with_x, &with_x.with_field(2)));
        assert_eq!(with_x.location_of(2), Some(0));
        assert_eq!(with_x.with_field(0).location_of(0), Some(1));
        assert_eq!(root.location_of(2), None);
    }

    #[test]
    fn invalidation_reaches_descendants() {
        let root = Layout::root();
        let leaf = root.with_field(0).with_field(1);
        root.invalidate();

        assert!(!root.is_valid());
        assert!(!leaf.is_valid());
        assert!(!root.with_field(3).is_valid());
    }
}
