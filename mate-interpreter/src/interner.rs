//!
//! This is an implementation of a string interner.
//!
//! Selectors are compared and hashed on every send and every semantic check,
//! so they are replaced by a small integer ID as early as possible.
//!

use indexmap::IndexSet;

use crate::reflection::ReflectiveOp;

/// An interned string.
///
/// This is fast to move, clone and compare.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Interned(pub u32);

/// A string interner.
///
/// The ID of a string is its insertion index, so lookups are a plain index into the set.
#[derive(Debug, Default)]
pub struct Interner {
    strings: IndexSet<Box<str>>,
}

impl Interner {
    /// Initialize the interner with an initial capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            strings: IndexSet::with_capacity(cap),
        }
    }

    /// Intern a given string.
    pub fn intern(&mut self, name: &str) -> Interned {
        if let Some(idx) = self.strings.get_index_of(name) {
            return Interned(idx as u32);
        }
        let (idx, _) = self.strings.insert_full(Box::from(name));
        Interned(idx as u32)
    }

    /// Get the ID of a string, if it was already interned.
    pub fn get(&self, name: &str) -> Option<Interned> {
        self.strings
            .get_index_of(name)
            .map(|idx| Interned(idx as u32))
    }

    /// Get the string associated to a given interning ID.
    pub fn lookup(&self, id: Interned) -> &str {
        self.strings
            .get_index(id.0 as usize)
            .map(|name| &**name)
            .unwrap_or("<unknown symbol>")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Selectors the interpreter itself sends or compares against.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    pub does_not_understand: Interned,
    pub value: Interned,
    pub value_with: Interned,
    pub value_with_with: Interned,
    reflective: [Interned; ReflectiveOp::COUNT],
}

impl Selectors {
    pub fn new(interner: &mut Interner) -> Self {
        let mut reflective = [Interned(0); ReflectiveOp::COUNT];
        for op in ReflectiveOp::ALL.iter().copied() {
            reflective[op as usize] = interner.intern(op.selector());
        }
        Self {
            does_not_understand: interner.intern("doesNotUnderstand:arguments:"),
            value: interner.intern("value"),
            value_with: interner.intern("value:"),
            value_with_with: interner.intern("value:with:"),
            reflective,
        }
    }

    /// The selector a meta-object must understand to intercept `op`.
    pub fn reflective(&self, op: ReflectiveOp) -> Interned {
        self.reflective[op as usize]
    }

    /// Whether this selector evaluates a block.
    pub fn is_block_value(&self, selector: Interned) -> bool {
        selector == self.value || selector == self.value_with || selector == self.value_with_with
    }
}
