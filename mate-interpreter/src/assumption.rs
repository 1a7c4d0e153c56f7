use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct AssumptionState {
    name: &'static str,
    valid: Cell<bool>,
}

/// A one-shot validity flag.
///
/// Cached decisions keep a clone of the assumption they were computed under,
/// and are trusted for as long as it stays valid. Once invalidated, an assumption
/// never becomes valid again: a fresh one has to be minted instead.
#[derive(Clone)]
pub struct Assumption(Rc<AssumptionState>);

impl Assumption {
    pub fn new(name: &'static str) -> Self {
        Self(Rc::new(AssumptionState {
            name,
            valid: Cell::new(true),
        }))
    }

    /// Mint an assumption that starts out invalidated.
    pub fn invalid(name: &'static str) -> Self {
        let assumption = Self::new(name);
        assumption.invalidate();
        assumption
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn is_valid(&self) -> bool {
        self.0.valid.get()
    }

    /// Invalidate this assumption.
    ///
    /// Returns whether this call is the one that flipped it.
    pub fn invalidate(&self) -> bool {
        self.0.valid.replace(false)
    }

    /// Whether both handles refer to the same flag.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assumption")
            .field("name", &self.0.name)
            .field("valid", &self.0.valid.get())
            .finish()
    }
}
