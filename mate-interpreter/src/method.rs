use std::fmt;

use crate::class::Class;
use crate::nodes::MethodBody;
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::{SOMRef, SOMWeakRef};

/// The kind of a class method.
pub enum MethodKind {
    /// A user-defined method, compiled into executable nodes.
    Defined(MethodBody),
    /// An interpreter primitive.
    Primitive(PrimitiveFn),
    /// A non-implemented primitive.
    NotImplemented(String),
}

impl MethodKind {
    /// Whether this invocable is a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

/// Represents a class method.
pub struct Method {
    pub kind: MethodKind,
    pub holder: SOMWeakRef<Class>,
    pub signature: String,
}

impl Method {
    pub fn class(&self, universe: &Universe) -> SOMRef<Class> {
        if self.is_primitive() {
            universe.primitive_class()
        } else {
            universe.method_class()
        }
    }

    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    pub fn holder(&self) -> &SOMWeakRef<Class> {
        &self.holder
    }

    pub fn signature(&self) -> &str {
        self.signature.as_str()
    }

    /// Whether this invocable is a primitive.
    pub fn is_primitive(&self) -> bool {
        self.kind.is_primitive()
    }

    /// The `Holder>>#signature` form of this method's name.
    pub fn qualified_name(&self) -> String {
        match self.holder.upgrade() {
            Some(holder) => format!("{}>>#{}", holder.borrow().name(), self.signature),
            None => format!("??>>#{}", self.signature),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MethodKind::Defined(_) => "defined",
            MethodKind::Primitive(_) => "primitive",
            MethodKind::NotImplemented(_) => "not implemented",
        };
        f.debug_struct("Method")
            .field("name", &self.qualified_name())
            .field("kind", &kind)
            .finish()
    }
}
