use thiserror::Error;

/// Errors that terminate execution and bubble up to the embedder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MateError {
    /// A message was not understood and the receiver does not define `doesNotUnderstand:arguments:`.
    #[error("message not understood: '{class}>>#{selector}'")]
    MessageNotUnderstood { class: String, selector: String },

    /// A super send found no method starting from the lexical superclass.
    #[error("super send of '#{selector}' found no method starting from '{class}'")]
    SuperLookupFailure { class: String, selector: String },

    /// A non-local return targeted an activation that has already returned.
    #[error("non-local return to an activation that already returned")]
    NonLocalReturnToDeadFrame,

    /// A field index past the fields an object has.
    #[error("'{class}' has {count} field(s), there is no field at index {index}")]
    FieldOutOfBounds {
        class: String,
        index: usize,
        count: usize,
    },

    /// A global binding was read but never defined.
    #[error("unknown global '{0}'")]
    UnknownGlobal(String),

    /// A name could not be resolved to a binding during compilation.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// A primitive received arguments it cannot handle.
    #[error("'{signature}': {message}")]
    Primitive {
        signature: &'static str,
        message: String,
    },

    /// A method was declared as primitive but the VM does not implement it.
    #[error("unimplemented primitive: {0}")]
    UnimplementedPrimitive(String),

    /// An invocation was attempted without a receiver.
    #[error("missing receiver for invocation")]
    MissingReceiver,

    /// A method outlived the class that defines it.
    #[error("cannot invoke '{0}' because its holder has been collected")]
    CollectedHolder(String),

    /// An assignment targets something that cannot be assigned to.
    #[error("cannot assign to '{0}'")]
    InvalidAssignment(String),

    /// A literal could not be turned into a value.
    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    /// A block literal declares more parameters than block classes exist for.
    #[error("blocks take at most 2 parameters, found {0}")]
    UnsupportedBlockArity(usize),

    /// A meta-object answered something its caller cannot use.
    #[error("'{selector}' answered {answer}, which cannot be used here")]
    InvalidReflectiveAnswer {
        selector: &'static str,
        answer: String,
    },
}

impl MateError {
    pub fn primitive(signature: &'static str, message: impl Into<String>) -> Self {
        Self::Primitive {
            signature,
            message: message.into(),
        }
    }
}

/// Signals used internally to restart a cached operation.
///
/// These are always recovered from and never leave the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retry {
    /// A dispatch guard depends on an invalidated layout: the entry must be discarded.
    InvalidCacheEntry,
    /// An object still uses an invalidated layout: it must be migrated first.
    StaleLayout,
}
