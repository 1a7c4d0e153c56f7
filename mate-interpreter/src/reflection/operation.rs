/// The slots of an **Environment**, in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentSlot {
    Semantics,
    Layout,
    Message,
}

impl EnvironmentSlot {
    /// The field index of this slot within an **Environment** instance.
    pub fn field_index(self) -> usize {
        match self {
            Self::Semantics => 0,
            Self::Layout => 1,
            Self::Message => 2,
        }
    }
}

/// An interceptable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectiveOp {
    MessageLookup,
    MessageActivation,
    ExecutorReadField,
    ExecutorWriteField,
    ExecutorReturn,
    ExecutorLocalArg,
    ExecutorNonLocalArg,
    ExecutorLocalSuperArg,
    ExecutorNonLocalSuperArg,
    ExecutorReadLocal,
    ExecutorWriteLocal,
    LayoutReadField,
    LayoutWriteField,
}

impl ReflectiveOp {
    pub const COUNT: usize = 13;

    pub const ALL: [ReflectiveOp; Self::COUNT] = [
        Self::MessageLookup,
        Self::MessageActivation,
        Self::ExecutorReadField,
        Self::ExecutorWriteField,
        Self::ExecutorReturn,
        Self::ExecutorLocalArg,
        Self::ExecutorNonLocalArg,
        Self::ExecutorLocalSuperArg,
        Self::ExecutorNonLocalSuperArg,
        Self::ExecutorReadLocal,
        Self::ExecutorWriteLocal,
        Self::LayoutReadField,
        Self::LayoutWriteField,
    ];

    /// The environment slot holding the meta-object responsible for this operation.
    pub fn slot(self) -> EnvironmentSlot {
        match self {
            Self::MessageLookup | Self::MessageActivation => EnvironmentSlot::Message,
            Self::LayoutReadField | Self::LayoutWriteField => EnvironmentSlot::Layout,
            _ => EnvironmentSlot::Semantics,
        }
    }

    /// The selector the meta-object must understand to intercept this operation.
    pub fn selector(self) -> &'static str {
        match self {
            Self::MessageLookup => "find:since:",
            Self::MessageActivation => "activate:withArguments:",
            Self::ExecutorReadField | Self::LayoutReadField => "read:",
            Self::ExecutorWriteField | Self::LayoutWriteField => "write:value:",
            Self::ExecutorReturn => "return:",
            Self::ExecutorLocalArg => "localArgument:inFrame:",
            Self::ExecutorNonLocalArg => "nonLocalArgument:inFrame:",
            Self::ExecutorLocalSuperArg => "localSuperArgument:inFrame:",
            Self::ExecutorNonLocalSuperArg => "nonLocalSuperArgument:inFrame:",
            Self::ExecutorReadLocal => "readLocal:inFrame:",
            Self::ExecutorWriteLocal => "writeLocal:inFrame:",
        }
    }

    /// Pick the argument-read operation for an access `context_level` lexical levels up.
    pub fn argument_read(context_level: usize, is_super: bool) -> Self {
        match (context_level, is_super) {
            (0, false) => Self::ExecutorLocalArg,
            (0, true) => Self::ExecutorLocalSuperArg,
            (_, false) => Self::ExecutorNonLocalArg,
            (_, true) => Self::ExecutorNonLocalSuperArg,
        }
    }
}
