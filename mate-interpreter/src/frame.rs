use std::fmt;
use std::rc::Rc;

use crate::block::Block;
use crate::class::Class;
use crate::method::Method;
use crate::value::Value;
use crate::SOMRef;

/// The level at which code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionLevel {
    /// Ordinary program execution, subject to interception.
    Base,
    /// Code running on behalf of a meta-object; never intercepted.
    Meta,
}

/// The `{environment, level}` pair every activation carries and hands down to the activations it creates.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// The environment installed on the activation, `Nil` if none.
    pub environment: Value,
    /// The execution level.
    pub level: ExecutionLevel,
}

impl Context {
    pub fn new(environment: Value, level: ExecutionLevel) -> Self {
        Self { environment, level }
    }

    /// Base level, without any environment.
    pub fn base() -> Self {
        Self::new(Value::Nil, ExecutionLevel::Base)
    }

    /// The context meta-methods run in: same environment, meta level.
    pub fn to_meta(&self) -> Self {
        Self::new(self.environment.clone(), ExecutionLevel::Meta)
    }

    /// The same level, with another environment installed.
    pub fn with_environment(&self, environment: Value) -> Self {
        Self::new(environment, self.level)
    }

    pub fn is_meta(&self) -> bool {
        self.level == ExecutionLevel::Meta
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::base()
    }
}

/// What an activation was created for.
#[derive(Clone)]
pub enum FrameKind {
    Block {
        block: Rc<Block>,
    },
    Method {
        /// Where super sends and field names are resolved from.
        holder: SOMRef<Class>,
        method: Rc<Method>,
    },
}

/// One activation of a method or block.
pub struct Frame {
    pub kind: FrameKind,
    /// The arguments within this frame (the receiver, or the block itself, comes first).
    pub args: Vec<Value>,
    pub locals: Vec<Value>,
    /// The environment and level this activation runs with.
    pub context: Context,
    /// Cleared once the activation has returned.
    pub is_alive: bool,
}

impl Frame {
    /// Construct a new frame, with all locals set to `nil`.
    pub fn new(kind: FrameKind, args: Vec<Value>, nb_locals: usize, context: Context) -> Self {
        Self {
            kind,
            args,
            locals: vec![Value::Nil; nb_locals],
            context,
            is_alive: true,
        }
    }

    pub fn kind(&self) -> &FrameKind {
        &self.kind
    }

    /// The receiver, seen through any enclosing blocks.
    pub fn get_self(&self) -> Value {
        match &self.kind {
            FrameKind::Method { .. } => self.args.first().cloned().unwrap_or(Value::Nil),
            FrameKind::Block { block } => block.frame.borrow().get_self(),
        }
    }

    pub fn get_method_holder(&self) -> SOMRef<Class> {
        match &self.kind {
            FrameKind::Method { holder, .. } => holder.clone(),
            FrameKind::Block { block } => block.frame.borrow().get_method_holder(),
        }
    }

    pub fn lookup_argument(&self, idx: usize) -> Option<Value> {
        self.args.get(idx).cloned()
    }

    pub fn lookup_local(&self, idx: usize) -> Option<Value> {
        self.locals.get(idx).cloned()
    }

    pub fn assign_local(&mut self, idx: usize, value: Value) -> Option<()> {
        self.locals.get_mut(idx).map(|local| *local = value)
    }

    /// Get the frame `n` lexical levels up (`0` is the frame itself).
    pub fn nth_frame_back(frame: &SOMRef<Frame>, n: usize) -> SOMRef<Frame> {
        let mut current = frame.clone();
        for _ in 0..n {
            let outer = match current.borrow().kind() {
                FrameKind::Block { block } => block.frame.clone(),
                FrameKind::Method { .. } => break,
            };
            current = outer;
        }
        current
    }

    /// The activation of the method this frame lexically belongs to.
    pub fn method_frame(frame: &SOMRef<Frame>) -> SOMRef<Frame> {
        match frame.borrow().kind() {
            FrameKind::Block { block } => Frame::method_frame(&block.frame),
            FrameKind::Method { .. } => frame.clone(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FrameKind::Block { block } => format!("{:?}", block),
            FrameKind::Method { method, .. } => method.qualified_name(),
        };
        f.debug_struct("Frame")
            .field("kind", &kind)
            .field("level", &self.context.level)
            .field("is_alive", &self.is_alive)
            .finish()
    }
}
