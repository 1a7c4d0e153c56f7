use std::rc::Rc;

use crate::block::Block;
use crate::error::MateError;
use crate::evaluate::Evaluate;
use crate::frame::{Context, Frame, FrameKind};
use crate::method::{Method, MethodKind};
use crate::universe::Universe;
use crate::value::Value;
use crate::SOMRef;

/// Represents the kinds of possible returns from an invocation.
#[derive(Debug)]
pub enum Return {
    /// A local return, the value is for the immediate caller.
    Local(Value),
    /// A non-local return, the value is for the parent of the referenced stack frame.
    NonLocal(Value, SOMRef<Frame>),
    /// An exception, expected to bubble all the way up.
    Exception(MateError),
}

/// Macro for propagating non-local returns and exceptions out of the current evaluation.
#[macro_export]
macro_rules! propagate {
    ($expr:expr) => {
        match $expr {
            $crate::invokable::Return::Local(value) => value,
            ret => return ret,
        }
    };
}

/// The trait for invoking methods and primitives.
pub trait Invoke {
    /// Invoke within the given universe, with the given arguments (receiver first), under the given context.
    fn invoke(&self, universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return;
}

impl Invoke for Rc<Method> {
    fn invoke(&self, universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        match self.kind() {
            MethodKind::Defined(body) => {
                if args.is_empty() {
                    return Return::Exception(MateError::MissingReceiver);
                }
                let holder = match self.holder().upgrade() {
                    Some(holder) => holder,
                    None => return Return::Exception(MateError::CollectedHolder(self.signature.clone())),
                };
                let kind = FrameKind::Method {
                    holder,
                    method: self.clone(),
                };
                let frame = Frame::new(kind, args, body.nb_locals, context.clone());
                universe.with_frame(frame, |universe| body.invoke(universe))
            }
            MethodKind::Primitive(func) => func(universe, args, context),
            MethodKind::NotImplemented(name) => {
                Return::Exception(MateError::UnimplementedPrimitive(name.clone()))
            }
        }
    }
}

impl Invoke for Rc<Block> {
    /// `args` starts with the block itself, followed by the block's parameters.
    fn invoke(&self, universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        let kind = FrameKind::Block {
            block: self.clone(),
        };
        let frame = Frame::new(kind, args, self.body.nb_locals, context.clone());
        universe.with_frame(frame, |universe| self.body.body.evaluate(universe))
    }
}
