use std::rc::Rc;

use crate::class::Class;
use crate::error::MateError;
use crate::frame::Context;
use crate::interner::Interned;
use crate::invokable::{Invoke, Return};
use crate::method::Method;
use crate::reflection::semantics::SemanticCheck;
use crate::reflection::ReflectiveOp;
use crate::universe::Universe;
use crate::value::Value;
use crate::SOMRef;

/// Invoke a meta-method at meta level.
///
/// `args` starts with the meta-object's base object (the receiver of the intercepted operation).
/// Whatever the meta-method answers replaces the intercepted operation's result.
pub fn invoke_meta(
    universe: &mut Universe,
    method: &Rc<Method>,
    args: Vec<Value>,
    context: &Context,
) -> Return {
    method.invoke(universe, args, &context.to_meta())
}

/// The pair of checks guarding a message send: method lookup, then method activation.
#[derive(Debug)]
pub struct MessageInterception {
    lookup: SemanticCheck,
    activation: SemanticCheck,
}

impl MessageInterception {
    pub fn new() -> Self {
        Self {
            lookup: SemanticCheck::new(ReflectiveOp::MessageLookup),
            activation: SemanticCheck::new(ReflectiveOp::MessageActivation),
        }
    }

    /// Perform the send of `selector` with `args` (receiver first) if either check intercepts it.
    ///
    /// `since` is the class lookup starts from, the receiver's class if `None`.
    /// When neither check intercepts, the arguments are handed back untouched
    /// so the caller can go through its regular dispatch.
    pub fn dispatch(
        &self,
        universe: &mut Universe,
        selector: Interned,
        since: Option<SOMRef<Class>>,
        args: Vec<Value>,
        context: &Context,
    ) -> Result<Return, Vec<Value>> {
        let receiver = match args.first() {
            Some(receiver) => receiver.clone(),
            None => return Ok(Return::Exception(MateError::MissingReceiver)),
        };
        let lookup = self.lookup.lookup(universe, &receiver, context);
        let activation = self.activation.lookup(universe, &receiver, context);
        if lookup.is_none() && activation.is_none() {
            return Err(args);
        }

        let since = since.unwrap_or_else(|| receiver.class(universe));
        let method = match lookup {
            Some(meta) => {
                let meta_args = vec![
                    receiver.clone(),
                    Value::Symbol(selector),
                    Value::Class(since),
                ];
                match invoke_meta(universe, &meta, meta_args, context) {
                    Return::Local(Value::Invokable(method)) => Some(method),
                    Return::Local(Value::Nil) => None,
                    Return::Local(answer) => {
                        return Ok(Return::Exception(MateError::InvalidReflectiveAnswer {
                            selector: ReflectiveOp::MessageLookup.selector(),
                            answer: answer.describe(universe),
                        }))
                    }
                    ret => return Ok(ret),
                }
            }
            None => since.borrow().lookup_method(selector),
        };

        let method = match method {
            Some(method) => method,
            None => {
                let mut args = args;
                let receiver = args.remove(0);
                return Ok(universe.does_not_understand(receiver, selector, args, context));
            }
        };

        let args = match activation {
            Some(meta) => {
                let meta_args = vec![
                    receiver,
                    Value::Invokable(method.clone()),
                    Value::array(args),
                ];
                match invoke_meta(universe, &meta, meta_args, context) {
                    Return::Local(Value::Array(values)) => values.borrow().clone(),
                    Return::Local(answer) => {
                        return Ok(Return::Exception(MateError::InvalidReflectiveAnswer {
                            selector: ReflectiveOp::MessageActivation.selector(),
                            answer: answer.describe(universe),
                        }))
                    }
                    ret => return Ok(ret),
                }
            }
            None => args,
        };

        Ok(method.invoke(universe, args, context))
    }
}

impl Default for MessageInterception {
    fn default() -> Self {
        Self::new()
    }
}
