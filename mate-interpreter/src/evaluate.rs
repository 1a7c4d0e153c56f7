use std::rc::Rc;

use crate::block::Block;
use crate::error::MateError;
use crate::frame::Frame;
use crate::invokable::Return;
use crate::nodes::{
    ArgumentRead, Body, Expression, FieldRead, FieldWrite, Literal, LocalRead, LocalWrite,
    MessageSend, MethodBody, SuperMessageSend,
};
use crate::propagate;
use crate::reflection::dispatch::invoke_meta;
use crate::universe::Universe;
use crate::value::Value;

/// The trait for evaluating executable nodes.
pub trait Evaluate {
    /// Evaluate the node within a given universe.
    fn evaluate(&self, universe: &mut Universe) -> Return;
}

impl Evaluate for Expression {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        match self {
            Self::Literal(literal) => literal.evaluate(universe),
            Self::GlobalRead(name) => match universe.lookup_global(*name) {
                Some(value) => Return::Local(value),
                None => Return::Exception(MateError::UnknownGlobal(
                    universe.lookup_symbol(*name).to_string(),
                )),
            },
            Self::Argument(node) => node.evaluate(universe),
            Self::LocalRead(node) => node.evaluate(universe),
            Self::LocalWrite(node) => node.evaluate(universe),
            Self::FieldRead(node) => node.evaluate(universe),
            Self::FieldWrite(node) => node.evaluate(universe),
            Self::Message(node) => node.evaluate(universe),
            Self::SuperMessage(node) => node.evaluate(universe),
            Self::Exit(expr) => {
                let value = propagate!(expr.evaluate(universe));
                let frame = Frame::method_frame(&universe.current_frame());
                let is_alive = frame.borrow().is_alive;
                if is_alive {
                    Return::NonLocal(value, frame)
                } else {
                    Return::Exception(MateError::NonLocalReturnToDeadFrame)
                }
            }
            Self::Block(body) => {
                let frame = universe.current_frame();
                Return::Local(Value::Block(Rc::new(Block {
                    frame,
                    body: body.clone(),
                })))
            }
            Self::Sequence(body) => body.evaluate(universe),
        }
    }
}

impl Evaluate for Literal {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let value = match self {
            Self::Nil => Value::Nil,
            Self::Boolean(value) => Value::Boolean(*value),
            Self::Integer(value) => Value::Integer(*value),
            Self::BigInteger(value) => Value::BigInteger(value.clone()),
            Self::Double(value) => Value::Double(*value),
            Self::Symbol(value) => Value::Symbol(*value),
            Self::String(value) => Value::String(value.clone()),
            Self::Array(literals) => {
                let mut output = Vec::with_capacity(literals.len());
                for literal in literals {
                    output.push(propagate!(literal.evaluate(universe)));
                }
                Value::array(output)
            }
        };
        Return::Local(value)
    }
}

impl Evaluate for Body {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let mut last_value = Value::Nil;
        for expr in &self.exprs {
            last_value = propagate!(expr.evaluate(universe));
        }
        Return::Local(last_value)
    }
}

impl MethodBody {
    /// Run this body within the method activation the universe just pushed.
    ///
    /// Falling off the end answers `self`, and non-local returns targeting this activation stop here.
    /// The answered value then goes through the method-return check.
    pub fn invoke(&self, universe: &mut Universe) -> Return {
        let frame = universe.current_frame();
        let value = match self.body.evaluate(universe) {
            Return::Local(_) => frame.borrow().get_self(),
            Return::NonLocal(value, target) => {
                if Rc::ptr_eq(&frame, &target) {
                    value
                } else {
                    return Return::NonLocal(value, target);
                }
            }
            ret @ Return::Exception(_) => return ret,
        };
        if let Some(check) = &self.return_check {
            let (receiver, context) = {
                let frame = frame.borrow();
                (frame.get_self(), frame.context.clone())
            };
            if let Some(method) = check.lookup(universe, &receiver, &context) {
                return invoke_meta(universe, &method, vec![receiver, value], &context);
            }
        }
        Return::Local(value)
    }
}

impl Evaluate for ArgumentRead {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let frame = universe.current_frame();
        let target = Frame::nth_frame_back(&frame, self.context_level);
        if let Some(check) = &self.check {
            let (receiver, context) = {
                let frame = frame.borrow();
                (frame.get_self(), frame.context.clone())
            };
            let operands = || {
                vec![
                    Value::Integer(self.index as i64),
                    Value::array(target.borrow().args.clone()),
                ]
            };
            if let Some(ret) = check.intercept(universe, &receiver, &context, operands) {
                return ret;
            }
        }
        let value = target.borrow().lookup_argument(self.index);
        Return::Local(value.unwrap_or(Value::Nil))
    }
}

impl Evaluate for LocalRead {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let frame = universe.current_frame();
        let target = Frame::nth_frame_back(&frame, self.context_level);
        if let Some(check) = &self.check {
            let (receiver, context) = {
                let frame = frame.borrow();
                (frame.get_self(), frame.context.clone())
            };
            let operands = || {
                vec![
                    Value::Integer(self.index as i64),
                    Value::array(target.borrow().locals.clone()),
                ]
            };
            if let Some(ret) = check.intercept(universe, &receiver, &context, operands) {
                return ret;
            }
        }
        let value = target.borrow().lookup_local(self.index);
        Return::Local(value.unwrap_or(Value::Nil))
    }
}

impl Evaluate for LocalWrite {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let value = propagate!(self.value.evaluate(universe));
        let frame = universe.current_frame();
        let target = Frame::nth_frame_back(&frame, self.context_level);
        if let Some(check) = &self.check {
            let (receiver, context) = {
                let frame = frame.borrow();
                (frame.get_self(), frame.context.clone())
            };
            let operands = || {
                let mut locals = target.borrow().locals.clone();
                if let Some(local) = locals.get_mut(self.index) {
                    *local = value.clone();
                }
                vec![Value::Integer(self.index as i64), Value::array(locals)]
            };
            if let Some(ret) = check.intercept(universe, &receiver, &context, operands) {
                return ret;
            }
        }
        target.borrow_mut().assign_local(self.index, value.clone());
        Return::Local(value)
    }
}

impl Evaluate for FieldRead {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let (receiver, context) = {
            let frame = universe.current_frame();
            let frame = frame.borrow();
            (frame.get_self(), frame.context.clone())
        };
        if let Some(check) = &self.check {
            let operands = || vec![Value::Integer(self.reader.index() as i64 + 1)];
            if let Some(ret) = check.intercept(universe, &receiver, &context, operands) {
                return ret;
            }
        }
        self.reader.read(universe, &receiver, &context)
    }
}

impl Evaluate for FieldWrite {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let value = propagate!(self.value.evaluate(universe));
        let (receiver, context) = {
            let frame = universe.current_frame();
            let frame = frame.borrow();
            (frame.get_self(), frame.context.clone())
        };
        if let Some(check) = &self.check {
            let operands = || {
                vec![
                    Value::Integer(self.writer.index() as i64 + 1),
                    value.clone(),
                ]
            };
            if let Some(ret) = check.intercept(universe, &receiver, &context, operands) {
                return ret;
            }
        }
        self.writer.write(universe, &receiver, value, &context)
    }
}

impl Evaluate for MessageSend {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let receiver = propagate!(self.receiver.evaluate(universe));
        let mut args = Vec::with_capacity(self.values.len() + 1);
        args.push(receiver);
        for value in &self.values {
            args.push(propagate!(value.evaluate(universe)));
        }
        let context = universe.current_context();
        let args = match &self.interception {
            Some(interception) => {
                match interception.dispatch(universe, self.call_site.selector(), None, args, &context) {
                    Ok(ret) => return ret,
                    Err(args) => args,
                }
            }
            None => args,
        };
        self.call_site.dispatch(universe, args, &context)
    }
}

impl Evaluate for SuperMessageSend {
    fn evaluate(&self, universe: &mut Universe) -> Return {
        let (receiver, holder, context) = {
            let frame = universe.current_frame();
            let frame = frame.borrow();
            (frame.get_self(), frame.get_method_holder(), frame.context.clone())
        };
        let super_class = match holder.borrow().super_class() {
            Some(class) => class,
            None => {
                return Return::Exception(MateError::SuperLookupFailure {
                    class: holder.borrow().name().to_string(),
                    selector: universe
                        .lookup_symbol(self.call_site.selector())
                        .to_string(),
                })
            }
        };
        let mut args = Vec::with_capacity(self.values.len() + 1);
        args.push(receiver);
        for value in &self.values {
            args.push(propagate!(value.evaluate(universe)));
        }
        let args = match &self.interception {
            Some(interception) => {
                let since = Some(super_class.clone());
                let selector = self.call_site.selector();
                match interception.dispatch(universe, selector, since, args, &context) {
                    Ok(ret) => return ret,
                    Err(args) => args,
                }
            }
            None => args,
        };
        self.call_site.dispatch(universe, &super_class, args, &context)
    }
}
