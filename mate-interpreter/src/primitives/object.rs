use std::convert::TryFrom;

use crate::error::MateError;
use crate::expect_args;
use crate::fields;
use crate::frame::Context;
use crate::invokable::Return;
use crate::primitives::PrimitiveFn;
use crate::reflection::semantics::intercept_uncached;
use crate::reflection::ReflectiveOp;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("class", self::class),
    ("==", self::eq),
    ("=", self::eq),
    ("perform:", self::perform),
    ("perform:withArguments:", self::perform_with_arguments),
    ("instVarAt:", self::inst_var_at),
    ("instVarAt:put:", self::inst_var_at_put),
    ("installEnvironment:", self::install_environment),
    ("environment", self::environment),
];

fn class(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#class";

    expect_args!(SIGNATURE, args, [
        object => object,
    ]);

    Return::Local(Value::Class(object.class(universe)))
}

fn eq(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#==";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    Return::Local(Value::Boolean(a == b))
}

fn perform(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#perform:";

    expect_args!(SIGNATURE, args, [
        object => object,
        Value::Symbol(sym) => sym,
    ]);

    universe.send_interned(sym, vec![object], context)
}

fn perform_with_arguments(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#perform:withArguments:";

    expect_args!(SIGNATURE, args, [
        object => object,
        Value::Symbol(sym) => sym,
        Value::Array(arr) => arr,
    ]);

    let args = std::iter::once(object).chain(arr.borrow().iter().cloned()).collect();
    universe.send_interned(sym, args, context)
}

/// Convert a 1-based field index of `object` into a 0-based one.
fn field_index(
    universe: &Universe,
    signature: &'static str,
    object: &Value,
    index: i64,
) -> Result<usize, MateError> {
    usize::try_from(index)
        .ok()
        .and_then(|index| index.checked_sub(1))
        .filter(|index| *index < universe.field_count(object))
        .ok_or_else(|| MateError::primitive(signature, "index out of bounds"))
}

fn inst_var_at(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#instVarAt:";

    expect_args!(SIGNATURE, args, [
        object => object,
        Value::Integer(index) => index,
    ]);

    let index = match field_index(universe, SIGNATURE, &object, index) {
        Ok(index) => index,
        Err(err) => return Return::Exception(err),
    };

    let op = ReflectiveOp::LayoutReadField;
    let operands = || vec![Value::Integer(index as i64 + 1)];
    if let Some(ret) = intercept_uncached(universe, op, &object, context, operands) {
        return ret;
    }

    let value = match object {
        Value::Instance(instance) => fields::read_field(&instance, index),
        Value::Class(class) => class.borrow().lookup_local(index).unwrap_or(Value::Nil),
        _ => Value::Nil,
    };

    Return::Local(value)
}

fn inst_var_at_put(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#instVarAt:put:";

    expect_args!(SIGNATURE, args, [
        object => object,
        Value::Integer(index) => index,
        value => value,
    ]);

    let index = match field_index(universe, SIGNATURE, &object, index) {
        Ok(index) => index,
        Err(err) => return Return::Exception(err),
    };

    let op = ReflectiveOp::LayoutWriteField;
    let operands = || vec![Value::Integer(index as i64 + 1), value.clone()];
    if let Some(ret) = intercept_uncached(universe, op, &object, context, operands) {
        return ret;
    }

    match object {
        Value::Instance(instance) => fields::write_field(&instance, index, value.clone()),
        Value::Class(class) => {
            class.borrow_mut().assign_local(index, value.clone());
        }
        _ => {}
    }

    Return::Local(value)
}

fn install_environment(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#installEnvironment:";

    expect_args!(SIGNATURE, args, [
        object => object,
        environment => environment,
    ]);

    match &object {
        Value::Instance(instance) => universe.install_object_environment(instance, environment),
        _ => {
            return Return::Exception(MateError::primitive(
                SIGNATURE,
                "environments can only be installed on objects",
            ))
        }
    }

    Return::Local(object)
}

fn environment(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Object>>#environment";

    expect_args!(SIGNATURE, args, [
        object => object,
    ]);

    let environment = match object {
        Value::Instance(instance) => {
            instance.borrow_mut().update_layout();
            let storage = universe.config.environment_storage;
            let environment = instance.borrow().environment(storage);
            environment
        }
        _ => Value::Nil,
    };

    Return::Local(environment)
}
