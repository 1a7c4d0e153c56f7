use std::convert::TryFrom;

use crate::error::MateError;
use crate::expect_args;
use crate::frame::Context;
use crate::invokable::Return;
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("at:", self::at),
    ("at:put:", self::at_put),
    ("length", self::length),
];

pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("new:", self::new)];

fn at(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Array>>#at:";

    expect_args!(SIGNATURE, args, [
        Value::Array(values) => values,
        Value::Integer(index) => index,
    ]);

    let index = match usize::try_from(index - 1) {
        Ok(index) => index,
        Err(err) => return Return::Exception(MateError::primitive(SIGNATURE, err.to_string())),
    };
    let value = values.borrow().get(index).cloned();
    match value {
        Some(value) => Return::Local(value),
        None => Return::Exception(MateError::primitive(SIGNATURE, "index out of bounds")),
    }
}

fn at_put(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Array>>#at:put:";

    expect_args!(SIGNATURE, args, [
        Value::Array(values) => values,
        Value::Integer(index) => index,
        value => value,
    ]);

    let index = match usize::try_from(index - 1) {
        Ok(index) => index,
        Err(err) => return Return::Exception(MateError::primitive(SIGNATURE, err.to_string())),
    };
    match values.borrow_mut().get_mut(index) {
        Some(location) => *location = value,
        None => return Return::Exception(MateError::primitive(SIGNATURE, "index out of bounds")),
    }
    Return::Local(Value::Array(values))
}

fn length(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Array>>#length";

    expect_args!(SIGNATURE, args, [
        Value::Array(values) => values,
    ]);

    let length = values.borrow().len();
    match i64::try_from(length) {
        Ok(length) => Return::Local(Value::Integer(length)),
        Err(err) => Return::Exception(MateError::primitive(SIGNATURE, err.to_string())),
    }
}

fn new(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Array>>#new:";

    expect_args!(SIGNATURE, args, [
        _,
        Value::Integer(count) => count,
    ]);

    match usize::try_from(count) {
        Ok(length) => Return::Local(Value::array(vec![Value::Nil; length])),
        Err(err) => Return::Exception(MateError::primitive(SIGNATURE, err.to_string())),
    }
}
