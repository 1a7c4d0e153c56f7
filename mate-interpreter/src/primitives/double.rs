use num_traits::ToPrimitive;

use crate::error::MateError;
use crate::expect_args;
use crate::frame::Context;
use crate::invokable::Return;
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("+", self::plus),
    ("-", self::minus),
    ("*", self::times),
    ("<", self::lt),
    ("=", self::eq),
];

macro_rules! promote {
    ($signature:expr, $value:expr) => {
        match $value {
            Value::Double(value) => value,
            Value::Integer(value) => value as f64,
            Value::BigInteger(value) => match value.to_f64() {
                Some(value) => value,
                None => {
                    return Return::Exception(MateError::primitive(
                        $signature,
                        "`Integer` too big to be converted to `Double`",
                    ))
                }
            },
            _ => return Return::Exception(MateError::primitive($signature, "wrong types")),
        }
    };
}

fn plus(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Double>>#+";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    let a = promote!(SIGNATURE, a);
    let b = promote!(SIGNATURE, b);
    Return::Local(Value::Double(a + b))
}

fn minus(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Double>>#-";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    let a = promote!(SIGNATURE, a);
    let b = promote!(SIGNATURE, b);
    Return::Local(Value::Double(a - b))
}

fn times(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Double>>#*";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    let a = promote!(SIGNATURE, a);
    let b = promote!(SIGNATURE, b);
    Return::Local(Value::Double(a * b))
}

fn lt(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Double>>#<";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    let a = promote!(SIGNATURE, a);
    let b = promote!(SIGNATURE, b);
    Return::Local(Value::Boolean(a < b))
}

fn eq(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Double>>#=";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    let a = promote!(SIGNATURE, a);
    let b = promote!(SIGNATURE, b);
    Return::Local(Value::Boolean(a == b))
}
