use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::MateError;
use crate::expect_args;
use crate::frame::Context;
use crate::invokable::{Invoke, Return};
use crate::primitives::PrimitiveFn;
use crate::propagate;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("+", self::plus),
    ("-", self::minus),
    ("*", self::times),
    ("<", self::lt),
    (">", self::gt),
    ("<=", self::le),
    (">=", self::ge),
    ("=", self::eq),
    ("to:do:", self::to_do),
];

macro_rules! demote {
    ($expr:expr) => {{
        let value = $expr;
        match value.to_i64() {
            Some(value) => Return::Local(Value::Integer(value)),
            None => Return::Local(Value::BigInteger(value)),
        }
    }};
}

fn wrong_types(signature: &'static str) -> Return {
    Return::Exception(MateError::primitive(signature, "wrong types"))
}

fn too_big(signature: &'static str) -> Return {
    Return::Exception(MateError::primitive(
        signature,
        "`Integer` too big to be converted to `Double`",
    ))
}

fn plus(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Integer>>#+";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => match a.checked_add(b) {
            Some(value) => Return::Local(Value::Integer(value)),
            None => demote!(BigInt::from(a) + BigInt::from(b)),
        },
        (Value::BigInteger(a), Value::BigInteger(b)) => demote!(a + b),
        (Value::BigInteger(a), Value::Integer(b)) | (Value::Integer(b), Value::BigInteger(a)) => {
            demote!(a + BigInt::from(b))
        }
        (Value::Integer(a), Value::Double(b)) => Return::Local(Value::Double((a as f64) + b)),
        (Value::BigInteger(a), Value::Double(b)) => match a.to_f64() {
            Some(a) => Return::Local(Value::Double(a + b)),
            None => too_big(SIGNATURE),
        },
        _ => wrong_types(SIGNATURE),
    }
}

fn minus(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Integer>>#-";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => match a.checked_sub(b) {
            Some(value) => Return::Local(Value::Integer(value)),
            None => demote!(BigInt::from(a) - BigInt::from(b)),
        },
        (Value::BigInteger(a), Value::BigInteger(b)) => demote!(a - b),
        (Value::BigInteger(a), Value::Integer(b)) => demote!(a - BigInt::from(b)),
        (Value::Integer(a), Value::BigInteger(b)) => demote!(BigInt::from(a) - b),
        (Value::Integer(a), Value::Double(b)) => Return::Local(Value::Double((a as f64) - b)),
        (Value::BigInteger(a), Value::Double(b)) => match a.to_f64() {
            Some(a) => Return::Local(Value::Double(a - b)),
            None => too_big(SIGNATURE),
        },
        _ => wrong_types(SIGNATURE),
    }
}

fn times(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Integer>>#*";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => match a.checked_mul(b) {
            Some(value) => Return::Local(Value::Integer(value)),
            None => demote!(BigInt::from(a) * BigInt::from(b)),
        },
        (Value::BigInteger(a), Value::BigInteger(b)) => demote!(a * b),
        (Value::BigInteger(a), Value::Integer(b)) | (Value::Integer(b), Value::BigInteger(a)) => {
            demote!(a * BigInt::from(b))
        }
        (Value::Integer(a), Value::Double(b)) => Return::Local(Value::Double((a as f64) * b)),
        (Value::BigInteger(a), Value::Double(b)) => match a.to_f64() {
            Some(a) => Return::Local(Value::Double(a * b)),
            None => too_big(SIGNATURE),
        },
        _ => wrong_types(SIGNATURE),
    }
}

/// Compare two integers (or an integer and a double), `None` if they cannot be compared.
fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::BigInteger(a), Value::BigInteger(b)) => Some(a.cmp(b)),
        (Value::BigInteger(a), Value::Integer(b)) => Some(a.cmp(&BigInt::from(*b))),
        (Value::Integer(a), Value::BigInteger(b)) => Some(BigInt::from(*a).cmp(b)),
        (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::BigInteger(a), Value::Double(b)) => a.to_f64()?.partial_cmp(b),
        _ => None,
    }
}

macro_rules! comparison {
    ($name:ident, $signature:expr, $test:expr) => {
        fn $name(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
            const SIGNATURE: &str = $signature;

            expect_args!(SIGNATURE, args, [
                a => a,
                b => b,
            ]);

            match compare(&a, &b) {
                Some(ordering) => Return::Local(Value::Boolean($test(ordering))),
                None => wrong_types(SIGNATURE),
            }
        }
    };
}

comparison!(lt, "Integer>>#<", std::cmp::Ordering::is_lt);
comparison!(gt, "Integer>>#>", std::cmp::Ordering::is_gt);
comparison!(le, "Integer>>#<=", std::cmp::Ordering::is_le);
comparison!(ge, "Integer>>#>=", std::cmp::Ordering::is_ge);

fn eq(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Integer>>#=";

    expect_args!(SIGNATURE, args, [
        a => a,
        b => b,
    ]);

    Return::Local(Value::Boolean(compare(&a, &b) == Some(std::cmp::Ordering::Equal)))
}

fn to_do(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Integer>>#to:do:";

    expect_args!(SIGNATURE, args, [
        Value::Integer(start) => start,
        Value::Integer(end) => end,
        Value::Block(block) => block,
    ]);

    for index in start..=end {
        let args = vec![Value::Block(block.clone()), Value::Integer(index)];
        propagate!(block.invoke(universe, args, context));
    }

    Return::Local(Value::Integer(start))
}
