use crate::expect_args;
use crate::frame::Context;
use crate::invokable::{Invoke, Return};
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("ifTrue:", self::if_true),
    ("ifFalse:", self::if_false),
    ("ifTrue:ifFalse:", self::if_true_if_false),
    ("not", self::not),
];

/// Evaluate `branch` if it is a block, answer it as-is otherwise.
fn evaluate_branch(universe: &mut Universe, branch: Value, context: &Context) -> Return {
    match branch {
        Value::Block(block) => {
            let args = vec![Value::Block(block.clone())];
            block.invoke(universe, args, context)
        }
        value => Return::Local(value),
    }
}

fn if_true(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Boolean>>#ifTrue:";

    expect_args!(SIGNATURE, args, [
        Value::Boolean(condition) => condition,
        branch => branch,
    ]);

    if condition {
        evaluate_branch(universe, branch, context)
    } else {
        Return::Local(Value::Nil)
    }
}

fn if_false(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Boolean>>#ifFalse:";

    expect_args!(SIGNATURE, args, [
        Value::Boolean(condition) => condition,
        branch => branch,
    ]);

    if condition {
        Return::Local(Value::Nil)
    } else {
        evaluate_branch(universe, branch, context)
    }
}

fn if_true_if_false(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Boolean>>#ifTrue:ifFalse:";

    expect_args!(SIGNATURE, args, [
        Value::Boolean(condition) => condition,
        if_true => if_true,
        if_false => if_false,
    ]);

    if condition {
        evaluate_branch(universe, if_true, context)
    } else {
        evaluate_branch(universe, if_false, context)
    }
}

fn not(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Boolean>>#not";

    expect_args!(SIGNATURE, args, [
        Value::Boolean(value) => value,
    ]);

    Return::Local(Value::Boolean(!value))
}
