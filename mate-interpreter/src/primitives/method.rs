use crate::expect_args;
use crate::frame::Context;
use crate::invokable::{Invoke, Return};
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("holder", self::holder),
    ("signature", self::signature),
    ("invokeOn:with:", self::invoke_on_with),
];

fn holder(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Method>>#holder";

    expect_args!(SIGNATURE, args, [
        Value::Invokable(invokable) => invokable,
    ]);

    match invokable.holder().upgrade() {
        Some(holder) => Return::Local(Value::Class(holder)),
        None => Return::Local(Value::Nil),
    }
}

fn signature(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Method>>#signature";

    expect_args!(SIGNATURE, args, [
        Value::Invokable(invokable) => invokable,
    ]);

    let sym = universe.intern_symbol(invokable.signature());
    Return::Local(Value::Symbol(sym))
}

fn invoke_on_with(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
    const SIGNATURE: &str = "Method>>#invokeOn:with:";

    expect_args!(SIGNATURE, args, [
        Value::Invokable(invokable) => invokable,
        receiver => receiver,
        Value::Array(args) => args,
    ]);

    let args = std::iter::once(receiver)
        .chain(args.borrow().iter().cloned())
        .collect();
    invokable.invoke(universe, args, context)
}
