use std::cell::RefCell;
use std::rc::Rc;

use crate::expect_args;
use crate::frame::Context;
use crate::instance::Instance;
use crate::invokable::Return;
use crate::primitives::PrimitiveFn;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("new", self::new),
    ("basicNew", self::new),
    ("basicNew:", self::new_with_environment),
    ("name", self::name),
    ("superclass", self::superclass),
    ("lookup:", self::lookup),
];
pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[];

fn superclass(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Class>>#superclass";

    expect_args!(SIGNATURE, args, [
        Value::Class(class) => class,
    ]);

    let super_class = class.borrow().super_class();
    Return::Local(super_class.map(Value::Class).unwrap_or(Value::Nil))
}

fn new(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Class>>#new";

    expect_args!(SIGNATURE, args, [
        Value::Class(class) => class,
    ]);

    let instance = Instance::from_class(class);
    let instance = Rc::new(RefCell::new(instance));
    Return::Local(Value::Instance(instance))
}

fn new_with_environment(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Class>>#basicNew:";

    expect_args!(SIGNATURE, args, [
        Value::Class(class) => class,
        environment => environment,
    ]);

    let instance = Rc::new(RefCell::new(Instance::from_class(class)));
    universe.install_object_environment(&instance, environment);
    Return::Local(Value::Instance(instance))
}

fn name(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Class>>#name";

    expect_args!(SIGNATURE, args, [
        Value::Class(class) => class,
    ]);

    let sym = universe.intern_symbol(class.borrow().name());
    Return::Local(Value::Symbol(sym))
}

fn lookup(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Class>>#lookup:";

    expect_args!(SIGNATURE, args, [
        Value::Class(class) => class,
        Value::Symbol(sym) => sym,
    ]);

    let method = class.borrow().lookup_method(sym);
    Return::Local(method.map(Value::Invokable).unwrap_or(Value::Nil))
}
