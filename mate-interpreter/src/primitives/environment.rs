use crate::expect_args;
use crate::fields;
use crate::frame::Context;
use crate::invokable::Return;
use crate::primitives::PrimitiveFn;
use crate::reflection::EnvironmentSlot;
use crate::universe::Universe;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("semantics", self::semantics),
    ("semantics:", self::set_semantics),
    ("layout", self::layout),
    ("layout:", self::set_layout),
    ("message", self::message),
    ("message:", self::set_message),
];
pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("global", self::global),
    ("global:", self::set_global),
];

fn read_slot(signature: &'static str, args: Vec<Value>, slot: EnvironmentSlot) -> Return {
    expect_args!(signature, args, [
        Value::Instance(environment) => environment,
    ]);

    Return::Local(fields::read_field(&environment, slot.field_index()))
}

/// Setting a slot changes what every cached interception decision for this environment should be.
fn write_slot(
    universe: &mut Universe,
    signature: &'static str,
    args: Vec<Value>,
    slot: EnvironmentSlot,
) -> Return {
    expect_args!(signature, args, [
        Value::Instance(environment) => environment,
        metaobject => metaobject,
    ]);

    fields::write_field(&environment, slot.field_index(), metaobject);
    universe.reflection.bump_epoch();
    Return::Local(Value::Instance(environment))
}

fn semantics(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    read_slot("Environment>>#semantics", args, EnvironmentSlot::Semantics)
}

fn set_semantics(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    write_slot(universe, "Environment>>#semantics:", args, EnvironmentSlot::Semantics)
}

fn layout(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    read_slot("Environment>>#layout", args, EnvironmentSlot::Layout)
}

fn set_layout(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    write_slot(universe, "Environment>>#layout:", args, EnvironmentSlot::Layout)
}

fn message(_: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    read_slot("Environment>>#message", args, EnvironmentSlot::Message)
}

fn set_message(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    write_slot(universe, "Environment>>#message:", args, EnvironmentSlot::Message)
}

fn global(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Environment class>>#global";

    expect_args!(SIGNATURE, args, [_]);

    Return::Local(universe.reflection.global_environment().clone())
}

fn set_global(universe: &mut Universe, args: Vec<Value>, _: &Context) -> Return {
    const SIGNATURE: &str = "Environment class>>#global:";

    expect_args!(SIGNATURE, args, [
        class => class,
        environment => environment,
    ]);

    universe.install_global_environment(environment);
    Return::Local(class)
}
