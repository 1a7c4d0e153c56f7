use crate::expect_args;
use crate::frame::Context;
use crate::invokable::{Invoke, Return};
use crate::primitives::PrimitiveFn;
use crate::propagate;
use crate::universe::Universe;
use crate::value::Value;

/// Primitives for the **Block1** class.
pub mod block1 {
    use super::*;

    pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
        ("value", self::value),
        ("whileTrue:", self::while_true),
        ("valueWithEnvironment:", self::value_with_environment),
    ];

    fn value(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        const SIGNATURE: &str = "Block1>>#value";

        let block_args = args.clone();
        expect_args!(SIGNATURE, args, [
            Value::Block(block) => block,
        ]);

        block.invoke(universe, block_args, context)
    }

    fn while_true(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        const SIGNATURE: &str = "Block1>>#whileTrue:";

        expect_args!(SIGNATURE, args, [
            Value::Block(condition) => condition,
            Value::Block(body) => body,
        ]);

        loop {
            let args = vec![Value::Block(condition.clone())];
            match propagate!(condition.invoke(universe, args, context)) {
                Value::Boolean(true) => {}
                _ => break,
            }
            let args = vec![Value::Block(body.clone())];
            propagate!(body.invoke(universe, args, context));
        }

        Return::Local(Value::Nil)
    }

    /// Evaluate the block with an environment installed on its activation.
    fn value_with_environment(
        universe: &mut Universe,
        args: Vec<Value>,
        context: &Context,
    ) -> Return {
        const SIGNATURE: &str = "Block1>>#valueWithEnvironment:";

        expect_args!(SIGNATURE, args, [
            Value::Block(block) => block,
            environment => environment,
        ]);

        let args = vec![Value::Block(block.clone())];
        block.invoke(universe, args, &context.with_environment(environment))
    }
}

/// Primitives for the **Block2** class.
pub mod block2 {
    use super::*;

    pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("value:", self::value)];

    fn value(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        const SIGNATURE: &str = "Block2>>#value:";

        let block_args = args.clone();
        expect_args!(SIGNATURE, args, [
            Value::Block(block) => block,
            _,
        ]);

        block.invoke(universe, block_args, context)
    }
}

/// Primitives for the **Block3** class.
pub mod block3 {
    use super::*;

    pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("value:with:", self::value)];

    fn value(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return {
        const SIGNATURE: &str = "Block3>>#value:with:";

        let block_args = args.clone();
        expect_args!(SIGNATURE, args, [
            Value::Block(block) => block,
            _,
            _,
        ]);

        block.invoke(universe, block_args, context)
    }
}
