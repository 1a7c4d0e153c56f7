mod blocks;

/// Primitives for the **Array** class.
pub mod array;
/// Primitives for the **Boolean** class.
pub mod boolean;
/// Primitives for the **Class** class.
pub mod class;
/// Primitives for the **Double** class.
pub mod double;
/// Primitives for the **Environment** class.
pub mod environment;
/// Primitives for the **Integer** class.
pub mod integer;
/// Primitives for the **Method** class and the **Primitive** class.
pub mod method;
/// Primitives for the **Object** class.
pub mod object;

pub use self::blocks::{block1, block2, block3};

use crate::frame::Context;
use crate::invokable::Return;
use crate::universe::Universe;
use crate::value::Value;

/// A interpreter primitive (just a bare function pointer).
///
/// Primitives receive the context of the send that reached them, so whatever they invoke
/// in turn keeps running with the same environment and level.
pub type PrimitiveFn = fn(universe: &mut Universe, args: Vec<Value>, context: &Context) -> Return;

/// Macro for checking and destructuring arguments passed to primitives.
#[macro_export]
macro_rules! expect_args {
    ($signature:expr, $args:expr, [ $( $ptrn:pat $( => $name:ident )? ),* $(,)? ]) => {
        #[allow(unused_mut)]
        let ($($(mut $name,)?)*) = {
            #[allow(unused_variables, unused_mut)]
            let mut iter = $args.into_iter();
            $(#[allow(unreachable_patterns)]
            $(let $name =)? match iter.next() {
                Some($ptrn) => {$($name)?},
                Some(_) => return $crate::invokable::Return::Exception(
                    $crate::error::MateError::primitive($signature, "wrong type"),
                ),
                None => return $crate::invokable::Return::Exception(
                    $crate::error::MateError::primitive($signature, "missing argument"),
                ),
            };)*
            ($($($name,)?)*)
        };
    };
}

pub fn get_class_primitives(class_name: &str) -> Option<&'static [(&'static str, PrimitiveFn)]> {
    match class_name {
        "Array" => Some(self::array::CLASS_PRIMITIVES),
        "Class" => Some(self::class::CLASS_PRIMITIVES),
        "Environment" => Some(self::environment::CLASS_PRIMITIVES),
        _ => None,
    }
}

pub fn get_instance_primitives(
    class_name: &str,
) -> Option<&'static [(&'static str, PrimitiveFn)]> {
    match class_name {
        "Array" => Some(self::array::INSTANCE_PRIMITIVES),
        "Block1" => Some(self::block1::INSTANCE_PRIMITIVES),
        "Block2" => Some(self::block2::INSTANCE_PRIMITIVES),
        "Block3" => Some(self::block3::INSTANCE_PRIMITIVES),
        "Boolean" => Some(self::boolean::INSTANCE_PRIMITIVES),
        "Class" => Some(self::class::INSTANCE_PRIMITIVES),
        "Double" => Some(self::double::INSTANCE_PRIMITIVES),
        "Environment" => Some(self::environment::INSTANCE_PRIMITIVES),
        "Integer" => Some(self::integer::INSTANCE_PRIMITIVES),
        "Method" => Some(self::method::INSTANCE_PRIMITIVES),
        "Primitive" => Some(self::method::INSTANCE_PRIMITIVES),
        "Object" => Some(self::object::INSTANCE_PRIMITIVES),
        _ => None,
    }
}
