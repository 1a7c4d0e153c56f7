//!
//! Constructors for syntax trees, for front ends and embedders that do not go through source text.
//!
//! ```
//! use mate_core::ast::{ClassDef, Expression, MethodDef};
//!
//! // Counter = ( | n | inc = ( n := n + 1 ) )
//! let counter = ClassDef::new("Counter")
//!     .with_instance_locals(&["n"])
//!     .with_instance_method(MethodDef::new("inc", &[], &[], vec![
//!         Expression::assign("n", Expression::binary("+", Expression::reference("n"), Expression::integer(1))),
//!     ]));
//!
//! assert_eq!(counter.instance_methods.len(), 1);
//! ```

use crate::ast::*;

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl ClassDef {
    /// Start a class definition that inherits from `Object`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_class: None,
            instance_locals: Vec::new(),
            instance_methods: Vec::new(),
            static_locals: Vec::new(),
            static_methods: Vec::new(),
        }
    }

    pub fn with_super_class(mut self, name: impl Into<String>) -> Self {
        self.super_class = Some(name.into());
        self
    }

    pub fn with_instance_locals(mut self, names: &[&str]) -> Self {
        self.instance_locals.extend(owned(names));
        self
    }

    pub fn with_static_locals(mut self, names: &[&str]) -> Self {
        self.static_locals.extend(owned(names));
        self
    }

    pub fn with_instance_method(mut self, method: MethodDef) -> Self {
        self.instance_methods.push(method);
        self
    }

    pub fn with_static_method(mut self, method: MethodDef) -> Self {
        self.static_methods.push(method);
        self
    }
}

impl MethodKind {
    /// Infer the kind of a method from its signature.
    ///
    /// Operators take exactly one parameter, keyword signatures take one parameter per colon.
    pub fn from_signature(signature: &str, parameters: &[&str]) -> Self {
        match signature.chars().next() {
            Some(ch) if !ch.is_alphabetic() => Self::Operator {
                rhs: parameters
                    .first()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| String::from("other")),
            },
            _ if signature.contains(':') => Self::Positional {
                parameters: owned(parameters),
            },
            _ => Self::Unary,
        }
    }
}

impl MethodDef {
    /// Define a method with an actual body.
    pub fn new(
        signature: impl Into<String>,
        parameters: &[&str],
        locals: &[&str],
        exprs: Vec<Expression>,
    ) -> Self {
        let signature = signature.into();
        Self {
            kind: MethodKind::from_signature(&signature, parameters),
            signature,
            body: MethodBody::Body {
                locals: owned(locals),
                body: Body { exprs },
            },
        }
    }

    /// Declare a method implemented by the VM.
    pub fn primitive(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let arity = match signature.chars().next() {
            Some(ch) if !ch.is_alphabetic() => 1,
            _ => signature.matches(':').count(),
        };
        let parameters: Vec<String> = (1..=arity).map(|idx| format!("arg{}", idx)).collect();
        let parameters: Vec<&str> = parameters.iter().map(String::as_str).collect();
        Self {
            kind: MethodKind::from_signature(&signature, &parameters),
            signature,
            body: MethodBody::Primitive,
        }
    }
}

impl Body {
    pub fn new(exprs: Vec<Expression>) -> Self {
        Self { exprs }
    }
}

impl Expression {
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    pub fn assign(name: impl Into<String>, value: Expression) -> Self {
        Self::Assignment(name.into(), Box::new(value))
    }

    pub fn send(receiver: Expression, signature: impl Into<String>, values: Vec<Expression>) -> Self {
        Self::Message(Message {
            receiver: Box::new(receiver),
            signature: signature.into(),
            values,
        })
    }

    pub fn binary(op: impl Into<String>, lhs: Expression, rhs: Expression) -> Self {
        Self::BinaryOp(BinaryOp {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn exit(value: Expression) -> Self {
        Self::Exit(Box::new(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    pub fn double(value: f64) -> Self {
        Self::Literal(Literal::Double(value))
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        Self::Literal(Literal::Symbol(value.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    pub fn block(parameters: &[&str], locals: &[&str], exprs: Vec<Expression>) -> Self {
        Self::Block(Block {
            parameters: owned(parameters),
            locals: owned(locals),
            body: Body { exprs },
        })
    }

    pub fn term(exprs: Vec<Expression>) -> Self {
        Self::Term(Term {
            body: Body { exprs },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_kinds_follow_signatures() {
        assert_eq!(MethodKind::from_signature("inc", &[]), MethodKind::Unary);
        assert_eq!(
            MethodKind::from_signature("write:value:", &["index", "value"]),
            MethodKind::Positional {
                parameters: vec![String::from("index"), String::from("value")],
            }
        );
        assert_eq!(
            MethodKind::from_signature("<=", &["other"]),
            MethodKind::Operator {
                rhs: String::from("other"),
            }
        );
    }

    #[test]
    fn primitive_declarations_get_placeholder_parameters() {
        let method = MethodDef::primitive("at:put:");
        assert_eq!(method.kind.arity(), 2);
        assert_eq!(method.body, MethodBody::Primitive);

        let method = MethodDef::primitive("==");
        assert_eq!(method.kind.arity(), 1);
    }

    #[test]
    fn class_definitions_accumulate_members() {
        let class = ClassDef::new("Point")
            .with_super_class("Object")
            .with_instance_locals(&["x", "y"])
            .with_static_locals(&["origin"])
            .with_instance_method(MethodDef::new(
                "x",
                &[],
                &[],
                vec![Expression::exit(Expression::reference("x"))],
            ));

        assert_eq!(class.super_class.as_deref(), Some("Object"));
        assert_eq!(class.instance_locals, vec!["x", "y"]);
        assert_eq!(class.static_locals, vec!["origin"]);
        assert_eq!(class.instance_methods[0].signature, "x");
    }
}
