use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context as _, Error};
use log::debug;

use mate_core::ast;

use crate::class::Class;
use crate::compiler;
use crate::config::VmConfig;
use crate::dispatch::CallSite;
use crate::error::MateError;
use crate::fields;
use crate::frame::{Context, ExecutionLevel, Frame};
use crate::instance::Instance;
use crate::interner::{Interned, Interner, Selectors};
use crate::invokable::{Invoke, Return};
use crate::method::Method;
use crate::reflection::dispatch::MessageInterception;
use crate::reflection::ReflectionState;
use crate::value::Value;
use crate::SOMRef;

/// Classes the interpreter needs direct access to, whatever user code does to the globals.
#[derive(Debug)]
pub struct CoreClasses {
    pub object_class: SOMRef<Class>,
    pub class_class: SOMRef<Class>,
    pub metaclass_class: SOMRef<Class>,

    pub nil_class: SOMRef<Class>,
    pub integer_class: SOMRef<Class>,
    pub double_class: SOMRef<Class>,
    pub array_class: SOMRef<Class>,
    pub method_class: SOMRef<Class>,
    pub primitive_class: SOMRef<Class>,
    pub symbol_class: SOMRef<Class>,
    pub string_class: SOMRef<Class>,

    pub block_class: SOMRef<Class>,
    pub block1_class: SOMRef<Class>,
    pub block2_class: SOMRef<Class>,
    pub block3_class: SOMRef<Class>,

    pub boolean_class: SOMRef<Class>,
    pub true_class: SOMRef<Class>,
    pub false_class: SOMRef<Class>,

    pub environment_class: SOMRef<Class>,
}

/// Everything one interpreter instance owns: classes and globals, live activations,
/// configuration and the meta-object protocol state.
pub struct Universe {
    pub interner: Interner,
    /// Selectors the interpreter sends or compares against itself.
    pub selectors: Selectors,
    pub globals: HashMap<Interned, Value>,
    pub core: CoreClasses,
    /// Live activations, innermost last.
    pub frames: Vec<SOMRef<Frame>>,
    /// The configuration this universe was created with.
    pub config: VmConfig,
    /// The global environment and the state of the meta-object protocol.
    pub reflection: ReflectionState,
    /// Bumped whenever a method table changes, so cached lookups can tell they went stale.
    pub method_epoch: u64,
}

impl Universe {
    /// Bootstrap a universe with the core classes.
    pub fn new(config: VmConfig) -> Self {
        let mut interner = Interner::with_capacity(256);
        let selectors = Selectors::new(&mut interner);
        let mut globals = HashMap::new();

        let mut system_class = |name: &str, fields: &[&str]| {
            let defn = ast::ClassDef::new(name).with_instance_locals(fields);
            let class = compiler::compile_class(&mut interner, &config, &defn, None)
                .unwrap_or_else(|err| panic!("could not bootstrap '{}': {}", name, err));
            globals.insert(interner.intern(name), Value::Class(class.clone()));
            class
        };

        let object_class = system_class("Object", &[]);
        let class_class = system_class("Class", &[]);
        let metaclass_class = system_class("Metaclass", &[]);

        let nil_class = system_class("Nil", &[]);
        let integer_class = system_class("Integer", &[]);
        let double_class = system_class("Double", &[]);
        let array_class = system_class("Array", &[]);
        let method_class = system_class("Method", &[]);
        let primitive_class = system_class("Primitive", &[]);
        let string_class = system_class("String", &[]);
        let symbol_class = system_class("Symbol", &[]);

        let block_class = system_class("Block", &[]);
        let block1_class = system_class("Block1", &[]);
        let block2_class = system_class("Block2", &[]);
        let block3_class = system_class("Block3", &[]);

        let boolean_class = system_class("Boolean", &[]);
        let true_class = system_class("True", &[]);
        let false_class = system_class("False", &[]);

        let environment_class = system_class("Environment", &["semantics", "layout", "message"]);

        object_class
            .borrow()
            .class()
            .borrow_mut()
            .set_class(&metaclass_class);
        object_class
            .borrow()
            .class()
            .borrow_mut()
            .set_super_class(&class_class);
        set_super_class(&class_class, &object_class, &metaclass_class);
        set_super_class(&metaclass_class, &class_class, &metaclass_class);
        set_super_class(&nil_class, &object_class, &metaclass_class);
        set_super_class(&array_class, &object_class, &metaclass_class);
        set_super_class(&method_class, &object_class, &metaclass_class);
        set_super_class(&primitive_class, &object_class, &metaclass_class);
        set_super_class(&string_class, &object_class, &metaclass_class);
        set_super_class(&symbol_class, &string_class, &metaclass_class);
        set_super_class(&integer_class, &object_class, &metaclass_class);
        set_super_class(&double_class, &object_class, &metaclass_class);

        set_super_class(&block_class, &object_class, &metaclass_class);
        set_super_class(&block1_class, &block_class, &metaclass_class);
        set_super_class(&block2_class, &block_class, &metaclass_class);
        set_super_class(&block3_class, &block_class, &metaclass_class);

        set_super_class(&boolean_class, &object_class, &metaclass_class);
        set_super_class(&true_class, &boolean_class, &metaclass_class);
        set_super_class(&false_class, &boolean_class, &metaclass_class);

        set_super_class(&environment_class, &object_class, &metaclass_class);

        let reflection = ReflectionState::new(config.reflection_enabled);

        Self {
            interner,
            selectors,
            globals,
            core: CoreClasses {
                object_class,
                class_class,
                metaclass_class,
                nil_class,
                integer_class,
                double_class,
                array_class,
                method_class,
                primitive_class,
                symbol_class,
                string_class,
                block_class,
                block1_class,
                block2_class,
                block3_class,
                boolean_class,
                true_class,
                false_class,
                environment_class,
            },
            frames: Vec::new(),
            config,
            reflection,
            method_epoch: 0,
        }
    }

    /// Define a class (and its metaclass), and bind it as a global.
    ///
    /// The superclass is looked up by name among the globals, and defaults to **Object**.
    pub fn define_class(&mut self, defn: &ast::ClassDef) -> Result<SOMRef<Class>, Error> {
        let super_class = match defn.super_class.as_deref() {
            Some(name) => {
                let symbol = self.intern_symbol(name);
                match self.lookup_global(symbol) {
                    Some(Value::Class(super_class)) => super_class,
                    _ => bail!("'{}': unknown superclass '{}'", defn.name, name),
                }
            }
            None => self.core.object_class.clone(),
        };

        let class = compiler::compile_class(&mut self.interner, &self.config, defn, Some(&super_class))
            .with_context(|| format!("could not compile class '{}'", defn.name))?;
        set_super_class(&class, &super_class, &self.core.metaclass_class);

        let name = self.intern_symbol(&defn.name);
        self.globals.insert(name, Value::Class(class.clone()));
        self.reflection.bump_epoch();
        debug!("defined class '{}'", defn.name);

        Ok(class)
    }

    /// Compile a method and add it to `class`, replacing any method with the same signature.
    ///
    /// Every cached lookup made before this call is dropped the next time it is used.
    pub fn add_method(
        &mut self,
        class: &SOMRef<Class>,
        defn: &ast::MethodDef,
    ) -> Result<Rc<Method>, Error> {
        let method = compiler::compile_method_for(&mut self.interner, &self.config, class, defn)
            .with_context(|| {
                format!(
                    "could not compile '{}>>#{}'",
                    class.borrow().name(),
                    defn.signature
                )
            })?;
        let method = Rc::new(method);
        let signature = self.intern_symbol(&defn.signature);
        class.borrow_mut().methods.insert(signature, method.clone());
        self.method_epoch += 1;
        self.reflection.bump_epoch();
        debug!(
            "added '{}', method epoch is now {}",
            method.qualified_name(),
            self.method_epoch
        );
        Ok(method)
    }

    /// Add an instance field to `class`, answering its (0-based) index.
    ///
    /// Every layout of the class' instances is invalidated; instances migrate lazily.
    pub fn define_field(&mut self, class: &SOMRef<Class>, name: &str) -> Result<usize, Error> {
        let has_subclass = self.globals.values().any(|value| match value {
            Value::Class(other) => other
                .borrow()
                .super_class()
                .map_or(false, |super_class| Rc::ptr_eq(&super_class, class)),
            _ => false,
        });
        if has_subclass {
            bail!(
                "cannot add field '{}' to '{}': it already has subclasses",
                name,
                class.borrow().name()
            );
        }

        let name = self.intern_symbol(name);
        let mut class = class.borrow_mut();
        let (index, added) = class.fields.insert_full(name);
        if !added {
            return Err(anyhow!(
                "'{}' already has a field named '{}'",
                class.name(),
                self.lookup_symbol(name)
            ));
        }
        class.renew_layout();
        Ok(index)
    }

    /// Create a fresh instance of `class`.
    pub fn instantiate(&self, class: &SOMRef<Class>) -> Value {
        let instance = Instance::from_class(class.clone());
        Value::Instance(Rc::new(RefCell::new(instance)))
    }

    /// How many fields `object` has: the fields its class declares (inherited ones included)
    /// for instances, the class-side variables for classes, none for anything else.
    pub fn field_count(&self, object: &Value) -> usize {
        match object {
            Value::Instance(instance) => instance.borrow().class().borrow().fields.len(),
            Value::Class(class) => class.borrow().locals.len(),
            _ => 0,
        }
    }

    fn check_field(&self, object: &Value, field: usize) -> Result<(), MateError> {
        let count = self.field_count(object);
        if field < count {
            return Ok(());
        }
        Err(MateError::FieldOutOfBounds {
            class: object.class(self).borrow().name().to_string(),
            index: field,
            count,
        })
    }

    /// Read a field (0-based) of an object, without interception or caching.
    pub fn read_field(&self, object: &Value, field: usize) -> Result<Value, MateError> {
        self.check_field(object, field)?;
        let value = match object {
            Value::Instance(instance) => fields::read_field(instance, field),
            Value::Class(class) => class.borrow().lookup_local(field).unwrap_or(Value::Nil),
            _ => Value::Nil,
        };
        Ok(value)
    }

    /// Write a field (0-based) of an object, without interception or caching.
    pub fn write_field(
        &mut self,
        object: &Value,
        field: usize,
        value: Value,
    ) -> Result<(), MateError> {
        self.check_field(object, field)?;
        match object {
            Value::Instance(instance) => fields::write_field(instance, field, value),
            Value::Class(class) => {
                class.borrow_mut().assign_local(field, value);
            }
            _ => {}
        }
        Ok(())
    }

    /// Send a message from outside of any activation.
    ///
    /// The send goes through the message lookup and activation checks, then dispatches normally.
    pub fn send(
        &mut self,
        selector: &str,
        receiver: Value,
        args: Vec<Value>,
        environment: Value,
        level: ExecutionLevel,
    ) -> Return {
        let selector = self.intern_symbol(selector);
        let context = Context::new(environment, level);
        let args = std::iter::once(receiver).chain(args).collect();
        self.send_interned(selector, args, &context)
    }

    /// Send `selector` with `args` (receiver first) under `context`, as a fresh call site would.
    pub fn send_interned(
        &mut self,
        selector: Interned,
        args: Vec<Value>,
        context: &Context,
    ) -> Return {
        let args = if self.config.reflection_enabled {
            match MessageInterception::new().dispatch(self, selector, None, args, context) {
                Ok(ret) => return ret,
                Err(args) => args,
            }
        } else {
            args
        };
        CallSite::new(selector).dispatch(self, args, context)
    }

    /// Install (or, with `Nil`, remove) the environment every activation is subject to.
    pub fn install_global_environment(&mut self, environment: Value) {
        self.reflection.install_global_environment(environment);
    }

    /// Install (or, with `Nil`, remove) the environment of a single object.
    pub fn install_object_environment(&mut self, instance: &SOMRef<Instance>, environment: Value) {
        let storage = self.config.environment_storage;
        let mut instance = instance.borrow_mut();
        instance.update_layout();
        instance.set_environment(storage, environment);
    }

    /// Switch interception on or off, without recompiling anything.
    pub fn set_reflection_active(&mut self, active: bool) {
        self.reflection.set_active(active);
    }

    /// Send `doesNotUnderstand:arguments:` to `receiver`, on behalf of a failed send of `selector`.
    pub fn does_not_understand(
        &mut self,
        receiver: Value,
        selector: Interned,
        args: Vec<Value>,
        context: &Context,
    ) -> Return {
        match receiver.lookup_method(self, self.selectors.does_not_understand) {
            Some(method) => {
                let args = vec![receiver, Value::Symbol(selector), Value::array(args)];
                method.invoke(self, args, context)
            }
            None => Return::Exception(MateError::MessageNotUnderstood {
                class: receiver.class(self).borrow().name().to_string(),
                selector: self.lookup_symbol(selector).to_string(),
            }),
        }
    }
}

impl Universe {
    /// Execute a piece of code within a new stack frame.
    ///
    /// The frame is marked dead once `func` returns.
    pub fn with_frame<T>(&mut self, frame: Frame, func: impl FnOnce(&mut Self) -> T) -> T {
        let frame = Rc::new(RefCell::new(frame));
        self.frames.push(frame.clone());
        let ret = func(self);
        self.frames.pop();
        frame.borrow_mut().is_alive = false;
        ret
    }

    /// Get the current frame.
    pub fn current_frame(&self) -> SOMRef<Frame> {
        self.frames.last().cloned().expect("no frames left")
    }

    /// Get the context of the current frame (base level without environment, outside of any frame).
    pub fn current_context(&self) -> Context {
        self.frames
            .last()
            .map(|frame| frame.borrow().context.clone())
            .unwrap_or_default()
    }
}

impl Universe {
    pub fn object_class(&self) -> SOMRef<Class> {
        self.core.object_class.clone()
    }

    pub fn class_class(&self) -> SOMRef<Class> {
        self.core.class_class.clone()
    }

    pub fn metaclass_class(&self) -> SOMRef<Class> {
        self.core.metaclass_class.clone()
    }

    pub fn nil_class(&self) -> SOMRef<Class> {
        self.core.nil_class.clone()
    }

    pub fn symbol_class(&self) -> SOMRef<Class> {
        self.core.symbol_class.clone()
    }

    pub fn string_class(&self) -> SOMRef<Class> {
        self.core.string_class.clone()
    }

    pub fn array_class(&self) -> SOMRef<Class> {
        self.core.array_class.clone()
    }

    pub fn integer_class(&self) -> SOMRef<Class> {
        self.core.integer_class.clone()
    }

    pub fn double_class(&self) -> SOMRef<Class> {
        self.core.double_class.clone()
    }

    pub fn block_class(&self) -> SOMRef<Class> {
        self.core.block_class.clone()
    }

    pub fn block1_class(&self) -> SOMRef<Class> {
        self.core.block1_class.clone()
    }

    pub fn block2_class(&self) -> SOMRef<Class> {
        self.core.block2_class.clone()
    }

    pub fn block3_class(&self) -> SOMRef<Class> {
        self.core.block3_class.clone()
    }

    pub fn true_class(&self) -> SOMRef<Class> {
        self.core.true_class.clone()
    }

    pub fn false_class(&self) -> SOMRef<Class> {
        self.core.false_class.clone()
    }

    pub fn method_class(&self) -> SOMRef<Class> {
        self.core.method_class.clone()
    }

    pub fn primitive_class(&self) -> SOMRef<Class> {
        self.core.primitive_class.clone()
    }

    pub fn environment_class(&self) -> SOMRef<Class> {
        self.core.environment_class.clone()
    }
}

impl Universe {
    /// Intern a symbol.
    pub fn intern_symbol(&mut self, symbol: &str) -> Interned {
        self.interner.intern(symbol)
    }

    /// Lookup a symbol.
    pub fn lookup_symbol(&self, symbol: Interned) -> &str {
        self.interner.lookup(symbol)
    }

    pub fn lookup_global(&self, idx: Interned) -> Option<Value> {
        self.globals.get(&idx).cloned()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

fn set_super_class(
    class: &SOMRef<Class>,
    super_class: &SOMRef<Class>,
    metaclass_class: &SOMRef<Class>,
) {
    class.borrow_mut().set_super_class(super_class);
    class
        .borrow()
        .class()
        .borrow_mut()
        .set_super_class(&super_class.borrow().class());
    class
        .borrow()
        .class()
        .borrow_mut()
        .set_class(metaclass_class);
}
