//!
//! This is a reflective interpreter for the Simple Object Machine, extended with the Mate meta-object protocol.
//!
//! Every message send owns a self-specializing dispatch chain, and every primitive operation
//! (argument, local and field access, method return, message lookup and activation) can be
//! intercepted by a meta-object installed globally, on an activation, or on a single object.
//!

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Facilities for fast-path validity flags.
pub mod assumption;
/// Facilities for manipulating blocks.
pub mod block;
/// Facilities for manipulating classes.
pub mod class;
/// Facilities for compiling syntax trees into executable nodes.
pub mod compiler;
/// The interpreter's configuration.
pub mod config;
/// Per-call-site message dispatch.
pub mod dispatch;
/// The interpreter's error types.
pub mod error;
/// Facilities for evaluating executable nodes.
pub mod evaluate;
/// Layout-aware field accessors.
pub mod fields;
/// Facilities for manipulating stack frames.
pub mod frame;
/// Facilities for manipulating class instances.
pub mod instance;
/// Facilities for string interning.
pub mod interner;
/// Facilities for invoking methods and blocks.
pub mod invokable;
/// Object layouts (hidden classes) and their transitions.
pub mod layout;
/// Facilities for manipulating class methods.
pub mod method;
/// The executable node definitions.
pub mod nodes;
/// Definitions for all supported primitives.
pub mod primitives;
/// The meta-object protocol.
pub mod reflection;
/// The collection of all known objects during execution.
pub mod universe;
/// Facilities for manipulating values.
pub mod value;

/// A strong and owning reference to an object.
pub type SOMRef<T> = Rc<RefCell<T>>;
/// A weak reference to an object.
pub type SOMWeakRef<T> = Weak<RefCell<T>>;
