//! Runtime utilities for generated code (Macros).
//! Do not use directly.

use std::cell::RefCell;

use crate::constants::SELF_REFERENCE;
use crate::error::Result;
use crate::schema::{TypeDef, TypeDict};

thread_local! {
    /// Unions whose names are being built on this thread, innermost last.
    /// `None` marks an anonymous union such as `Option<T>`.
    static UNIONS: RefCell<Vec<Option<&'static str>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the union stack when the naming of one union is finished, even if
/// naming an alternative panics.
struct UnionFrame;

impl Drop for UnionFrame {
    fn drop(&mut self) {
        UNIONS.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Builds the name of a union whose alternatives are named by `alternatives`.
///
/// `key` identifies a named Rust type (an enum). When that type shows up again
/// while its own alternatives are being named, the innermost union is the
/// enum itself and the recursion is written as `^`. A type that recurs through
/// another union cannot be expressed: `^` would bind to the wrong union, so the
/// reference is left as a name the type parser rejects.
pub fn union_name<F>(key: Option<&'static str>, alternatives: F) -> String
where
    F: FnOnce() -> Vec<String>,
{
    if let Some(k) = key {
        let seen = UNIONS.with(|s| {
            let s = s.borrow();
            s.contains(&Some(k)).then(|| s.last() == Some(&Some(k)))
        });
        match seen {
            Some(true) => return SELF_REFERENCE.to_owned(),
            Some(false) => return format!("{SELF_REFERENCE}{k}"),
            None => {}
        }
    }

    UNIONS.with(|s| s.borrow_mut().push(key));
    let frame = UnionFrame;
    let alts = alternatives();
    drop(frame);
    format!("[{}]", alts.join(","))
}

/// Registers a user-defined type and reports whether it was new.
///
/// Generated `register_types` bodies only recurse into field types when this
/// returns `true`, which is what stops a type that names itself from looping.
pub fn register_user_type(types: &mut TypeDict, name: &str, fields: Vec<(String, &str)>) -> Result<bool> {
    types.register(name, fields.into_iter().collect::<TypeDef>())
}

thread_local! {
    static REGISTERING: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

struct RegisterFrame;

impl Drop for RegisterFrame {
    fn drop(&mut self) {
        REGISTERING.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Runs `register` unless the type identified by `key` is already being
/// registered further up the call stack.
///
/// Enums have no dictionary entry of their own, so this is what ends the
/// recursion for an enum that contains itself.
pub fn register_once<F>(key: &'static str, register: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    if REGISTERING.with(|s| s.borrow().contains(&key)) {
        return Ok(());
    }
    REGISTERING.with(|s| s.borrow_mut().push(key));
    let frame = RegisterFrame;
    let result = register();
    drop(frame);
    result
}

/// Name of one instantiation of a parameterised user type, `name<a,b>`.
///
/// Each instantiation gets its own dictionary entry, since field types differ.
pub fn generic_name(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        name.to_owned()
    } else {
        format!("{name}<{}>", args.join(","))
    }
}

/// Name of a tuple with the given field types.
pub fn tuple_name(fields: &[String]) -> String {
    format!("({})", fields.join(","))
}
