//! Recursive-descent parser for the type-name grammar.
//!
//! ```text
//! type        := fundamental | array | tuple | union | identifier
//! fundamental := ('f'|'i'|'u') digits | "null"
//! array       := type '#' [digits]
//! tuple       := '(' type (',' type)* ')'
//! union       := '[' type (',' type)* ']'      alternatives may use '^' for the union itself
//! identifier  := name ['<' type (',' type)* '>']   looked up in the type dictionary
//! ```
//!
//! Resolution is memoized through the registry: a name that is already interned
//! is returned as is. Composite nodes are interned as placeholders *before*
//! their children are resolved, so a definition can reach itself again through
//! a union or a dynamic array.
//!
//! Nesting deeper than [`MAX_TYPE_DEPTH`] levels is a schema error.

use super::dict::TypeDict;
use super::id::TypeId;
use super::node::{ArrayLen, Child, TypeKind, TypeNode};
use super::registry::TypeRegistry;
use crate::constants::{MAX_TYPE_DEPTH, MAX_UNION_ALTERNATIVES, NULL_TYPE, SELF_REFERENCE};
use crate::error::{Result, ScribeError};

/// Characters with a meaning in the grammar or the header framing.
const RESERVED_CHARS: &[char] = &['#', '(', ')', '[', ']', ',', '^', '{', '}', '"', '\\'];

pub(crate) struct TypeParser<'r, 'd> {
    registry: &'r mut TypeRegistry,
    dict: &'d TypeDict,
    /// Enclosing unions, innermost last. `^` binds to the top.
    unions: Vec<TypeId>,
    /// Nodes whose children are being resolved, with the guard depth at entry.
    in_progress: Vec<(TypeId, usize)>,
    /// Number of unions and dynamic arrays entered so far.
    guards: usize,
    /// Current nesting of `resolve_name` calls.
    depth: usize,
}

impl<'r, 'd> TypeParser<'r, 'd> {
    pub(crate) fn new(registry: &'r mut TypeRegistry, dict: &'d TypeDict) -> Self {
        Self {
            registry,
            dict,
            unions: Vec::new(),
            in_progress: Vec::new(),
            guards: 0,
            depth: 0,
        }
    }

    /// Resolves a name; on failure every node created by this call is discarded.
    pub(crate) fn resolve(mut self, name: &str) -> Result<TypeId> {
        let mark = self.registry.len();
        let result = self.resolve_name(name);
        if result.is_err() {
            self.registry.rollback(mark);
        }
        result
    }

    fn resolve_name(&mut self, name: &str) -> Result<TypeId> {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(ScribeError::Schema(format!(
                "type name nested too deeply (more than {MAX_TYPE_DEPTH} levels)"
            )));
        }
        self.depth += 1;
        let result = self.resolve_level(name);
        self.depth -= 1;
        result
    }

    fn resolve_level(&mut self, name: &str) -> Result<TypeId> {
        if name.trim().is_empty() {
            return Err(ScribeError::Schema("blank type name".into()));
        }

        if name == SELF_REFERENCE {
            return self.unions.last().copied().ok_or_else(|| {
                ScribeError::Schema(format!("self-reference `{SELF_REFERENCE}` outside of a union"))
            });
        }

        // A name with a free `^` means something different inside each union.
        let context_free = !has_free_self_reference(name);
        if context_free && let Some(id) = self.registry.lookup(name) {
            self.check_cycle(id, name)?;
            return Ok(id);
        }

        let head = name.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &name[head.len()..];

        if let Some(elem) = head.strip_suffix('#') {
            let len = if digits.is_empty() {
                ArrayLen::Dynamic
            } else {
                ArrayLen::Fixed(digits.parse().map_err(|_| {
                    ScribeError::Schema(format!("array length out of range in `{name}`"))
                })?)
            };
            return self.resolve_array(name, elem, len, context_free);
        }

        if name == NULL_TYPE {
            return Ok(self.finish_fundamental(name, 0));
        }

        if !digits.is_empty() && matches!(head, "f" | "i" | "u") {
            let width = digits.parse().map_err(|_| {
                ScribeError::Schema(format!("byte width out of range in `{name}`"))
            })?;
            return Ok(self.finish_fundamental(name, width));
        }

        match name.as_bytes().first() {
            Some(b'(') => self.resolve_composite(name, TypeKind::Tuple, context_free),
            Some(b'[') => self.resolve_composite(name, TypeKind::Union, context_free),
            _ => self.resolve_user(name),
        }
    }

    fn finish_fundamental(&mut self, name: &str, width: usize) -> TypeId {
        let id = self.registry.add_node(TypeNode::fundamental(name, width));
        self.registry.intern(name, id);
        id
    }

    fn resolve_array(
        &mut self,
        name: &str,
        elem_name: &str,
        len: ArrayLen,
        context_free: bool,
    ) -> Result<TypeId> {
        let id = self.begin(name, TypeKind::Array(len), context_free);
        let guarded = len == ArrayLen::Dynamic;
        if guarded {
            self.guards += 1;
        }
        let elem = self.resolve_name(elem_name);
        if guarded {
            self.guards -= 1;
        }
        self.in_progress.pop();
        let elem = elem?;

        let fixed_len = match (self.registry.get(elem).fixed_len, len) {
            (Some(elem_len), ArrayLen::Fixed(n)) => elem_len.checked_mul(n),
            _ => None,
        };
        self.registry.replace_node(
            id,
            TypeNode {
                name: name.to_owned(),
                fixed_len,
                kind: TypeKind::Array(len),
                children: vec![Child {
                    ty: elem,
                    name: None,
                }],
            },
        );
        Ok(id)
    }

    fn resolve_composite(&mut self, name: &str, kind: TypeKind, context_free: bool) -> Result<TypeId> {
        let inner = unwrap_brackets(name)?;
        let parts = split_top_level(inner, name)?;
        let is_union = kind == TypeKind::Union;
        if is_union && parts.len() > MAX_UNION_ALTERNATIVES {
            return Err(ScribeError::Schema(format!(
                "union `{name}` has {} alternatives, at most {MAX_UNION_ALTERNATIVES} are allowed",
                parts.len()
            )));
        }

        let id = self.begin(name, kind, context_free);
        if is_union {
            self.unions.push(id);
            self.guards += 1;
        }
        let children: Result<Vec<Child>> = parts
            .into_iter()
            .map(|part| self.resolve_name(part).map(|ty| Child { ty, name: None }))
            .collect();
        if is_union {
            self.unions.pop();
            self.guards -= 1;
        }
        self.in_progress.pop();
        let children = children?;

        // The active alternative is picked per value, so a union is never fixed.
        let fixed_len = if is_union {
            None
        } else {
            self.sum_fixed(&children)
        };
        self.registry.replace_node(
            id,
            TypeNode {
                name: name.to_owned(),
                fixed_len,
                kind,
                children,
            },
        );
        Ok(id)
    }

    fn resolve_user(&mut self, name: &str) -> Result<TypeId> {
        validate_identifier(name)?;
        let dict = self.dict;
        let def = dict
            .get(name)
            .ok_or_else(|| ScribeError::UndefinedType(name.to_owned()))?;

        let id = self.begin(name, TypeKind::UserDefined, true);
        let children: Result<Vec<Child>> = def
            .fields()
            .iter()
            .map(|field| {
                self.resolve_name(&field.type_name).map(|ty| Child {
                    ty,
                    name: Some(field.name.clone()),
                })
            })
            .collect();
        self.in_progress.pop();
        let children = children?;

        let fixed_len = self.sum_fixed(&children);
        self.registry.replace_node(
            id,
            TypeNode {
                name: name.to_owned(),
                fixed_len,
                kind: TypeKind::UserDefined,
                children,
            },
        );
        Ok(id)
    }

    /// Creates and (when context free) interns a placeholder for `name`.
    fn begin(&mut self, name: &str, kind: TypeKind, context_free: bool) -> TypeId {
        let id = self.registry.add_node(TypeNode::placeholder(name, kind));
        if context_free {
            self.registry.intern(name, id);
        }
        self.in_progress.push((id, self.guards));
        id
    }

    /// Rejects a node that reaches itself with no union or dynamic array in
    /// between, since its instances would be infinitely large.
    fn check_cycle(&self, id: TypeId, name: &str) -> Result<()> {
        match self.in_progress.iter().find(|(open, _)| *open == id) {
            Some((_, guards)) if *guards == self.guards => Err(ScribeError::Schema(format!(
                "type `{name}` contains itself without a union or dynamic array in between"
            ))),
            _ => Ok(()),
        }
    }

    fn sum_fixed(&self, children: &[Child]) -> Option<usize> {
        children.iter().try_fold(0usize, |acc, child| {
            self.registry
                .get(child.ty)
                .fixed_len
                .and_then(|len| acc.checked_add(len))
        })
    }
}

/// Checks that `name` can be used as a user-defined type name.
///
/// Identifiers must not collide with the grammar: no reserved characters, no
/// whitespace, and nothing that would parse as a fundamental type. A name may
/// end in a balanced argument list such as `hist<f8>` or `pair<u1,(f4,f4)>`,
/// naming one instantiation of a parameterised type.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ScribeError::Schema("blank type name".into()));
    }
    let (base, args) = match name.find('<') {
        Some(i) => (&name[..i], Some(&name[i..])),
        None => (name, None),
    };
    if base.is_empty() {
        return Err(ScribeError::Schema(format!(
            "malformed type name `{name}`: missing name before `<`"
        )));
    }
    if let Some(c) = base.chars().find(|c| {
        RESERVED_CHARS.contains(c) || matches!(c, '<' | '>') || c.is_whitespace() || c.is_control()
    }) {
        return Err(unexpected(name, c));
    }
    if let Some(args) = args {
        check_arguments(name, args)?;
    }

    let mut chars = name.chars();
    let looks_fundamental = matches!(chars.next(), Some('f' | 'i' | 'u'))
        && !chars.as_str().is_empty()
        && chars.as_str().bytes().all(|b| b.is_ascii_digit());
    if looks_fundamental || name == NULL_TYPE {
        return Err(ScribeError::Schema(format!(
            "`{name}` is a fundamental type name and cannot be redefined"
        )));
    }
    Ok(())
}

/// `args` is the `<...>` tail of an identifier: balanced, non-empty, and
/// closed by its last character.
fn check_arguments(name: &str, args: &str) -> Result<()> {
    if args == "<>" {
        return Err(ScribeError::Schema(format!(
            "malformed type name `{name}`: empty argument list"
        )));
    }
    let mut stack = Vec::new();
    for (i, c) in args.char_indices() {
        if matches!(c, '^' | '{' | '}' | '"' | '\\') || c.is_whitespace() || c.is_control() {
            return Err(unexpected(name, c));
        }
        if let Some(close) = closer(c) {
            stack.push(close);
        } else if matches!(c, ')' | ']' | '>') {
            if stack.pop() != Some(c) {
                return Err(unbalanced(name));
            }
            if stack.is_empty() && i + c.len_utf8() != args.len() {
                return Err(ScribeError::Schema(format!(
                    "malformed type name `{name}`: trailing text after closing `{c}`"
                )));
            }
        }
    }
    if stack.is_empty() {
        Ok(())
    } else {
        Err(unbalanced(name))
    }
}

fn unexpected(name: &str, c: char) -> ScribeError {
    ScribeError::Schema(format!(
        "malformed type name `{name}`: unexpected character `{c}`"
    ))
}

/// True when `name` contains a `^` not enclosed by any union bracket of its own.
fn has_free_self_reference(name: &str) -> bool {
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '^' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn closer(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '<' => Some('>'),
        _ => None,
    }
}

/// Strips one balanced outer pair of brackets that must span the whole name.
fn unwrap_brackets(name: &str) -> Result<&str> {
    let mut stack = Vec::new();
    for (i, c) in name.char_indices() {
        if let Some(close) = closer(c) {
            stack.push(close);
        } else if matches!(c, ')' | ']' | '>') {
            if stack.pop() != Some(c) {
                return Err(unbalanced(name));
            }
            if stack.is_empty() {
                if i + c.len_utf8() != name.len() {
                    return Err(ScribeError::Schema(format!(
                        "malformed type name `{name}`: trailing text after closing `{c}`"
                    )));
                }
                return Ok(&name[1..i]);
            }
        }
    }
    Err(unbalanced(name))
}

/// Splits on commas that are not nested inside brackets.
fn split_top_level<'a>(inner: &'a str, name: &str) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut stack = Vec::new();
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        if let Some(close) = closer(c) {
            stack.push(close);
        } else if matches!(c, ')' | ']' | '>') {
            if stack.pop() != Some(c) {
                return Err(unbalanced(name));
            }
        } else if c == ',' && stack.is_empty() {
            parts.push(&inner[start..i]);
            start = i + 1;
        }
    }
    if !stack.is_empty() {
        return Err(unbalanced(name));
    }
    parts.push(&inner[start..]);
    Ok(parts)
}

fn unbalanced(name: &str) -> ScribeError {
    ScribeError::Schema(format!("unbalanced brackets in type name `{name}`"))
}
