#![allow(missing_docs)]

use scribe::format::header_end;
use scribe::schema::{ArrayLen, TypeKind, TypeRegistry};
use scribe::{Reader, Result, ScribeError, TypeDef, TypeDict};

fn parse(name: &str) -> Result<(TypeRegistry, scribe::schema::TypeId)> {
    let mut registry = TypeRegistry::new();
    let id = registry.parse(name, &TypeDict::new())?;
    Ok((registry, id))
}

// --- GRAMMAR ---

#[test]
fn test_fundamentals_and_fixed_lengths() -> Result<()> {
    let cases: &[(&str, Option<usize>)] = &[
        ("f8", Some(8)),
        ("u1", Some(1)),
        ("i16", Some(16)),
        ("null", Some(0)),
        ("f8#3", Some(24)),
        ("f8#0", Some(0)),
        ("(f8,i4)", Some(12)),
        ("((u1,u2),u4#2)", Some(11)),
        ("f8#", None),
        ("(f8,u1#)", None),
        ("[f8,i4]", None),
        ("[null]", None),
    ];
    for (name, fixed) in cases {
        let (registry, id) = parse(name)?;
        let node = registry.get(id);
        assert_eq!(node.name(), *name);
        assert_eq!(node.fixed_len(), *fixed, "fixed length of {name}");
    }
    Ok(())
}

#[test]
fn test_array_kinds() -> Result<()> {
    let (registry, id) = parse("u2#7#")?;
    let outer = registry.get(id);
    assert_eq!(outer.kind(), TypeKind::Array(ArrayLen::Dynamic));
    let inner = registry.get(outer.element().ok_or(ScribeError::KeyNotFound("element".into()))?);
    assert_eq!(inner.name(), "u2#7");
    assert_eq!(inner.kind(), TypeKind::Array(ArrayLen::Fixed(7)));
    assert_eq!(inner.element_count(), 7);
    assert!(inner.is_array());
    Ok(())
}

#[test]
fn test_malformed_names() {
    for name in ["", "   ", "(f8,i4", "[f8]]", "(f8))", "f8)", "(f8,,i4)", "[]", "#3"] {
        let mut registry = TypeRegistry::new();
        let result = registry.parse(name, &TypeDict::new());
        assert!(
            matches!(result, Err(ScribeError::Schema(_)) | Err(ScribeError::UndefinedType(_))),
            "`{name}` should not parse, got {result:?}"
        );
    }
}

#[test]
fn test_union_alternative_limit() -> Result<()> {
    let alts = |n: usize| format!("[{}]", vec!["u1"; n].join(","));
    parse(&alts(256))?;
    assert!(matches!(parse(&alts(257)), Err(ScribeError::Schema(_))));
    Ok(())
}

// --- INTERNING ---

#[test]
fn test_interning_returns_the_same_handle() -> Result<()> {
    let dict = TypeDict::new();
    let mut registry = TypeRegistry::new();
    let a = registry.parse("(f8,i4#)", &dict)?;
    let len = registry.len();
    let b = registry.parse("(f8,i4#)", &dict)?;
    assert_eq!(a, b);
    assert_eq!(registry.len(), len);

    // Sub-names are interned on the way down.
    let outer = registry.parse("(f8,i4#)#", &dict)?;
    assert_eq!(registry.get(outer).element(), Some(a));
    assert_eq!(registry.lookup("i4#"), registry.get(a).child(1).map(|c| c.ty));
    Ok(())
}

#[test]
fn test_reader_interns_root_types() -> Result<()> {
    let mut w = scribe::Writer::new(Vec::new());
    w.write("a", &vec![1.0f64])?
        .write("n", &3u8)?
        .write("b", &vec![2.0f64])?;
    let r = Reader::from_bytes(w.close()?)?;
    assert_eq!(r.get("a")?.type_id(), r.get("b")?.type_id());
    assert_ne!(r.get("a")?.type_id(), r.get("n")?.type_id());
    Ok(())
}

// --- RECURSION ---

#[test]
fn test_self_referencing_union() -> Result<()> {
    let (registry, id) = parse("[f8,^#]")?;
    let union = registry.get(id);
    assert!(union.is_union());
    assert_eq!(union.num_children(), 2);
    let list = union.child(1).map(|c| c.ty).ok_or(ScribeError::KeyNotFound("1".into()))?;
    assert_eq!(registry.get(list).name(), "^#");
    assert_eq!(registry.get(list).element(), Some(id));
    assert_eq!(union.fixed_len(), None);
    Ok(())
}

#[test]
fn test_self_reference_binds_to_innermost_union() -> Result<()> {
    let (registry, outer) = parse("[i4,[f8,^]#]")?;
    let list = registry.get(outer).child(1).map(|c| c.ty).ok_or(ScribeError::KeyNotFound("1".into()))?;
    let inner = registry.get(list).element().ok_or(ScribeError::KeyNotFound("elem".into()))?;
    assert_ne!(inner, outer);
    assert_eq!(registry.get(inner).child(1).map(|c| c.ty), Some(inner));
    // The inner union closes over its own `^`, so it is interned; `^` alone never is.
    assert_eq!(registry.lookup("[f8,^]"), Some(inner));
    assert_eq!(registry.lookup("^"), None);
    Ok(())
}

#[test]
fn test_recursive_value_decodes() -> Result<()> {
    use scribe::ScribeValue;
    use scribe::codec::{write_size, write_union_index};

    let mut w = scribe::Writer::new(Vec::new());
    w.write_with("tree", "[f8,^#]", |out| {
        write_union_index(out, 1)?;
        write_size(out, 2)?;
        write_union_index(out, 0)?;
        1.0f64.write_value(out)?;
        write_union_index(out, 1)?;
        write_size(out, 0)
    })?;
    w.write_with("leaf", "[f8,^#]", |out| {
        write_union_index(out, 0)?;
        2.5f64.write_value(out)
    })?;
    let r = Reader::from_bytes(w.close()?)?;

    let tree = r.get("tree")?;
    assert_eq!(tree.union_index()?, 1);
    assert_eq!(tree.memlen()?, 1 + 4 + (1 + 8) + (1 + 4));
    assert_eq!(tree.variant()?.size()?, 2);
    assert_eq!(tree.get(0)?.variant()?.safe_cast::<f64>()?, 1.0);
    assert_eq!(tree.get(1)?.variant()?.size()?, 0);
    assert_eq!(r.get("leaf")?.variant()?.safe_cast::<f64>()?, 2.5);
    assert_eq!(r.get("tree")?.type_id(), r.get("leaf")?.type_id());
    Ok(())
}

#[test]
fn test_self_reference_outside_union() {
    for name in ["^", "^#", "(f8,^)"] {
        assert!(matches!(parse(name), Err(ScribeError::Schema(_))), "{name}");
    }
}

#[test]
fn test_infinite_types_are_rejected() -> Result<()> {
    let mut dict = TypeDict::new();
    dict.register("chain", TypeDef::new().field("f8", "value").field("chain", "next"))?;
    dict.register("fixed_chain", TypeDef::new().field("fixed_chain#2", "next"))?;
    dict.register("list", TypeDef::new().field("f8", "value").field("list#", "rest"))?;
    dict.register("maybe", TypeDef::new().field("[null,maybe]", "next"))?;

    let mut registry = TypeRegistry::new();
    assert!(matches!(registry.parse("chain", &dict), Err(ScribeError::Schema(_))));
    assert!(matches!(registry.parse("fixed_chain", &dict), Err(ScribeError::Schema(_))));

    let list = registry.parse("list", &dict)?;
    let rest = registry.get(list).child(1).map(|c| c.ty).ok_or(ScribeError::KeyNotFound("rest".into()))?;
    assert_eq!(registry.get(rest).element(), Some(list));
    registry.parse("maybe", &dict)?;
    Ok(())
}

// --- ERRORS & ROLLBACK ---

#[test]
fn test_undefined_type_is_named() {
    let mut registry = TypeRegistry::new();
    let err = registry.parse("(f8,missing)", &TypeDict::new()).unwrap_err();
    assert!(matches!(err, ScribeError::UndefinedType(ref n) if n == "missing"));
    assert!(err.to_string().contains("missing"));
    // Nothing from the failed call stays behind.
    assert!(registry.is_empty());
    assert_eq!(registry.lookup("f8"), None);
}

#[test]
fn test_failed_parse_keeps_earlier_types() -> Result<()> {
    let dict = TypeDict::new();
    let mut registry = TypeRegistry::new();
    let f8 = registry.parse("f8", &dict)?;
    assert!(registry.parse("(f8,i4,(u1,nope))", &dict).is_err());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("f8"), Some(f8));
    assert_eq!(registry.lookup("i4"), None);
    Ok(())
}

#[test]
fn test_nesting_depth_is_limited() -> Result<()> {
    let shallow = format!("{}f8{}", "(".repeat(64), ")".repeat(64));
    let (registry, id) = parse(&shallow)?;
    assert_eq!(registry.get(id).fixed_len(), Some(8));

    let deep = format!("{}f8{}", "(".repeat(10_000), ")".repeat(10_000));
    let mut registry = TypeRegistry::new();
    assert!(matches!(
        registry.parse(&deep, &TypeDict::new()),
        Err(ScribeError::Schema(ref m)) if m.contains("nested too deeply")
    ));
    assert!(registry.is_empty());

    let arrays = format!("u1{}", "#".repeat(10_000));
    assert!(matches!(parse(&arrays), Err(ScribeError::Schema(_))));

    let header = format!(r#"{{"root":[["{deep}","x"]],"types":{{}}}}"#);
    assert!(matches!(
        Reader::from_bytes(header.into_bytes()),
        Err(ScribeError::Schema(_))
    ));
    Ok(())
}

#[test]
fn test_user_type_chains_are_depth_limited() {
    let mut dict = TypeDict::new();
    for i in 0..1_000 {
        let def = TypeDef::new().field(format!("link{}", i + 1), "next");
        assert!(dict.register(&format!("link{i}"), def).is_ok());
    }
    assert!(dict.register("link1000", TypeDef::new().field("u1", "end")).is_ok());
    let mut registry = TypeRegistry::new();
    assert!(matches!(
        registry.parse("link0", &dict),
        Err(ScribeError::Schema(_))
    ));
    assert!(registry.is_empty());
}

// --- MEMLEN ---

#[test]
fn test_memlen_walks_variable_parts() -> Result<()> {
    let (registry, id) = parse("(i4,f8#,[null,u2])")?;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&7i32.to_ne_bytes());
    bytes.extend_from_slice(&2u32.to_ne_bytes());
    bytes.extend_from_slice(&1.0f64.to_ne_bytes());
    bytes.extend_from_slice(&2.0f64.to_ne_bytes());
    bytes.push(1);
    bytes.extend_from_slice(&9u16.to_ne_bytes());
    bytes.extend_from_slice(b"trailing garbage");

    assert_eq!(registry.memlen(id, &bytes)?, 4 + 4 + 16 + 3);
    Ok(())
}

#[test]
fn test_memlen_reports_truncation() -> Result<()> {
    let (registry, id) = parse("f8#")?;
    let mut bytes = 3u32.to_ne_bytes().to_vec();
    bytes.extend_from_slice(&[0; 8]);
    // Fixed-width elements are answered from the count alone.
    assert_eq!(registry.memlen(id, &bytes)?, 28);
    assert!(matches!(registry.memlen(id, &bytes[..2]), Err(ScribeError::Format(_))));

    let (registry, id) = parse("u1##")?;
    assert!(matches!(registry.memlen(id, &bytes), Err(ScribeError::Format(_))));
    Ok(())
}

// --- DICTIONARY ---

#[test]
fn test_dictionary_registration_is_idempotent() -> Result<()> {
    let axis = TypeDef::new().field("u4", "nbins").field("f8", "min").field("f8", "max");
    let mut dict = TypeDict::new();
    assert!(dict.register("lin_axis", axis.clone())?);
    assert!(!dict.register("lin_axis", axis)?);
    assert_eq!(dict.len(), 1);

    let other = TypeDef::new().field("f8", "min");
    assert!(matches!(dict.register("lin_axis", other), Err(ScribeError::Schema(_))));
    assert_eq!(
        serde_json::to_string(&dict).map_err(ScribeError::from)?,
        r#"{"lin_axis":[["u4","nbins"],["f8","min"],["f8","max"]]}"#
    );
    Ok(())
}

#[test]
fn test_dictionary_rejects_bad_names() {
    let mut dict = TypeDict::new();
    for name in ["", "f8", "u16", "null", "two words", "a#", "(x)", "[x]", "x^", "br{ace"] {
        assert!(
            matches!(dict.register(name, TypeDef::new()), Err(ScribeError::Schema(_))),
            "`{name}` should be rejected"
        );
    }
    assert!(dict.is_empty());
}

#[test]
fn test_dictionary_accepts_argument_lists() -> Result<()> {
    let mut dict = TypeDict::new();
    for name in ["hist<f8>", "pair<u1,(f4,f4)>", "wrap<hist<f8>#2>", "opt<[null,f8]>"] {
        assert!(dict.register(name, TypeDef::new().field("u1", "a"))?, "`{name}` should be accepted");
    }
    for name in ["<f8>", "a<>", "a<f8", "a<f8>x", "a<(f8>)", "a>", "a<^>", "a<f8 >"] {
        assert!(
            matches!(dict.register(name, TypeDef::new()), Err(ScribeError::Schema(_))),
            "`{name}` should be rejected"
        );
    }

    let mut registry = TypeRegistry::new();
    let id = registry.parse("(pair<u1,(f4,f4)>,hist<f8>#)", &dict)?;
    let node = registry.get(id);
    assert_eq!(node.num_children(), 2);
    let first = node.child(0).map(|c| registry.get(c.ty).name());
    assert_eq!(first, Some("pair<u1,(f4,f4)>"));
    assert_eq!(node.fixed_len(), None);
    Ok(())
}

#[test]
fn test_grouped_definitions_expand() -> Result<()> {
    let dict: TypeDict =
        serde_json::from_str(r#"{"point":[["f8","x","y"],["u1","flag"]]}"#).map_err(ScribeError::from)?;
    let def = dict.get("point").ok_or(ScribeError::UndefinedType("point".into()))?;
    let names: Vec<&str> = def.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["x", "y", "flag"]);
    assert_eq!(def.fields()[1].type_name, "f8");

    let bad: std::result::Result<TypeDict, _> = serde_json::from_str(r#"{"p":[["f8"]]}"#);
    assert!(bad.is_err());
    Ok(())
}

// --- HEADER FRAMING ---

#[test]
fn test_header_boundary() -> Result<()> {
    assert_eq!(header_end(br#"{"a":{"b":{}}}rest"#)?, 14);
    assert!(matches!(header_end(b"  {}"), Err(ScribeError::Format(_))));
    assert!(matches!(header_end(br#"{"a":{}"#), Err(ScribeError::Format(_))));
    assert!(matches!(header_end(b""), Err(ScribeError::Format(_))));
    Ok(())
}

#[test]
fn test_reader_rejects_bad_files() {
    assert!(matches!(
        Reader::from_bytes(b"not a scribe file".to_vec()),
        Err(ScribeError::Format(_))
    ));
    assert!(matches!(
        Reader::from_bytes(br#"{"root":[["f8","x"]],"types":{}"#.to_vec()),
        Err(ScribeError::Format(_))
    ));
    assert!(matches!(
        Reader::from_bytes(br#"{"root": oops}"#.to_vec()),
        Err(ScribeError::Json(_))
    ));
    assert!(matches!(
        Reader::from_bytes(br#"{"root":[["thing","x"]],"types":{}}"#.to_vec()),
        Err(ScribeError::UndefinedType(ref n)) if n == "thing"
    ));
}

#[test]
fn test_corrupt_bodies_fail_on_access() -> Result<()> {
    let mut bytes = br#"{"root":[["[f8,i4]","u"],["f8#","a"]],"types":{}}"#.to_vec();
    bytes.push(5);
    let r = Reader::from_bytes(bytes)?;
    let u = r.get("u")?;
    assert_eq!(u.union_index()?, 5);
    assert!(matches!(u.variant(), Err(ScribeError::Format(_))));
    assert!(matches!(u.memlen(), Err(ScribeError::Format(_))));
    // Reaching `a` means walking past `u`.
    assert!(matches!(r.get("a"), Err(ScribeError::Format(_))));

    let mut bytes = br#"{"root":[["f8#","a"]],"types":{}}"#.to_vec();
    bytes.extend_from_slice(&4u32.to_ne_bytes());
    bytes.extend_from_slice(&1.0f64.to_ne_bytes());
    let r = Reader::from_bytes(bytes)?;
    let a = r.get("a")?;
    assert_eq!(a.size()?, 4);
    assert_eq!(a.get(0)?.safe_cast::<f64>()?, 1.0);
    assert!(matches!(a.get(1)?.safe_cast::<f64>(), Err(ScribeError::Format(_))));
    assert!(matches!(a.to_scalars::<f64>(), Err(ScribeError::Format(_))));
    Ok(())
}
