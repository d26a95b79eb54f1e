//! End-to-end scenarios over the public API surface.
use dotjson_lib::{
    compile_get_path, compile_set_path, delete, delete_many, get, get_many, get_str, increment,
    parse, pretty, run, set, set_many, set_with_compiled, set_with_options, ugly, valid, Kind,
    PrettyOptions, SetOptions, SetValue,
};
use pretty_assertions::assert_eq;

#[test]
fn nested_lookup() {
    let json = br#"{"name":{"first":"Tom","last":"Anderson"},"age":37}"#;
    let last = get(json, "name.last");
    assert_eq!(Kind::String, last.kind());
    assert_eq!("Anderson", last.string());
}

#[test]
fn modifier_pipe_then_index() {
    let json = br#"{"children":["Sara","Alex","Jack"]}"#;
    assert_eq!("Jack", get(json, "children|@reverse|0").string());
}

#[test]
fn filter_projection() {
    let json = br#"{"friends":[{"age":44},{"age":68},{"age":47}]}"#;
    let v = get(json, "friends.#(age>45)#.age");
    assert_eq!(Kind::Array, v.kind());
    assert_eq!(b"[68,47]".to_vec(), v.raw().to_vec());
}

#[test]
fn set_same_length_fast_path() {
    let json = br#"{"a":{"b":{"c":1}}}"#;
    let out = set(json, "a.b.c", SetValue::Int(2)).unwrap();
    assert_eq!(2, get(&out, "a.b.c").int());
    assert_eq!(json.len(), out.len());
}

#[test]
fn set_expands_arrays_with_null_holes() {
    let json = br#"{"items":[1,2,3]}"#;
    let out = set(json, "items.10", SetValue::Int(99)).unwrap();
    assert_eq!(
        br#"{"items":[1,2,3,null,null,null,null,null,null,null,99]}"#.to_vec(),
        out
    );
}

#[test]
fn delete_collapses_commas() {
    let json = br#"{"a":1,"b":2,"c":3}"#;
    assert_eq!(br#"{"a":1,"c":3}"#.to_vec(), delete(json, "b").unwrap());
}

#[test]
fn json_lines_addressing() {
    let json = b"{\"name\":\"Alice\"}\n{\"name\":\"Bob\"}\n{\"name\":\"Carol\"}";
    let v = get(json, "..#.name");
    assert_eq!(br#"["Alice","Bob","Carol"]"#.to_vec(), v.raw().to_vec());
    assert_eq!("Bob", get(json, "..1.name").string());
    assert_eq!(3, get(json, "..#").int());
}

#[test]
fn escaped_keys_never_descend() {
    assert_eq!(
        "Inception",
        get(br#"{"fav.movie":"Inception"}"#, r"fav\.movie").string()
    );
    assert!(!get(br#"{"fav":{"movie":"X"}}"#, r"fav\.movie").exists());
}

#[test]
fn slice_modifier() {
    let json = b"[10,20,30,40,50]";
    assert_eq!(b"[20,30]".to_vec(), get(json, "@slice:1:3").raw().to_vec());
    assert_eq!(b"[40,50]".to_vec(), get(json, "@slice:-2:").raw().to_vec());
}

#[test]
fn colon_prefixed_numeric_keys() {
    let json = br#"{"users":{"2313":{"name":"Alice"}}}"#;
    assert_eq!("Alice", get(json, "users.:2313.name").string());
    assert_eq!("Alice", get(json, "users.2313.name").string());
}

#[test]
fn whole_document_paths() {
    let json = br#"{"a":1}"#;
    assert_eq!(json.to_vec(), get(json, "").raw().to_vec());
    assert_eq!(json.to_vec(), get(json, "@this").raw().to_vec());
    assert_eq!(Kind::Object, parse(json).kind());
}

#[test]
fn get_str_and_get_many() {
    let json = r#"{"a":1,"b":"x"}"#;
    assert_eq!(1, get_str(json, "a").int());
    let many = get_many(json.as_bytes(), &["a", "missing", "b"]);
    assert_eq!(3, many.len());
    assert_eq!(1, many[0].int());
    assert!(!many[1].exists());
    assert_eq!("x", many[2].string());
}

#[test]
fn compiled_paths_are_reusable() {
    let path = compile_get_path("a.b").unwrap();
    assert_eq!("a.b", path.source());
    assert_eq!(1, run(&path, br#"{"a":{"b":1}}"#).int());
    assert_eq!(2, path.run(br#"{"a":{"b":2}}"#).int());
    assert!(compile_get_path("a.#(").is_err());
}

#[test]
fn compiled_set_paths_are_reusable() {
    let path = compile_set_path("counts.total").unwrap();
    let out = set_with_compiled(br#"{}"#, &path, SetValue::Int(1), None).unwrap();
    assert_eq!(br#"{"counts":{"total":1}}"#.to_vec(), out);
    let out = set_with_compiled(&out, &path, SetValue::Int(2), None).unwrap();
    assert_eq!(2, get(&out, "counts.total").int());
}

#[test]
fn set_with_merge_options() {
    let json = br#"{"cfg":{"a":1,"b":2}}"#;
    let opts = SetOptions {
        merge_objects: true,
        ..SetOptions::default()
    };
    let out = set_with_options(json, "cfg", SetValue::raw(br#"{"b":9,"c":3}"#), &opts).unwrap();
    assert_eq!(1, get(&out, "cfg.a").int());
    assert_eq!(9, get(&out, "cfg.b").int());
    assert_eq!(3, get(&out, "cfg.c").int());
}

#[test]
fn batch_operations_compose_left_to_right() {
    let out = set_many(
        br#"{}"#,
        &[
            ("list.-1", SetValue::Int(1)),
            ("list.-1", SetValue::Int(2)),
            ("list.0", SetValue::Int(7)),
        ],
    )
    .unwrap();
    assert_eq!(br#"{"list":[7,2]}"#.to_vec(), out);

    let out = delete_many(&out, &["list.0", "list.0"]).unwrap();
    assert_eq!(br#"{"list":[]}"#.to_vec(), out);
}

#[test]
fn increment_and_read_back() {
    let json = br#"{"stats":{"hits":9}}"#;
    let out = increment(json, "stats.hits", 1.0).unwrap();
    assert_eq!(10, get(&out, "stats.hits").int());
    let out = increment(&out, "stats.misses", 3.0).unwrap();
    assert_eq!(3, get(&out, "stats.misses").int());
}

#[test]
fn formatting_round_trip() {
    let json = br#"{"b":[1,2],"a":{"x":"y"}}"#;
    assert!(valid(json));
    let pretty_out = pretty(json, &PrettyOptions::default()).unwrap();
    assert!(valid(&pretty_out));
    let ugly_out = ugly(&pretty_out).unwrap();
    assert!(valid(&ugly_out));
    assert_eq!(json.to_vec(), ugly_out);
    assert!(!valid(b"{\"a\":}"));
    assert!(pretty(b"nope", &PrettyOptions::default()).is_err());
}

#[test]
fn value_accessors() {
    let json = br#"{"when":"2021-06-01T12:30:00Z","n":"42","flag":"yes","arr":[1,2]}"#;
    let when = get(json, "when").time().unwrap();
    assert_eq!("2021-06-01 12:30:00 +00:00", when.to_string());
    assert_eq!(42, get(json, "n").int());
    assert_eq!(42, get(json, "n").uint() as i64);
    assert!(get(json, "flag").boolean());

    let doc = get(json, "");
    let mut keys = Vec::new();
    doc.each(|k, _| {
        keys.push(k.string().to_owned());
        true
    });
    assert_eq!(vec!["when", "n", "flag", "arr"], keys);

    let map = doc.map();
    assert!(map.contains_key(&"arr".to_owned()));

    let a = get(json, "n");
    let b = get(json, "arr");
    assert!(a.less(&b, true), "numbers order before containers");
}

#[test]
fn multipath_and_wildcards_together() {
    let json = br#"{"first":"Tom","last":"Anderson","age":37}"#;
    let v = get(json, "first,age");
    assert_eq!(br#"["Tom",37]"#.to_vec(), v.raw().to_vec());
    assert_eq!("Anderson", get(json, "la?t").string());
}

#[test]
fn deep_recursive_descent() {
    let json = br#"{"person":{"phones":[{"number":"111"},{"number":"222"}],"number":"333"}}"#;
    let v = get(json, "..number");
    assert_eq!(br#"["333","111","222"]"#.to_vec(), v.raw().to_vec());
}
