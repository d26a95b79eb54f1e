//! Property tests for the engine's quantified invariants.
use dotjson_lib::{delete, get, increment, pretty, set, ugly, valid, PrettyOptions, SetValue};
use proptest::prelude::*;

/// Generates the text of an arbitrary JSON value, compact (no insignificant
/// whitespace) and with unique object keys.
fn json_text() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("null".to_owned()),
        any::<bool>().prop_map(|b| b.to_string()),
        any::<i64>().prop_map(|n| n.to_string()),
        "[a-zA-Z0-9 _.-]{0,12}".prop_map(|s| format!("\"{s}\"")),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6)
                .prop_map(|vals| format!("[{}]", vals.join(","))),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(|pairs| {
                let members: Vec<String> = pairs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (k, v))| format!("\"{k}{i}\":{v}"))
                    .collect();
                format!("{{{}}}", members.join(","))
            }),
        ]
    })
}

/// Scalar arrays, the domain of the order-sensitive modifiers.
fn scalar_array_text() -> impl Strategy<Value = String> {
    let scalar = prop_oneof![
        Just("null".to_owned()),
        any::<bool>().prop_map(|b| b.to_string()),
        any::<i32>().prop_map(|n| n.to_string()),
        "[a-z]{0,6}".prop_map(|s| format!("\"{s}\"")),
    ];
    prop::collection::vec(scalar, 0..12).prop_map(|vals| format!("[{}]", vals.join(",")))
}

proptest! {
    #[test]
    fn generated_documents_are_valid(doc in json_text()) {
        prop_assert!(valid(doc.as_bytes()));
    }

    #[test]
    fn reformatting_preserves_validity(doc in json_text()) {
        let b = doc.as_bytes();
        let uglied = ugly(b).unwrap();
        prop_assert!(valid(&uglied));
        let prettied = pretty(b, &PrettyOptions::default()).unwrap();
        prop_assert!(valid(&prettied));
        // the generated text is already compact, so ugly is the identity
        // and un-prettifying returns to it
        prop_assert_eq!(b.to_vec(), uglied);
        prop_assert_eq!(doc.as_bytes().to_vec(), ugly(&prettied).unwrap());
    }

    #[test]
    fn lookups_are_insensitive_to_formatting(doc in json_text()) {
        let wrapped = format!(r#"{{"outer":{doc},"sibling":1}}"#);
        let prettied = pretty(wrapped.as_bytes(), &PrettyOptions::default()).unwrap();
        let direct = get(wrapped.as_bytes(), "outer");
        let reformatted = get(&prettied, "outer");
        prop_assert_eq!(direct.kind(), reformatted.kind());
        prop_assert_eq!(
            ugly(direct.raw()).unwrap(),
            ugly(reformatted.raw()).unwrap()
        );
    }

    #[test]
    fn get_after_set_returns_the_value(doc in json_text(), n in any::<i64>()) {
        let base = format!(r#"{{"data":{doc}}}"#);
        let out = set(base.as_bytes(), "data.fresh.leaf", SetValue::Int(n));
        // objects gain the member, null parents are autovivified over,
        // any other kind is a type mismatch
        if doc.starts_with('{') || doc == "null" {
            let out = out.unwrap();
            prop_assert!(valid(&out));
            prop_assert_eq!(n, get(&out, "data.fresh.leaf").int());
        } else {
            prop_assert!(out.is_err());
        }
    }

    #[test]
    fn same_length_replacement_preserves_buffer_length(a in 10_000_i64..99_999, b in 10_000_i64..99_999) {
        let json = format!(r#"{{"n":{a}}}"#);
        let out = set(json.as_bytes(), "n", SetValue::Int(b)).unwrap();
        prop_assert_eq!(json.len(), out.len());
        prop_assert_eq!(b, get(&out, "n").int());
    }

    #[test]
    fn delete_removes_only_the_target(doc in json_text()) {
        let wrapped = format!(r#"{{"gone":{doc},"kept":{doc}}}"#);
        let out = delete(wrapped.as_bytes(), "gone").unwrap();
        prop_assert!(valid(&out));
        prop_assert!(!get(&out, "gone").exists());
        prop_assert_eq!(
            get(wrapped.as_bytes(), "kept").raw().to_vec(),
            get(&out, "kept").raw().to_vec()
        );
    }

    #[test]
    fn increment_round_trips(n in -1_000_000_i64..1_000_000, d in -10_000_i64..10_000) {
        let json = format!(r#"{{"n":{n}}}"#);
        let up = increment(json.as_bytes(), "n", d as f64).unwrap();
        prop_assert_eq!(n + d, get(&up, "n").int());
        let back = increment(&up, "n", -d as f64).unwrap();
        prop_assert_eq!(n, get(&back, "n").int());
    }

    #[test]
    fn reverse_twice_is_identity(arr in scalar_array_text()) {
        let twice = get(arr.as_bytes(), "@reverse|@reverse");
        prop_assert_eq!(arr.as_bytes().to_vec(), twice.raw().to_vec());
    }

    #[test]
    fn sort_is_idempotent(arr in scalar_array_text()) {
        let once = get(arr.as_bytes(), "@sort");
        let twice = get(arr.as_bytes(), "@sort|@sort");
        prop_assert_eq!(once.raw().to_vec(), twice.raw().to_vec());
    }

    #[test]
    fn distinct_is_idempotent(arr in scalar_array_text()) {
        let once = get(arr.as_bytes(), "@distinct");
        let twice = get(arr.as_bytes(), "@distinct|@distinct");
        prop_assert_eq!(once.raw().to_vec(), twice.raw().to_vec());
    }

    #[test]
    fn projection_matches_element_wise_lookup(docs in prop::collection::vec(json_text(), 0..6)) {
        let arr = format!("[{}]", docs.join(","));
        let projected = get(arr.as_bytes(), "#.kept0");
        let mut by_hand = Vec::new();
        for doc in &docs {
            let v = get(doc.as_bytes(), "kept0");
            if v.exists() {
                by_hand.push(String::from_utf8(v.raw().to_vec()).unwrap());
            }
        }
        let expected = format!("[{}]", by_hand.join(","));
        prop_assert_eq!(expected.as_bytes().to_vec(), projected.raw().to_vec());
    }
}
