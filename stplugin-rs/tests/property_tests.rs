use proptest::prelude::*;
use stplugin::index::{from_host, host_index, translate};
use stplugin::missing::{from_external, is_missing, to_external, MISSING_THRESHOLD};
use stplugin::{Axis, ErrorKind, MissingValue, NameTrie, SetValue, Value};

fn band_bits() -> impl Strategy<Value = u64> {
    let lo = MISSING_THRESHOLD.to_bits() + 1;
    let hi = f64::INFINITY.to_bits();
    prop_oneof![
        9 => lo..=hi,
        1 => Just(f64::NEG_INFINITY.to_bits()),
    ]
}

proptest! {
    /// Every band double survives host → script → host bit-for-bit.
    #[test]
    fn missing_round_trip(bits in band_bits()) {
        let x = f64::from_bits(bits);
        prop_assert!(is_missing(x));
        let v = to_external(x);
        prop_assert!(matches!(v, Value::Missing(_)));
        let back = match v {
            Value::Missing(mv) => from_external(SetValue::Missing(mv)),
            other => return Err(TestCaseError::fail(format!("not missing: {other:?}"))),
        };
        prop_assert_eq!(back.to_bits(), bits);
    }

    /// Ordinary numbers pass through untouched.
    #[test]
    fn numbers_pass_through(x in -1e300f64..1e300f64) {
        prop_assert_eq!(to_external(x), Value::Number(x));
        prop_assert_eq!(from_external(SetValue::Number(x)), x);
    }

    #[test]
    fn sentinels_classify_to_themselves(k in 0u8..27) {
        let mv = MissingValue::new(k).unwrap();
        prop_assert_eq!(MissingValue::classify(mv.raw()), mv);
        prop_assert_eq!(mv.code(), Some(k));
    }
}

proptest! {
    /// Every index in [-N, N) maps into [0, N), and i and i - N land on the
    /// same element.
    #[test]
    fn index_round_trip(n in 1usize..10_000, seed in any::<u64>()) {
        let i = (seed % n as u64) as i64;
        let pos = translate(i, n, Axis::Observation).unwrap();
        let neg = translate(i - n as i64, n, Axis::Observation).unwrap();
        prop_assert_eq!(pos, i as usize);
        prop_assert_eq!(neg, pos);
        prop_assert_eq!(from_host(host_index(pos)), pos);
    }

    #[test]
    fn index_bounds(n in 0usize..10_000, over in 0i64..1000) {
        let n_i = n as i64;
        let hi = translate(n_i + over, n, Axis::Variable).unwrap_err();
        prop_assert_eq!(hi.kind(), ErrorKind::OutOfRange);
        let lo = translate(-n_i - 1 - over, n, Axis::Variable).unwrap_err();
        prop_assert_eq!(lo.kind(), ErrorKind::OutOfRange);
    }
}

proptest! {
    /// Every inserted name resolves exactly to itself, with or without
    /// abbreviation.
    #[test]
    fn exact_names_resolve(
        names in prop::collection::hash_set("[_a-zA-Z][_a-zA-Z0-9]{0,8}", 1..40),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let trie: NameTrie = names.iter().map(String::as_str).collect();
        for (i, name) in names.iter().enumerate() {
            prop_assert_eq!(trie.resolve(name, true).unwrap(), i);
            prop_assert_eq!(trie.resolve(name, false).unwrap(), i);
        }
    }

    /// A prefix that only one name has resolves to that name; a prefix that
    /// several names share (and none equals) is ambiguous.
    #[test]
    fn prefixes_resolve_or_are_ambiguous(
        names in prop::collection::hash_set("[a-c]{1,5}", 1..20),
        query in "[a-c]{1,4}",
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let trie: NameTrie = names.iter().map(String::as_str).collect();
        let sharing: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with(query.as_str()))
            .map(|(i, _)| i)
            .collect();
        let exact = names.iter().position(|n| *n == query);
        let got = trie.resolve(&query, true);
        match (exact, sharing.len()) {
            (Some(i), _) => prop_assert_eq!(got.unwrap(), i),
            (None, 0) => prop_assert_eq!(got.unwrap_err().kind(), ErrorKind::NotFound),
            (None, 1) => prop_assert_eq!(got.unwrap(), sharing[0]),
            (None, _) => prop_assert_eq!(got.unwrap_err().kind(), ErrorKind::AmbiguousAbbreviation),
        }
    }

    #[test]
    fn resolver_never_panics(query in "\\PC*") {
        let trie: NameTrie = ["income", "incomeSq", "id"].into_iter().collect();
        let _ = trie.resolve(&query, true);
    }
}
