// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Input-Transformer Inference

use eventbridge_typed::transform::infer_transformer;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;

fn schema() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z_]{0,8}", 1..8)
        .prop_map(|names| names.into_iter().collect())
}

proptest! {
    /// Property: the path map holds exactly the fields the transform read
    #[test]
    fn prop_paths_match_fields_read(
        (fields, picks) in schema().prop_flat_map(|fields| {
            let len = fields.len();
            (Just(fields), prop::collection::vec(0..len, 0..12))
        })
    ) {
        let transformer = infer_transformer(&fields, |props, _| {
            Value::Array(picks.iter().map(|&i| props.get(&fields[i]).into()).collect())
        })
        .unwrap();

        let read: BTreeSet<&String> = picks.iter().map(|&i| &fields[i]).collect();
        let mapped: BTreeSet<&String> = transformer.input_paths_map.keys().collect();
        prop_assert_eq!(mapped, read);

        for (key, path) in &transformer.input_paths_map {
            prop_assert_eq!(path, &format!("$.detail.properties.{}", key));
        }
        prop_assert!(!transformer.input_template.contains("@@ebt-"));
    }
}
