// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Pattern Compilation

use eventbridge_typed::pattern::{compute_pattern, PatternTarget};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct Target {
    source: String,
    detail_type: String,
}

impl PatternTarget for Target {
    fn source(&self) -> &str {
        &self.source
    }

    fn detail_type(&self) -> &str {
        &self.detail_type
    }

    fn schema_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

fn targets() -> impl Strategy<Value = Vec<Target>> {
    prop::collection::vec(("[a-c]", "[A-Z][a-z]{0,6}"), 1..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(source, detail_type)| Target { source, detail_type })
            .collect()
    })
}

proptest! {
    /// Property: sources are de-duplicated, detail-types kept one per target
    #[test]
    fn prop_sources_unique_detail_types_concatenated(targets in targets()) {
        let refs: Vec<&dyn PatternTarget> = targets.iter().map(|t| t as &dyn PatternTarget).collect();
        let pattern = compute_pattern(&refs, None).unwrap();

        let unique: BTreeSet<&String> = pattern.source.iter().collect();
        prop_assert_eq!(unique.len(), pattern.source.len());
        prop_assert_eq!(pattern.detail_type.len(), targets.len());
        prop_assert!(!pattern.source.is_empty());

        for target in &targets {
            prop_assert!(pattern.source.contains(&target.source));
        }
    }
}
