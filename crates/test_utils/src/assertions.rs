//! Custom Test Assertions
//!
//! Provides assertion helpers for CDR batches that give more meaningful
//! error messages than standard assertions.

use domain_charging::{CdrBatch, ChargeContext, ChargeDetailRecord};

/// Asserts that correlation numbers strictly increase in record order
pub fn assert_strictly_increasing(records: &[ChargeDetailRecord]) {
    for pair in records.windows(2) {
        assert!(
            pair[0].correlation_number() < pair[1].correlation_number(),
            "Correlation numbers not strictly increasing: {} followed by {}",
            pair[0].correlation(),
            pair[1].correlation()
        );
    }
}

/// Asserts that the records are numbered `first, first + 1, ...` without gaps
pub fn assert_contiguous_from(records: &[ChargeDetailRecord], first: u64) {
    let actual: Vec<u64> = records.iter().map(|r| r.correlation_number()).collect();
    let expected: Vec<u64> = (first..first + records.len() as u64).collect();
    assert_eq!(
        actual, expected,
        "Expected contiguous correlation numbers starting at {}",
        first
    );
}

/// Asserts that every record carries the given context verbatim
pub fn assert_records_match_context(records: &[ChargeDetailRecord], context: &ChargeContext) {
    for record in records {
        assert_eq!(record.provider(), context.provider(), "provider mismatch");
        assert_eq!(record.offering(), context.offering(), "offering mismatch");
        assert_eq!(record.customer(), context.customer(), "customer mismatch");
        assert_eq!(record.product_class(), context.product_class(), "product class mismatch");
        assert_eq!(record.cost_currency(), context.currency(), "currency mismatch");
        assert_eq!(record.order(), context.order(), "order mismatch");
    }
}

/// Asserts that no correlation number appears in more than one batch
pub fn assert_batches_disjoint(batches: &[CdrBatch]) {
    let mut seen = std::collections::HashSet::new();
    for batch in batches {
        for record in batch.records() {
            assert!(
                seen.insert(record.correlation_number()),
                "Correlation number {} issued twice",
                record.correlation()
            );
        }
    }
}
