//! Assertion functions for decoded sequences.

use crate::seq::DataSeq;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
///
/// ```
/// use lineio::testing::assert_collections_equal;
///
/// assert_collections_equal(&[1, 2, 3], &[1, 2, 3]);
/// ```
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}"
        );
    }
}

/// Assert that two collections hold the same elements, ignoring order.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    let actual_set: HashSet<_> = actual.iter().collect();
    let expected_set: HashSet<_> = expected.iter().collect();
    if actual_set != expected_set {
        let missing: Vec<_> = expected_set.difference(&actual_set).collect();
        let extra: Vec<_> = actual_set.difference(&expected_set).collect();
        panic!("Collection content mismatch:\n  Missing elements: {missing:?}\n  Extra elements: {extra:?}");
    }
}

/// Drain `seq` and compare it with `expected` in order.
///
/// # Panics
///
/// Panics if the sequence fails or differs from `expected`.
pub fn assert_seq_equal<T: Debug + PartialEq + 'static>(seq: DataSeq<T>, expected: &[T]) {
    match seq.to_vec() {
        Ok(actual) => assert_collections_equal(&actual, expected),
        Err(e) => panic!("sequence failed: {e:#}"),
    }
}

/// Assert that every element satisfies `predicate`.
///
/// # Panics
///
/// Panics with the first failing element.
pub fn assert_all<T: Debug, F: Fn(&T) -> bool>(items: &[T], predicate: F) {
    if let Some((i, item)) = items.iter().enumerate().find(|(_, item)| !predicate(item)) {
        panic!("Element at index {i} does not satisfy predicate: {item:?}");
    }
}
