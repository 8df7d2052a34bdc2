//! Network value resolution.
//!
//! The client knows how many agents it assumes to be honest. The network
//! value is the one value reported exactly that many times. If no value,
//! or more than one value, has that multiplicity the round is undecided.
//!
//! Liars are free to pick any values, including the same one. If they all
//! agree on a value and there are exactly as many of them as honest agents,
//! the round is undecided. That is the adversarial limit of the rule and
//! there is nothing in the protocol to break the tie.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of resolving one query round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Exactly one value occurred at the expected frequency.
    Decided(i32),

    /// Zero or several values occurred at the expected frequency.
    Undecided,
}

impl Resolution {
    /// Returns the resolved value, if any.
    pub fn value(&self) -> Option<i32> {
        match self {
            Resolution::Decided(value) => Some(*value),
            Resolution::Undecided => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Decided(value) => write!(f, "decided({})", value),
            Resolution::Undecided => write!(f, "undecided"),
        }
    }
}

/// Finds the unique value reported exactly `expected_frequency` times.
///
/// Runs in linear time. Every counted value is inspected, so a second
/// match is always detected whatever order the map yields them in.
pub fn find_network_value(values: &[i32], expected_frequency: usize) -> Resolution {
    let mut frequencies: HashMap<i32, usize> = HashMap::with_capacity(values.len());
    for value in values {
        *frequencies.entry(*value).or_insert(0) += 1;
    }

    let mut candidates = frequencies
        .into_iter()
        .filter(|(_, count)| *count == expected_frequency)
        .map(|(value, _)| value);

    match (candidates.next(), candidates.next()) {
        (Some(value), None) => Resolution::Decided(value),
        _ => Resolution::Undecided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_value_at_frequency() {
        assert_eq!(find_network_value(&[100, 4, 7, 9, 100], 2), Resolution::Decided(100));
        assert_eq!(find_network_value(&[1, 1, 1, 2], 3), Resolution::Decided(1));
    }

    #[test]
    fn test_tie_is_undecided() {
        // 100 and 7 both appear twice
        assert_eq!(find_network_value(&[100, 4, 7, 7, 9, 100], 2), Resolution::Undecided);
    }

    #[test]
    fn test_no_value_at_frequency() {
        assert_eq!(find_network_value(&[1, 2, 3], 2), Resolution::Undecided);
        assert_eq!(find_network_value(&[], 1), Resolution::Undecided);
        // More occurrences than expected is not a match either
        assert_eq!(find_network_value(&[5, 5, 5], 2), Resolution::Undecided);
    }

    #[test]
    fn test_colluding_liars_defeat_resolution() {
        // 3 honest agents say 10, 3 liars agree on 99
        let values = [10, 99, 10, 99, 10, 99];
        assert_eq!(find_network_value(&values, 3), Resolution::Undecided);
    }

    #[test]
    fn test_resolution_accessors() {
        assert_eq!(Resolution::Decided(4).value(), Some(4));
        assert_eq!(Resolution::Undecided.value(), None);
        assert_eq!(Resolution::Undecided.to_string(), "undecided");
    }

    #[test]
    fn test_resolution_json_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&Resolution::Decided(9)).unwrap(),
            r#"{"decided":9}"#
        );
        assert_eq!(
            serde_json::to_string(&Resolution::Undecided).unwrap(),
            r#""undecided""#
        );
        let back: Resolution = serde_json::from_str(r#"{"decided":-3}"#).unwrap();
        assert_eq!(back, Resolution::Decided(-3));
    }

    proptest! {
        #[test]
        fn prop_unique_value_at_frequency_is_found(
            honest in any::<i32>(),
            frequency in 1usize..8,
            noise in prop::collection::vec(any::<i32>(), 0..20),
        ) {
            // Noise values stop one short of `frequency`
            let mut values = vec![honest; frequency];
            let mut seen: HashMap<i32, usize> = HashMap::new();
            for v in noise {
                if v == honest {
                    continue;
                }
                let count = seen.entry(v).or_insert(0);
                if *count + 1 == frequency {
                    continue;
                }
                *count += 1;
                values.push(v);
            }
            prop_assert_eq!(find_network_value(&values, frequency), Resolution::Decided(honest));
        }

        #[test]
        fn prop_two_values_at_frequency_is_undecided(
            a in any::<i32>(),
            b in any::<i32>(),
            frequency in 1usize..6,
        ) {
            prop_assume!(a != b);
            let mut values = vec![a; frequency];
            values.extend(std::iter::repeat(b).take(frequency));
            prop_assert_eq!(find_network_value(&values, frequency), Resolution::Undecided);
        }

        #[test]
        fn prop_resolution_is_idempotent(
            values in prop::collection::vec(0i32..5, 0..30),
            frequency in 1usize..6,
        ) {
            let first = find_network_value(&values, frequency);
            let second = find_network_value(&values, frequency);
            prop_assert_eq!(first, second);
        }
    }
}
