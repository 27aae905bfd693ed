//! Property tests for the value codec and equality.

use proptest::prelude::*;
use storesync_testkit::generators::value_strategy;
use storesync_value::{decode, encode, Value};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn codec_round_trip(a in value_strategy()) {
        let bytes = encode(&a).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), a);
    }

    #[test]
    fn decoded_copies_are_equal_but_not_shared(a in value_strategy()) {
        let copy = decode(&encode(&a).unwrap()).unwrap();
        prop_assert_eq!(&copy, &a);
        if matches!(a, Value::Object(_) | Value::Array(_)) {
            prop_assert!(!copy.same_ref(&a));
        }
    }

    #[test]
    fn clones_share_identity(a in value_strategy()) {
        let copy = a.clone();
        prop_assert_eq!(&copy, &a);
        if a.container_id().is_some() {
            prop_assert!(copy.same_ref(&a));
        }
    }
}
