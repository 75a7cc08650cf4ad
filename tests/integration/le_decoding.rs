//! Property tests for little-endian element decoding

use proptest::prelude::*;
use starkline::proto::FieldElement;
use starkline::{u64_from_le_bytes, MalformedInput};

proptest! {
    #[test]
    fn test_any_u64_survives_le_bytes(value in any::<u64>()) {
        prop_assert_eq!(u64_from_le_bytes(&value.to_le_bytes()).unwrap(), value);
        prop_assert_eq!(u64::try_from(&FieldElement::from(value)).unwrap(), value);
    }

    #[test]
    fn test_wrong_lengths_are_rejected(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        prop_assume!(bytes.len() != 8);
        prop_assert_eq!(
            u64_from_le_bytes(&bytes),
            Err(MalformedInput::InvalidLength { expected: 8, actual: bytes.len() })
        );
    }
}

#[test]
fn test_seven_and_nine_bytes() {
    assert_eq!(
        u64_from_le_bytes(&[1; 7]),
        Err(MalformedInput::InvalidLength {
            expected: 8,
            actual: 7
        })
    );
    assert_eq!(
        u64_from_le_bytes(&[1; 9]),
        Err(MalformedInput::InvalidLength {
            expected: 8,
            actual: 9
        })
    );
}
