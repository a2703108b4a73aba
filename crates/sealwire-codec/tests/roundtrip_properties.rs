//! Property tests: every stage combination is lossless, and the encryption
//! frame flag always reflects the threshold.

use proptest::prelude::*;
use sealwire_codec::*;
use sealwire_types::{CacheConfig, CompressionConfig, EncryptionPolicy, constants};

const KEY: [u8; 32] = [0x42; 32];

fn json() -> PipelineBuilder<JsonSerializer> {
    PipelineBuilder::json(&CacheConfig::default())
}

proptest! {
    /// Hex decoding inverts encoding, whatever the case of the text.
    #[test]
    fn prop_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let text = HexEncoder.encode(&data);
        prop_assert_eq!(text.len(), data.len() * 2);
        prop_assert!(!text.chars().any(|c| c.is_ascii_lowercase()));
        prop_assert_eq!(HexEncoder.decode(&text).unwrap(), data.clone());
        prop_assert_eq!(HexEncoder.decode(&text.to_ascii_lowercase()).unwrap(), data);
    }

    /// Any odd-length input is rejected.
    #[test]
    fn prop_hex_odd_length_rejected(text in "([0-9A-F]{2}){0,32}") {
        let odd = format!("{text}0");
        prop_assert!(HexEncoder.decode(&odd).is_err());
    }

    #[test]
    fn prop_json_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let s = json().build();
        let back: Vec<u8> = s.deserialize(&s.serialize(&data).unwrap()).unwrap();
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_compressed_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..256),
        level in 0u32..=9,
    ) {
        let s = json().compressed(CompressionConfig::at_level(level)).build();
        let back: Vec<u8> = s.deserialize(&s.serialize(&data).unwrap()).unwrap();
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_encrypted_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..256),
        threshold in 0usize..1024,
    ) {
        let s = json()
            .encrypted(AesGcmEncryptor::new(&KEY), EncryptionPolicy::skip_below(threshold))
            .build();
        let back: Vec<u8> = s.deserialize(&s.serialize(&data).unwrap()).unwrap();
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_full_stack_roundtrip(text in ".{0,200}") {
        let s = json()
            .compressed(CompressionConfig::default())
            .encrypted(AesGcmEncryptor::new(&KEY), EncryptionPolicy::skip_below(64))
            .hex_encoded()
            .build();
        let back: String = s.deserialize(&s.serialize(&text).unwrap()).unwrap();
        prop_assert_eq!(back, text);
    }

    /// The flag byte is 0x00 exactly when the plaintext is under the threshold.
    #[test]
    fn prop_flag_matches_threshold(
        data in prop::collection::vec(any::<u8>(), 0..128),
        threshold in 0usize..512,
    ) {
        let plain_len = JsonSerializer::new().serialize(&data).unwrap().len();
        let s = json()
            .encrypted(AesGcmEncryptor::new(&KEY), EncryptionPolicy::skip_below(threshold))
            .build();
        let bytes = s.serialize(&data).unwrap();

        let expected = if plain_len < threshold {
            constants::FRAME_FLAG_PLAIN
        } else {
            constants::FRAME_FLAG_ENCRYPTED
        };
        prop_assert_eq!(bytes[0], expected);
    }
}
