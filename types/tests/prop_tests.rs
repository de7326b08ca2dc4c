use proptest::prelude::*;

use reckon_types::{CanonicalStatus, Email, EventId, ParticipantKey, Timestamp};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(
        base in 1u64..1_000_000,
        deficit in 1u64..1_000_000,
    ) {
        let later = Timestamp::new(base + deficit);
        let earlier = Timestamp::new(base);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
        prop_assert_eq!(earlier.elapsed_since(later), deficit);
    }

    /// Email normalization is idempotent and case-insensitive.
    #[test]
    fn email_normalization_is_idempotent(
        local in "[A-Za-z0-9._+-]{1,16}",
        domain in "[A-Za-z0-9-]{1,12}\\.[A-Za-z]{2,4}",
    ) {
        let raw = format!("{local}@{domain}");
        let once = Email::parse(&raw).unwrap();
        let twice = Email::parse(once.as_str()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, Email::parse(&raw.to_uppercase()).unwrap());
    }

    /// ParticipantKey survives a bincode round trip (store encoding).
    #[test]
    fn participant_key_bincode(local in "[a-z]{1,10}", event in "[a-z0-9-]{1,20}") {
        let key = ParticipantKey::new(
            Email::parse(&format!("{local}@example.org")).unwrap(),
            EventId::new(event).unwrap(),
        );
        let encoded = bincode::serialize(&key).unwrap();
        let decoded: ParticipantKey = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, key);
    }

    /// Only the four exact spellings parse as a canonical status.
    #[test]
    fn arbitrary_strings_rarely_parse_as_status(s in "\\PC{0,24}") {
        let parsed = s.parse::<CanonicalStatus>();
        prop_assert_eq!(parsed.is_ok(), CanonicalStatus::ALL.iter().any(|st| st.as_str() == s));
    }
}
