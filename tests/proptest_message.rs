use proptest::prelude::*;

use leaseline::message::parse_lease_list;
use leaseline::{Lease, Request, Response};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    #[test]
    fn request_parse_never_panics_on_arbitrary_text(text: String) {
        let _ = Request::parse(&text);
    }

    #[test]
    fn response_parse_never_panics_on_arbitrary_text(text: String) {
        let _ = Response::parse(&text);
    }

    #[test]
    fn lease_list_parse_never_panics_on_arbitrary_text(text: String) {
        let _ = parse_lease_list(&text);
    }

    #[test]
    fn request_parse_never_panics_on_known_token_with_random_fields(
        token in prop::sample::select(vec!["DISCOVER", "REQUEST", "RENEW", "RELEASE", "LIST"]),
        lines in prop::collection::vec("[^\r\n]*", 0..6),
    ) {
        let text = format!("{}\n{}", token, lines.join("\n"));
        let _ = Request::parse(&text);
    }

    #[test]
    fn request_parse_never_panics_on_random_separators(
        body in prop::collection::vec(any::<char>(), 0..256),
    ) {
        let mut text = "REQUEST\n".to_string();
        text.extend(body);
        let _ = Request::parse(&text);
    }

    #[test]
    fn request_roundtrips_through_encoding(
        mac in "[0-9a-f]{2}(:[0-9a-f]{2}){5}",
        octets in any::<[u8; 4]>(),
        timestamp in any::<i64>(),
    ) {
        let original = Request::Discover {
            mac_address: mac,
            ip_address: octets.into(),
            timestamp,
        };
        let parsed = Request::parse(&original.encode()).unwrap();
        prop_assert_eq!(original, parsed);
    }

    #[test]
    fn response_roundtrips_through_encoding(
        mac in "[0-9a-f]{2}(:[0-9a-f]{2}){5}",
        octets in any::<[u8; 4]>(),
        timestamp in any::<i64>(),
        acknowledge in any::<bool>(),
    ) {
        let original = if acknowledge {
            Response::Acknowledge {
                mac_address: mac,
                ip_address: octets.into(),
                timestamp,
            }
        } else {
            Response::Offer {
                mac_address: mac,
                ip_address: octets.into(),
                timestamp,
            }
        };
        let parsed = Response::parse(&original.encode()).unwrap();
        prop_assert_eq!(original, parsed);
    }

    #[test]
    fn lease_list_roundtrips_through_encoding(
        entries in prop::collection::vec(
            (
                any::<u64>(),
                "[0-9a-f]{2}(:[0-9a-f]{2}){5}",
                any::<[u8; 4]>(),
                any::<i64>(),
                any::<bool>(),
            ),
            0..16,
        ),
    ) {
        let leases: Vec<Lease> = entries
            .into_iter()
            .map(|(sequence, mac_address, octets, expires_at, acknowledged)| Lease {
                sequence,
                mac_address,
                ip_address: octets.into(),
                expires_at,
                acknowledged,
            })
            .collect();

        let encoded = Response::LeaseList(leases.clone()).encode();
        let parsed = parse_lease_list(&encoded).unwrap();
        prop_assert_eq!(leases, parsed);
    }
}
