//! Protocol message parsing and encoding.
//!
//! Messages are UTF-8 text, one per datagram. The first line is the message
//! type token; each following line is a `Label: value` field whose value is
//! everything after the first colon with surrounding whitespace stripped.
//! Fields are positional — label text is carried for readability but never
//! validated.
//!
//! # Message Grammar
//!
//! ```text
//! DISCOVER                      OFFER
//! MAC Address: <mac>            MAC Address: <mac>
//! IP Address: <ip>              IP Address: <ip>
//! Time Stamp: <unix secs>       Time Stamp: <unix secs>
//!
//! REQUEST / RENEW / RELEASE     ACKNOWLEDGE
//!   (same three fields)           (same three fields)
//!
//! LIST                          DECLINE
//!   (no body)                   <free-text reason>
//!
//! List reply: one line per lease
//! mac: <m> | ip: <ip> | num: <n> | time: <ts> | ack: <bool>
//! ```
//!
//! Both directions are implemented: the server parses requests and encodes
//! responses, the one-shot client helpers do the reverse.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::lease::Lease;

/// Maximum datagram the protocol produces or accepts.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// First contact: the client asks for an address.
    Discover {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// The client accepts previously offered lease terms.
    Request {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// The client asks to extend its lease.
    Renew {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// The client gives up its lease. Never answered.
    Release {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// Administrative dump of the lease table.
    List,
}

impl Request {
    /// Parses a request message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedMessage`] for an unknown type token and
    /// [`Error::InvalidMessage`] for a recognized token with missing or
    /// unparseable fields. Extra trailing lines are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let kind = lines
            .next()
            .ok_or_else(|| Error::InvalidMessage("empty message".to_string()))?
            .trim();

        match kind {
            "DISCOVER" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Discover {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "REQUEST" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Request {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "RENEW" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Renew {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "RELEASE" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Release {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "LIST" => Ok(Self::List),
            other => Err(Error::UnrecognizedMessage(other.to_string())),
        }
    }

    /// Encodes the request in wire form.
    pub fn encode(&self) -> String {
        match self {
            Self::Discover {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("DISCOVER", mac_address, *ip_address, *timestamp),
            Self::Request {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("REQUEST", mac_address, *ip_address, *timestamp),
            Self::Renew {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("RENEW", mac_address, *ip_address, *timestamp),
            Self::Release {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("RELEASE", mac_address, *ip_address, *timestamp),
            Self::List => "LIST\n".to_string(),
        }
    }

    /// The message type token, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discover { .. } => "DISCOVER",
            Self::Request { .. } => "REQUEST",
            Self::Renew { .. } => "RENEW",
            Self::Release { .. } => "RELEASE",
            Self::List => "LIST",
        }
    }
}

/// A server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Proposed lease terms.
    Offer {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// Confirmed lease terms.
    Acknowledge {
        mac_address: String,
        ip_address: Ipv4Addr,
        timestamp: i64,
    },
    /// Rejection with a free-text reason.
    Decline { reason: String },
    /// Reply to LIST: the full lease table.
    LeaseList(Vec<Lease>),
}

impl Response {
    /// An OFFER carrying the lease's terms.
    pub fn offer(lease: &Lease) -> Self {
        Self::Offer {
            mac_address: lease.mac_address.clone(),
            ip_address: lease.ip_address,
            timestamp: lease.expires_at,
        }
    }

    /// An ACKNOWLEDGE carrying the lease's terms.
    pub fn acknowledge(lease: &Lease) -> Self {
        Self::Acknowledge {
            mac_address: lease.mac_address.clone(),
            ip_address: lease.ip_address,
            timestamp: lease.expires_at,
        }
    }

    /// Encodes the response in wire form.
    pub fn encode(&self) -> String {
        match self {
            Self::Offer {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("OFFER", mac_address, *ip_address, *timestamp),
            Self::Acknowledge {
                mac_address,
                ip_address,
                timestamp,
            } => encode_fields("ACKNOWLEDGE", mac_address, *ip_address, *timestamp),
            Self::Decline { reason } => format!("DECLINE\n{reason}\n"),
            Self::LeaseList(leases) => leases
                .iter()
                .map(|lease| {
                    format!(
                        "mac: {} | ip: {} | num: {} | time: {} | ack: {}\n",
                        lease.mac_address,
                        lease.ip_address,
                        lease.sequence,
                        lease.expires_at,
                        lease.acknowledged
                    )
                })
                .collect(),
        }
    }

    /// Parses a typed reply (OFFER, ACKNOWLEDGE, or DECLINE).
    ///
    /// List replies carry no type token; use [`parse_lease_list`] for those.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let kind = lines
            .next()
            .ok_or_else(|| Error::InvalidMessage("empty message".to_string()))?
            .trim();

        match kind {
            "OFFER" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Offer {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "ACKNOWLEDGE" => {
                let (mac_address, ip_address, timestamp) = parse_fields(lines)?;
                Ok(Self::Acknowledge {
                    mac_address,
                    ip_address,
                    timestamp,
                })
            }
            "DECLINE" => Ok(Self::Decline {
                reason: lines.next().unwrap_or("").trim().to_string(),
            }),
            other => Err(Error::UnrecognizedMessage(other.to_string())),
        }
    }
}

/// Parses a LIST reply into leases. An empty reply is an empty table.
pub fn parse_lease_list(text: &str) -> Result<Vec<Lease>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_lease_line)
        .collect()
}

fn parse_lease_line(line: &str) -> Result<Lease> {
    fn value<'a>(part: Option<&'a str>, line: &str) -> Result<&'a str> {
        let part =
            part.ok_or_else(|| Error::InvalidMessage(format!("short list entry: {line:?}")))?;
        let (_, value) = part.split_once(':').ok_or_else(|| {
            Error::InvalidMessage(format!("missing colon in list entry: {line:?}"))
        })?;
        Ok(value.trim())
    }

    let mut parts = line.split('|');
    let mac_address = value(parts.next(), line)?.to_string();
    let ip_address = parse_number(value(parts.next(), line)?, "ip")?;
    let sequence = parse_number(value(parts.next(), line)?, "num")?;
    let expires_at = parse_number(value(parts.next(), line)?, "time")?;
    let acknowledged = parse_number(value(parts.next(), line)?, "ack")?;

    Ok(Lease {
        sequence,
        mac_address,
        ip_address,
        expires_at,
        acknowledged,
    })
}

fn field_value<'a>(lines: &mut std::str::Lines<'a>, label: &str) -> Result<&'a str> {
    let line = lines
        .next()
        .ok_or_else(|| Error::InvalidMessage(format!("missing {label} line")))?;
    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| Error::InvalidMessage(format!("missing colon in {label} line")))?;
    Ok(value.trim())
}

fn parse_fields(mut lines: std::str::Lines<'_>) -> Result<(String, Ipv4Addr, i64)> {
    let mac_address = field_value(&mut lines, "MAC address")?;
    if mac_address.is_empty() {
        return Err(Error::InvalidMessage("empty MAC address".to_string()));
    }

    let ip_address = parse_number(field_value(&mut lines, "IP address")?, "IP address")?;
    let timestamp = parse_number(field_value(&mut lines, "time stamp")?, "time stamp")?;

    Ok((mac_address.to_string(), ip_address, timestamp))
}

fn parse_number<T: std::str::FromStr>(text: &str, label: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidMessage(format!("bad {label}: {text:?}")))
}

fn encode_fields(kind: &str, mac_address: &str, ip_address: Ipv4Addr, timestamp: i64) -> String {
    format!("{kind}\nMAC Address: {mac_address}\nIP Address: {ip_address}\nTime Stamp: {timestamp}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discover() {
        let text = "DISCOVER\nMAC Address: aa:bb:cc:dd:ee:ff\nIP Address: 0.0.0.0\nTime Stamp: 0\n";
        let request = Request::parse(text).unwrap();
        assert_eq!(
            request,
            Request::Discover {
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                ip_address: Ipv4Addr::UNSPECIFIED,
                timestamp: 0,
            }
        );
    }

    #[test]
    fn test_parse_request_with_lease_terms() {
        let text =
            "REQUEST\nMAC Address: aa:bb:cc:dd:ee:ff\nIP Address: 192.168.45.3\nTime Stamp: 1700000060\n";
        let request = Request::parse(text).unwrap();
        assert_eq!(
            request,
            Request::Request {
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                ip_address: Ipv4Addr::new(192, 168, 45, 3),
                timestamp: 1_700_000_060,
            }
        );
    }

    #[test]
    fn test_parse_list_has_no_body() {
        assert_eq!(Request::parse("LIST").unwrap(), Request::List);
        assert_eq!(Request::parse("LIST\n").unwrap(), Request::List);
    }

    #[test]
    fn test_field_labels_are_ignored() {
        let text = "RENEW\nwhatever: aa:bb:cc:dd:ee:ff\n: 192.168.45.3\nx: 42\n";
        let request = Request::parse(text).unwrap();
        assert_eq!(
            request,
            Request::Renew {
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                ip_address: Ipv4Addr::new(192, 168, 45, 3),
                timestamp: 42,
            }
        );
    }

    #[test]
    fn test_unknown_type_token() {
        let result = Request::parse("NONSENSE\nMAC Address: aa\n");
        assert!(matches!(result, Err(Error::UnrecognizedMessage(_))));
    }

    #[test]
    fn test_malformed_messages_are_rejected() {
        for text in [
            "",
            "DISCOVER",
            "DISCOVER\nMAC Address: aa:bb:cc:dd:ee:ff",
            "DISCOVER\nMAC Address:\nIP Address: 0.0.0.0\nTime Stamp: 0",
            "DISCOVER\nMAC Address: aa\nIP Address: not-an-ip\nTime Stamp: 0",
            "DISCOVER\nMAC Address: aa\nIP Address: 0.0.0.0\nTime Stamp: soon",
            "RELEASE\nno colon here\nIP Address: 0.0.0.0\nTime Stamp: 0",
        ] {
            let result = Request::parse(text);
            assert!(
                matches!(result, Err(Error::InvalidMessage(_))),
                "{text:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_request_roundtrip() {
        let original = Request::Release {
            mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            ip_address: Ipv4Addr::new(192, 168, 45, 7),
            timestamp: 1_700_000_000,
        };
        assert_eq!(Request::parse(&original.encode()).unwrap(), original);
    }

    #[test]
    fn test_encode_offer_wire_form() {
        let lease = Lease {
            sequence: 1,
            mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            ip_address: Ipv4Addr::new(192, 168, 45, 1),
            expires_at: 1_700_000_060,
            acknowledged: false,
        };
        assert_eq!(
            Response::offer(&lease).encode(),
            "OFFER\nMAC Address: aa:bb:cc:dd:ee:ff\nIP Address: 192.168.45.1\nTime Stamp: 1700000060\n"
        );
    }

    #[test]
    fn test_encode_decline_carries_reason() {
        let response = Response::Decline {
            reason: "address pool exhausted".to_string(),
        };
        assert_eq!(response.encode(), "DECLINE\naddress pool exhausted\n");
        assert_eq!(Response::parse(&response.encode()).unwrap(), response);
    }

    #[test]
    fn test_parse_decline_without_reason_line() {
        let response = Response::parse("DECLINE\n").unwrap();
        assert_eq!(
            response,
            Response::Decline {
                reason: String::new()
            }
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let lease = Lease {
            sequence: 3,
            mac_address: "02:00:00:00:00:07".to_string(),
            ip_address: Ipv4Addr::new(192, 168, 45, 3),
            expires_at: 1_700_000_120,
            acknowledged: true,
        };
        let response = Response::acknowledge(&lease);
        assert_eq!(Response::parse(&response.encode()).unwrap(), response);
    }

    #[test]
    fn test_lease_list_roundtrip() {
        let leases = vec![
            Lease {
                sequence: 1,
                mac_address: "aa:bb:cc:dd:ee:01".to_string(),
                ip_address: Ipv4Addr::new(192, 168, 45, 1),
                expires_at: 1_700_000_060,
                acknowledged: true,
            },
            Lease {
                sequence: 2,
                mac_address: "aa:bb:cc:dd:ee:02".to_string(),
                ip_address: Ipv4Addr::new(192, 168, 45, 2),
                expires_at: 1_700_000_090,
                acknowledged: false,
            },
        ];

        let encoded = Response::LeaseList(leases.clone()).encode();
        assert_eq!(
            encoded.lines().next().unwrap(),
            "mac: aa:bb:cc:dd:ee:01 | ip: 192.168.45.1 | num: 1 | time: 1700000060 | ack: true"
        );
        assert_eq!(parse_lease_list(&encoded).unwrap(), leases);
    }

    #[test]
    fn test_empty_lease_list() {
        assert_eq!(Response::LeaseList(Vec::new()).encode(), "");
        assert!(parse_lease_list("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lease_list_entry() {
        assert!(parse_lease_list("mac: aa | ip: 192.168.45.1").is_err());
        assert!(parse_lease_list("garbage without separators").is_err());
    }
}
