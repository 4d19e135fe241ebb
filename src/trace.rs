//! Loading packet traces and mapping participants to dense indices.
//!
//! A trace file has the following shape:
//!
//! ```text
//! <sender id>
//! ["<recipient id>", "<recipient id>", ...]
//! [[p00, p01, ...], [p10, p11, ...], ...]
//! {'src': '<id>', 'dst': '<id>', 'time_sent': 0.12, 'time_delivered': 0.31}
//! ...
//! ```
//!
//! where the third line is the row-stochastic sending-probability matrix
//! of the social graph (`[]` if unavailable), and every following line
//! is one packet.
use ndarray::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::ParticipantIndex;
use crate::error::{Result, SdaError};

pub type ParticipantId = String;

/// One packet, from its entry into the mix network to its delivery.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PacketRecord<P> {
    pub src: P,
    pub dst: P,
    pub time_sent: f64,
    pub time_delivered: f64,
}

/// A packet as written by the simulator.
pub type RawPacket = PacketRecord<ParticipantId>;
/// A packet whose endpoints were mapped to dense indices.
pub type Packet = PacketRecord<ParticipantIndex>;

impl<P> PacketRecord<P> {
    pub fn delay(&self) -> f64 {
        self.time_delivered - self.time_sent
    }
}

/// A trace file, before participant identifiers are mapped to indices.
#[derive(Debug, Clone)]
pub struct RawTrace {
    pub sender_id: ParticipantId,
    pub recipient_ids: Vec<ParticipantId>,
    pub sending_profile: Option<Array2<f64>>,
    pub packets: Vec<RawPacket>,
}

/// Bijection between participant identifiers and `0..N`.
///
/// Indices follow the lexicographic order of the identifiers, so the
/// mapping only depends on the set of senders in a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct IdMapping {
    index_of: BTreeMap<ParticipantId, ParticipantIndex>,
    ids: Vec<ParticipantId>,
}

impl IdMapping {
    /// Builds the mapping from the distinct senders of `packets`.
    pub fn from_packets(packets: &[RawPacket]) -> IdMapping {
        let ids = packets.iter()
                         .map(|p| p.src.clone())
                         .collect::<BTreeSet<_>>()
                         .into_iter()
                         .collect::<Vec<_>>();
        let index_of = ids.iter()
                          .cloned()
                          .enumerate()
                          .map(|(i, id)| (id, i))
                          .collect();

        IdMapping { index_of, ids }
    }

    pub fn index(&self, id: &str) -> Result<ParticipantIndex> {
        self.index_of.get(id)
                     .copied()
                     .ok_or_else(|| SdaError::UnknownParticipant(id.to_string()))
    }

    pub fn id(&self, index: ParticipantIndex) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Maps the endpoints of every packet to dense indices.
///
/// Fails if the sender, one of its recipients, or the destination of
/// some packet never appears as a `src` in the trace.
pub fn normalize(packets: Vec<RawPacket>, sender_id: &str, recipient_ids: &[ParticipantId])
        -> Result<(Vec<Packet>, IdMapping)> {
    let mapping = IdMapping::from_packets(&packets);

    mapping.index(sender_id)?;
    for id in recipient_ids {
        mapping.index(id)?;
    }

    let packets = packets.into_iter()
                         .map(|p| Ok(PacketRecord {
                             src: mapping.index(&p.src)?,
                             dst: mapping.index(&p.dst)?,
                             time_sent: p.time_sent,
                             time_delivered: p.time_delivered,
                         }))
                         .collect::<Result<Vec<_>>>()?;

    Ok((packets, mapping))
}

/// A trace ready for analysis.
#[derive(Debug, Clone)]
pub struct Trace {
    pub mapping: IdMapping,
    /// Index of the tracked participant.
    pub target: ParticipantIndex,
    /// Indices of the target's true recipients, ascending.
    pub recipients: Vec<ParticipantIndex>,
    pub sending_profile: Option<Array2<f64>>,
    pub packets: Vec<Packet>,
}

impl Trace {
    pub fn from_raw(raw: RawTrace) -> Result<Trace> {
        let (packets, mapping) = normalize(raw.packets, &raw.sender_id, &raw.recipient_ids)?;
        let target = mapping.index(&raw.sender_id)?;
        let mut recipients = raw.recipient_ids.iter()
                                              .map(|id| mapping.index(id))
                                              .collect::<Result<Vec<_>>>()?;
        recipients.sort_unstable();
        recipients.dedup();

        Ok(Trace {
            mapping,
            target,
            recipients,
            sending_profile: raw.sending_profile,
            packets,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Trace> {
        Trace::from_raw(load_trace(path)?)
    }

    pub fn n_participants(&self) -> usize {
        self.mapping.len()
    }

    pub fn participant_id(&self, index: ParticipantIndex) -> Option<&str> {
        self.mapping.id(index)
    }
}

/// Loads a trace file.
pub fn load_trace(path: impl AsRef<Path>) -> Result<RawTrace> {
    let content = fs::read_to_string(path)?;
    parse_trace(&content)
}

/// Parses the content of a trace file.
pub fn parse_trace(content: &str) -> Result<RawTrace> {
    let mut lines = content.lines()
                           .enumerate()
                           .map(|(i, l)| (i + 1, l.trim()))
                           .filter(|(_, l)| !l.is_empty());

    let missing = |what: &str| SdaError::Parse {
        line: 0,
        reason: format!("missing {}", what),
    };

    let (_, sender_id) = lines.next().ok_or_else(|| missing("sender id"))?;
    let (n, recipients) = lines.next().ok_or_else(|| missing("recipient list"))?;
    let recipient_ids: Vec<ParticipantId> = parse_literal(recipients, n)?;
    let (n, profile) = lines.next().ok_or_else(|| missing("sending profile"))?;
    let sending_profile = parse_profile(parse_literal(profile, n)?, n)?;

    let mut packets = Vec::new();
    for (n, line) in lines {
        let packet: RawPacket = parse_literal(line, n)?;
        if !(packet.time_delivered >= packet.time_sent) {
            return Err(SdaError::Parse {
                line: n,
                reason: format!("packet delivered at {} before being sent at {}",
                                packet.time_delivered, packet.time_sent),
            });
        }
        packets.push(packet);
    }

    Ok(RawTrace {
        sender_id: sender_id.trim_matches(|c| c == '"' || c == '\'').to_string(),
        recipient_ids,
        sending_profile,
        packets,
    })
}

/// Parses a list or mapping literal; single-quoted strings are accepted.
fn parse_literal<T: DeserializeOwned>(text: &str, line: usize) -> Result<T> {
    serde_json::from_str(&double_quoted(text))
               .map_err(|e| SdaError::Parse { line, reason: e.to_string() })
}

/// Rewrites single-quoted strings with double quotes, leaving quotes
/// inside strings alone.
fn double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Delimiter of the string being copied, if any.
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                out.push('"');
            },
            (Some(q), _) if c == q => {
                quote = None;
                out.push('"');
            },
            (Some('\''), '"') => out.push_str("\\\""),
            (Some(_), '\\') => match chars.next() {
                // JSON has no `\'` escape.
                Some('\'') => out.push('\''),
                Some(e) => {
                    out.push('\\');
                    out.push(e);
                },
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    out
}

fn parse_profile(rows: Vec<Vec<f64>>, line: usize) -> Result<Option<Array2<f64>>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let n = rows.len();
    if rows.iter().any(|r| r.len() != n) {
        return Err(SdaError::Parse {
            line,
            reason: "sending profile is not a square matrix".into(),
        });
    }
    let flat = rows.into_iter().flatten().collect::<Vec<_>>();
    let profile = Array2::from_shape_vec((n, n), flat)
                         .map_err(|e| SdaError::Parse { line, reason: e.to_string() })?;

    Ok(Some(profile))
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TRACE: &str = "carol\n\
                         [\"bob\",\"dave\"]\n\
                         [[0.0,0.5,0.5],[1.0,0.0,0.0],[0.5,0.5,0.0]]\n\
                         {'src': 'carol', 'dst': 'bob', 'time_sent': 0.5, 'time_delivered': 0.75}\n\
                         {'src': 'dave', 'dst': 'carol', 'time_sent': 1, 'time_delivered': 1.5}\n\
                         \n\
                         {'src': 'bob', 'dst': 'dave', 'time_sent': 2.0, 'time_delivered': 2.25}\n";

    fn raw(src: &str, dst: &str, t: f64) -> RawPacket {
        PacketRecord {
            src: src.to_string(),
            dst: dst.to_string(),
            time_sent: t,
            time_delivered: t + 1.,
        }
    }

    #[test]
    fn parse_trace_file() {
        let raw = parse_trace(TRACE).unwrap();

        assert_eq!(raw.sender_id, "carol");
        assert_eq!(raw.recipient_ids, vec!["bob", "dave"]);
        assert_eq!(raw.sending_profile.unwrap(),
                   array![[0.0, 0.5, 0.5], [1.0, 0.0, 0.0], [0.5, 0.5, 0.0]]);
        assert_eq!(raw.packets.len(), 3);
        assert_eq!(raw.packets[1], raw_packet("dave", "carol", 1., 1.5));
    }

    fn raw_packet(src: &str, dst: &str, sent: f64, delivered: f64) -> RawPacket {
        PacketRecord {
            src: src.to_string(),
            dst: dst.to_string(),
            time_sent: sent,
            time_delivered: delivered,
        }
    }

    #[test]
    fn parse_trace_without_profile() {
        let raw = parse_trace("a\n[\"b\"]\n[]\n{'src': 'a', 'dst': 'b', \
                               'time_sent': 0.0, 'time_delivered': 0.1}\n").unwrap();
        assert!(raw.sending_profile.is_none());
        assert_eq!(raw.packets.len(), 1);
    }

    #[test]
    fn parse_ids_with_quotes() {
        let raw = parse_trace(r#"o'brien
                                 ["o'brien", 'bob']
                                 []
                                 {'src': "o'brien", 'dst': 'bob', 'time_sent': 0.0, 'time_delivered': 0.1}
                                 {'src': 'bob', 'dst': 'say "hi"', 'time_sent': 1.0, 'time_delivered': 1.1}
                              "#).unwrap();

        assert_eq!(raw.sender_id, "o'brien");
        assert_eq!(raw.recipient_ids, vec!["o'brien", "bob"]);
        assert_eq!(raw.packets[0], raw_packet("o'brien", "bob", 0., 0.1));
        assert_eq!(raw.packets[1].dst, "say \"hi\"");
    }

    #[test]
    fn single_quotes_become_double_quotes() {
        assert_eq!(double_quoted("['a', 'b']"), r#"["a", "b"]"#);
        assert_eq!(double_quoted(r#"["o'brien"]"#), r#"["o'brien"]"#);
        assert_eq!(double_quoted(r#"['it\'s', 'a"b']"#), r#"["it's", "a\"b"]"#);
        assert_eq!(double_quoted(r#"["a\"b"]"#), r#"["a\"b"]"#);
    }

    #[test]
    fn parse_trace_errors() {
        match parse_trace("a\n[\"b\"]\n[]\n{'src': 'a', 'dst': 'b'}\n") {
            Err(SdaError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected result: {:?}", other),
        }
        // Delivered before being sent.
        match parse_trace("a\n[\"b\"]\n[]\n{'src': 'a', 'dst': 'b', \
                           'time_sent': 2.0, 'time_delivered': 1.0}\n") {
            Err(SdaError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(parse_trace("a\n[\"b\"]\n[[1.0, 0.0]]\n"),
                         Err(SdaError::Parse { line: 3, .. })));
        assert!(matches!(parse_trace("a\n"), Err(SdaError::Parse { .. })));
    }

    #[test]
    fn normalize_sorts_ids() {
        let packets = vec![raw("zed", "amy", 0.),
                           raw("amy", "zed", 1.),
                           raw("kim", "zed", 2.),
                           raw("zed", "kim", 3.)];
        let (indexed, mapping) = normalize(packets, "kim", &["amy".to_string()]).unwrap();

        assert_eq!(mapping.index("amy").unwrap(), 0);
        assert_eq!(mapping.index("kim").unwrap(), 1);
        assert_eq!(mapping.index("zed").unwrap(), 2);
        assert_eq!(mapping.id(2), Some("zed"));
        assert_eq!(mapping.id(3), None);
        assert_eq!(indexed.iter().map(|p| (p.src, p.dst)).collect::<Vec<_>>(),
                   vec![(2, 0), (0, 2), (1, 2), (2, 1)]);
        // Times are untouched.
        assert_eq!(indexed[3].time_sent, 3.);
        assert_eq!(indexed[3].time_delivered, 4.);
    }

    #[test]
    fn normalize_is_deterministic() {
        let packets = vec![raw("d", "a", 0.), raw("b", "c", 1.), raw("a", "b", 2.),
                           raw("c", "d", 3.), raw("b", "a", 4.)];
        let mut reversed = packets.clone();
        reversed.reverse();

        let (_, first) = normalize(packets.clone(), "a", &[]).unwrap();
        let (_, second) = normalize(packets, "a", &[]).unwrap();
        let (_, third) = normalize(reversed, "a", &[]).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn normalize_unknown_participants() {
        let packets = vec![raw("a", "b", 0.), raw("b", "a", 1.)];
        assert!(matches!(normalize(packets.clone(), "c", &[]),
                         Err(SdaError::UnknownParticipant(ref id)) if id == "c"));
        assert!(matches!(normalize(packets.clone(), "a", &["x".to_string()]),
                         Err(SdaError::UnknownParticipant(ref id)) if id == "x"));
        // Destination that never sends.
        let packets = vec![raw("a", "b", 0.), raw("b", "q", 1.)];
        assert!(matches!(normalize(packets, "a", &[]),
                         Err(SdaError::UnknownParticipant(ref id)) if id == "q"));
    }

    #[test]
    fn trace_from_raw() {
        let trace = Trace::from_raw(parse_trace(TRACE).unwrap()).unwrap();

        assert_eq!(trace.n_participants(), 3);
        assert_eq!(trace.target, 1);
        assert_eq!(trace.recipients, vec![0, 2]);
        assert_eq!(trace.participant_id(2), Some("dave"));
        assert_eq!(trace.packets[0].src, 1);
        assert_eq!(trace.packets[0].dst, 0);
    }
}
