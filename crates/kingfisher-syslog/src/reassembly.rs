//! Reassembly of fragmented Cisco ISE messages.
//!
//! ISE splits long syslog payloads across datagrams, tagging each with
//! `CISE_<type> <uid> <total> <index>`. Fragments are buffered per uid and
//! joined in index order once all have arrived. A uid that stalls past the
//! timeout is forwarded as a best-effort partial, so one lost datagram
//! cannot pin its siblings forever.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use kingfisher_core::{RawDatagram, WholeMessage};
use kingfisher_parse::patterns::CHUNK_HEADER;

struct AssemblyBuffer {
    total: usize,
    /// `(index, fragment text)` in arrival order. Duplicate indices are
    /// kept; the stable sort at join time preserves their arrival order.
    received: Vec<(usize, String)>,
    first_seen: Instant,
    last_seen: Instant,
    source: IpAddr,
    received_at: DateTime<Utc>,
}

impl AssemblyBuffer {
    fn join(mut self) -> WholeMessage {
        self.received.sort_by_key(|(index, _)| *index);
        let text: String = self
            .received
            .into_iter()
            .map(|(_, fragment)| fragment)
            .collect();
        WholeMessage {
            source: self.source,
            text,
            received_at: self.received_at,
        }
    }
}

/// Per-worker fragment buffer. Workers own one each; source-hash routing in
/// the queue guarantees all fragments of a sender land on the same worker.
pub struct Reassembler {
    buffers: HashMap<String, AssemblyBuffer>,
    timeout: Duration,
}

impl Reassembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffers: HashMap::new(),
            timeout,
        }
    }

    /// Number of uids currently buffered.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Feed one datagram. Returns zero or more whole messages ready for
    /// classification: the datagram itself when it is not a fragment, the
    /// completed uid, and any other uids swept out by the timeout.
    pub fn offer(&mut self, datagram: RawDatagram, now: Instant) -> Vec<WholeMessage> {
        let RawDatagram { source, text, received_at } = datagram;

        let header = CHUNK_HEADER.captures(&text).and_then(|captures| {
            let uid = captures.get(1)?.as_str().to_string();
            let total = captures.get(2)?.as_str().parse::<usize>().ok()?;
            let index = captures.get(3)?.as_str().parse::<usize>().ok()?;
            Some((uid, total, index))
        });
        let Some((uid, total, index)) = header else {
            return vec![WholeMessage { source, text, received_at }];
        };

        let mut emitted = Vec::new();
        let complete = {
            let buffer = self.buffers.entry(uid.clone()).or_insert_with(|| AssemblyBuffer {
                total,
                received: Vec::new(),
                first_seen: now,
                last_seen: now,
                source,
                received_at,
            });
            buffer.received.push((index, text));
            buffer.last_seen = now;
            buffer.received.len() >= buffer.total
        };

        if complete {
            if let Some(buffer) = self.buffers.remove(&uid) {
                info!("Full message joined: {}", uid);
                emitted.push(buffer.join());
            }
        } else {
            // Sweep the rest of the buffer; the current uid just refreshed
            // its last_seen and never blocks others.
            let expired: Vec<String> = self
                .buffers
                .iter()
                .filter(|(buffered_uid, buffer)| {
                    **buffered_uid != uid && now.duration_since(buffer.last_seen) > self.timeout
                })
                .map(|(buffered_uid, _)| buffered_uid.clone())
                .collect();
            for stale_uid in expired {
                if let Some(buffer) = self.buffers.remove(&stale_uid) {
                    warn!(
                        "{} {} fragment waiting over {:?}, received {}/{} chunks; forwarding partial",
                        buffer.source,
                        stale_uid,
                        self.timeout,
                        buffer.received.len(),
                        buffer.total
                    );
                    emitted.push(buffer.join());
                }
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SOURCE: &str = "10.23.18.218";

    fn fragment(uid: u32, total: u32, index: u32, body: &str) -> RawDatagram {
        RawDatagram {
            source: SOURCE.parse().expect("test address"),
            text: format!("CISE_Passed_Authentications {uid} {total} {index} {body}"),
            received_at: Utc::now(),
        }
    }

    fn plain(text: &str) -> RawDatagram {
        RawDatagram {
            source: SOURCE.parse().expect("test address"),
            text: text.to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn non_fragment_passes_straight_through() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let emitted = reassembler.offer(plain("plain syslog line"), Instant::now());
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].text, "plain syslog line");
        assert!(reassembler.is_empty());
    }

    #[test]
    fn in_order_fragments_join_on_completion() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let now = Instant::now();
        assert!(reassembler.offer(fragment(555, 2, 1, "head"), now).is_empty());
        let emitted = reassembler.offer(fragment(555, 2, 2, "tail"), now);
        assert_eq!(emitted.len(), 1);
        let text = &emitted[0].text;
        assert!(text.contains("head"));
        assert!(text.contains("tail"));
        assert!(text.find("head").unwrap() < text.find("tail").unwrap());
        assert!(reassembler.is_empty());
    }

    #[test]
    fn out_of_order_fragments_join_in_index_order() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let now = Instant::now();
        assert!(reassembler.offer(fragment(555, 2, 2, "tail"), now).is_empty());
        let emitted = reassembler.offer(fragment(555, 2, 1, "head"), now);
        assert_eq!(emitted.len(), 1);
        let text = &emitted[0].text;
        assert!(text.find("head").unwrap() < text.find("tail").unwrap());
    }

    #[test]
    fn duplicate_indices_count_toward_total_and_keep_arrival_order() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let now = Instant::now();
        assert!(reassembler.offer(fragment(7, 2, 1, "first"), now).is_empty());
        let emitted = reassembler.offer(fragment(7, 2, 1, "second"), now);
        assert_eq!(emitted.len(), 1);
        let text = &emitted[0].text;
        assert!(text.find("first").unwrap() < text.find("second").unwrap());
    }

    #[test]
    fn stale_uid_is_swept_when_another_fragment_arrives() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(reassembler.offer(fragment(777, 3, 1, "only chunk"), start).is_empty());

        let later = start + Duration::from_secs(31);
        let emitted = reassembler.offer(fragment(888, 2, 1, "unrelated"), later);
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].text.contains("only chunk"));
        // 888 is still waiting for its second chunk.
        assert_eq!(reassembler.len(), 1);
    }

    #[test]
    fn fresh_uids_survive_the_sweep() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(reassembler.offer(fragment(1, 2, 1, "a"), start).is_empty());
        let recent = start + Duration::from_secs(20);
        assert!(reassembler.offer(fragment(2, 2, 1, "b"), recent).is_empty());

        // 1 is 25s old, 2 is 5s old; neither has expired yet.
        let emitted = reassembler.offer(fragment(3, 2, 1, "c"), start + Duration::from_secs(25));
        assert!(emitted.is_empty());
        assert_eq!(reassembler.len(), 3);
    }

    #[test]
    fn completion_beats_the_sweep_for_the_current_uid() {
        let mut reassembler = Reassembler::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(reassembler.offer(fragment(10, 2, 1, "old"), start).is_empty());

        // Completing uid 10 late still joins it; the sweep only runs on the
        // incomplete path.
        let late = start + Duration::from_secs(40);
        let emitted = reassembler.offer(fragment(10, 2, 2, "late tail"), late);
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].text.contains("late tail"));
    }
}
