//! Signal K messages exchanged with the server over its TCP stream.
//!
//! Every message is one JSON document on its own line. Outbound we send
//! deltas for our own paths, the subscription for the depth feed, and nothing
//! else. Inbound we care about deltas carrying numeric values and PUT
//! requests aimed at configuration paths.

use heapless::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RODE_DEPLOYED_PATH: &str = "navigation.anchor.rodeDeployed";
pub const SCOPE_PATH: &str = "navigation.anchor.scope";
pub const CHAIN_LENGTH_PATH: &str = "navigation.anchor.chainLength";
pub const UP_BUTTON_PATH: &str = "navigation.windless.remote.upbutton.state";
pub const DOWN_BUTTON_PATH: &str = "navigation.windless.remote.downbutton.state";
pub const DEPTH_PATH: &str = "navigation.depth";

/// Values per inbound delta we look at. Longer updates fail to decode.
const MAX_VALUES: usize = 8;
const MAX_UPDATES: usize = 4;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    #[error("message does not fit the output buffer")]
    Encode,
    #[error("malformed message")]
    Decode,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub units: &'static str,
    pub description: &'static str,
    pub display_name: &'static str,
    pub short_name: &'static str,
}

pub static RODE_DEPLOYED_META: Metadata = Metadata {
    units: "m",
    description: "Anchor Rode Deployed",
    display_name: "Rode Deployed",
    short_name: "Rode Out",
};

pub static SCOPE_META: Metadata = Metadata {
    units: "ratio",
    description: "Anchor scope, rode deployed over depth",
    display_name: "Anchor Scope",
    short_name: "Scope",
};

pub static CHAIN_LENGTH_META: Metadata = Metadata {
    units: "m",
    description: "Anchor chain length",
    display_name: "Chain length",
    short_name: "Chain length",
};

pub static UP_BUTTON_META: Metadata = Metadata {
    units: "",
    description: "State of the remote anchor control up button",
    display_name: "Up button state",
    short_name: "Up Button",
};

pub static DOWN_BUTTON_META: Metadata = Metadata {
    units: "",
    description: "State of the remote anchor control down button",
    display_name: "Down button state",
    short_name: "Down Button",
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value<'a> {
    Number(f32),
    Text(&'a str),
}

/// One value for one path, optionally with the path's metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta<'a> {
    pub path: &'a str,
    pub value: Value<'a>,
    pub metadata: Option<&'a Metadata>,
}

#[derive(Serialize)]
struct DeltaMessage<'a> {
    updates: &'a [UpdateOut<'a>],
}

#[derive(Serialize)]
struct UpdateOut<'a> {
    values: &'a [PathValue<'a>],
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a [PathMeta<'a>]>,
}

#[derive(Serialize)]
struct PathValue<'a> {
    path: &'a str,
    value: Value<'a>,
}

#[derive(Serialize)]
struct PathMeta<'a> {
    path: &'a str,
    value: &'a Metadata,
}

impl Delta<'_> {
    /// Writes the delta as JSON into `buf` and returns the length written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let values = [PathValue {
            path: self.path,
            value: self.value,
        }];
        let meta = self.metadata.map(|value| {
            [PathMeta {
                path: self.path,
                value,
            }]
        });
        let updates = [UpdateOut {
            values: &values,
            meta: meta.as_ref().map(|m| m.as_slice()),
        }];
        encode(&DeltaMessage { updates: &updates }, buf)
    }
}

/// Publishes one Signal K path. Metadata rides along with the first delta
/// only.
#[derive(Debug)]
pub struct SkOutput {
    path: &'static str,
    metadata: Option<&'static Metadata>,
    metadata_sent: bool,
}

impl SkOutput {
    pub const fn new(path: &'static str, metadata: Option<&'static Metadata>) -> Self {
        Self {
            path,
            metadata,
            metadata_sent: false,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn delta<'a>(&mut self, value: Value<'a>) -> Delta<'a> {
        let metadata = if self.metadata_sent {
            None
        } else {
            self.metadata_sent = true;
            self.metadata
        };
        Delta {
            path: self.path,
            value,
            metadata,
        }
    }

    /// Attaches the metadata to the next delta again, e.g. for a new server
    /// connection.
    pub fn resend_metadata(&mut self) {
        self.metadata_sent = false;
    }
}

#[derive(Serialize)]
struct Subscribe<'a> {
    context: &'a str,
    subscribe: &'a [Subscription<'a>],
}

#[derive(Serialize)]
struct Subscription<'a> {
    path: &'a str,
    period: u32,
}

#[derive(Serialize)]
struct Unsubscribe<'a> {
    context: &'a str,
    unsubscribe: &'a [UnsubscribePath<'a>],
}

#[derive(Serialize)]
struct UnsubscribePath<'a> {
    path: &'a str,
}

/// Cancels the default subscription the server sets up for a new stream.
pub fn unsubscribe_all(buf: &mut [u8]) -> Result<usize, CodecError> {
    encode(
        &Unsubscribe {
            context: "*",
            unsubscribe: &[UnsubscribePath { path: "*" }],
        },
        buf,
    )
}

/// Asks the server for `path` on our own vessel every `period_ms`.
pub fn subscribe(path: &str, period_ms: u32, buf: &mut [u8]) -> Result<usize, CodecError> {
    encode(
        &Subscribe {
            context: "vessels.self",
            subscribe: &[Subscription {
                path,
                period: period_ms,
            }],
        },
        buf,
    )
}

fn encode<T: Serialize>(message: &T, buf: &mut [u8]) -> Result<usize, CodecError> {
    serde_json_core::to_slice(message, buf).map_err(|_| CodecError::Encode)
}

#[derive(Deserialize)]
struct InboundMessage<'a> {
    #[serde(borrow)]
    updates: Option<Vec<UpdateIn<'a>, MAX_UPDATES>>,
    #[serde(borrow)]
    put: Option<PutIn<'a>>,
}

#[derive(Deserialize)]
struct UpdateIn<'a> {
    #[serde(borrow)]
    values: Option<Vec<ValueIn<'a>, MAX_VALUES>>,
}

#[derive(Deserialize)]
struct ValueIn<'a> {
    path: &'a str,
    value: f32,
}

#[derive(Deserialize)]
struct PutIn<'a> {
    path: &'a str,
    value: f32,
}

/// A decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<'a> {
    /// Numeric values from a delta, as `(path, value)`.
    Delta(Vec<(&'a str, f32), MAX_VALUES>),
    /// A request to set the value at `path`.
    Put { path: &'a str, value: f32 },
    /// Valid JSON with nothing for us, such as the server hello.
    Ignored,
}

impl<'a> Inbound<'a> {
    pub fn parse(line: &'a [u8]) -> Result<Self, CodecError> {
        let (message, _) = serde_json_core::from_slice::<InboundMessage<'a>>(line)
            .map_err(|_| CodecError::Decode)?;

        if let Some(put) = message.put {
            return Ok(Inbound::Put {
                path: put.path,
                value: put.value,
            });
        }

        let mut values = Vec::new();
        for update in message.updates.iter().flatten() {
            for value in update.values.iter().flatten() {
                if values.push((value.path, value.value)).is_err() {
                    return Err(CodecError::Decode);
                }
            }
        }

        if values.is_empty() {
            Ok(Inbound::Ignored)
        } else {
            Ok(Inbound::Delta(values))
        }
    }

    /// The last value received for `path` in this delta.
    pub fn value_of(&self, path: &str) -> Option<f32> {
        match self {
            Inbound::Delta(values) => values
                .iter()
                .rev()
                .find(|(p, _)| *p == path)
                .map(|(_, v)| *v),
            _ => None,
        }
    }
}

/// Reassembles newline-terminated lines from a byte stream.
///
/// Read into [`LineBuffer::space`], report the byte count with
/// [`LineBuffer::commit`], then drain with [`LineBuffer::pop_line`] until it
/// returns `None` before reading again. A line that does not fit is dropped up
/// to its terminating newline.
pub struct LineBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
    discarding: bool,
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
            discarding: false,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.discarding = false;
    }

    pub fn space(&mut self) -> &mut [u8] {
        if self.len == N {
            warn!("inbound line longer than {} bytes dropped", N);
            self.len = 0;
            self.discarding = true;
        }
        &mut self.buf[self.len..]
    }

    pub fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(N);
    }

    /// Takes the next complete, non-empty line without its line ending.
    pub fn pop_line(&mut self) -> Option<Vec<u8, N>> {
        loop {
            let end = self.buf[..self.len].iter().position(|&b| b == b'\n')?;
            let mut line = &self.buf[..end];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }
            let keep = !self.discarding && !line.is_empty();
            let taken = if keep { Vec::from_slice(line).ok() } else { None };

            self.buf.copy_within(end + 1..self.len, 0);
            self.len -= end + 1;
            self.discarding = false;

            if taken.is_some() {
                return taken;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(delta: &Delta) -> String {
        let mut buf = [0u8; 512];
        let n = delta.encode(&mut buf).unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn metadata_only_on_first_delta() {
        let mut output = SkOutput::new(RODE_DEPLOYED_PATH, Some(&RODE_DEPLOYED_META));

        let first = encoded(&output.delta(Value::Number(0.5)));
        assert!(first.starts_with(
            r#"{"updates":[{"values":[{"path":"navigation.anchor.rodeDeployed","value":0.5}],"meta":[{"path":"navigation.anchor.rodeDeployed","value":{"#
        ));
        assert!(first.contains(r#""units":"m""#));
        assert!(first.contains(r#""displayName":"Rode Deployed""#));
        assert!(first.contains(r#""shortName":"Rode Out""#));

        let second = encoded(&output.delta(Value::Number(1.0)));
        assert!(!second.contains("meta"));

        output.resend_metadata();
        assert!(encoded(&output.delta(Value::Number(1.0))).contains("meta"));
    }

    #[test]
    fn text_values() {
        let mut output = SkOutput::new(UP_BUTTON_PATH, None);
        assert_eq!(
            encoded(&output.delta(Value::Text("ON"))),
            r#"{"updates":[{"values":[{"path":"navigation.windless.remote.upbutton.state","value":"ON"}]}]}"#
        );
    }

    #[test]
    fn encode_reports_small_buffer() {
        let mut output = SkOutput::new(SCOPE_PATH, Some(&SCOPE_META));
        let mut buf = [0u8; 16];
        assert_eq!(
            output.delta(Value::Number(2.0)).encode(&mut buf),
            Err(CodecError::Encode)
        );
    }

    #[test]
    fn subscription_messages() {
        let mut buf = [0u8; 128];
        let n = subscribe(DEPTH_PATH, 1000, &mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            br#"{"context":"vessels.self","subscribe":[{"path":"navigation.depth","period":1000}]}"#
        );

        let n = unsubscribe_all(&mut buf).unwrap();
        assert_eq!(&buf[..n], br#"{"context":"*","unsubscribe":[{"path":"*"}]}"#);
    }

    #[test]
    fn parses_depth_delta() {
        let line = br#"{"context":"vessels.urn:mrn:imo:mmsi:123","updates":[{"source":{"label":"nmea"},"timestamp":"2024-05-01T10:00:00Z","values":[{"path":"navigation.depth","value":5.1}]}]}"#;
        let inbound = Inbound::parse(line).unwrap();
        assert_eq!(inbound.value_of(DEPTH_PATH), Some(5.1));
        assert_eq!(inbound.value_of(SCOPE_PATH), None);
    }

    #[test]
    fn parses_put() {
        let line = br#"{"requestId":"c0d79334","put":{"path":"/gypsy/circumference","value":0.35}}"#;
        assert_eq!(
            Inbound::parse(line),
            Ok(Inbound::Put {
                path: "/gypsy/circumference",
                value: 0.35
            })
        );
    }

    #[test]
    fn hello_is_ignored() {
        let line = br#"{"name":"signalk-server","version":"2.8.0","self":"vessels.urn:mrn:imo:mmsi:123","roles":["master","main"]}"#;
        assert_eq!(Inbound::parse(line), Ok(Inbound::Ignored));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert_eq!(Inbound::parse(b"{\"updates\":"), Err(CodecError::Decode));
        assert_eq!(Inbound::parse(b"hello"), Err(CodecError::Decode));
    }

    /// Feeds `data` the way the session loop does: read what fits, then drain.
    fn feed<const N: usize>(lines: &mut LineBuffer<N>, mut data: &[u8]) -> std::vec::Vec<String> {
        let mut out = std::vec::Vec::new();
        while !data.is_empty() {
            let space = lines.space();
            let n = space.len().min(data.len());
            space[..n].copy_from_slice(&data[..n]);
            lines.commit(n);
            data = &data[n..];
            while let Some(line) = lines.pop_line() {
                out.push(String::from_utf8(line.to_vec()).unwrap());
            }
        }
        out
    }

    #[test]
    fn lines_split_across_reads() {
        let mut lines = LineBuffer::<64>::new();
        assert_eq!(feed(&mut lines, b"{\"a\":1}\r\n{\"b\""), vec![r#"{"a":1}"#]);
        assert_eq!(feed(&mut lines, b":2}\n\n"), vec![r#"{"b":2}"#]);
        assert!(lines.pop_line().is_none());
    }

    #[test]
    fn overlong_line_is_dropped() {
        let mut lines = LineBuffer::<8>::new();
        assert_eq!(feed(&mut lines, b"0123456789abcdef\nok\n"), vec!["ok"]);
        assert!(lines.pop_line().is_none());
    }

    #[test]
    fn complete_line_survives_overlong_neighbour() {
        let mut lines = LineBuffer::<8>::new();
        assert_eq!(feed(&mut lines, b"ab\ncdefghijk\nok\n"), vec!["ab", "ok"]);
    }
}
