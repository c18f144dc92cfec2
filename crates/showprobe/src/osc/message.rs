use std::fmt;

use rosc::OscColor;
use rosc::OscMidiMessage;
use rosc::OscPacket;
use rosc::OscTime;
use rosc::OscType;

use super::OscError;
use super::Result;

/// A decoded OSC argument, one variant per type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// `i`
    Int(i32),
    /// `h`
    Long(i64),
    /// `f`
    Float(f32),
    /// `d`
    Double(f64),
    /// `s`
    String(String),
    /// `c`
    Char(char),
    /// `T` / `F`
    Bool(bool),
    /// `b`
    Blob(Vec<u8>),
    /// `t`: NTP seconds and fraction
    Time { seconds: u32, fractional: u32 },
    /// `r`: red, green, blue, alpha
    Color([u8; 4]),
    /// `m`: port, status, data1, data2
    Midi([u8; 4]),
    /// `N`
    Nil,
    /// `I`
    Impulse,
    /// `[` ... `]`
    Array(Vec<OscArg>),
}

impl OscArg {
    /// Parse a command-line word into an argument.
    ///
    /// `true`/`false` and `nil` are keywords, integer literals become `Int`
    /// (or `Long` if they overflow 32 bits), numeric literals with a fraction
    /// or exponent become `Float`, and everything else is sent as a string.
    pub fn parse_cli(word: &str) -> Self {
        match word {
            "true" => return OscArg::Bool(true),
            "false" => return OscArg::Bool(false),
            "nil" => return OscArg::Nil,
            _ => {}
        }

        if let Ok(v) = word.parse::<i32>() {
            return OscArg::Int(v);
        }
        if let Ok(v) = word.parse::<i64>() {
            return OscArg::Long(v);
        }
        // f32::from_str accepts "inf" and "NaN"; only take real numeric literals
        if word.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(v) = word.parse::<f32>() {
                return OscArg::Float(v);
            }
        }
        OscArg::String(word.to_string())
    }

    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Long(_) => 'h',
            OscArg::Float(_) => 'f',
            OscArg::Double(_) => 'd',
            OscArg::String(_) => 's',
            OscArg::Char(_) => 'c',
            OscArg::Bool(true) => 'T',
            OscArg::Bool(false) => 'F',
            OscArg::Blob(_) => 'b',
            OscArg::Time { .. } => 't',
            OscArg::Color(_) => 'r',
            OscArg::Midi(_) => 'm',
            OscArg::Nil => 'N',
            OscArg::Impulse => 'I',
            OscArg::Array(_) => '[',
        }
    }
}

impl From<OscType> for OscArg {
    fn from(value: OscType) -> Self {
        match value {
            OscType::Int(v) => OscArg::Int(v),
            OscType::Long(v) => OscArg::Long(v),
            OscType::Float(v) => OscArg::Float(v),
            OscType::Double(v) => OscArg::Double(v),
            OscType::String(v) => OscArg::String(v),
            OscType::Char(v) => OscArg::Char(v),
            OscType::Bool(v) => OscArg::Bool(v),
            OscType::Blob(v) => OscArg::Blob(v),
            OscType::Time(t) => OscArg::Time {
                seconds: t.seconds,
                fractional: t.fractional,
            },
            OscType::Color(c) => OscArg::Color([c.red, c.green, c.blue, c.alpha]),
            OscType::Midi(m) => OscArg::Midi([m.port, m.status, m.data1, m.data2]),
            OscType::Nil => OscArg::Nil,
            OscType::Inf => OscArg::Impulse,
            OscType::Array(a) => OscArg::Array(a.content.into_iter().map(OscArg::from).collect()),
        }
    }
}

impl From<OscArg> for OscType {
    fn from(value: OscArg) -> Self {
        match value {
            OscArg::Int(v) => OscType::Int(v),
            OscArg::Long(v) => OscType::Long(v),
            OscArg::Float(v) => OscType::Float(v),
            OscArg::Double(v) => OscType::Double(v),
            OscArg::String(v) => OscType::String(v),
            OscArg::Char(v) => OscType::Char(v),
            OscArg::Bool(v) => OscType::Bool(v),
            OscArg::Blob(v) => OscType::Blob(v),
            OscArg::Time {
                seconds,
                fractional,
            } => OscType::Time(OscTime {
                seconds,
                fractional,
            }),
            OscArg::Color([red, green, blue, alpha]) => OscType::Color(OscColor {
                red,
                green,
                blue,
                alpha,
            }),
            OscArg::Midi([port, status, data1, data2]) => OscType::Midi(OscMidiMessage {
                port,
                status,
                data1,
                data2,
            }),
            OscArg::Nil => OscType::Nil,
            OscArg::Impulse => OscType::Inf,
            OscArg::Array(items) => OscType::Array(rosc::OscArray {
                content: items.into_iter().map(OscType::from).collect(),
            }),
        }
    }
}

impl fmt::Display for OscArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscArg::Int(v) => write!(f, "{}", v),
            OscArg::Long(v) => write!(f, "{}", v),
            // Debug keeps the decimal point on whole floats
            OscArg::Float(v) => write!(f, "{:?}", v),
            OscArg::Double(v) => write!(f, "{:?}", v),
            OscArg::String(v) => write!(f, "{:?}", v),
            OscArg::Char(v) => write!(f, "{:?}", v),
            OscArg::Bool(v) => write!(f, "{}", v),
            OscArg::Blob(v) => write!(f, "blob({} bytes)", v.len()),
            OscArg::Time {
                seconds,
                fractional,
            } => write!(f, "time({}.{:08x})", seconds, fractional),
            OscArg::Color([r, g, b, a]) => write!(f, "color({}, {}, {}, {})", r, g, b, a),
            OscArg::Midi([port, status, d1, d2]) => {
                write!(f, "midi({}, {:#04x}, {}, {})", port, status, d1, d2)
            }
            OscArg::Nil => f.write_str("nil"),
            OscArg::Impulse => f.write_str("impulse"),
            OscArg::Array(items) => write_list(f, items),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[OscArg]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}

/// A single OSC message: an address and its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub addr: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(addr: impl Into<String>, args: Vec<OscArg>) -> Result<Self> {
        let addr = addr.into();
        if !addr.starts_with('/') {
            return Err(OscError::InvalidAddress(addr));
        }
        Ok(Self { addr, args })
    }

    /// Flatten a decoded packet into its messages, bundles depth-first in
    /// the order they were packed.
    pub fn from_packet(packet: OscPacket) -> Vec<OscMessage> {
        let mut out = Vec::new();
        collect_messages(packet, &mut out);
        out
    }

    /// Type tag string as it appears on the wire, e.g. `,is`
    pub fn type_tags(&self) -> String {
        let mut tags = String::from(",");
        for arg in &self.args {
            push_tag(arg, &mut tags);
        }
        tags
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let packet = OscPacket::Message(rosc::OscMessage {
            addr: self.addr.clone(),
            args: self.args.iter().cloned().map(OscType::from).collect(),
        });
        rosc::encoder::encode(&packet).map_err(|e| OscError::Encode(e.to_string()))
    }
}

fn push_tag(arg: &OscArg, tags: &mut String) {
    if let OscArg::Array(items) = arg {
        tags.push('[');
        for item in items {
            push_tag(item, tags);
        }
        tags.push(']');
    } else {
        tags.push(arg.type_tag());
    }
}

fn collect_messages(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(OscMessage {
            addr: msg.addr,
            args: msg.args.into_iter().map(OscArg::from).collect(),
        }),
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                collect_messages(packet, out);
            }
        }
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.addr)?;
        write_list(f, &self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli() {
        assert_eq!(OscArg::parse_cli("1"), OscArg::Int(1));
        assert_eq!(OscArg::parse_cli("-7"), OscArg::Int(-7));
        assert_eq!(OscArg::parse_cli("4294967296"), OscArg::Long(4294967296));
        assert_eq!(OscArg::parse_cli("0.5"), OscArg::Float(0.5));
        assert_eq!(OscArg::parse_cli("1e3"), OscArg::Float(1000.0));
        assert_eq!(OscArg::parse_cli("true"), OscArg::Bool(true));
        assert_eq!(OscArg::parse_cli("false"), OscArg::Bool(false));
        assert_eq!(OscArg::parse_cli("nil"), OscArg::Nil);
        assert_eq!(OscArg::parse_cli("inf"), OscArg::String("inf".into()));
        assert_eq!(OscArg::parse_cli("NaN"), OscArg::String("NaN".into()));
        assert_eq!(OscArg::parse_cli("go"), OscArg::String("go".into()));
        assert_eq!(OscArg::parse_cli("12a"), OscArg::String("12a".into()));
    }

    #[test]
    fn test_new_requires_leading_slash() {
        assert!(OscMessage::new("/msc/go/1", vec![]).is_ok());
        assert!(matches!(
            OscMessage::new("msc/go/1", vec![]),
            Err(OscError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_display() {
        let msg = OscMessage::new(
            "/test/addr",
            vec![
                OscArg::Int(1),
                OscArg::String("a".into()),
                OscArg::Float(1.0),
                OscArg::Bool(true),
                OscArg::Blob(vec![1, 2, 3]),
                OscArg::Array(vec![OscArg::Nil, OscArg::Impulse]),
            ],
        )
        .unwrap();

        insta::assert_snapshot!(msg.to_string(), @r#"/test/addr [1, "a", 1.0, true, blob(3 bytes), [nil, impulse]]"#);
    }

    #[test]
    fn test_wide_and_extended_tags_keep_their_type() {
        let decoded = OscMessage::from_packet(OscPacket::Message(rosc::OscMessage {
            addr: "/x".to_string(),
            args: vec![
                OscType::Long(1 << 40),
                OscType::Double(0.1),
                OscType::Char('q'),
                OscType::Time(OscTime {
                    seconds: 1,
                    fractional: 0x8000_0000,
                }),
                OscType::Color(OscColor {
                    red: 255,
                    green: 0,
                    blue: 16,
                    alpha: 128,
                }),
                OscType::Midi(OscMidiMessage {
                    port: 0,
                    status: 0x90,
                    data1: 60,
                    data2: 100,
                }),
            ],
        }));

        let msg = &decoded[0];
        assert_eq!(msg.type_tags(), ",hdctrm");
        insta::assert_snapshot!(msg.to_string(), @"/x [1099511627776, 0.1, 'q', time(1.80000000), color(255, 0, 16, 128), midi(0, 0x90, 60, 100)]");

        let bytes = msg.encode().unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        assert_eq!(&OscMessage::from_packet(packet)[0], msg);
    }

    #[test]
    fn test_type_tags() {
        let msg = OscMessage::new(
            "/x",
            vec![
                OscArg::Int(1),
                OscArg::Bool(false),
                OscArg::Array(vec![OscArg::Double(2.0), OscArg::Char('c')]),
            ],
        )
        .unwrap();
        assert_eq!(msg.type_tags(), ",iF[dc]");
    }

    #[test]
    fn test_from_packet_flattens_bundles_in_order() {
        let msg = |addr: &str| {
            OscPacket::Message(rosc::OscMessage {
                addr: addr.to_string(),
                args: vec![],
            })
        };
        let packet = OscPacket::Bundle(rosc::OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                msg("/a"),
                OscPacket::Bundle(rosc::OscBundle {
                    timetag: OscTime {
                        seconds: 0,
                        fractional: 1,
                    },
                    content: vec![msg("/b"), msg("/c")],
                }),
                msg("/d"),
            ],
        });

        let addrs: Vec<_> = OscMessage::from_packet(packet)
            .into_iter()
            .map(|m| m.addr)
            .collect();
        assert_eq!(addrs, vec!["/a", "/b", "/c", "/d"]);
    }

    #[test]
    fn test_encode_decodes_with_rosc() {
        let msg = OscMessage::new(
            "/msc/go/12",
            vec![OscArg::Int(1), OscArg::String("a".into())],
        )
        .unwrap();

        let bytes = msg.encode().unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        assert_eq!(OscMessage::from_packet(packet), vec![msg]);
    }
}
