use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stompsync_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A byte string shown as text when it is UTF-8 and as base64 otherwise.
#[derive(Serialize)]
struct Payload {
    encoding: &'static str,
    data: String,
}

impl Payload {
    fn new(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self {
                encoding: "utf8",
                data: text.to_string(),
            },
            Err(_) => Self {
                encoding: "base64",
                data: STANDARD.encode(bytes),
            },
        }
    }
}

#[derive(Serialize)]
struct InvalidationOutput<'a> {
    seq: usize,
    channel: &'a str,
    size: usize,
    payload: Payload,
    timestamp: String,
}

pub fn print_invalidation(seq: usize, channel: &str, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = InvalidationOutput {
                seq,
                channel,
                size: payload.len(),
                payload: Payload::new(payload),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "CHANNEL", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    channel.to_string(),
                    payload.len().to_string(),
                    preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{seq} channel={channel} size={} payload={}",
                payload.len(),
                preview(payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
            print_raw(b"\n");
        }
    }
}

#[derive(Serialize)]
struct HeaderOutput<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    seq: usize,
    command: &'a str,
    headers: Vec<HeaderOutput<'a>>,
    body_size: usize,
    body: Option<Payload>,
}

pub fn print_frame(seq: usize, frame: &Frame, format: OutputFormat) {
    let body: Option<&[u8]> = frame.body().map(|body| body.as_ref());
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                seq,
                command: frame.command(),
                headers: frame
                    .headers()
                    .map(|(name, value)| HeaderOutput { name, value })
                    .collect(),
                body_size: body.map_or(0, <[u8]>::len),
                body: body.map(Payload::new),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let headers = frame
                .headers()
                .map(|(name, value)| format!("{name}:{value}"))
                .collect::<Vec<_>>()
                .join("\n");
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "COMMAND", "HEADERS", "BODY"])
                .add_row(vec![
                    seq.to_string(),
                    frame.command().to_string(),
                    headers,
                    body.map(preview).unwrap_or_default(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let headers = frame
                .headers()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            match body {
                Some(body) => println!(
                    "#{seq} {} [{headers}] body={}",
                    frame.command(),
                    preview(body)
                ),
                None => println!("#{seq} {} [{headers}]", frame.command()),
            }
        }
        OutputFormat::Raw => {
            if let Some(body) = body {
                print_raw(body);
                print_raw(b"\n");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_falls_back_to_base64_for_binary() {
        let text = Payload::new(b"users/42");
        assert_eq!(text.encoding, "utf8");
        assert_eq!(text.data, "users/42");

        let binary = Payload::new(&[0xff, 0x00, 0x01]);
        assert_eq!(binary.encoding, "base64");
        assert_eq!(binary.data, "/wAB");
    }

    #[test]
    fn frame_json_lists_headers_in_wire_order() {
        let frame = Frame::new("MESSAGE")
            .with_header("destination", "/topic/a")
            .with_header("content-length", "2")
            .with_body(&b"hi"[..]);
        let out = FrameOutput {
            seq: 1,
            command: frame.command(),
            headers: frame
                .headers()
                .map(|(name, value)| HeaderOutput { name, value })
                .collect(),
            body_size: 2,
            body: frame.body().map(|b| Payload::new(b)),
        };

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["command"], "MESSAGE");
        assert_eq!(json["headers"][0]["name"], "destination");
        assert_eq!(json["headers"][1]["value"], "2");
        assert_eq!(json["body"]["data"], "hi");
    }
}
