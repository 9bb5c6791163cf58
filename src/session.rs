//! The interactive command loop: read a command from the operator, send it
//! to the transmitter, read back one configuration record and print it.
//!
//! Everything here is synchronous. The operator's terminal and the device are
//! passed in, so the loop can be driven by scripted input in tests.

use std::io::{BufRead, ErrorKind, Read, Write};

use crate::error::DecodeError;
use crate::protocol::{ChannelConfig, Command};
use crate::RECORD_LEN;

pub const COMMAND_PROMPT: &str = "Enter command (e.g., C0) or 'exit' to quit: ";

#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Prefix each raw data line with the time (UTC) it was received.
    pub timestamps: bool,
}

/// What happened to a single operator command.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Exit,
    Decoded(ChannelConfig),
    DecodeFailed(DecodeError),
    /// Fewer than RECORD_LEN bytes arrived before the read timed out.
    ShortRead {
        received: usize,
    },
    SendFailed(ErrorKind),
    ReadFailed(ErrorKind),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub commands_sent: usize,
    pub records_decoded: usize,
    pub decode_failures: usize,
    pub short_reads: usize,
    pub send_failures: usize,
    pub read_failures: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Exit => return,
            Outcome::SendFailed(_) => {
                self.send_failures += 1;
                return;
            }
            Outcome::Decoded(_) => self.records_decoded += 1,
            Outcome::DecodeFailed(_) => self.decode_failures += 1,
            Outcome::ShortRead { .. } => self.short_reads += 1,
            Outcome::ReadFailed(_) => self.read_failures += 1,
        }
        self.commands_sent += 1;
    }
}

pub struct Session<D: Read + Write> {
    device: D,
    options: SessionOptions,
}

impl<D: Read + Write> Session<D> {
    pub fn new(device: D, options: SessionOptions) -> Session<D> {
        Session { device, options }
    }

    /// Gives back the device connection. Dropping the session instead closes it.
    pub fn into_inner(self) -> D {
        self.device
    }

    /// Runs commands until the operator exits (or their input ends).
    /// Device failures are reported to `out` and never end the loop, only
    /// errors on the operator's own terminal are returned.
    pub fn run(
        &mut self,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> std::io::Result<Summary> {
        let mut summary = Summary::default();
        loop {
            let outcome = self.step(input, out)?;
            summary.record(&outcome);
            if outcome == Outcome::Exit {
                log::info!("session finished: {summary:?}");
                return Ok(summary);
            }
        }
    }

    pub fn step(
        &mut self,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> std::io::Result<Outcome> {
        write!(out, "{COMMAND_PROMPT}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // Treat a closed terminal (e.g. Ctrl-D) like "exit".
            writeln!(out)?;
            return Ok(Outcome::Exit);
        }

        let command = Command::parse(&line);
        let Some(wire) = command.to_wire() else {
            return Ok(Outcome::Exit);
        };
        if let Some(warning) = command.reply_warning() {
            log::warn!("{warning}");
        }

        log::debug!("sending {:?}", String::from_utf8_lossy(&wire));
        if let Err(e) = self.send(&wire) {
            writeln!(out, "Failed to send command: {e}")?;
            return Ok(Outcome::SendFailed(e.kind()));
        }

        let reply = match read_reply(&mut self.device) {
            Ok(reply) => reply,
            Err(e) => {
                writeln!(out, "Failed to read reply: {e}")?;
                return Ok(Outcome::ReadFailed(e.kind()));
            }
        };
        log::debug!("received {} bytes: {}", reply.len(), hex::encode(&reply));

        if reply.len() != RECORD_LEN {
            writeln!(out, "Failed to parse struct. Data length may be incorrect.")?;
            return Ok(Outcome::ShortRead {
                received: reply.len(),
            });
        }

        match self.timestamp() {
            Some(timestamp) => {
                writeln!(out, "{timestamp} Raw Data: {}", hex::encode(&reply))?
            }
            None => writeln!(out, "Raw Data: {}", hex::encode(&reply))?,
        }
        match ChannelConfig::decode(&reply) {
            Ok(config) => {
                log::debug!(
                    "decoded {} #{} record",
                    config.device_type.description(),
                    config.device_id
                );
                writeln!(out, "{config}")?;
                Ok(Outcome::Decoded(config))
            }
            Err(e) => {
                writeln!(out, "Error parsing struct: {e}")?;
                Ok(Outcome::DecodeFailed(e))
            }
        }
    }

    fn send(&mut self, wire: &[u8]) -> std::io::Result<()> {
        self.device.write_all(wire)?;
        self.device.flush()
    }

    fn timestamp(&self) -> Option<String> {
        if !self.options.timestamps {
            return None;
        }
        let format = time::macros::format_description!(
            version = 2,
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        );
        time::OffsetDateTime::now_utc().format(&format).ok()
    }
}

/// Reads until RECORD_LEN bytes have arrived or the device stops sending.
/// A timeout is not an error here, it simply ends the reply early.
pub fn read_reply(device: &mut impl Read) -> std::io::Result<Vec<u8>> {
    let mut buf = [0u8; RECORD_LEN];
    let mut filled = 0;
    while filled < RECORD_LEN {
        match device.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => match e.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => break,
                ErrorKind::Interrupted => continue,
                _ => return Err(e),
            },
        }
    }
    Ok(buf[..filled].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DeviceType;
    use std::collections::VecDeque;
    use std::io::Cursor;

    const EXAMPLE_RECORD: [u8; 12] = [
        0x01, b'S', 0x02, 0x00, 0x05, 0x9c, 0xff, 0x64, 0x00, 0x00, 0xff, 0x80,
    ];

    /// Stands in for the transmitter: each newline written releases the next
    /// scripted reply, delivered in the given chunks. Reads with nothing
    /// pending time out, like a real port does.
    #[derive(Default)]
    struct ScriptedDevice {
        replies: VecDeque<Vec<Vec<u8>>>,
        pending: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        write_error: Option<ErrorKind>,
        read_error: Option<ErrorKind>,
    }

    impl ScriptedDevice {
        fn with_replies(replies: Vec<Vec<Vec<u8>>>) -> ScriptedDevice {
            ScriptedDevice {
                replies: replies.into(),
                ..Default::default()
            }
        }
    }

    impl Read for ScriptedDevice {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.read_error {
                return Err(kind.into());
            }
            let Some(mut chunk) = self.pending.pop_front() else {
                return Err(ErrorKind::TimedOut.into());
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.pending.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for ScriptedDevice {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.write_error {
                return Err(kind.into());
            }
            self.written.extend_from_slice(buf);
            for _ in buf.iter().filter(|b| **b == b'\n') {
                if let Some(reply) = self.replies.pop_front() {
                    self.pending.extend(reply);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn example_config() -> ChannelConfig {
        ChannelConfig {
            version: 1,
            device_type: DeviceType::ThreeStateSwitch,
            device_id: 2,
            reverse: 0,
            trim: 5,
            analog_min: -100,
            analog_max: 100,
            min_endpoint: 0,
            max_endpoint: 255,
            center_point: 128,
        }
    }

    fn run_script(device: ScriptedDevice, input: &str) -> (Summary, String, ScriptedDevice) {
        let mut session = Session::new(device, SessionOptions::default());
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let summary = session.run(&mut input, &mut out).unwrap();
        (
            summary,
            String::from_utf8(out).unwrap(),
            session.into_inner(),
        )
    }

    #[test]
    fn test_read_reply() {
        struct TestCase<'a> {
            name: &'a str,
            chunks: Vec<Vec<u8>>,
            expected_result: Vec<u8>,
        }
        let tests = [
            TestCase {
                name: "Whole",
                chunks: vec![EXAMPLE_RECORD.to_vec()],
                expected_result: EXAMPLE_RECORD.to_vec(),
            },
            TestCase {
                name: "Chunked",
                chunks: vec![
                    EXAMPLE_RECORD[..1].to_vec(),
                    EXAMPLE_RECORD[1..7].to_vec(),
                    EXAMPLE_RECORD[7..].to_vec(),
                ],
                expected_result: EXAMPLE_RECORD.to_vec(),
            },
            TestCase {
                name: "Nothing",
                chunks: vec![],
                expected_result: vec![],
            },
            TestCase {
                name: "Short",
                chunks: vec![vec![1, 2, 3]],
                expected_result: vec![1, 2, 3],
            },
            TestCase {
                name: "LongerThanRecord",
                chunks: vec![b"Invalid channel index\r\n".to_vec()],
                expected_result: b"Invalid chan".to_vec(),
            },
        ];
        for case in tests {
            let mut device = ScriptedDevice {
                pending: case.chunks.into(),
                ..Default::default()
            };
            let got = read_reply(&mut device).unwrap();
            assert_eq!(
                got, case.expected_result,
                "{}: got={got:?}, want={:?}",
                case.name, case.expected_result
            );
        }
    }

    #[test]
    fn test_read_reply_propagates_device_errors() {
        let mut device = ScriptedDevice {
            read_error: Some(ErrorKind::BrokenPipe),
            ..Default::default()
        };
        let got = read_reply(&mut device);
        assert_eq!(got.unwrap_err().kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_exit_sends_nothing() {
        for input in ["exit\n", "EXIT\n", "  Exit  \n", ""] {
            let device = ScriptedDevice::with_replies(vec![vec![EXAMPLE_RECORD.to_vec()]]);
            let (summary, _, device) = run_script(device, input);
            assert_eq!(summary, Summary::default(), "{input:?}");
            assert!(device.written.is_empty(), "{input:?}: wrote {:?}", device.written);
        }
    }

    #[test]
    fn test_decodes_record() {
        let device = ScriptedDevice::with_replies(vec![vec![
            EXAMPLE_RECORD[..5].to_vec(),
            EXAMPLE_RECORD[5..].to_vec(),
        ]]);
        let mut session = Session::new(device, SessionOptions::default());
        let mut input = Cursor::new(b"C0\n".to_vec());
        let mut out = Vec::new();

        let got = session.step(&mut input, &mut out).unwrap();
        assert_eq!(got, Outcome::Decoded(example_config()));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!(
                "{COMMAND_PROMPT}Raw Data: 01530200059cff640000ff80\n\
                 Version: 1, Device Type: S, Device ID: 2, Reverse: 0, Trim: 5\n\
                 Analog Min: -100, Analog Max: 100, Min Endpoint: 0, Max Endpoint: 255, Center Point: 128\n"
            )
        );
        assert_eq!(session.into_inner().written, b"C0\n");
    }

    #[test]
    fn test_short_read_then_prompts_again() {
        let device = ScriptedDevice::with_replies(vec![vec![vec![0x01, b'S', 0x02]], vec![]]);
        let (summary, out, device) = run_script(device, "C1\nC2\nexit\n");
        assert_eq!(
            summary,
            Summary {
                commands_sent: 2,
                short_reads: 2,
                ..Default::default()
            }
        );
        let failure = "Failed to parse struct. Data length may be incorrect.\n";
        assert_eq!(
            out,
            format!("{COMMAND_PROMPT}{failure}{COMMAND_PROMPT}{failure}{COMMAND_PROMPT}")
        );
        assert_eq!(device.written, b"C1\nC2\n");
    }

    #[test]
    fn test_short_read_outcome() {
        let device = ScriptedDevice::with_replies(vec![vec![vec![0xaa; 11]]]);
        let mut session = Session::new(device, SessionOptions::default());
        let got = session
            .step(&mut Cursor::new(b"C3\n".to_vec()), &mut Vec::<u8>::new())
            .unwrap();
        assert_eq!(got, Outcome::ShortRead { received: 11 });
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let mut record = EXAMPLE_RECORD;
        record[1] = 0xfe;
        let device = ScriptedDevice::with_replies(vec![vec![record.to_vec()]]);
        let (summary, out, _) = run_script(device, "C4\nexit\n");
        assert_eq!(summary.decode_failures, 1);
        assert_eq!(summary.commands_sent, 1);
        assert_eq!(
            out,
            format!(
                "{COMMAND_PROMPT}Raw Data: 01fe0200059cff640000ff80\n\
                 Error parsing struct: device type byte 0xfe is not ASCII\n\
                 {COMMAND_PROMPT}"
            )
        );
    }

    #[test]
    fn test_send_failure_is_reported_and_loop_continues() {
        let device = ScriptedDevice {
            write_error: Some(ErrorKind::BrokenPipe),
            ..Default::default()
        };
        let (summary, out, _) = run_script(device, "C0\nexit\n");
        assert_eq!(
            summary,
            Summary {
                send_failures: 1,
                ..Default::default()
            }
        );
        assert!(out.contains("Failed to send command: "), "{out}");
        assert!(out.ends_with(COMMAND_PROMPT), "{out}");
    }

    #[test]
    fn test_read_failure_is_reported() {
        let device = ScriptedDevice {
            read_error: Some(ErrorKind::BrokenPipe),
            ..Default::default()
        };
        let (summary, out, _) = run_script(device, "C0\nexit\n");
        assert_eq!(summary.read_failures, 1);
        assert!(out.contains("Failed to read reply: "), "{out}");
    }

    #[test]
    fn test_mixed_session() {
        let device = ScriptedDevice::with_replies(vec![
            vec![EXAMPLE_RECORD.to_vec()],
            // X returns ten channel values, which is not a record.
            vec![vec![0x7f; 10]],
            vec![EXAMPLE_RECORD.to_vec()],
        ]);
        let (summary, _, device) = run_script(device, "C0\nX\nC9\nExit\nC1\n");
        assert_eq!(
            summary,
            Summary {
                commands_sent: 3,
                records_decoded: 2,
                short_reads: 1,
                ..Default::default()
            }
        );
        assert_eq!(device.written, b"C0\nX\nC9\n");
    }

    #[test]
    fn test_timestamps() {
        let device = ScriptedDevice::with_replies(vec![vec![EXAMPLE_RECORD.to_vec()]]);
        let mut session = Session::new(device, SessionOptions { timestamps: true });
        let mut out = Vec::new();
        session
            .step(&mut Cursor::new(b"C0\n".to_vec()), &mut out)
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        let line = out
            .strip_prefix(COMMAND_PROMPT)
            .and_then(|rest| rest.lines().next())
            .unwrap();
        let (timestamp, rest) = line.split_once(' ').unwrap();
        // e.g. 2024-01-31T12:34:56
        assert_eq!(timestamp.len(), 19, "{timestamp}");
        assert_eq!(&timestamp[10..11], "T", "{timestamp}");
        assert_eq!(rest, "Raw Data: 01530200059cff640000ff80");
    }
}
