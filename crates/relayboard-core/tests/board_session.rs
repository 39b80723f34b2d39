use pretty_assertions::assert_eq;
use relayboard_core::board::{Board, BoardConfig, BoardState};
use relayboard_core::protocol::{
    AdcReading, BoardError, PortKind, RelayValues, Transport, TransportError,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing_subscriber::EnvFilter;

/// What the scripted board has seen and will answer
#[derive(Default)]
struct MockState {
    written: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    /// Returned by every read once `replies` is exhausted
    noise: Option<Vec<u8>>,
    reads: usize,
    fail_on_write: bool,
    closed: bool,
}

/// Scripted transport; clones share the same state
#[derive(Clone, Default)]
struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn reply(&self, text: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(text.as_bytes().to_vec());
        self
    }

    fn noisy(&self, bytes: &[u8]) {
        self.state.lock().unwrap().noise = Some(bytes.to_vec());
    }

    fn fail_writes(&self) {
        self.state.lock().unwrap().fail_on_write = true;
    }

    fn written(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .written
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_write {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Serial write failed",
            )));
        }
        state.written.push(data.to_vec());
        Ok(data.len())
    }

    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        let mut data = match state.replies.pop_front() {
            Some(reply) => reply,
            None => state.noise.clone().unwrap_or_default(),
        };
        data.truncate(max_bytes);
        Ok(data)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Route session logs through the test harness; `RUST_LOG` picks the level
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn board_with(relay_count: usize) -> (Board, MockTransport) {
    init_tracing();
    let mock = MockTransport::new();
    let board = Board::with_transport(
        BoardConfig::new("/dev/ttyACM0", relay_count),
        Box::new(mock.clone()),
    )
    .unwrap();
    (board, mock)
}

#[test]
fn test_get_device_name() {
    let (mut board, mock) = board_with(16);
    mock.reply("id get\n\r0000abc1\n\r>");

    assert_eq!(board.get_device_name().unwrap(), "0000abc1");
    assert_eq!(mock.written(), vec!["id get\r"]);
}

#[test]
fn test_set_device_name_normalizes() {
    let (mut board, mock) = board_with(16);
    mock.reply("id set 0000abc1\n\r>");

    assert_eq!(board.set_device_name("ab!c#1").unwrap(), "0000abc1");
    assert_eq!(mock.written(), vec!["id set 0000abc1\r"]);
}

#[test]
fn test_read_and_set_gpio() {
    let (mut board, mock) = board_with(8);
    mock.reply("gpio read 3\n\r\n1\n\r>")
        .reply("gpio clear 3 \n\r>")
        .reply("gpio read 3\n\r\n0\n\r>");

    assert!(board.read_gpio(3).unwrap());
    board.set_gpio(3, false).unwrap();
    assert!(!board.read_gpio(3).unwrap());
    assert_eq!(
        mock.written(),
        vec!["gpio read 3\n\r", "gpio clear 3 \r", "gpio read 3\n\r"]
    );
}

#[test]
fn test_invalid_ports_do_no_io() {
    let (mut board, mock) = board_with(8);

    for port in [10u32, 42, u32::MAX] {
        assert!(matches!(
            board.read_gpio(port),
            Err(BoardError::InvalidPort {
                kind: PortKind::Gpio,
                ..
            })
        ));
        assert!(matches!(
            board.set_gpio(port, true),
            Err(BoardError::InvalidPort { .. })
        ));
    }
    assert!(matches!(
        board.get_adc(5, true),
        Err(BoardError::InvalidPort {
            kind: PortKind::Adc,
            port: 5
        })
    ));
    assert!(matches!(
        board.set_relay(8, true),
        Err(BoardError::InvalidPort {
            kind: PortKind::Relay,
            port: 8
        })
    ));
    assert!(mock.written().is_empty());
    assert_eq!(mock.reads(), 0);
}

#[test]
fn test_adc_readings() {
    let (mut board, mock) = board_with(8);
    mock.reply("adc read 0\n\r1023\n\r>")
        .reply("adc read 4\n\r0\n\r>")
        .reply("adc read 2\n\r512\n\r>");

    match board.get_adc(0, false).unwrap() {
        AdcReading::Volts(v) => assert!((v - 3.3).abs() < 1e-9),
        other => panic!("expected volts, got {:?}", other),
    }
    assert_eq!(board.get_adc(4, false).unwrap(), AdcReading::Volts(0.0));
    assert_eq!(board.read_adc_raw(2).unwrap(), 512);
    assert_eq!(
        mock.written(),
        vec!["adc read 0\r", "adc read 4\r", "adc read 2\r"]
    );
}

#[test]
fn test_get_relays_expands_to_board_width() {
    let (mut board, mock) = board_with(16);
    mock.reply("relay readall\n\r0089\n\r>");

    let state = board.get_relays().unwrap();
    assert_eq!(state.len(), 16);
    assert_eq!(state.active(), vec![0, 3, 7]);
    assert_eq!(mock.written(), vec!["relay readall\r"]);
}

#[test]
fn test_set_relays_from_bits_and_word() {
    let (mut board, mock) = board_with(8);
    mock.reply("relay writeall 89\n\r>")
        .reply("relay writeall 89\n\r>")
        .reply("relay writeall ff\n\r>");

    board
        .set_relays(vec![true, false, false, true, false, false, false, true])
        .unwrap();
    board.set_relays(0x89u64).unwrap();
    let written = board.set_relays(0x1ffu64).unwrap();

    assert_eq!(written.len(), 8);
    assert_eq!(written.active(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(
        mock.written(),
        vec![
            "relay writeall 89\r",
            "relay writeall 89\r",
            "relay writeall ff\r"
        ]
    );
}

#[test]
fn test_set_relays_ignores_entries_past_board_width() {
    let (mut board, mock) = board_with(4);
    mock.reply("relay writeall 1\n\r>");

    let levels: Vec<i64> = vec![1, 0, 0, 0, 1, 1, 1];
    board.set_relays(levels).unwrap();
    assert_eq!(mock.written(), vec!["relay writeall 1\r"]);
}

#[test]
fn test_set_relays_rejects_float_and_text_before_io() {
    let (mut board, mock) = board_with(8);

    for input in [json!(3.5), json!("89"), json!([1, "on"])] {
        let result = RelayValues::try_from(&input).and_then(|values| board.set_relays(values));
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));
    }
    assert!(mock.written().is_empty());

    mock.reply("relay writeall 05\n\r>");
    let values = RelayValues::try_from(&json!([1, 0, 1])).unwrap();
    board.set_relays(values).unwrap();
    assert_eq!(mock.written(), vec!["relay writeall 05\r"]);
}

#[test]
fn test_set_single_relay() {
    let (mut board, mock) = board_with(8);
    mock.reply("relay readall\n\r81\n\r>")
        .reply("relay writeall 89\n\r>");

    let state = board.set_relay(3, true).unwrap();
    assert_eq!(state.active(), vec![0, 3, 7]);
    assert_eq!(
        mock.written(),
        vec!["relay readall\r", "relay writeall 89\r"]
    );
}

#[test]
fn test_clear_buffer_quiet_line() {
    let (mut board, mock) = board_with(8);

    assert!(board.clear_buffer().unwrap());
    assert_eq!(mock.reads(), 1);
    assert!(mock.written().is_empty());
}

#[test]
fn test_clear_buffer_drains_then_succeeds() {
    let (mut board, mock) = board_with(8);
    mock.reply("stray").reply(">");

    assert!(board.clear_buffer().unwrap());
    assert_eq!(mock.reads(), 3);
}

#[test]
fn test_clear_buffer_gives_up_after_limit() {
    let (mut board, mock) = board_with(8);
    mock.noisy(b"\xff\xfe noise");

    assert!(!board.clear_buffer().unwrap());
    assert_eq!(mock.reads(), 11);

    assert!(!board.clear_buffer_with(3).unwrap());
    assert_eq!(mock.reads(), 11 + 4);
}

#[test]
fn test_clear_buffer_with_unbounded_limit() {
    let (mut board, mock) = board_with(8);

    assert!(board.clear_buffer_with(usize::MAX).unwrap());
    assert_eq!(mock.reads(), 1);

    mock.reply("stray").reply("more stray");
    assert!(board.clear_buffer_with(usize::MAX).unwrap());
    assert_eq!(mock.reads(), 1 + 3);
}

#[test]
fn test_failed_open_is_not_connected() {
    let mut board = Board::open_with(BoardConfig::new("COM99", 16), |_| {
        Err(TransportError::Serial("No such file or directory".to_string()))
    });

    assert!(!board.is_connected());
    assert!(matches!(
        board.state(),
        BoardState::Failed { reason } if reason.contains("No such file")
    ));
    assert!(matches!(board.get_device_name(), Err(BoardError::NotConnected)));
    assert!(matches!(board.read_gpio(0), Err(BoardError::NotConnected)));
    assert!(matches!(board.get_adc(0, true), Err(BoardError::NotConnected)));
    assert!(matches!(board.set_relays(0u64), Err(BoardError::NotConnected)));
    assert!(matches!(board.clear_buffer(), Err(BoardError::NotConnected)));
    assert!(matches!(
        board.into_connected(),
        Err(BoardError::ConnectionFailed(_))
    ));
}

#[test]
fn test_open_with_invalid_geometry_fails() {
    let mock = MockTransport::new();
    let board = Board::open_with(BoardConfig::new("COM3", 0), |_| {
        Ok(Box::new(mock.clone()) as Box<dyn Transport>)
    });
    assert!(matches!(board.state(), BoardState::Failed { .. }));
}

#[test]
fn test_closed_board_does_no_io() {
    let (mut board, mock) = board_with(8);
    board.close().unwrap();

    assert!(mock.is_closed());
    assert_eq!(board.state(), &BoardState::Closed);
    assert!(matches!(board.get_relays(), Err(BoardError::NotConnected)));
    assert!(matches!(board.set_gpio(1, true), Err(BoardError::NotConnected)));
    assert!(matches!(board.set_device_name("x"), Err(BoardError::NotConnected)));
    assert!(matches!(board.clear_buffer(), Err(BoardError::NotConnected)));
    assert!(matches!(board.close(), Err(BoardError::NotConnected)));
    assert!(mock.written().is_empty());
    assert_eq!(mock.reads(), 0);
}

#[test]
fn test_silent_board_times_out() {
    let (mut board, _mock) = board_with(8);

    let err = board.get_device_name().unwrap_err();
    assert!(matches!(err, BoardError::Transport(TransportError::Timeout)));
    assert!(err.is_retryable());
}

#[test]
fn test_write_failure_is_transport_error() {
    let (mut board, mock) = board_with(8);
    mock.fail_writes();

    assert!(matches!(
        board.set_gpio(0, true),
        Err(BoardError::Transport(TransportError::Io(_)))
    ));
    assert_eq!(mock.reads(), 0);
}

#[test]
fn test_garbage_reply_then_drain_and_retry() {
    let (mut board, mock) = board_with(8);
    mock.reply("elay readall\n\r00\n\r>")
        .reply("tail of previous reply")
        .reply("")
        .reply("relay readall\n\r01\n\r>");

    let err = board.get_relays().unwrap_err();
    assert!(matches!(err, BoardError::MalformedResponse { .. }));
    assert!(err.is_retryable());

    assert!(board.clear_buffer().unwrap());
    assert_eq!(board.get_relays().unwrap().active(), vec![0]);
}

#[test]
fn test_boards_on_separate_threads() {
    let handles: Vec<_> = (0..2u32)
        .map(|n| {
            let (mut board, mock) = board_with(8);
            mock.reply(&format!("gpio read {}\n\r\n1\n\r>", n));
            thread::spawn(move || {
                let level = board.read_gpio(n);
                (level.unwrap(), mock.written())
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let (level, written) = handle.join().unwrap();
        assert!(level);
        assert_eq!(written, vec![format!("gpio read {}\n\r", n)]);
    }
}
