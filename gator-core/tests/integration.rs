//! Integration tests: handshake, framing, persistence and the watchdog
//! over a real TCP connection on localhost.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use bytes::BytesMut;
use gator_core::{
    FatalHandler, Frame, FrameCodec, GatorError, MessageKind, PeerStream, SenderConfig,
    SessionFlag, TcpSender, escalate,
};
use tokio_util::codec::{Decoder, Encoder};

// ── Helpers ──────────────────────────────────────────────────────

/// A fatal handler that only counts, so tests survive escalation.
fn counting_handler() -> (Arc<AtomicUsize>, Arc<dyn FatalHandler>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let handler: Arc<dyn FatalHandler> = Arc::new(move |_: &GatorError| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, handler)
}

/// Connect a collector that sends `lines` and then reads the greeting.
/// Returns the daemon side of the connection and the collector thread.
fn attach_collector(
    lines: &'static [&'static str],
) -> (TcpStream, std::thread::JoinHandle<(BufReader<TcpStream>, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let collector = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        for line in lines {
            stream.write_all(line.as_bytes()).unwrap();
            stream.write_all(b"\n").unwrap();
        }
        let mut reader = BufReader::new(stream);
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();
        (reader, greeting)
    });

    let (daemon_side, _) = listener.accept().unwrap();
    (daemon_side, collector)
}

/// Read exactly one frame from the collector's socket.
fn read_frame(reader: &mut impl Read, buf: &mut BytesMut, codec: &mut FrameCodec) -> Option<Frame> {
    loop {
        if let Some(frame) = codec.decode(buf).unwrap() {
            return Some(frame);
        }
        let mut chunk = [0u8; 4096];
        let n = reader.read(&mut chunk).unwrap();
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn pre_framed(kind: MessageKind, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    FrameCodec::new()
        .encode(Frame::new(kind, payload.to_vec()), &mut buf)
        .unwrap();
    buf.to_vec()
}

// ── Handshake ────────────────────────────────────────────────────

#[test]
fn test_handshake_after_legacy_chatter() {
    let (stream, collector) = attach_collector(&["VERSION", "garbage 1 2 3", "STREAMLINE"]);
    let session = SessionFlag::new();
    let (fatal_count, fatal) = counting_handler();

    let sender = TcpSender::new(
        Some(PeerStream::new(stream)),
        SenderConfig::default(),
        &session,
        fatal,
    )
    .unwrap();

    let (_, greeting) = collector.join().unwrap();
    assert_eq!(greeting, "GATOR 231\n");
    assert!(session.is_waiting_on_command());
    assert!(sender.has_connection());
    assert_eq!(fatal_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_handshake_disconnect_escalates_once() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let collector = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"not the token\n").unwrap();
        // dropped before STREAMLINE
    });
    let (stream, _) = listener.accept().unwrap();
    collector.join().unwrap();

    let (fatal_count, fatal) = counting_handler();
    let result = TcpSender::new(
        Some(PeerStream::new(stream)),
        SenderConfig::default(),
        &SessionFlag::new(),
        Arc::clone(&fatal),
    );
    let sender = escalate(fatal.as_ref(), result);

    assert!(sender.is_none());
    assert_eq!(fatal_count.load(Ordering::SeqCst), 1);
}

// ── Framing ──────────────────────────────────────────────────────

#[test]
fn test_frames_decode_on_collector() {
    let (stream, collector) = attach_collector(&["STREAMLINE"]);
    let (_, fatal) = counting_handler();
    let sender = TcpSender::new(
        Some(PeerStream::new(stream)),
        SenderConfig::default(),
        &SessionFlag::new(),
        fatal,
    )
    .unwrap();
    let (mut reader, _) = collector.join().unwrap();

    let big: Vec<u8> = (0..250_000u32).map(|i| (i % 251) as u8).collect();
    sender.send(b"<captured/>", MessageKind::xml()).unwrap();
    sender.send(&big, MessageKind::Other(0x20)).unwrap();
    sender
        .send(&pre_framed(MessageKind::RawCapture, b"apc"), MessageKind::RawCapture)
        .unwrap();
    sender.close().unwrap();

    let mut buf = BytesMut::new();
    let mut codec = FrameCodec::new();

    let first = read_frame(&mut reader, &mut buf, &mut codec).unwrap();
    assert_eq!(first.kind, MessageKind::xml());
    assert_eq!(&first.payload[..], b"<captured/>");

    let second = read_frame(&mut reader, &mut buf, &mut codec).unwrap();
    assert_eq!(second.kind, MessageKind::Other(0x20));
    assert_eq!(&second.payload[..], &big[..]);

    let third = read_frame(&mut reader, &mut buf, &mut codec).unwrap();
    assert_eq!(third.kind, MessageKind::RawCapture);
    assert_eq!(&third.payload[..], b"apc");

    assert!(read_frame(&mut reader, &mut buf, &mut codec).is_none());
}

// ── Concurrency + persistence ────────────────────────────────────

#[test]
fn test_concurrent_raw_capture_to_wire_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let (stream, collector) = attach_collector(&["STREAMLINE"]);
    let (_, fatal) = counting_handler();
    let config = SenderConfig {
        deadline: Duration::from_secs(8),
        max_rate_bps: 8 * 1000,
    };
    let sender = Arc::new(
        TcpSender::new(Some(PeerStream::new(stream)), config, &SessionFlag::new(), fatal).unwrap(),
    );
    let path = sender.create_data_file(Some(dir.path())).unwrap().unwrap();
    let (mut reader, _) = collector.join().unwrap();

    const PRODUCERS: u8 = 6;
    const BLOCKS: usize = 20;

    // Drain the wire concurrently so the producers never stall.
    let drain = std::thread::spawn(move || {
        let mut buf = BytesMut::new();
        let mut codec = FrameCodec::new();
        let mut frames = Vec::new();
        while let Some(frame) = read_frame(&mut reader, &mut buf, &mut codec) {
            frames.push(frame);
        }
        frames
    });

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let sender = Arc::clone(&sender);
            std::thread::spawn(move || {
                for _ in 0..BLOCKS {
                    let block = pre_framed(MessageKind::RawCapture, &[id; 3000]);
                    sender.send(&block, MessageKind::RawCapture).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    sender.close().unwrap();

    let check = |frames: &[Frame]| {
        assert_eq!(frames.len(), PRODUCERS as usize * BLOCKS);
        for frame in frames {
            assert_eq!(frame.kind, MessageKind::RawCapture);
            assert_eq!(frame.payload.len(), 3000);
            let id = frame.payload[0];
            assert!(frame.payload.iter().all(|&b| b == id));
        }
    };

    check(&drain.join().unwrap());

    let mut on_disk = BytesMut::from(&std::fs::read(&path).unwrap()[..]);
    let mut codec = FrameCodec::new();
    let mut frames = Vec::new();
    while let Some(frame) = codec.decode(&mut on_disk).unwrap() {
        frames.push(frame);
    }
    assert!(on_disk.is_empty());
    check(&frames);
}

// ── Watchdog ─────────────────────────────────────────────────────

#[test]
fn test_stalled_collector_trips_watchdog_once() {
    let (stream, collector) = attach_collector(&["STREAMLINE"]);

    let count = Arc::new(AtomicUsize::new(0));
    let (fired_tx, fired_rx) = mpsc::channel();
    let seen = Arc::clone(&count);
    let fatal: Arc<dyn FatalHandler> = Arc::new(move |e: &GatorError| {
        assert!(matches!(e, GatorError::WatchdogExpired(_)));
        seen.fetch_add(1, Ordering::SeqCst);
        let _ = fired_tx.send(());
    });

    let config = SenderConfig {
        deadline: Duration::from_millis(200),
        // 1 MiB chunks at this deadline.
        max_rate_bps: 8 * 1024 * 1024 * 5,
    };
    let sender = Arc::new(
        TcpSender::new(Some(PeerStream::new(stream)), config, &SessionFlag::new(), fatal).unwrap(),
    );
    // The collector stops reading after the greeting.
    let (reader, _) = collector.join().unwrap();

    let producer = {
        let sender = Arc::clone(&sender);
        std::thread::spawn(move || sender.send(&vec![0u8; 64 * 1024 * 1024], MessageKind::RawCapture))
    };

    fired_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("watchdog never fired");

    // Hang up so the blocked write fails and the producer returns.
    drop(reader);
    let result = producer.join().unwrap();
    assert!(matches!(result, Err(GatorError::Connection(_))));

    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

// ── Teardown ─────────────────────────────────────────────────────

#[test]
fn test_file_only_teardown_twice() {
    let (_, fatal) = counting_handler();
    let sender = TcpSender::file_only(SenderConfig::default(), fatal).unwrap();
    assert!(!sender.has_connection());
    assert!(!sender.has_data_file());

    sender.send(b"nowhere", MessageKind::RawCapture).unwrap();
    sender.close().unwrap();
    sender.close().unwrap();
}
