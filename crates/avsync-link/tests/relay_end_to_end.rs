//! Relay behavior against fake receivers on loopback TCP.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avsync_frame::{decode_header, encode_outbound, Framing, HEADER_SIZE};
use avsync_link::{LinkConfig, Relay, RelayConfig};

fn test_config() -> LinkConfig {
    LinkConfig {
        poll_timeout: Duration::from_millis(10),
        byte_timeout: Duration::from_millis(200),
        reconnect_backoff: Duration::from_millis(50),
        connect_timeout: Duration::from_secs(1),
        ..LinkConfig::default()
    }
}

fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

fn accept(listener: &TcpListener) -> TcpStream {
    let (stream, _) = listener.accept().expect("accept should succeed");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    stream
}

fn read_delimited(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).expect("delimited read should succeed");
        received.push(byte[0]);
        if byte[0] == b'\r' {
            return received;
        }
    }
}

/// Read one eISCP frame and return its payload.
fn read_eiscp(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).expect("header read should succeed");
    let header = decode_header(&header).expect("header should be valid");
    let mut payload = vec![0u8; header.payload_len as usize];
    stream.read_exact(&mut payload).expect("payload read should succeed");
    payload
}

fn assert_silent(stream: &mut TcpStream) {
    stream
        .set_read_timeout(Some(Duration::from_millis(300)))
        .expect("read timeout should be settable");
    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(n) => panic!("unexpected {n} bytes: {:?}", buf[..n].escape_ascii().to_string()),
        Err(err) => assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)),
    }
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
}

fn write_eiscp(stream: &mut TcpStream, command: &[u8]) {
    let frame = encode_outbound(Framing::Eiscp, command).expect("encode should succeed");
    stream.write_all(&frame).expect("write should succeed");
}

fn spawn_listeners(relay: &Relay, running: &Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
    relay
        .connections()
        .map(|connection| {
            let connection = Arc::clone(connection);
            let running = Arc::clone(running);
            thread::Builder::new()
                .name(connection.name().to_string())
                .spawn(move || connection.listen(&running))
                .expect("listener thread should start")
        })
        .collect()
}

fn stop(relay: Relay, running: Arc<AtomicBool>, listeners: Vec<JoinHandle<()>>) {
    running.store(false, Ordering::SeqCst);
    for listener in listeners {
        listener.join().expect("listener should not panic");
    }
    relay.shutdown();
}

#[test]
fn power_message_reaches_each_secondary_once_in_its_framing() {
    let (primary, primary_port) = bind();
    let (tcp_secondary, tcp_port) = bind();
    let (eiscp_secondary, eiscp_port) = bind();

    let config = RelayConfig::from_json_str(&format!(
        r#"{{"primary": {{"mode": "EISCP", "ip": "127.0.0.1", "port": {primary_port}}},
            "secondaries": [
                {{"mode": "TCP", "ip": "127.0.0.1", "tcp_port": {tcp_port}}},
                {{"mode": "EISCP", "ip": "127.0.0.1", "port": {eiscp_port}}}
            ]}}"#
    ))
    .expect("config should parse");
    let relay = Relay::from_config(&config, test_config());
    let running = Arc::new(AtomicBool::new(true));
    let listeners = spawn_listeners(&relay, &running);

    let mut primary_stream = accept(&primary);
    let mut tcp_stream = accept(&tcp_secondary);
    let mut eiscp_stream = accept(&eiscp_secondary);

    write_eiscp(&mut primary_stream, b"!1PWR01");
    write_eiscp(&mut primary_stream, b"!1MVL20");

    assert_eq!(read_delimited(&mut tcp_stream), b"!1PWR01\r".to_vec());
    assert_eq!(read_eiscp(&mut eiscp_stream), b"!1PWR01\r".to_vec());
    assert_silent(&mut tcp_stream);
    assert_silent(&mut eiscp_stream);

    relay.probe_primary().expect("probe should succeed");
    assert_eq!(read_eiscp(&mut primary_stream), b"!1PWRQSTN\r".to_vec());

    stop(relay, running, listeners);
}

#[test]
fn relay_resumes_after_primary_drops() {
    let (primary, primary_port) = bind();
    let (secondary, secondary_port) = bind();

    let config = RelayConfig::from_json_str(&format!(
        r#"{{"primary": {{"mode": "EISCP", "ip": "127.0.0.1", "port": {primary_port}}},
            "secondaries": [{{"mode": "TCP", "ip": "127.0.0.1", "tcp_port": {secondary_port}}}]}}"#
    ))
    .expect("config should parse");
    let relay = Relay::from_config(&config, test_config());
    let running = Arc::new(AtomicBool::new(true));
    let listeners = spawn_listeners(&relay, &running);

    let first = accept(&primary);
    let mut secondary_stream = accept(&secondary);
    drop(first);

    let mut second = accept(&primary);
    write_eiscp(&mut second, b"!1PWR00");
    assert_eq!(read_delimited(&mut secondary_stream), b"!1PWR00\r".to_vec());

    stop(relay, running, listeners);
}

#[test]
fn unreachable_secondary_does_not_stop_the_others() {
    let (primary, primary_port) = bind();
    let (reachable, reachable_port) = bind();
    let (closed, closed_port) = bind();
    drop(closed);

    let config = RelayConfig::from_json_str(&format!(
        r#"{{"primary": {{"mode": "EISCP", "ip": "127.0.0.1", "port": {primary_port}}},
            "secondaries": [
                {{"mode": "TCP", "ip": "127.0.0.1", "tcp_port": {closed_port}}},
                {{"mode": "TCP", "ip": "127.0.0.1", "tcp_port": {reachable_port}}}
            ]}}"#
    ))
    .expect("config should parse");
    let relay = Relay::from_config(&config, test_config());
    let running = Arc::new(AtomicBool::new(true));
    let listeners = spawn_listeners(&relay, &running);

    let mut primary_stream = accept(&primary);
    let mut reachable_stream = accept(&reachable);
    write_eiscp(&mut primary_stream, b"!1PWR01");

    assert_eq!(read_delimited(&mut reachable_stream), b"!1PWR01\r".to_vec());

    stop(relay, running, listeners);
}
