//! Integration tests for adapters_socket crate
//!
//! These tests drive whole handle lifecycles over loopback TCP, UDP and
//! Unix-domain sockets.

use std::thread;
use std::time::{Duration, Instant};

use adapters_socket::*;
use entities_socket::{Address, AddressFamily, Protocol, SocketState, SocketType};
use infrastructure_socket_errors::SocketError;

fn listener() -> Socket {
    Socket::create(&SocketConfig::from_pairs([("local_addr", "127.0.0.1"), ("listen", "4")])).unwrap()
}

fn wait_for(socket: &mut Socket, bytes: usize) {
    assert!(socket.is_readable(Some(Duration::from_secs(2))).unwrap());
    for _ in 0..200 {
        if socket.available().unwrap() >= bytes {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {} bytes", bytes);
}

#[test]
fn test_tcp_readline_mixed_terminators() {
    let mut server = listener();
    assert_eq!(server.state(), SocketState::Listening);
    let port = server.local_addr().unwrap().service();

    let writer = thread::spawn(move || {
        let config = SocketConfig::from_pairs([("remote_addr", "127.0.0.1"), ("remote_port", port.as_str())]);
        let mut client = Socket::create(&config).unwrap();
        client.write(b"alpha\r\nbeta\ngamma\rdelta\0").unwrap();
        client
    });

    let mut conn = server.accept().unwrap().unwrap();
    assert_eq!(conn.state(), SocketState::Connected);
    assert!(conn.remote_addr().is_some());
    let _client = writer.join().unwrap();

    wait_for(&mut conn, 24);
    assert_eq!(conn.readline().unwrap(), b"alpha");
    assert_eq!(conn.readline().unwrap(), b"beta");
    assert_eq!(conn.readline().unwrap(), b"gamma");
    assert_eq!(conn.readline().unwrap(), b"delta");
}

#[test]
fn test_to_string_names_both_ends() {
    let mut server = listener();
    let port = server.local_addr().unwrap().service();
    let client_port = port.clone();
    let client = thread::spawn(move || {
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        client.connect(Some("127.0.0.1"), Some(&client_port), None).unwrap();
        client
    });
    let _conn = server.accept().unwrap().unwrap();
    let client = client.join().unwrap();

    let text = client.to_string();
    assert!(text.starts_with("SOCKET(ID="));
    assert!(text.contains(";DOMAIN=INET;TYPE=STREAM;PROTO=TCP"));
    assert!(text.contains(&format!(";REMOTE=127.0.0.1:{}", port)));
    assert!(text.ends_with(')'));
}

#[test]
fn test_connect_refused_keeps_state() {
    // Grab a free port, then release it so nothing listens there.
    let port = {
        let spare = Socket::create(&SocketConfig::default().with_local(Some("127.0.0.1"), None)).unwrap();
        spare.local_addr().unwrap().service()
    };
    let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
    client.set_timeout(Duration::from_secs(2));
    let err = client.connect(Some("127.0.0.1"), Some(&port), None).unwrap_err();
    assert!(matches!(err, SocketError::Platform { .. } | SocketError::ConnectTimeout { .. }));
    assert_eq!(client.state(), SocketState::Init);
    assert!(client.last_error().is_set());
}

/// A never-accepting listener whose accept queue is full, so further
/// handshakes stall, plus a handle whose first connect already timed out.
#[cfg(target_os = "linux")]
fn saturated_listener() -> (Socket, Vec<Socket>, Socket, String) {
    let server = Socket::create(&SocketConfig::from_pairs([("local_addr", "127.0.0.1"), ("listen", "1")])).unwrap();
    let port = server.local_addr().unwrap().service();
    let mut queued = Vec::new();
    for _ in 0..64 {
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        match client.connect(Some("127.0.0.1"), Some(&port), Some(Duration::from_millis(50))) {
            Ok(()) => queued.push(client),
            Err(SocketError::ConnectTimeout { .. }) => return (server, queued, client, port),
            Err(e) => panic!("unexpected connect failure: {}", e),
        }
    }
    panic!("accept queue never filled");
}

#[cfg(target_os = "linux")]
#[test]
fn test_connect_timeout_is_bounded_and_retryable() {
    let (_server, _queued, mut client, port) = saturated_listener();
    assert_eq!(client.state(), SocketState::Init);
    assert!(client.last_error().is_set());

    let started = Instant::now();
    let err = client
        .connect(Some("127.0.0.1"), Some(&port), Some(Duration::from_millis(50)))
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, SocketError::ConnectTimeout { .. }), "{:?}", err);
    assert!(elapsed >= Duration::from_millis(45), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "{:?}", elapsed);
    assert_eq!(client.state(), SocketState::Init);

    let mut other = listener();
    let other_port = other.local_addr().unwrap().service();
    client
        .connect(Some("127.0.0.1"), Some(&other_port), Some(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(client.state(), SocketState::Connected);
    assert!(!client.last_error().is_set());
    assert!(other.accept().unwrap().is_some());
}

#[test]
fn test_reconnect_after_close() {
    let mut server = listener();
    let port = server.local_addr().unwrap().service();
    let acceptor = thread::spawn(move || {
        let first = server.accept().unwrap().unwrap();
        let second = server.accept().unwrap().unwrap();
        (first, second)
    });

    let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
    client.connect(Some("127.0.0.1"), Some(&port), None).unwrap();
    client.close();
    assert_eq!(client.state(), SocketState::Closed);
    assert!(client.descriptor().is_none());
    client.connect(Some("127.0.0.1"), Some(&port), None).unwrap();
    assert_eq!(client.state(), SocketState::Connected);
    acceptor.join().unwrap();
}

#[test]
fn test_udp_exchange_through_config() {
    let mut a = Socket::create(&SocketConfig::from_pairs([("proto", "udp"), ("local_addr", "127.0.0.1")])).unwrap();
    assert_eq!(a.socket_type(), SocketType::Datagram);
    let a_port = a.local_addr().unwrap().service();

    let mut b = Socket::create(&SocketConfig::from_pairs([
        ("proto", "udp"),
        ("remote_addr", "127.0.0.1"),
        ("remote_port", a_port.as_str()),
    ]))
    .unwrap();
    assert_eq!(b.state(), SocketState::Connected);
    b.write(b"datagram").unwrap();

    let mut buf = [0u8; 32];
    assert!(a.is_readable(Some(Duration::from_secs(2))).unwrap());
    let (n, from) = a.recv_from(&mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"datagram");
    assert_eq!(from.as_ref(), b.local_addr());
}

#[test]
fn test_non_blocking_accept_without_pending() {
    let mut server = Socket::create(&SocketConfig::from_pairs([
        ("local_addr", "127.0.0.1"),
        ("listen", "2"),
        ("blocking", "0"),
    ]))
    .unwrap();
    assert!(!server.blocking());
    assert!(server.accept().unwrap().is_none());
    assert_eq!(server.state(), SocketState::Listening);
}

#[test]
fn test_lookup_loopback() {
    let hints = LookupHints {
        family: Some(AddressFamily::Inet),
        socket_type: Some(SocketType::Stream),
        ..LookupHints::default()
    };
    let results = lookup(Some("127.0.0.1"), Some("80"), &hints).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].address.host(), "127.0.0.1");
    assert_eq!(results[0].address.service(), "80");
    assert_eq!(resolve_name("127.0.0.1").unwrap(), "127.0.0.1");
}

#[test]
fn test_native_address_roundtrip_ipv4() {
    let address = Address::from("127.0.0.1:8080".parse::<std::net::SocketAddr>().unwrap());
    let native = address::encode(&address).unwrap();
    assert!(!native.is_empty());
    assert_eq!(address::decode(native.as_bytes(), Protocol::TCP).unwrap(), address);
}

#[cfg(unix)]
mod unix_domain {
    use super::*;

    #[test]
    fn test_bind_replaces_stale_file_and_close_unlinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        std::fs::write(&path, b"leftover").unwrap();
        let path_text = path.to_str().unwrap();

        let mut server = Socket::create(&SocketConfig::from_pairs([("local_path", path_text), ("listen", "1")])).unwrap();
        assert_eq!(server.family(), AddressFamily::Unix);
        assert_eq!(server.state(), SocketState::Listening);
        assert!(path.exists());

        server.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_accepted_child_leaves_listener_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.sock");
        let path_text = path.to_str().unwrap().to_string();

        let mut server = Socket::create(&SocketConfig::from_pairs([("local_path", path_text.as_str()), ("listen", "1")])).unwrap();
        let client_path = path_text.clone();
        let client = thread::spawn(move || {
            let mut client = Socket::create(&SocketConfig::from_pairs([("remote_path", client_path.as_str())])).unwrap();
            client.writeln(b"over unix").unwrap();
            client
        });

        let mut conn = server.accept().unwrap().unwrap();
        let _client = client.join().unwrap();
        wait_for(&mut conn, 11);
        assert_eq!(conn.readline().unwrap(), b"over unix");

        conn.close();
        assert!(path.exists());
        drop(server);
        assert!(!path.exists());
    }

    #[test]
    fn test_overlong_path_rejected() {
        let long = "x".repeat(UNIX_PATH_MAX + 1);
        let err = Socket::create(&SocketConfig::from_pairs([("local_path", long.as_str())])).unwrap_err();
        assert!(matches!(err, SocketError::InvalidArgument(_)));
    }
}
