//! Integration tests for api_facades crate
//!
//! These tests drive sockets purely by handle identity through the
//! process-wide manager.

use std::thread;
use std::time::{Duration, Instant};

use api_facades::{global, HandleId};
use entities_socket::{AddressFamily, SocketState};
use infrastructure_socket_errors::SocketError;

fn listen_loopback() -> (HandleId, String) {
    let id = global()
        .create_from_args(&["local_addr", "127.0.0.1", "listen", "4"])
        .unwrap();
    let port = global().local_addr(id).unwrap().unwrap().service();
    (id, port)
}

fn wait_for(id: HandleId, bytes: usize) {
    assert!(global().is_readable(id, Some(Duration::from_secs(2))).unwrap());
    for _ in 0..200 {
        if global().available(id).unwrap() >= bytes {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {} bytes", bytes);
}

#[test]
fn test_line_protocol_by_identity() {
    let (listener, port) = listen_loopback();
    let client = thread::spawn(move || {
        let id = global()
            .create_from_pairs([("remote_addr", "127.0.0.1"), ("remote_port", port.as_str())])
            .unwrap();
        global().writeln(id, b"HELO client").unwrap();
        global()
            .write_formatted(id, format_args!("SIZE {}\n", 1024))
            .unwrap();
        id
    });

    let conn = global().accept(listener).unwrap().unwrap();
    let client = client.join().unwrap();
    wait_for(conn, 23);
    assert_eq!(global().readline(conn).unwrap(), b"HELO client");
    assert_eq!(global().readline(conn).unwrap(), b"SIZE 1024");

    let text = global().describe(client).unwrap();
    assert!(text.contains("DOMAIN=INET;TYPE=STREAM;PROTO=TCP"));
    assert!(text.contains(";REMOTE=127.0.0.1:"));

    for id in [client, conn, listener] {
        global().destroy(id).unwrap();
    }
}

#[test]
fn test_peer_close_moves_handle_to_error() {
    let (listener, port) = listen_loopback();
    let client = thread::spawn(move || {
        global()
            .create_from_pairs([("remote_addr", "127.0.0.1"), ("remote_port", port.as_str())])
            .unwrap()
    });
    let conn = global().accept(listener).unwrap().unwrap();
    global().destroy(client.join().unwrap()).unwrap();

    let mut buf = [0u8; 16];
    let err = global().recv(conn, &mut buf, 0).unwrap_err();
    assert!(matches!(err, SocketError::ConnectionReset { .. }));
    assert_eq!(global().state(conn).unwrap(), SocketState::Error);
    assert!(global().last_error(Some(conn)).is_set());

    global().destroy(conn).unwrap();
    global().destroy(listener).unwrap();
}

#[test]
fn test_udp_datagrams_by_identity() {
    let receiver = global()
        .create(&adapters_socket::SocketConfig::udp(AddressFamily::Inet).with_local(Some("127.0.0.1"), None))
        .unwrap();
    let target = global().local_addr(receiver).unwrap().unwrap();
    let sender = global()
        .create_from_pairs([("proto", "udp"), ("local_addr", "127.0.0.1")])
        .unwrap();

    assert_eq!(global().send_to(sender, b"one", 0, Some(&target)).unwrap(), 3);
    assert_eq!(global().write(sender, b"two").unwrap(), 3);

    let mut buf = [0u8; 8];
    for expected in [&b"one"[..], &b"two"[..]] {
        assert!(global().is_readable(receiver, Some(Duration::from_secs(2))).unwrap());
        let (n, from) = global().recv_from(receiver, &mut buf, 0).unwrap();
        assert_eq!(&buf[..n], expected);
        assert_eq!(from, global().local_addr(sender).unwrap());
    }

    global().destroy(sender).unwrap();
    global().destroy(receiver).unwrap();
}

#[test]
fn test_options_by_identity() {
    let id = global().create_from_pairs([("reuseaddr", "1")]).unwrap();
    assert!(global().reuse_addr(id).unwrap());
    global().set_nodelay(id, true).unwrap();
    assert!(global().nodelay(id).unwrap());
    global().set_blocking(id, false).unwrap();
    assert!(!global().blocking(id).unwrap());
    global().set_timeout(id, Duration::from_millis(750)).unwrap();
    assert_eq!(global().timeout(id).unwrap(), Duration::from_millis(750));
    global().destroy(id).unwrap();
}

#[test]
fn test_standalone_resolution() {
    assert_eq!(global().resolve_name("127.0.0.1").unwrap(), "127.0.0.1");
    assert!(matches!(
        global().reverse_resolve("not an address"),
        Err(SocketError::InvalidArgument(_))
    ));
    assert!(global().last_error(None).is_set());
}

#[cfg(unix)]
#[test]
fn test_unix_listener_path_survives_child_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facade.sock");
    let path_text = path.to_str().unwrap().to_string();

    let listener = global()
        .create_from_pairs([("local_path", path_text.as_str()), ("listen", "2")])
        .unwrap();
    let client_path = path_text.clone();
    let client = thread::spawn(move || {
        global()
            .create_from_pairs([("remote_path", client_path.as_str())])
            .unwrap()
    });
    let conn = global().accept(listener).unwrap().unwrap();
    let client = client.join().unwrap();

    global().destroy(conn).unwrap();
    global().destroy(client).unwrap();
    assert!(path.exists());
    global().destroy(listener).unwrap();
    assert!(!path.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_connect_timeout_by_identity() {
    let (listener, port) = {
        let id = global()
            .create_from_pairs([("local_addr", "127.0.0.1"), ("listen", "1")])
            .unwrap();
        (id, global().local_addr(id).unwrap().unwrap().service())
    };
    let short = Some(Duration::from_millis(50));

    let mut queued = Vec::new();
    let mut stalled = None;
    for _ in 0..64 {
        let id = global().create(&adapters_socket::SocketConfig::default()).unwrap();
        match global().connect(id, Some("127.0.0.1"), Some(&port), short) {
            Ok(()) => queued.push(id),
            Err(SocketError::ConnectTimeout { .. }) => {
                stalled = Some(id);
                break;
            }
            Err(e) => panic!("unexpected connect failure: {}", e),
        }
    }
    let stalled = stalled.expect("accept queue never filled");

    let started = Instant::now();
    let err = global()
        .connect(stalled, Some("127.0.0.1"), Some(&port), short)
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, SocketError::ConnectTimeout { .. }), "{:?}", err);
    assert!(elapsed >= Duration::from_millis(45) && elapsed < Duration::from_millis(500), "{:?}", elapsed);
    assert_eq!(global().state(stalled).unwrap(), SocketState::Init);
    assert_eq!(global().last_error(Some(stalled)).code, err.code());

    for id in queued.into_iter().chain([stalled, listener]) {
        global().destroy(id).unwrap();
    }
}
