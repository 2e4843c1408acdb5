// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Sockets from the pure-Rust backend talking to real peers

#![cfg(feature = "zeromq")]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use iruby_config::{ConnectionConfig, KernelChannel};
use iruby_session_adapter::{AdapterClass, KernelChannels, PyzmqAdapter, SessionAdapter, SocketPattern};
use tokio::runtime::Runtime;
use zeromq::{DealerSocket, ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

fn pyzmq_session() -> Box<dyn SessionAdapter> {
    PyzmqAdapter
        .instantiate(Arc::new(ConnectionConfig::default()))
        .unwrap()
}

#[test]
fn test_rep_answers_req_client() {
    let mut adapter = pyzmq_session();
    let (mut rep, port) = adapter.make_rep_socket("tcp", "127.0.0.1", 0).unwrap();
    assert_ne!(port, 0);

    let client = thread::spawn(move || {
        let runtime = Runtime::new().unwrap();
        runtime.block_on(async {
            let mut req = ReqSocket::new();
            req.connect(&format!("tcp://127.0.0.1:{}", port)).await.unwrap();
            req.send(ZmqMessage::from(b"ping".to_vec())).await.unwrap();
            let reply = req.recv().await.unwrap();
            reply.into_vec()[0].to_vec()
        })
    });

    assert_eq!(rep.recv_multipart().unwrap(), vec![b"ping".to_vec()]);
    rep.send_multipart(&[b"pong".as_slice()]).unwrap();

    assert_eq!(client.join().unwrap(), b"pong".to_vec());
}

#[test]
fn test_router_routes_reply_by_identity() {
    let mut adapter = pyzmq_session();
    let (mut router, port) = adapter.make_router_socket("tcp", "127.0.0.1", 0).unwrap();

    let client = thread::spawn(move || {
        let runtime = Runtime::new().unwrap();
        runtime.block_on(async {
            let mut dealer = DealerSocket::new();
            dealer
                .connect(&format!("tcp://127.0.0.1:{}", port))
                .await
                .unwrap();
            dealer
                .send(ZmqMessage::from(b"execute_request".to_vec()))
                .await
                .unwrap();
            dealer
                .recv()
                .await
                .unwrap()
                .into_vec()
                .into_iter()
                .map(|frame| frame.to_vec())
                .collect::<Vec<_>>()
        })
    });

    let request = router.recv_multipart().unwrap();
    assert_eq!(request.len(), 2);
    assert_eq!(request[1], b"execute_request".to_vec());

    let identity = request[0].clone();
    router
        .send_multipart(&[identity.as_slice(), b"execute_reply".as_slice()])
        .unwrap();

    assert_eq!(client.join().unwrap(), vec![b"execute_reply".to_vec()]);
}

#[test]
fn test_kernel_channels_get_distinct_ports() {
    let mut adapter = pyzmq_session();

    let mut channels = KernelChannels::bind(adapter.as_mut()).unwrap();
    let connection = channels.resolved_connection().clone();

    let ports: HashSet<u16> = connection
        .all_ports()
        .into_iter()
        .map(|(_, port)| port)
        .collect();
    assert_eq!(ports.len(), 5);
    assert!(!ports.contains(&0));

    let heartbeat = channels.socket_mut(KernelChannel::Heartbeat).unwrap();
    assert_eq!(heartbeat.pattern(), SocketPattern::Rep);
    assert!(heartbeat
        .last_endpoint()
        .ends_with(&connection.hb_port.to_string()));
}
