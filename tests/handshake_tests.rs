#[cfg(test)]
mod handshake_tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use nodemesh::session::{
        self, uppercase, ClientOptions, ClientSession, ClientState, ExchangeMode, Received, ServerOptions,
        ServerSession, ServerState, SessionError, TcpTransport,
    };
    use nodemesh::session::ExchangeReport;
    use nodemesh::topology::{AssignmentStrategy, Topology, TopologyGenerator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Bind a listening server on an ephemeral localhost port
    fn listening_server() -> (ServerSession<TcpTransport>, u16) {
        let mut server = ServerSession::new(TcpTransport);
        server.bind("127.0.0.1", 0).unwrap();
        server.listen().unwrap();
        let port = server.local_port().unwrap();
        (server, port)
    }

    /// A localhost port with nothing listening on it
    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Localhost topology whose servers all accept on a free port
    fn localhost_topology(servers: u32, clients: u32) -> Topology {
        TopologyGenerator::new()
            .address_template("127.0.0.1")
            .client_port(closed_port())
            .strategy(AssignmentStrategy::Sequential)
            .generate(servers, clients, &mut StdRng::seed_from_u64(1))
            .unwrap()
    }

    /// Run a client, retrying while its server thread is not listening yet
    fn run_client_when_ready(topology: &Topology, index: u32, options: &ClientOptions) -> ExchangeReport {
        for _ in 0..50 {
            match session::run_client(topology, index, TcpTransport, options) {
                Ok(report) => return report,
                Err(SessionError::ConnectionRefused { .. }) => thread::sleep(Duration::from_millis(20)),
                Err(err) => panic!("client{} failed: {:?}", index, err),
            }
        }
        panic!("server never started listening");
    }

    #[test]
    fn test_client_message_reaches_server() {
        let (mut server, port) = listening_server();
        assert_eq!(server.state(), ServerState::Listening);

        let handle = thread::spawn(move || {
            server.accept().unwrap();
            let report = server.exchange(ExchangeMode::Single).unwrap();
            (report, server.state())
        });

        let mut client = ClientSession::new(TcpTransport);
        client
            .run_once("127.0.0.1", port, b"Hello_world", ExchangeMode::Single)
            .unwrap();
        assert_eq!(client.state(), ClientState::Closed);

        let (report, state) = handle.join().unwrap();
        assert_eq!(report.received, vec!["Hello_world"]);
        assert_eq!(uppercase(report.received[0].as_bytes()), b"HELLO_WORLD".to_vec());
        assert_eq!(state, ServerState::Closed);
    }

    #[test]
    fn test_echo_round_trip() {
        let (mut server, port) = listening_server();

        let handle = thread::spawn(move || {
            server.accept().unwrap();
            server.exchange(ExchangeMode::Echo).unwrap()
        });

        let report = ClientSession::new(TcpTransport)
            .run_once("127.0.0.1", port, b"Hello_world", ExchangeMode::Echo)
            .unwrap();
        assert_eq!(report.received, vec!["HELLO_WORLD"]);

        let server_report = handle.join().unwrap();
        assert_eq!(server_report.received, vec!["Hello_world"]);
        assert_eq!(server_report.sent, vec!["HELLO_WORLD"]);
    }

    #[test]
    fn test_connect_without_listener_is_refused() {
        let port = closed_port();
        let mut client = ClientSession::new(TcpTransport).with_connect_timeout(Duration::from_secs(5));

        let err = client.connect("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, SessionError::ConnectionRefused { .. }), "got {:?}", err);
        assert_eq!(client.state(), ClientState::Closed);
    }

    #[test]
    fn test_peer_closing_without_data_closes_server() {
        let (mut server, port) = listening_server();

        let handle = thread::spawn(move || {
            server.accept().unwrap();
            let received = server.receive().unwrap();
            (received, server.state())
        });

        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        drop(stream);

        let (received, state) = handle.join().unwrap();
        assert_eq!(received, Received::PeerClosed);
        assert_eq!(state, ServerState::Closed);
    }

    #[test]
    fn test_second_bind_on_same_port_is_address_in_use() {
        let (_server, port) = listening_server();

        let mut second = ServerSession::new(TcpTransport);
        let err = second.bind("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, SessionError::AddressInUse { .. }), "got {:?}", err);
        assert_eq!(second.state(), ServerState::Closed);
    }

    #[test]
    fn test_nodes_find_each_other_through_topology() {
        let topology = localhost_topology(1, 1);

        let server_topology = topology.clone();
        let handle = thread::spawn(move || {
            let options = ServerOptions {
                mode: ExchangeMode::Echo,
                ..ServerOptions::default()
            };
            session::run_server(&server_topology, 0, TcpTransport, &options)
        });

        let options = ClientOptions {
            mode: ExchangeMode::Echo,
            connect_timeout: Some(Duration::from_secs(5)),
            ..ClientOptions::default()
        };
        let report = run_client_when_ready(&topology, 0, &options);
        assert_eq!(report.received, vec!["HELLO_WORLD"]);

        let server_report = handle.join().unwrap().unwrap();
        assert_eq!(server_report.received, vec!["Hello_world"]);
    }

    #[test]
    fn test_server_serves_every_assigned_client() {
        let topology = localhost_topology(1, 2);
        assert_eq!(topology.clients_of(0).count(), 2);

        let server_topology = topology.clone();
        let handle = thread::spawn(move || {
            let options = ServerOptions {
                mode: ExchangeMode::Echo,
                all_clients: true,
                ..ServerOptions::default()
            };
            session::run_server(&server_topology, 0, TcpTransport, &options)
        });

        for (index, payload) in [(0, "first"), (1, "second")] {
            let options = ClientOptions {
                payload: payload.to_string(),
                mode: ExchangeMode::Echo,
                connect_timeout: Some(Duration::from_secs(5)),
            };
            let report = run_client_when_ready(&topology, index, &options);
            assert_eq!(report.received, vec![payload.to_uppercase()]);
        }

        let server_report = handle.join().unwrap().unwrap();
        assert_eq!(server_report.received, vec!["first", "second"]);
        assert_eq!(server_report.sent, vec!["FIRST", "SECOND"]);
    }
}
