fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod mock_mailbox;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use mex_client::{
        ClientConfig, FatalError, MailboxClient, MailboxCredentials, MeshAuthProvider, MessageId,
        MexError, TransferResult, TransportError,
    };
    use mex_protocol::{InboxListing, SendMetadata, SendResponse};

    use crate::mock_mailbox::{MockMailbox, Reply};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture file as a string.
    fn load_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture: serde_json::Value = serde_json::from_str(&load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"));
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(fixture, reserialized, "roundtrip mismatch for {name}");
    }

    fn credentials() -> MailboxCredentials {
        MailboxCredentials::new("X26ABC1", "password", "TestKey")
    }

    fn client_for(server: &MockMailbox, chunk_size: usize) -> MailboxClient {
        let mut config = ClientConfig::new(server.url.clone(), credentials());
        config.chunk_size = chunk_size;
        config.timeout_secs = 5;
        MailboxClient::from_config(&config).unwrap()
    }

    fn metadata() -> SendMetadata {
        serde_json::from_str(&load_fixture("send_metadata.json")).unwrap()
    }

    // --- Fixture shapes ---

    #[test]
    fn fixture_send_response() {
        roundtrip_test::<SendResponse>("send_response.json");
        let legacy: SendResponse =
            serde_json::from_str(&load_fixture("send_response_legacy.json")).unwrap();
        assert_eq!(legacy.message_id, "20240315093012345678_ABC123");
    }

    #[test]
    fn fixture_inbox_listing() {
        roundtrip_test::<InboxListing>("inbox_listing.json");
    }

    #[test]
    fn fixture_send_metadata() {
        roundtrip_test::<SendMetadata>("send_metadata.json");
    }

    #[test]
    fn fixture_client_config() {
        roundtrip_test::<ClientConfig>("client_config.json");
        let config = ClientConfig::from_json(&load_fixture("client_config.json")).unwrap();
        assert_eq!(config.mailbox_id, "X26ABC1");
        assert_eq!(config.timeout_secs, 10);
    }

    // --- Upload on the wire ---

    #[tokio::test]
    async fn chunked_upload_on_the_wire() {
        let server = MockMailbox::start(vec![
            Reply::new(202, r#"{"message_id":"MSG-1"}"#),
            Reply::new(202, ""),
            Reply::new(202, r#"{"message_id":"MSG-1"}"#),
        ])
        .await;
        let client = client_for(&server, 10);
        let payload = b"0123456789abcdefghijKLMNO"; // 25 bytes -> 3 chunks.

        let result = client.send_message(&metadata(), payload).await.unwrap();
        assert_eq!(
            result,
            TransferResult::new(202, br#"{"message_id":"MSG-1"}"#.to_vec())
        );

        let requests = server.requests();
        let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/messageexchange/X26ABC1/outbox",
                "/messageexchange/X26ABC1/outbox/MSG-1/2",
                "/messageexchange/X26ABC1/outbox/MSG-1/3",
            ]
        );

        let mut reassembled = Vec::new();
        for (i, req) in requests.iter().enumerate() {
            assert_eq!(req.method, "POST");
            assert_eq!(req.header("mex-chunk-range"), Some(format!("{}:3", i + 1).as_str()));
            assert_eq!(req.header("mex-from"), Some("X26ABC1"));
            assert_eq!(req.header("mex-to"), Some("X26XYZ9"));
            assert_eq!(req.header("mex-workflowid"), Some("TEST_WORKFLOW"));
            assert_eq!(req.header("mex-filename"), Some("report.csv"));
            assert_eq!(req.header("content-encoding"), Some("gzip"));
            assert_eq!(req.header("content-type"), Some("application/octet-stream"));
            reassembled.extend(mex_transfer::decompress(&req.body).unwrap());
        }
        assert_eq!(reassembled, payload);
    }

    #[tokio::test]
    async fn every_request_is_signed_with_a_fresh_nonce() {
        let server = MockMailbox::start(vec![
            Reply::new(202, r#"{"messageID":"MSG-2"}"#),
            Reply::new(202, ""),
        ])
        .await;
        let client = client_for(&server, 4);
        client.send_message(&metadata(), b"12345678").await.unwrap();

        let provider = MeshAuthProvider::default();
        let mut nonces = Vec::new();
        for req in server.requests() {
            let auth = req.header("authorization").unwrap();
            let rest = auth.strip_prefix("NHSMESH ").unwrap();
            let parts: Vec<&str> = rest.split(':').collect();
            assert_eq!(parts.len(), 5);
            let (mailbox, nonce, count, timestamp) = (parts[0], parts[1], parts[2], parts[3]);
            assert_eq!(mailbox, "X26ABC1");
            assert_eq!(count, "0");
            assert_eq!(timestamp.len(), 12);

            let expected = provider
                .authorization(&credentials(), nonce, 0, timestamp)
                .unwrap();
            assert_eq!(auth, expected);
            assert!(req.header("mex-clientversion").is_some());
            nonces.push(nonce.to_string());
        }
        assert_eq!(nonces.len(), 2);
        assert_ne!(nonces[0], nonces[1]);
    }

    #[tokio::test]
    async fn upload_wrong_status_stops_the_sequence() {
        let server = MockMailbox::start(vec![
            Reply::new(200, r#"{"message_id":"MSG-3"}"#),
            Reply::new(202, ""),
        ])
        .await;
        let client = client_for(&server, 4);

        let err = client
            .send_message(&metadata(), b"12345678")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.status(), Some(200));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn upload_redirect_is_fatal_and_not_followed() {
        let server = MockMailbox::start(vec![
            Reply::new(302, "").with_header("Location", "/elsewhere"),
            Reply::new(202, r#"{"message_id":"MSG-R"}"#),
        ])
        .await;
        let client = client_for(&server, 4);

        let err = client
            .send_message(&metadata(), b"12345678")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MexError::Fatal(FatalError::UnexpectedStatus { status: 302, .. })
        ));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].path.ends_with("/outbox"));
    }

    // --- Download on the wire ---

    #[tokio::test]
    async fn chunked_download_on_the_wire() {
        let server = MockMailbox::start(vec![
            Reply::new(206, "a").with_range("1:3"),
            Reply::new(206, "b").with_range("2:3"),
            Reply::new(200, "c").with_range("3:3"),
        ])
        .await;
        let client = client_for(&server, 10);
        let id = MessageId::new("MSG-4").unwrap();

        let result = client.receive_message(&id).await.unwrap();
        assert_eq!(result, TransferResult::new(206, b"abc".to_vec()));

        let requests = server.requests();
        let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/messageexchange/X26ABC1/inbox/MSG-4",
                "/messageexchange/X26ABC1/inbox/MSG-4/2",
                "/messageexchange/X26ABC1/inbox/MSG-4/3",
            ]
        );
        assert!(requests.iter().all(|r| r.method == "GET"));
    }

    #[tokio::test]
    async fn single_part_download() {
        let server = MockMailbox::start(vec![Reply::new(200, "whole message")]).await;
        let client = client_for(&server, 10);

        let result = client
            .receive_message(&MessageId::new("MSG-5").unwrap())
            .await
            .unwrap();
        assert_eq!(result, TransferResult::new(200, b"whole message".to_vec()));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn malformed_range_is_fatal() {
        let server = MockMailbox::start(vec![Reply::new(206, "a").with_range("one:three")]).await;
        let client = client_for(&server, 10);

        let err = client
            .receive_message(&MessageId::new("MSG-6").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn server_error_is_reported_with_body() {
        let server = MockMailbox::start(vec![Reply::new(500, "internal")]).await;
        let client = client_for(&server, 10);

        let err = client
            .receive_message(&MessageId::new("MSG-7").unwrap())
            .await
            .unwrap_err();
        match err {
            MexError::Transport(TransportError::Status {
                operation,
                status,
                body,
            }) => {
                assert_eq!(operation, "receive_message");
                assert_eq!(status, 500);
                assert_eq!(body, "internal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // --- Mailbox housekeeping ---

    #[tokio::test]
    async fn inbox_then_acknowledge() {
        let server = MockMailbox::start(vec![
            Reply::new(200, load_fixture("inbox_listing.json")),
            Reply::new(200, r#"{"message_id":"20240315093012345678_ABC123"}"#),
        ])
        .await;
        let client = client_for(&server, 10);

        let ids = client.list_inbox().await.unwrap();
        assert_eq!(ids.len(), 2);
        client.acknowledge(&ids[0]).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/messageexchange/X26ABC1/inbox");
        assert_eq!(requests[1].method, "PUT");
        assert_eq!(
            requests[1].path,
            "/messageexchange/X26ABC1/inbox/20240315093012345678_ABC123/status/acknowledged"
        );
    }

    #[tokio::test]
    async fn handshake_from_fixture_config() {
        let server = MockMailbox::start(vec![Reply::new(200, "")]).await;
        let mut config = ClientConfig::from_json(&load_fixture("client_config.json")).unwrap();
        config.base_url = server.url.clone();
        config.tls = None;

        let client = MailboxClient::from_config(&config).unwrap();
        client.handshake().await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].path, "/messageexchange/X26ABC1");
        assert!(
            requests[0]
                .header("authorization")
                .unwrap()
                .starts_with("NHSMESH X26ABC1:")
        );
    }
}
