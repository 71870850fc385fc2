use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use vaa_events::admin::commands::{dump_vaa_by_message_id, find_missing_messages, inject_governance_vaa};
use vaa_events::admin::AdminEndpoint;
use vaa_events::error::EventsError;
use vaa_events::vaa::{Signature, Vaa};

type Handler = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// A control plane on a unix socket. `handler` maps (method, params) to the
/// reply line; `None` means never answer.
struct FakeControlPlane {
    _dir: TempDir,
    socket: PathBuf,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeControlPlane {
    fn start(handler: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("admin.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let accepted = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        {
            let accepted = accepted.clone();
            let closed = closed.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let closed = closed.clone();
                    let requests = requests.clone();
                    let handler = handler.clone();

                    tokio::spawn(async move {
                        let (read, mut write) = stream.into_split();
                        let mut lines = BufReader::new(read).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            let request: Value = serde_json::from_str(&line).unwrap();
                            requests.lock().unwrap().push(request.clone());
                            let method = request["method"].as_str().unwrap_or_default();
                            if let Some(reply) = handler(method, &request["params"]) {
                                let mut out = serde_json::to_vec(&reply).unwrap();
                                out.push(b'\n');
                                if write.write_all(&out).await.is_err() {
                                    break;
                                }
                            }
                        }
                        closed.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }

        Self {
            _dir: dir,
            socket,
            accepted,
            closed,
            requests,
        }
    }

    fn endpoint(&self) -> AdminEndpoint {
        AdminEndpoint::new(&self.socket).with_timeout(Duration::from_millis(500))
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Waits for the server to see every accepted connection closed.
    async fn assert_all_closed(&self) {
        for _ in 0..100 {
            if self.closed.load(Ordering::SeqCst) == self.accepted() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "{} connections accepted but {} closed",
            self.accepted(),
            self.closed.load(Ordering::SeqCst)
        );
    }
}

fn sample_vaa() -> Vaa {
    let mut emitter_address = [0u8; 32];
    emitter_address[31] = 0xab;
    Vaa {
        version: 1,
        guardian_set_index: 2,
        signatures: vec![Signature {
            index: 1,
            signature: [3; 65],
        }],
        timestamp: 1_634_000_000,
        nonce: 9,
        emitter_chain: 2,
        emitter_address,
        sequence: 42,
        consistency_level: 15,
        payload: b"payload".to_vec(),
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn find_missing_messages_reports_gaps() {
    let server = FakeControlPlane::start(|method, _| {
        assert_eq!(method, "FindMissingMessages");
        Some(json!({"result": {
            "missing_messages": ["2/abc/3", "2/abc/4"],
            "first_sequence": 1,
            "last_sequence": 9,
        }}))
    });

    let report = find_missing_messages(&server.endpoint(), "2", "abc").await.unwrap();
    assert_eq!(report.missing_messages, vec!["2/abc/3", "2/abc/4"]);
    assert_eq!((report.first_sequence, report.last_sequence), (1, 9));
    assert_eq!(report.gap_count(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["params"]["emitter_chain"], 2);
    assert_eq!(requests[0]["params"]["emitter_address"], "abc");

    assert_eq!(server.accepted(), 1);
    server.assert_all_closed().await;
}

#[tokio::test]
async fn find_missing_messages_validates_before_connecting() {
    let server = FakeControlPlane::start(|_, _| panic!("no request expected"));

    for chain in ["eth", "-1", "70000", ""] {
        let err = find_missing_messages(&server.endpoint(), chain, "abc").await.unwrap_err();
        assert!(matches!(err, EventsError::InvalidArgument(_)), "{chain:?}: {err}");
    }
    let err = find_missing_messages(&server.endpoint(), "2", "").await.unwrap_err();
    assert!(matches!(err, EventsError::InvalidArgument(_)));

    assert_eq!(server.accepted(), 0);
}

#[tokio::test]
async fn dump_vaa_decodes_returned_bytes() {
    let vaa = sample_vaa();
    let bytes = vaa.marshal().unwrap();
    let reply = hex::encode(&bytes);
    let server = FakeControlPlane::start(move |method, _| {
        assert_eq!(method, "GetSignedVAA");
        Some(json!({"result": {"vaa_bytes": reply}}))
    });

    let dump = dump_vaa_by_message_id(&server.endpoint(), "2/0xabc/42").await.unwrap();
    assert_eq!(dump.vaa, vaa);
    assert_eq!(dump.hex_bytes(), hex::encode(&bytes));

    let message_id = &server.requests()[0]["params"]["message_id"];
    assert_eq!(message_id["emitter_chain"], 2);
    assert_eq!(message_id["emitter_address"], "0xabc");
    assert_eq!(message_id["sequence"], 42);

    server.assert_all_closed().await;
}

#[tokio::test]
async fn dump_vaa_rejects_malformed_message_id() {
    let server = FakeControlPlane::start(|_, _| panic!("no request expected"));

    let err = dump_vaa_by_message_id(&server.endpoint(), "2/0xabc").await.unwrap_err();
    assert!(matches!(err, EventsError::MalformedIdentity(_)));
    assert_eq!(server.accepted(), 0);
}

#[tokio::test]
async fn dump_vaa_fails_on_undecodable_bytes() {
    let server = FakeControlPlane::start(|_, _| Some(json!({"result": {"vaa_bytes": "01"}})));

    let err = dump_vaa_by_message_id(&server.endpoint(), "2/abc/1").await.unwrap_err();
    assert!(matches!(err, EventsError::Decode(_)));
    server.assert_all_closed().await;
}

#[tokio::test]
async fn rpc_errors_are_fatal_and_close_the_connection() {
    let server =
        FakeControlPlane::start(|_, _| Some(json!({"error": {"message": "no such emitter"}})));

    let err = find_missing_messages(&server.endpoint(), "2", "abc").await.unwrap_err();
    match err {
        EventsError::Rpc { method, message } => {
            assert_eq!(method, "FindMissingMessages");
            assert_eq!(message, "no such emitter");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(server.accepted(), 1);
    server.assert_all_closed().await;
}

#[tokio::test]
async fn timed_out_rpc_releases_the_connection() {
    let server = FakeControlPlane::start(|_, _| None);
    let endpoint = server.endpoint().with_timeout(Duration::from_millis(100));

    let err = dump_vaa_by_message_id(&endpoint, "2/abc/1").await.unwrap_err();
    assert!(matches!(err, EventsError::Unavailable(_)), "{err}");
    assert_eq!(server.accepted(), 1);
    server.assert_all_closed().await;
}

#[tokio::test]
async fn unreachable_socket_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = AdminEndpoint::new(dir.path().join("missing.sock"));

    let err = find_missing_messages(&endpoint, "2", "abc").await.unwrap_err();
    assert!(matches!(err, EventsError::Unavailable(_)));
}

#[tokio::test]
async fn governance_inject_reports_digests() {
    let server = FakeControlPlane::start(|method, params| {
        assert_eq!(method, "InjectGovernanceVAA");
        assert_eq!(params["current_set_index"], 0);
        assert_eq!(params["messages"][0]["nonce"], 42);
        Some(json!({"result": {"digests": ["00ff", "abcd"]}}))
    });

    let files = tempfile::tempdir().unwrap();
    let path = write_file(
        files.path(),
        "guardian_set.toml",
        r#"
current_set_index = 0

[[messages]]
sequence = 1
nonce = 42

[messages.guardian_set]
guardians = [{ pubkey = "0xbeFA429d57cD18b7F8A4d91A2da9AB4AF05d0FBe", name = "guardian-0" }]
"#,
    );

    let digests = inject_governance_vaa(&server.endpoint(), &path).await.unwrap();
    assert_eq!(digests, vec!["00ff", "abcd"]);
    server.assert_all_closed().await;
}

#[tokio::test]
async fn governance_inject_fails_before_connecting_on_bad_file() {
    let server = FakeControlPlane::start(|_, _| panic!("no request expected"));
    let files = tempfile::tempdir().unwrap();

    let err = inject_governance_vaa(&server.endpoint(), &files.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, EventsError::InvalidArgument(_)));

    let garbage = write_file(files.path(), "bad.toml", "messages = [");
    let err = inject_governance_vaa(&server.endpoint(), &garbage).await.unwrap_err();
    assert!(matches!(err, EventsError::Toml(_)));

    assert_eq!(server.accepted(), 0);
}
