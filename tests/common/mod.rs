//! Shared fixtures: an in-memory GGUF writer and a minimal HTTP server
//! for exercising remote acquisition without the network.
#![allow(dead_code)]

use bytes::BufMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Installs a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// WordPiece-style vocabulary used by the fixture model.
pub const FIXTURE_VOCAB: &[&str] = &["[UNK]", "[CLS]", "[SEP]", "hello", "world", "##s"];

/// Embedding table matching [`FIXTURE_VOCAB`], one row per token.
pub fn fixture_table() -> Vec<Vec<f32>> {
    vec![
        vec![100.0, 100.0], // [UNK]
        vec![1.0, 0.0],     // [CLS]
        vec![0.0, 1.0],     // [SEP]
        vec![2.0, 4.0],     // hello
        vec![6.0, 8.0],     // world
        vec![10.0, 20.0],   // ##s
    ]
}

/// Serialized fixture model: vocabulary above plus its embedding table.
pub fn fixture_gguf() -> Vec<u8> {
    build_gguf(FIXTURE_VOCAB, &fixture_table())
}

const GGUF_TYPE_U32: u32 = 4;
const GGUF_TYPE_STRING: u32 = 8;
const GGUF_TYPE_ARRAY: u32 = 9;
const GGML_TYPE_F32: u32 = 0;
const ALIGNMENT: usize = 32;

fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.put_u64_le(value.len() as u64);
    buf.put_slice(value.as_bytes());
}

/// Writes a minimal GGUF v3 container: a BERT-flavored metadata block
/// and a single F32 `token_embd.weight` tensor.
pub fn build_gguf(vocab: &[&str], table: &[Vec<f32>]) -> Vec<u8> {
    assert_eq!(vocab.len(), table.len(), "one table row per vocab token");
    let dim = table[0].len();
    let unk_index = vocab
        .iter()
        .position(|token| *token == "[UNK]")
        .expect("fixture vocab must contain [UNK]") as u32;

    let mut buf = Vec::new();
    buf.put_slice(b"GGUF");
    buf.put_u32_le(3); // version
    buf.put_u64_le(1); // tensor count
    buf.put_u64_le(5); // metadata kv count

    put_string(&mut buf, "general.architecture");
    buf.put_u32_le(GGUF_TYPE_STRING);
    put_string(&mut buf, "bert");

    put_string(&mut buf, "general.name");
    buf.put_u32_le(GGUF_TYPE_STRING);
    put_string(&mut buf, "fixture");

    put_string(&mut buf, "bert.embedding_length");
    buf.put_u32_le(GGUF_TYPE_U32);
    buf.put_u32_le(dim as u32);

    put_string(&mut buf, "tokenizer.ggml.tokens");
    buf.put_u32_le(GGUF_TYPE_ARRAY);
    buf.put_u32_le(GGUF_TYPE_STRING);
    buf.put_u64_le(vocab.len() as u64);
    for token in vocab {
        put_string(&mut buf, token);
    }

    put_string(&mut buf, "tokenizer.ggml.unknown_token_id");
    buf.put_u32_le(GGUF_TYPE_U32);
    buf.put_u32_le(unk_index);

    // Tensor info. GGML dimension order is fastest-first, so ne[0] is
    // the embedding dimension and ne[1] the vocabulary size.
    put_string(&mut buf, "token_embd.weight");
    buf.put_u32_le(2);
    buf.put_u64_le(dim as u64);
    buf.put_u64_le(vocab.len() as u64);
    buf.put_u32_le(GGML_TYPE_F32);
    buf.put_u64_le(0); // offset within the data section

    // Tensor data starts at the next aligned boundary.
    while buf.len() % ALIGNMENT != 0 {
        buf.put_u8(0);
    }
    for row in table {
        assert_eq!(row.len(), dim, "ragged embedding table");
        for value in row {
            buf.put_f32_le(*value);
        }
    }
    buf
}

/// What the fixture server should answer with.
pub struct FixtureResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Applied before the response line is written, to widen race
    /// windows in concurrency tests.
    pub delay: Option<Duration>,
}

impl FixtureResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Minimal HTTP/1.1 server that records request paths and authorization
/// headers and always answers with one canned response.
pub struct FixtureServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Option<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start(response: FixtureResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture server address");

        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let auth = Arc::new(Mutex::new(None));
        let response = Arc::new(response);

        let accept_hits = Arc::clone(&hits);
        let accept_paths = Arc::clone(&paths);
        let accept_auth = Arc::clone(&auth);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let hits = Arc::clone(&accept_hits);
                let paths = Arc::clone(&accept_paths);
                let auth = Arc::clone(&accept_auth);
                let response = Arc::clone(&response);
                tokio::spawn(async move {
                    serve_connection(stream, hits, paths, auth, response).await;
                });
            }
        });

        Self {
            addr,
            hits,
            paths,
            auth,
            handle,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_path(&self) -> Option<String> {
        self.paths.lock().unwrap().last().cloned()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.auth.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: tokio::net::TcpStream,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Option<String>>>,
    response: Arc<FixtureResponse>,
) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(read) => request.extend_from_slice(&chunk[..read]),
        }
    }

    let text = String::from_utf8_lossy(&request);
    if let Some(line) = text.lines().next() {
        if let Some(path) = line.split_whitespace().nth(1) {
            paths.lock().unwrap().push(path.to_string());
        }
    }
    for line in text.lines() {
        if let Some(value) = line
            .to_ascii_lowercase()
            .strip_prefix("authorization:")
            .map(str::trim)
        {
            // Preserve original casing of the value.
            let original = &line[line.len() - value.len()..];
            *auth.lock().unwrap() = Some(original.to_string());
        }
    }
    hits.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let head = format!(
        "HTTP/1.1 {} Fixture\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&response.body).await;
    let _ = stream.shutdown().await;
}
