//! Streaming pipeline tests over an in-memory transport
//!
//! The transport hands out scripted byte chunks and counts how often a body
//! stream is released, so connection cleanup can be observed directly.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use ollama_core::config::ClientConfig;
use ollama_core::http::{ByteStream, RequestOptions, Transport};
use ollama_core::{
    ChatRequest, GenerateRequest, Message, OllamaClient, OllamaError, Result, TransportError,
};
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tracing_subscriber::EnvFilter;

/// Byte stream that records when it is dropped
struct TrackedBody {
    inner: ByteStream,
    closed: Arc<AtomicUsize>,
}

impl Stream for TrackedBody {
    type Item = std::result::Result<Bytes, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport replaying a fixed body for every streamed request
struct ScriptedTransport {
    chunks: Vec<&'static str>,
    closed: Arc<AtomicUsize>,
    last_body: Mutex<Option<Value>>,
}

impl ScriptedTransport {
    fn new(chunks: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            closed: Arc::new(AtomicUsize::new(0)),
            last_body: Mutex::new(None),
        })
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn last_body(&self) -> Value {
        self.last_body.lock().unwrap().clone().unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, body: Option<Value>, _options: RequestOptions) -> Result<Bytes> {
        *self.last_body.lock().unwrap() = body;
        Ok(Bytes::from(self.chunks.concat()))
    }

    async fn stream(&self, body: Option<Value>, _options: RequestOptions) -> Result<ByteStream> {
        *self.last_body.lock().unwrap() = body;
        let chunks: Vec<_> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Ok(TrackedBody {
            inner: stream::iter(chunks).boxed(),
            closed: self.closed.clone(),
        }
        .boxed())
    }
}

fn client(transport: Arc<ScriptedTransport>) -> OllamaClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    OllamaClient::with_transport(transport, ClientConfig::default())
}

const HAIKU: [&str; 4] = [
    "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:45Z\",\"response\":\"Soft\",\"done\":false}\n",
    "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:45Z\",\"response\":\" wool\",\"done\":false}\n",
    "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:46Z\",\"response\":\" drifts\",\"done\":false}\n",
    "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:46Z\",\"response\":\"\",\"done\":true,\"done_reason\":\"stop\",\"total_duration\":5000,\"load_duration\":100,\"prompt_eval_count\":12,\"eval_count\":3}\n",
];

#[tokio::test]
async fn test_stream_ends_exactly_after_done() {
    let transport = ScriptedTransport::new(HAIKU.to_vec());
    let stream = client(transport.clone())
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    let records: Vec<_> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(records.len(), 4);
    assert_eq!(records.iter().filter(|r| r.done).count(), 1);
    assert!(records.last().unwrap().done);
    assert_eq!(records[3].usage.eval_count, Some(3));
    assert!(records[..3].iter().all(|r| r.usage.is_empty()));
    assert_eq!(transport.closed(), 1);
    assert_eq!(transport.last_body()["stream"], true);
}

#[tokio::test]
async fn test_abandoned_stream_closes_connection_once() {
    let transport = ScriptedTransport::new(HAIKU.to_vec());
    let mut stream = client(transport.clone())
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.response, "Soft");
    assert_eq!(transport.closed(), 0);

    drop(stream);
    assert_eq!(transport.closed(), 1);
}

#[tokio::test]
async fn test_repeated_partial_reads_do_not_leak() {
    let transport = ScriptedTransport::new(HAIKU.to_vec());
    let client = client(transport.clone());

    for _ in 0..5 {
        let mut stream = client
            .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
            .await
            .unwrap();
        stream.next().await.unwrap().unwrap();
    }

    assert_eq!(transport.closed(), 5);
}

#[tokio::test]
async fn test_connection_released_on_done_before_drop() {
    let transport = ScriptedTransport::new(HAIKU.to_vec());
    let mut stream = client(transport.clone())
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    while let Some(record) = stream.next().await {
        if record.unwrap().done {
            break;
        }
    }
    assert_eq!(transport.closed(), 1);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_records_split_across_chunks() {
    let transport = ScriptedTransport::new(vec![
        "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:45Z\",\"resp",
        "onse\":\"caf\u{e9}\",\"done\":false}\n{\"model\":\"llama3.2\",\"created_at\":",
        "\"2024-08-04T19:22:46Z\",\"response\":\"\",\"done\":true}\n",
    ]);
    let response = client(transport)
        .generate_stream(GenerateRequest::new("llama3.2", "coffee"))
        .await
        .unwrap()
        .accumulate()
        .await
        .unwrap();

    assert_eq!(response.response, "café");
    assert!(response.done);
}

#[tokio::test]
async fn test_server_error_mid_stream() {
    let transport = ScriptedTransport::new(vec![
        HAIKU[0],
        "{\"error\":\"an error was encountered while running the model\"}\n",
        HAIKU[3],
    ]);
    let mut stream = client(transport.clone())
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().is_ok());
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.is_server_error());
    assert!(err.to_string().contains("running the model"));
    assert!(stream.next().await.is_none());
    assert_eq!(transport.closed(), 1);
}

#[tokio::test]
async fn test_missing_field_is_terminal() {
    let transport = ScriptedTransport::new(vec![
        "{\"model\":\"llama3.2\",\"response\":\"x\",\"done\":false}\n",
        HAIKU[3],
    ]);
    let mut stream = client(transport)
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.field(), Some("created_at"));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_premature_close_is_distinguishable() {
    let transport = ScriptedTransport::new(HAIKU[..2].to_vec());
    let result = client(transport)
        .generate_stream(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap()
        .accumulate()
        .await;

    assert!(matches!(
        result,
        Err(OllamaError::Transport(TransportError::ClosedBeforeDone))
    ));
}

#[tokio::test]
async fn test_chat_stream_accumulates_message() {
    let transport = ScriptedTransport::new(vec![
        "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:45Z\",\"message\":{\"role\":\"assistant\",\"content\":\"\",\"thinking\":\"Colors... \"},\"done\":false}\n",
        "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:45Z\",\"message\":{\"role\":\"assistant\",\"content\":\"\",\"tool_calls\":[{\"function\":{\"name\":\"rgb_to_hex\",\"arguments\":{\"red\":\"1.0\",\"green\":0,\"blue\":0}}}]},\"done\":false}\n",
        "{\"model\":\"llama3.2\",\"created_at\":\"2024-08-04T19:22:46Z\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\",\"eval_count\":9}\n",
    ]);
    let request = ChatRequest::new("llama3.2", vec![Message::user("What is red in hex?")])
        .with_think(true);
    let response = client(transport.clone())
        .chat_stream(request)
        .await
        .unwrap()
        .accumulate()
        .await
        .unwrap();

    assert_eq!(response.message.thinking.as_deref(), Some("Colors... "));
    assert_eq!(response.message.tool_calls().len(), 1);
    assert_eq!(response.message.tool_calls()[0].name(), "rgb_to_hex");
    assert_eq!(response.usage.eval_count, Some(9));
    assert_eq!(transport.last_body()["think"], true);
}

#[tokio::test]
async fn test_buffered_generate_parses_single_record() {
    let transport = ScriptedTransport::new(vec![HAIKU[3]]);
    let response = client(transport.clone())
        .generate(GenerateRequest::new("llama3.2", "haiku"))
        .await
        .unwrap();

    assert!(response.done);
    assert_eq!(response.usage.total_duration, Some(5000));
    assert_eq!(transport.last_body()["stream"], false);
}
