//! Decoding tests through the public streaming API
//!
//! Every scenario is driven twice where it matters: through the pull-based
//! `fragments` stream and through the handler-based `ResponseDecoder`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{stream, Stream, StreamExt};
use quickcheck_macros::quickcheck;
use serde_json::json;
use sonarchat::streaming::{fragments, AbortHandle, Completion, LineDecoder, ResponseDecoder};
use sonarchat::{ChatError, Result};

fn record(content: &str) -> String {
    format!("{}\n", json!({ "choices": [{ "delta": { "content": content } }] }))
}

fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>>> + Unpin {
    let items: Vec<Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
    stream::iter(items)
}

/// Split `bytes` at the given offsets (taken modulo the length)
fn split_at_points(bytes: &[u8], points: &[usize]) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let mut cuts: Vec<usize> = points.iter().map(|p| p % bytes.len()).collect();
    cuts.push(0);
    cuts.push(bytes.len());
    cuts.sort_unstable();
    cuts.dedup();
    cuts.windows(2).map(|w| bytes[w[0]..w[1]].to_vec()).collect()
}

async fn collect_pull(parts: &[&str]) -> (Vec<String>, Option<ChatError>) {
    let mut out = Vec::new();
    let stream = fragments(body(parts));
    futures_util::pin_mut!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => out.push(fragment),
            Err(e) => return (out, Some(e)),
        }
    }
    (out, None)
}

#[derive(Default)]
struct Events {
    fragments: Vec<String>,
    done: usize,
    errors: usize,
}

async fn collect_handlers<S>(stream: S) -> (Events, Result<Completion>)
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin + Send + 'static,
{
    let events = Arc::new(Mutex::new(Events::default()));
    let (f, d, e) = (events.clone(), events.clone(), events.clone());

    let result = ResponseDecoder::builder(stream)
        .on_fragment(move |text| f.lock().unwrap().fragments.push(text.to_string()))
        .on_done(move || d.lock().unwrap().done += 1)
        .on_error(move |_| e.lock().unwrap().errors += 1)
        .build()
        .run()
        .await;

    let events = std::mem::take(&mut *events.lock().unwrap());
    (events, result)
}

#[quickcheck]
fn fragments_survive_any_chunking(contents: Vec<String>, points: Vec<usize>) -> bool {
    let expected: Vec<String> = contents.into_iter().filter(|c| !c.is_empty()).collect();
    let raw: String = expected.iter().map(|c| record(c)).collect();

    let mut decoder = LineDecoder::new();
    let mut emitted = Vec::new();
    for chunk in split_at_points(raw.as_bytes(), &points) {
        emitted.extend(decoder.push(&chunk));
        if decoder.check_overflow().is_err() {
            return false;
        }
    }
    decoder.finish();

    emitted == expected
}

#[quickcheck]
fn handler_decoder_matches_chunking(contents: Vec<String>, points: Vec<usize>) -> bool {
    let expected: Vec<String> = contents.into_iter().filter(|c| !c.is_empty()).collect();
    let raw: String = expected.iter().map(|c| record(c)).collect();
    let chunks: Vec<Result<Vec<u8>>> = split_at_points(raw.as_bytes(), &points)
        .into_iter()
        .map(Ok)
        .collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (events, result) = runtime.block_on(collect_handlers(stream::iter(chunks)));

    events.fragments == expected
        && events.done == 1
        && events.errors == 0
        && matches!(result, Ok(Completion::Finished))
}

#[tokio::test]
async fn test_hello_world_split_mid_record() {
    let parts = [
        "{\"choices\":[{\"delta\":{\"content\":\"Hel",
        "lo\"}}]}\n{\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n",
    ];

    let (pulled, error) = collect_pull(&parts).await;
    assert_eq!(pulled, vec!["Hello", " world"]);
    assert!(error.is_none());

    let (events, result) = collect_handlers(body(&parts)).await;
    assert_eq!(events.fragments, vec!["Hello", " world"]);
    assert_eq!(events.done, 1);
    assert_eq!(events.errors, 0);
    assert_eq!(result.unwrap(), Completion::Finished);
}

#[tokio::test]
async fn test_only_content_records_emit() {
    let parts = [
        "not json\n{\"choices\":[{\"delta\":{}}]}\n{\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
    ];

    let (pulled, _) = collect_pull(&parts).await;
    assert_eq!(pulled, vec!["ok"]);

    let (events, _) = collect_handlers(body(&parts)).await;
    assert_eq!(events.fragments, vec!["ok"]);
    assert_eq!(events.done, 1);
}

#[tokio::test]
async fn test_malformed_line_between_records() {
    let raw = format!("{}{{\"choices\":[{{\"delta\"\n{}", record("a"), record("b"));
    let (events, _) = collect_handlers(body(&[raw.as_str()])).await;
    assert_eq!(events.fragments, vec!["a", "b"]);
}

#[tokio::test]
async fn test_prefixed_line_is_not_a_record() {
    let raw = format!("data: {}{}", record("framed"), record("plain"));

    let (pulled, _) = collect_pull(&[raw.as_str()]).await;
    assert_eq!(pulled, vec!["plain"]);
}

#[tokio::test]
async fn test_empty_or_absent_delta_is_silent() {
    let raw = [
        "{\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
        "{\"choices\":[{\"delta\":{\"content\":null}}]}\n",
        "{\"choices\":[{}]}\n",
        "{\"choices\":[]}\n",
        "{}\n",
    ]
    .concat();

    let (pulled, error) = collect_pull(&[raw.as_str()]).await;
    assert!(pulled.is_empty());
    assert!(error.is_none());
}

#[tokio::test]
async fn test_trailing_partial_line_dropped() {
    let raw = format!("{}{{\"choices\":[{{\"delta\":{{\"content\":\"lost\"}}}}]}}", record("kept"));

    let (events, result) = collect_handlers(body(&[raw.as_str()])).await;
    assert_eq!(events.fragments, vec!["kept"]);
    assert_eq!(events.done, 1);
    assert_eq!(events.errors, 0);
    assert_eq!(result.unwrap(), Completion::Finished);
}

#[tokio::test]
async fn test_transport_failure_fires_error_once() {
    let first = record("partial");
    let items: Vec<Result<Vec<u8>>> = vec![
        Ok(first.into_bytes()),
        Err(ChatError::Transport("connection reset".to_string())),
        Ok(record("never").into_bytes()),
    ];

    let (events, result) = collect_handlers(stream::iter(items)).await;
    assert_eq!(events.fragments, vec!["partial"]);
    assert_eq!(events.errors, 1);
    assert_eq!(events.done, 0);
    assert!(result.unwrap_err().is_transport());
}

#[tokio::test]
async fn test_abort_mid_stream_stops_emission() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Result<Vec<u8>>>();
    let body = Box::pin(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    });

    let abort = AbortHandle::new();
    let events = Arc::new(Mutex::new(Events::default()));
    let (f, d, e) = (events.clone(), events.clone(), events.clone());

    let decoder = ResponseDecoder::builder(body)
        .abort_handle(abort.clone())
        .on_fragment(move |text| f.lock().unwrap().fragments.push(text.to_string()))
        .on_done(move || d.lock().unwrap().done += 1)
        .on_error(move |_| e.lock().unwrap().errors += 1)
        .build();
    let task = tokio::spawn(decoder.run());

    tx.send(Ok(record("first").into_bytes())).unwrap();
    for _ in 0..50 {
        if !events.lock().unwrap().fragments.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    abort.abort();
    let result = task.await.unwrap();

    // The stream is still open; nothing sent after the abort may arrive.
    let _ = tx.send(Ok(record("second").into_bytes()));

    let events = events.lock().unwrap();
    assert_eq!(events.fragments, vec!["first"]);
    assert_eq!(events.done + events.errors, 1);
    assert_eq!(result.unwrap(), Completion::Aborted);
}
