//! Pull-based fragment stream
//!
//! Same decoding as [`ResponseDecoder`](super::ResponseDecoder), exposed as
//! a lazy `Stream`. The stream ending is the completion signal; a transport
//! failure is yielded once as `Err` and ends it.

use futures_util::{pin_mut, Stream, StreamExt};

use crate::errors::Result;
use crate::streaming::lines::{LineDecoder, MAX_BUFFER_SIZE};

/// Decode a response body into assistant text fragments
pub fn fragments<S, B>(body: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    fragments_with_capacity(body, MAX_BUFFER_SIZE)
}

/// [`fragments`] with a custom carry-over limit
pub fn fragments_with_capacity<S, B>(
    body: S,
    max_buffer_size: usize,
) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    async_stream::try_stream! {
        let mut lines = LineDecoder::with_capacity(max_buffer_size);
        pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for fragment in lines.push(chunk.as_ref()) {
                yield fragment;
            }
            lines.check_overflow()?;
        }

        lines.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ChatError;
    use futures_util::stream;

    #[tokio::test]
    async fn test_collects_fragments_in_order() {
        let body = stream::iter(vec![
            Ok::<_, ChatError>("not json\n{\"choices\":[{\"delta\":{}}]}\n"),
            Ok("{\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n"),
        ]);

        let collected: Vec<String> = fragments(body)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(collected, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let body = stream::iter(vec![
            Ok("{\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Err(ChatError::Transport("eof".to_string())),
            Ok("{\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n"),
        ]);

        let items: Vec<Result<String>> = fragments(body).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(ChatError::Transport(_))));
    }

    #[tokio::test]
    async fn test_trailing_line_is_dropped() {
        let body = stream::iter(vec![Ok::<_, ChatError>(
            "{\"choices\":[{\"delta\":{\"content\":\"kept\"}}]}\n{\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}",
        )]);

        let collected: Vec<String> = fragments(body)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(collected, vec!["kept"]);
    }

    #[test]
    fn test_overflow_is_yielded_once() {
        let body = stream::iter(vec![
            Ok::<_, ChatError>("x".repeat(32)),
            Ok("{\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n".to_string()),
        ]);

        let items: Vec<Result<String>> =
            tokio_test::block_on(fragments_with_capacity(body, 16).collect());

        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(ChatError::BufferOverflow { size: 32, max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_complete_record_precedes_overflow() {
        let body = stream::iter(vec![Ok::<_, ChatError>(format!(
            "{{\"choices\":[{{\"delta\":{{\"content\":\"complete\"}}}}]}}\n{}",
            "x".repeat(100)
        ))]);

        let items: Vec<Result<String>> = fragments_with_capacity(body, 64).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "complete");
        assert!(matches!(
            items[1],
            Err(ChatError::BufferOverflow { size: 100, max: 64 })
        ));
    }
}
