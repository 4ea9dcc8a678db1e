// Concurrent corpus tokenization.
//
// A dispatcher on a blocking thread reads paragraphs and pushes them, tagged
// with their paragraph index, onto a bounded queue. A fixed pool of blocking
// tokenizer tasks drains the queue and a single collector drops each result
// into the slot for its index, so the corpus comes back in paragraph order no
// matter which worker finishes first.
//
// Every stage reports failure as a value. The collector returns the first
// error it sees; dropping the queue then stops the dispatcher.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::pin::pin;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::document::{Corpus, Document};
use super::tokenize::{paragraphs, tokenize};
use crate::error::{InductionError, Result};

/// Sizing for the tokenizer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of concurrent tokenizer workers.
    pub workers: usize,
    /// Paragraphs the dispatcher may queue ahead of the workers.
    pub queue_depth: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 64,
        }
    }
}

/// Open `path` and tokenize it with [`segment`].
pub async fn load_corpus(path: &Path, options: PoolOptions) -> Result<Corpus> {
    let file = File::open(path)?;
    let corpus = segment(BufReader::new(file), options).await?;

    info!(
        path = %path.display(),
        documents = corpus.len(),
        tokens = corpus.token_count(),
        "Tokenized corpus"
    );

    Ok(corpus)
}

/// Split `reader` into paragraphs and tokenize them on a worker pool.
pub async fn segment<R>(reader: R, options: PoolOptions) -> Result<Corpus>
where
    R: BufRead + Send + 'static,
{
    let workers = options.workers.max(1);
    let (tx, rx) = mpsc::channel::<(usize, String)>(options.queue_depth.max(1));

    let dispatcher = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut dispatched = 0;
        for paragraph in paragraphs(reader) {
            if tx.blocking_send((dispatched, paragraph?)).is_err() {
                // The collector bailed out; nobody is listening any more.
                break;
            }
            dispatched += 1;
        }
        Ok(dispatched)
    });

    let queue = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    let results = queue
        .map(|(index, text)| tokio::task::spawn_blocking(move || (index, tokenize(&text))))
        .buffer_unordered(workers);
    let mut results = pin!(results);

    let mut slots: Vec<Option<Document>> = Vec::new();
    while let Some(joined) = results.next().await {
        let (index, document) = joined.map_err(|e| InductionError::Worker(e.to_string()))?;
        if index >= slots.len() {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(document);
    }

    let dispatched = dispatcher
        .await
        .map_err(|e| InductionError::Worker(e.to_string()))??;
    debug!(dispatched, workers, "Tokenizer pool drained");

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    #[tokio::test]
    async fn test_segment_preserves_paragraph_order() {
        let text: String = (0..200)
            .map(|i| format!("Paragraph {i} Word\nsecond line {i}\n\n"))
            .collect();
        let options = PoolOptions {
            workers: 8,
            queue_depth: 2,
        };

        let corpus = segment(Cursor::new(text), options).await.unwrap();

        assert_eq!(corpus.len(), 200);
        for (i, doc) in corpus.iter().enumerate() {
            let expected = format!("paragraph {i} word second line {i}");
            assert_eq!(doc.tokens().join(" "), expected);
        }
    }

    #[tokio::test]
    async fn test_segment_empty_input() {
        let corpus = segment(Cursor::new(String::new()), PoolOptions::default())
            .await
            .unwrap();
        assert!(corpus.is_empty());
    }

    #[tokio::test]
    async fn test_segment_single_worker() {
        let options = PoolOptions {
            workers: 1,
            queue_depth: 1,
        };
        let corpus = segment(Cursor::new("a b c\n\na b\n".to_string()), options)
            .await
            .unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents()[1].tokens(), &["a", "b"]);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("disk went away"));
            }
            self.served = true;
            let chunk = b"first paragraph\n\nsecond";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let reader = BufReader::new(FailingReader { served: false });
        let err = segment(reader, PoolOptions::default()).await.unwrap_err();
        assert!(matches!(err, InductionError::Io(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_io_error() {
        let bytes = vec![b'o', b'k', b'\n', b'\n', 0xff, 0xfe, b'\n'];
        let err = segment(Cursor::new(bytes), PoolOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InductionError::Io(_)), "got {err:?}");
    }
}
