use std::{
    num::NonZeroUsize,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use url::Url;

use super::{FlakyStore, PNG, group, memory_store, rewriter};
use crate::{
    Error, ErrorKind,
    config::Concurrency,
    storage::{ObjectStore, memory},
};

fn parallel(limit: usize) -> Concurrency {
    Concurrency::Parallel {
        limit: NonZeroUsize::new(limit).unwrap(),
    }
}

/// Earlier puts take longer, so uploads finish in reverse order.
struct SlowStore {
    inner: memory::Store,
    total: usize,
    calls: AtomicUsize,
    finished: Mutex<Vec<usize>>,
}

impl ObjectStore for SlowStore {
    type Error = memory::Error;

    async fn put(&self, key: String, content_type: String, body: Bytes) -> Result<Url, Self::Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20 * (self.total - call) as u64)).await;
        self.finished.lock().unwrap().push(call);
        self.inner.put(key, content_type, body).await
    }
}

#[tokio::test]
async fn replacements_land_in_their_own_node() {
    let store = SlowStore {
        inner: memory_store(),
        total: 3,
        calls: AtomicUsize::new(0),
        finished: Mutex::new(Vec::new()),
    };
    let input = format!(
        r#"<img src="data:image/png;base64,{PNG}"><img src="data:image/gif;base64,R0lGODlh"><img src="data:image/webp;base64,UklGRg==">"#
    );
    let output = rewriter(&store)
        .with_concurrency(parallel(3))
        .rewrite(&input, &group("g"))
        .await
        .unwrap();

    assert_eq!(*store.finished.lock().unwrap(), vec![2, 1, 0]);
    let srcs = crate::html::Document::parse(output.as_str())
        .unwrap()
        .images()
        .iter()
        .map(|image| image.attr("src").unwrap().to_owned())
        .collect::<Vec<_>>();
    for (src, (extension, magic)) in srcs.iter().zip([
        ("png", &b"\x89PNG"[..]),
        ("gif", &b"GIF89a"[..]),
        ("webp", &b"RIFF"[..]),
    ]) {
        let key = src.strip_prefix("https://cdn.example.com/").unwrap();
        assert!(key.ends_with(extension), "{key}");
        let object = store.inner.get(key).await.unwrap();
        assert_eq!(object.content_type, format!("image/{extension}"));
        assert!(object.body.starts_with(magic));
    }
}

#[tokio::test]
async fn first_failure_aborts() {
    let store = FlakyStore::new(memory_store(), 0);
    let input = format!(r#"<img src="data:image/png;base64,{PNG}"><img src="data:image/png;base64,{PNG}"><img src="data:image/png;base64,{PNG}">"#);
    let error = rewriter(&store)
        .with_concurrency(parallel(2))
        .rewrite(&input, &group("g"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Storage);
    assert!(matches!(&error, Error::Image(image) if image.context.index == 0));
    // the third upload never starts
    assert!(store.inner.objects().await.len() <= 1);
}

#[tokio::test]
async fn limit_of_one_matches_serial() {
    let input = format!(r#"<p>a</p><img src="data:image/png;base64,{PNG}" alt="a"><img src="x.png">"#);
    let store = memory_store();
    let output = rewriter(&store)
        .with_concurrency(parallel(1))
        .rewrite(&input, &group("g"))
        .await
        .unwrap();
    let key = store.objects().await.keys().next().unwrap().clone();
    assert_eq!(
        output,
        format!(r#"<p>a</p><img src="https://cdn.example.com/{key}" alt="a"><img src="x.png">"#)
    );
}
