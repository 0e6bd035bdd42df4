// Behaviour every StorageBackend must share; each backend's tests run these
use super::StorageBackend;
use crate::error::StorageError;
use crate::io_utils::sources::{payload, ShortReader};
use crate::io_utils::{self, DEFAULT_CHUNK_SIZE};
use crate::key::ObjectKey;
use futures::future::join_all;

fn key(value: &str) -> ObjectKey {
    ObjectKey::new(value).unwrap()
}

pub(crate) async fn read_object<B: StorageBackend>(backend: &B, key: &ObjectKey) -> Vec<u8> {
    let mut source = backend.fetch(key).await.unwrap();
    io_utils::to_byte_array(&mut source).await.unwrap()
}

async fn read_range<B: StorageBackend>(backend: &B, key: &ObjectKey, start: u64, end: u64) -> Vec<u8> {
    let mut source = backend.fetch_range(key, start, end).await.unwrap();
    io_utils::to_byte_array(&mut source).await.unwrap()
}

pub(crate) async fn roundtrip<B: StorageBackend>(backend: &B) {
    for len in [0, 1, DEFAULT_CHUNK_SIZE, 5 * DEFAULT_CHUNK_SIZE + 7] {
        let k = key(&format!("topic/0/{len}.log"));
        let data = payload(len);

        let stored = backend.upload(&k, &mut data.as_slice(), None).await.unwrap();

        assert_eq!(stored, len as u64);
        assert_eq!(read_object(backend, &k).await, data);
    }
}

pub(crate) async fn overwrite<B: StorageBackend>(backend: &B) {
    let k = key("topic/0/segment.index");

    backend.upload(&k, &mut &b"first version, longer"[..], None).await.unwrap();
    backend.upload(&k, &mut &b"second"[..], Some(6)).await.unwrap();

    assert_eq!(read_object(backend, &k).await, b"second");
}

pub(crate) async fn short_read_source<B: StorageBackend>(backend: &B) {
    let k = key("topic/2/short.log");
    let data = payload(3 * DEFAULT_CHUNK_SIZE + 1);
    let mut source = ShortReader::new(data.clone(), 17).interrupting();

    let stored = backend
        .upload(&k, &mut source, Some(data.len() as u64))
        .await
        .unwrap();

    assert_eq!(stored, data.len() as u64);
    assert_eq!(read_object(backend, &k).await, data);
}

pub(crate) async fn missing_key<B: StorageBackend>(backend: &B) {
    let k = key("nothing/here");

    let err = backend.fetch(&k).await.err().unwrap();
    assert!(matches!(err, StorageError::KeyNotFound(ref missing) if *missing == k));

    let err = backend.fetch_range(&k, 0, 1).await.err().unwrap();
    assert!(err.is_not_found());
}

pub(crate) async fn range_law<B: StorageBackend>(backend: &B) {
    let k = key("topic/3/ranged.log");
    let data = payload(1000);
    let n = data.len() as u64;
    backend.upload(&k, &mut data.as_slice(), None).await.unwrap();

    let cases = [(0, n), (0, 1), (10, 20), (999, 1000), (500, 5000), (0, u64::MAX), (7, 7)];
    for (a, b) in cases {
        let expected = &data[a as usize..b.min(n) as usize];
        assert_eq!(read_range(backend, &k, a, b).await, expected, "range [{a}, {b})");
    }

    assert!(read_range(backend, &k, n, n).await.is_empty());
    assert!(read_range(backend, &k, n, n + 10).await.is_empty());
}

pub(crate) async fn invalid_ranges<B: StorageBackend>(backend: &B) {
    let k = key("topic/3/small.log");
    backend.upload(&k, &mut &b"0123456789"[..], None).await.unwrap();

    for (a, b) in [(11, 12), (5, 4), (100, 50)] {
        let err = backend.fetch_range(&k, a, b).await.err().unwrap();
        assert!(
            matches!(err, StorageError::InvalidRange { start, end, size: 10 } if start == a && end == b),
            "range [{a}, {b}) gave {err:?}"
        );
    }
}

pub(crate) async fn length_mismatch<B: StorageBackend>(backend: &B) {
    let k = key("topic/4/segment.log");
    backend.upload(&k, &mut &b"kept"[..], Some(4)).await.unwrap();

    for expected in [0, 3, 5] {
        let err = backend
            .upload(&k, &mut &b"repl"[..], Some(expected))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::LengthMismatch { actual: 4, .. }));
    }
    assert_eq!(read_object(backend, &k).await, b"kept");

    let fresh = key("topic/4/never.log");
    backend.upload(&fresh, &mut &b"abc"[..], Some(2)).await.unwrap_err();
    assert!(backend.fetch(&fresh).await.err().unwrap().is_not_found());
}

pub(crate) async fn delete_idempotent<B: StorageBackend>(backend: &B) {
    let k = key("topic/5/segment.log");
    backend.upload(&k, &mut &b"bye"[..], None).await.unwrap();

    backend.delete(&k).await.unwrap();
    assert!(backend.fetch(&k).await.err().unwrap().is_not_found());

    backend.delete(&k).await.unwrap();
    backend.delete(&key("never/stored")).await.unwrap();
}

pub(crate) async fn delete_all<B: StorageBackend>(backend: &B) {
    let keys: Vec<_> = ["t/0/a.log", "t/0/a.index", "t/1/b.log"]
        .into_iter()
        .map(key)
        .collect();
    for k in &keys {
        backend.upload(k, &mut k.as_str().as_bytes(), None).await.unwrap();
    }
    let survivor = key("t/2/c.log");
    backend.upload(&survivor, &mut &b"c"[..], None).await.unwrap();

    backend.delete_all(&keys).await.unwrap();

    for k in &keys {
        assert!(backend.fetch(k).await.err().unwrap().is_not_found());
    }
    assert_eq!(read_object(backend, &survivor).await, b"c");
}

pub(crate) async fn concurrent_uploads<B: StorageBackend>(backend: &B) {
    let k = key("topic/6/raced.log");
    let contents: Vec<Vec<u8>> = (0..8u8)
        .map(|i| vec![i; 2 * DEFAULT_CHUNK_SIZE + i as usize * 100])
        .collect();

    for _ in 0..5 {
        let uploads = contents.iter().map(|c| {
            let k = &k;
            async move {
                let mut source = ShortReader::new(c.clone(), 1500);
                backend.upload(k, &mut source, None).await
            }
        });

        for result in join_all(uploads).await {
            result.unwrap();
        }

        let stored = read_object(backend, &k).await;
        assert!(
            contents.iter().any(|c| *c == stored),
            "object is not one whole upload ({} bytes)",
            stored.len()
        );
    }
}

pub(crate) async fn fetch_during_upload<B: StorageBackend>(backend: &B) {
    let k = key("topic/7/swapped.log");
    let old = vec![b'o'; 4 * DEFAULT_CHUNK_SIZE];
    let new = vec![b'n'; 3 * DEFAULT_CHUNK_SIZE];
    backend.upload(&k, &mut old.as_slice(), None).await.unwrap();

    let upload = async {
        let mut source = ShortReader::new(new.clone(), 512);
        backend.upload(&k, &mut source, None).await.unwrap();
    };
    let reads = join_all((0..8).map(|_| read_object(backend, &k)));

    let ((), seen) = tokio::join!(upload, reads);

    for bytes in seen {
        assert!(bytes == old || bytes == new, "saw a partial object of {} bytes", bytes.len());
    }
    assert_eq!(read_object(backend, &k).await, new);
}

pub(crate) async fn sibling_uploads_during_delete<B: StorageBackend>(backend: &B) {
    for round in 0..20 {
        let uploads = (0..6).map(|i| async move {
            let k = key(&format!("t/p/{round}/u{i}"));
            let body = payload(DEFAULT_CHUNK_SIZE + i);
            backend.upload(&k, &mut body.as_slice(), None).await.unwrap();
            (k, body)
        });
        let churn = (0..6).map(|i| async move {
            let k = key(&format!("t/p/{round}/d{i}"));
            backend.upload(&k, &mut &b"short-lived"[..], None).await.unwrap();
            backend.delete(&k).await.unwrap();
        });

        let (stored, _) = tokio::join!(join_all(uploads), join_all(churn));

        for (k, body) in stored {
            assert_eq!(read_object(backend, &k).await, body);
        }
    }
}
