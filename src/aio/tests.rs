use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;

use bytes::Bytes;
use futures::{FutureExt, StreamExt, TryStreamExt};

use crate::source::{from_fn, MemorySource, RangeData, RangeSource, SourceShape};
use crate::*;

async fn build(writer: AsarWriter) -> Bytes {
    let chunks: Vec<Bytes> = writer.into_stream().unwrap().try_collect().await.unwrap();
    chunks.concat().into()
}

/// A stream-backed source over `data`, answering in `chunk`-sized pieces.
/// Windows past the end are cut short, as a truncated file would be.
fn streaming(data: Bytes, chunk: usize) -> impl RangeSource {
    from_fn(move |offset, length| {
        let end = ((offset + length) as usize).min(data.len());
        let start = (offset as usize).min(end);
        let window = data.slice(start..end);
        async move {
            let pieces: Vec<io::Result<Bytes>> = window
                .chunks(chunk)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(RangeData::Stream(futures::stream::iter(pieces).boxed()))
        }
    })
}

fn example_writer() -> AsarWriter {
    let mut writer = AsarWriter::new();
    writer
        .add_file("a.txt", &b"hello"[..], 5, FileAttributes::default())
        .unwrap();
    writer
        .add_file("dir/b.txt", &b"xyz"[..], 3, FileAttributes::default())
        .unwrap();
    writer
}

fn large_payload() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn end_to_end_example() {
    let writer = example_writer();
    assert_eq!(
        serde_json::to_string(writer.index()).unwrap(),
        r#"{"files":{"a.txt":{"offset":"0","size":5},"dir":{"files":{"b.txt":{"offset":"5","size":3}}}}}"#
    );
    assert_eq!(writer.encode_header().unwrap().len(), 112);

    let archive = build(writer).await;
    assert_eq!(archive.len(), 120);
    assert_eq!(&archive[112..], b"helloxyz");

    let reader = AsarReader::new(MemorySource::new(archive));
    let index = reader.fetch_index().await.unwrap();
    assert_eq!(index.data_offset(), 112);

    assert_eq!(reader.read_file("a.txt").await.unwrap(), "hello");
    assert_eq!(reader.read_file("/dir/b.txt").await.unwrap(), "xyz");
    assert_eq!(
        reader.read_file("dir").await.unwrap_err().kind(),
        ErrorKind::IsADirectory
    );
    assert_eq!(reader.readdir("dir").unwrap(), vec!["b.txt"]);
    assert_eq!(reader.readdir("").unwrap(), vec!["a.txt", "dir"]);
}

#[tokio::test]
async fn filesystem_style_errors() {
    let reader = AsarReader::new(MemorySource::new(build(example_writer()).await));
    reader.fetch_index().await.unwrap();

    let err = reader.get_file_index("dir/missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), Some("ENOENT"));

    let err = reader.get_file_index("a.txt/more").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotADirectory);

    let err = reader.readdir("a.txt").unwrap_err();
    assert_eq!(err.code(), Some("ENOTDIR"));

    let Err(err) = reader.create_read_stream("dir").await else {
        panic!("streaming a directory should fail");
    };
    assert_eq!(err.kind(), ErrorKind::IsADirectory);
    assert_eq!(err.errno(), Some(-21));

    assert!(reader.is_folder("dir").unwrap());
    assert!(!reader.is_folder("a.txt").unwrap());
}

#[tokio::test]
async fn index_must_be_fetched_for_lookups() {
    let reader = AsarReader::new(MemorySource::new(build(example_writer()).await));
    assert_eq!(
        reader.readdir("").unwrap_err().kind(),
        ErrorKind::IndexNotLoaded
    );
    assert_eq!(reader.source_shape(), SourceShape::Unknown);

    // content reads fetch implicitly
    assert_eq!(reader.read_file("a.txt").await.unwrap(), "hello");
    assert_eq!(reader.readdir("dir").unwrap(), vec!["b.txt"]);
    assert_eq!(reader.source_shape(), SourceShape::BufferBacked);
}

#[tokio::test]
async fn buffer_and_stream_sources_agree() {
    let large = large_payload();
    let mut writer = example_writer();
    writer
        .add_bytes("assets/large.bin", large.clone(), FileAttributes::default())
        .unwrap();
    writer
        .add_bytes("assets/empty", Bytes::new(), FileAttributes::default())
        .unwrap();
    let archive = build(writer).await;

    let buffered = AsarReader::new(MemorySource::new(archive.clone()));
    let streamed = AsarReader::new(streaming(archive, 1000));

    for path in ["a.txt", "dir/b.txt", "assets/large.bin", "assets/empty"] {
        let a = buffered.read_file(path).await.unwrap();
        let b = streamed.read_file(path).await.unwrap();
        assert_eq!(a, b, "{}", path);

        let a: Vec<Bytes> = buffered
            .create_read_stream(path)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let b: Vec<Bytes> = streamed
            .create_read_stream(path)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(a.concat(), b.concat(), "{}", path);
    }

    assert_eq!(buffered.read_file("assets/large.bin").await.unwrap(), large);
    assert_eq!(buffered.source_shape(), SourceShape::BufferBacked);
    assert_eq!(streamed.source_shape(), SourceShape::StreamBacked);
}

#[tokio::test]
async fn buffered_streams_are_chunked() {
    let large = large_payload();
    let mut writer = AsarWriter::new();
    writer
        .add_bytes("large.bin", large.clone(), FileAttributes::default())
        .unwrap();
    let archive = build(writer).await;

    let memory = MemorySource::new(archive);
    let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = calls.clone();
    let source = from_fn(move |offset, length| {
        log.lock().unwrap().push((offset, length));
        let memory = memory.clone();
        async move { memory.read_range(offset, length).await }
    });

    let reader = AsarReader::new(source);
    let index = reader.fetch_index().await.unwrap();
    let (start, len) = index
        .file_location(index.file("large.bin").unwrap())
        .unwrap();

    calls.lock().unwrap().clear();
    let chunks: Vec<Bytes> = reader
        .create_read_stream("large.bin")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), large);
    assert!(chunks.iter().all(|c| c.len() <= DEFAULT_CHUNK_SIZE));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 4);
    assert!(calls
        .iter()
        .all(|&(o, l)| o >= start && o + l <= start + len && l <= DEFAULT_CHUNK_SIZE as u64));
}

#[tokio::test]
async fn attributes_round_trip() {
    let mut attrs = FileAttributes::executable();
    attrs
        .extra
        .insert("integrity".into(), serde_json::json!({ "algorithm": "SHA256" }));

    let mut writer = AsarWriter::new();
    writer.mkdir("bin").unwrap();
    writer.mkdir(["empty", "dir"]).unwrap();
    writer
        .add_reader("bin/tool", &b"#!/bin/sh\n"[..], 10, attrs.clone())
        .unwrap();
    let archive = build(writer).await;

    let reader = AsarReader::new(MemorySource::new(archive));
    reader.fetch_index().await.unwrap();
    let file = reader.get_file_index("bin/tool").unwrap().as_file().unwrap();
    assert!(file.is_executable());
    assert_eq!(file.attributes(), &attrs);
    assert_eq!(reader.read_file("bin/tool").await.unwrap(), "#!/bin/sh\n");
    assert!(reader.readdir("empty/dir").unwrap().is_empty());
}

#[tokio::test]
async fn rejected_entries_leave_archive_intact() {
    let mut writer = example_writer();
    let err = writer
        .add_file("a.txt", &b"again"[..], 5, FileAttributes::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = writer
        .add_file("a.txt/inner", &b"x"[..], 1, FileAttributes::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotCreateInsideFile);

    let err = writer.mkdir(["ok", "bad/segment"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathInvalid);
    assert_eq!(writer.content_len(), 8);

    let reader = AsarReader::new(MemorySource::new(build(writer).await));
    assert_eq!(reader.read_file("a.txt").await.unwrap(), "hello");
    assert_eq!(reader.read_file("dir/b.txt").await.unwrap(), "xyz");
}

#[tokio::test]
async fn write_to_counts_bytes() {
    let mut out = Vec::new();
    let written = example_writer().write_to(&mut out).await.unwrap();
    assert_eq!(written, 120);
    assert_eq!(out.len(), 120);
    assert_eq!(&out[..4], &[4, 0, 0, 0]);
}

#[tokio::test]
async fn source_must_keep_its_shape() {
    let archive = build(example_writer()).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let source = from_fn(move |offset, length| {
        let window = archive.slice(offset as usize..(offset + length) as usize);
        let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
        async move {
            if first {
                Ok(RangeData::Buffer(window))
            } else {
                Ok(RangeData::Stream(
                    futures::stream::once(async move { Ok::<_, io::Error>(window) }).boxed(),
                ))
            }
        }
    });

    let reader = AsarReader::new(source);
    let err = reader.fetch_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(reader.source_shape(), SourceShape::BufferBacked);
}

#[tokio::test]
async fn garbage_index_is_corrupt() {
    let mut archive = build(example_writer()).await.to_vec();
    archive[16] = b'[';
    let reader = AsarReader::new(MemorySource::new(archive));
    let err = reader.fetch_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);

    let truncated = build(example_writer()).await.slice(..60);
    let reader = AsarReader::new(streaming(truncated.clone(), 16));
    let err = reader.fetch_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);

    let reader = AsarReader::new(MemorySource::new(truncated));
    let err = reader.fetch_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[tokio::test]
async fn huge_declared_size_is_corrupt() {
    let text = r#"{"files":{"f":{"offset":"0","size":9223372036854775808}}}"#;
    let mut archive = crate::core::header::encode_text(text).unwrap();
    archive.extend_from_slice(b"12345678");
    let reader = AsarReader::new(streaming(archive.into(), 4));

    reader.fetch_index().await.unwrap();
    let file = reader.get_file_index("f").unwrap().as_file().unwrap();
    assert_eq!(file.size(), 1 << 63);

    let err = reader.read_file("f").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
}

#[tokio::test]
async fn reserved_attribute_keys_are_ignored() {
    let mut attrs = FileAttributes::default();
    attrs.extra.insert("offset".into(), serde_json::json!("40"));
    attrs.extra.insert("size".into(), serde_json::json!(99));
    attrs.extra.insert("files".into(), serde_json::json!({}));
    attrs.extra.insert("unpacked".into(), serde_json::json!(false));

    let mut writer = example_writer();
    writer.add_bytes("c.txt", "abc", attrs).unwrap();
    assert_eq!(
        serde_json::to_string(writer.index().get("c.txt").unwrap()).unwrap(),
        r#"{"offset":"8","size":3,"unpacked":false}"#
    );

    let reader = AsarReader::new(MemorySource::new(build(writer).await));
    assert_eq!(reader.read_file("c.txt").await.unwrap(), "abc");
    assert_eq!(reader.read_file("a.txt").await.unwrap(), "hello");
    let file = reader.get_file_index("c.txt").unwrap().as_file().unwrap();
    assert_eq!(file.attributes().extra.len(), 1);
}

// Splicer

fn stream_of(chunks: &[&'static str]) -> ByteStream {
    let chunks: Vec<io::Result<Bytes>> = chunks
        .iter()
        .map(|c| Ok(Bytes::from_static(c.as_bytes())))
        .collect();
    futures::stream::iter(chunks).boxed()
}

#[tokio::test]
async fn splicer_emits_entries_in_order() {
    let splicer = StreamSplicer::new(vec![
        SpliceEntry::new(3, &b"abc"[..]),
        SpliceEntry::new(4, stream_of(&["de", "", "fg"])),
        SpliceEntry::new(0, stream_of(&[])),
        SpliceEntry::new(2, &b"hi"[..]),
    ]);
    assert_eq!(splicer.total_len(), 9);
    let chunks: Vec<Bytes> = splicer.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"abcdefghi");
}

#[tokio::test]
async fn splicer_rejects_overrun() {
    let mut splicer = StreamSplicer::new(vec![
        SpliceEntry::new(2, &b"ok"[..]),
        SpliceEntry::new(3, stream_of(&["ab", "cd"])),
        SpliceEntry::new(1, &b"z"[..]),
    ]);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "ok");
    assert_eq!(splicer.next().await.unwrap().unwrap(), "ab");
    let err = splicer.next().await.unwrap().unwrap_err();
    assert!(matches!(err, AsarError::PayloadOverrun { entry: 1, declared: 3 }));
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    assert!(splicer.next().await.is_none());
}

#[tokio::test]
async fn splicer_rejects_short_payloads() {
    let mut splicer = StreamSplicer::new(vec![SpliceEntry::new(5, stream_of(&["abc"]))]);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "abc");
    let err = splicer.next().await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        AsarError::PayloadTruncated {
            entry: 0,
            declared: 5,
            received: 3
        }
    ));
    assert!(splicer.next().await.is_none());

    let mut splicer = StreamSplicer::new(vec![SpliceEntry::new(5, &b"abc"[..])]);
    assert_eq!(
        splicer.next().await.unwrap().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );

    let chunks: Vec<Bytes> = StreamSplicer::new(vec![SpliceEntry::new(2, &b"abc"[..])])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), b"ab");
}

#[tokio::test]
async fn splicer_forwards_source_errors() {
    let failing: ByteStream = futures::stream::iter(vec![
        Ok(Bytes::from_static(b"a")),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "upstream")),
    ])
    .boxed();
    let mut splicer = StreamSplicer::new(vec![SpliceEntry::new(4, failing)]);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "a");
    let err = splicer.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(splicer.next().await.is_none());
}

#[tokio::test]
async fn splicer_suspends_on_stalled_source() {
    let (tx, rx) = futures::channel::mpsc::unbounded::<io::Result<Bytes>>();
    let mut splicer = StreamSplicer::new(vec![
        SpliceEntry::new(2, &b"ab"[..]),
        SpliceEntry::new(4, Box::pin(rx) as ByteStream),
        SpliceEntry::new(1, &b"z"[..]),
    ]);

    assert_eq!(splicer.next().await.unwrap().unwrap(), "ab");
    assert!(splicer.next().now_or_never().is_none());

    tx.unbounded_send(Ok(Bytes::from_static(b"cd"))).unwrap();
    assert_eq!(splicer.next().await.unwrap().unwrap(), "cd");
    assert!(splicer.next().now_or_never().is_none());

    tx.unbounded_send(Ok(Bytes::from_static(b"ef"))).unwrap();
    assert_eq!(splicer.next().await.unwrap().unwrap(), "ef");
    // full, but the source has not ended yet
    assert!(splicer.next().now_or_never().is_none());

    drop(tx);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "z");
    assert!(splicer.next().await.is_none());
    assert_eq!(splicer.bytes_emitted(), 7);
}

#[tokio::test]
async fn splicer_only_pulls_on_demand() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let mut sent = false;
    let source = futures::stream::poll_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if sent {
            Poll::Ready(None)
        } else {
            sent = true;
            Poll::Ready(Some(Ok(Bytes::from_static(b"xy"))))
        }
    });
    let mut splicer = StreamSplicer::new(vec![
        SpliceEntry::new(1, &b"a"[..]),
        SpliceEntry::new(2, Box::pin(source) as ByteStream),
    ]);

    assert_eq!(splicer.next().await.unwrap().unwrap(), "a");
    assert_eq!(polls.load(Ordering::SeqCst), 0);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "xy");
    assert_eq!(polls.load(Ordering::SeqCst), 1);
    // one more poll, to see the source end
    assert!(splicer.next().await.is_none());
    assert_eq!(polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn splicer_rejects_overrun_in_later_chunk() {
    let result: Result<Vec<Bytes>> = StreamSplicer::new(vec![
        SpliceEntry::new(2, stream_of(&["ab", "c"])),
        SpliceEntry::new(1, &b"z"[..]),
    ])
    .try_collect()
    .await;
    let err = result.unwrap_err();
    assert!(matches!(err, AsarError::PayloadOverrun { entry: 0, declared: 2 }));

    let mut splicer = StreamSplicer::new(vec![
        SpliceEntry::new(2, stream_of(&["ab", "", "c"])),
        SpliceEntry::new(1, &b"z"[..]),
    ]);
    assert_eq!(splicer.next().await.unwrap().unwrap(), "ab");
    let err = splicer.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    assert!(splicer.next().await.is_none());
    assert_eq!(splicer.bytes_emitted(), 2);
}
