mod common;

use bytes::Bytes;
use common::{TestDepot, failing_stream, seeded_bytes};
use depot_core::{DownloadDescriptor, UploadDescriptor};
use depot_storage::StorageError;
use futures::StreamExt;

#[tokio::test]
async fn test_whole_upload_roundtrip() {
    let depot = TestDepot::new().await;
    let data = seeded_bytes(7, 100_000);
    depot.put_whole("SUCCESS_RESULT", "result.json", &data).await;

    assert_eq!(depot.get("LAST_RESULT", "result.json").await, data);
    let size = depot
        .server
        .file_size(&DownloadDescriptor::new("LAST_RESULT", "result.json"))
        .await
        .unwrap();
    assert_eq!(size, data.len() as u64);
}

#[tokio::test]
async fn test_reupload_replaces_content() {
    let depot = TestDepot::new().await;
    depot
        .put_whole("SUCCESS_RESULT", "result.json", &seeded_bytes(1, 5000))
        .await;
    let second = seeded_bytes(2, 300);
    depot.put_whole("SUCCESS_RESULT", "result.json", &second).await;

    assert_eq!(depot.get("GATHER", "result.json").await, second);
}

#[tokio::test]
async fn test_range_returns_exactly_requested_bytes() {
    let depot = TestDepot::with_config(|c| c.transfer.buffer_size = 1024).await;
    let data = seeded_bytes(3, 10_000);
    depot.put_whole("SUCCESS_RESULT", "range.bin", &data).await;

    let desc = DownloadDescriptor::new("LAST_RESULT", "range.bin").with_range(0, 2500);
    let mut out = Vec::new();
    let sent = depot.server.download(&desc, &mut out).await.unwrap();
    assert_eq!(sent, 2500);
    assert_eq!(out, &data[..2500]);

    let desc = DownloadDescriptor::new("LAST_RESULT", "range.bin").with_range(4000, 3000);
    let mut out = Vec::new();
    depot.server.download(&desc, &mut out).await.unwrap();
    assert_eq!(out, &data[4000..7000]);
}

#[tokio::test]
async fn test_range_past_end_is_clipped() {
    let depot = TestDepot::new().await;
    let data = seeded_bytes(4, 1000);
    depot.put_whole("SUCCESS_RESULT", "short.bin", &data).await;

    let desc = DownloadDescriptor::new("LAST_RESULT", "short.bin").with_range(900, 5000);
    let download = depot.server.open_download(&desc).await.unwrap();
    assert_eq!(download.content_length, 100);
    let chunks: Vec<_> = download.stream.collect().await;
    let body: Vec<u8> = chunks
        .into_iter()
        .flat_map(|c| c.unwrap().to_vec())
        .collect();
    assert_eq!(body, &data[900..]);

    let desc = DownloadDescriptor::new("LAST_RESULT", "short.bin").with_range(5000, 10);
    let mut out = Vec::new();
    assert_eq!(depot.server.download(&desc, &mut out).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stream_items_bounded_by_buffer() {
    let depot = TestDepot::with_config(|c| c.transfer.buffer_size = 512).await;
    depot
        .put_whole("SUCCESS_RESULT", "buf.bin", &seeded_bytes(5, 4000))
        .await;

    let download = depot
        .server
        .open_download(&DownloadDescriptor::new("LAST_RESULT", "buf.bin"))
        .await
        .unwrap();
    let sizes: Vec<usize> = download
        .stream
        .map(|c| c.unwrap().len())
        .collect()
        .await;
    assert!(sizes.iter().all(|&n| n <= 512));
    assert_eq!(sizes.iter().sum::<usize>(), 4000);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let depot = TestDepot::new().await;
    let mut out = Vec::new();

    let err = depot
        .server
        .download(&DownloadDescriptor::new("LAST_RESULT", "nope.bin"), &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound(n) if n == "nope.bin"));

    let err = depot
        .server
        .download(&DownloadDescriptor::new("TOOL_CLIENT", "nope.bin"), &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound(_)));
}

#[tokio::test]
async fn test_static_category_reads_primary_volume() {
    let depot = TestDepot::new().await;
    let root = depot.config.categories.volumes["TOOL_CLIENT"][0].clone();
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("client.tar.gz"), b"tool bytes").unwrap();
    std::fs::create_dir_all(root.join("bundle")).unwrap();

    assert_eq!(depot.get("TOOL_CLIENT", "client.tar.gz").await, b"tool bytes");

    let mut out = Vec::new();
    let err = depot
        .server
        .download(&DownloadDescriptor::new("TOOL_CLIENT", "bundle"), &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotAFile(_)));
}

#[tokio::test]
async fn test_file_size_zero_when_absent() {
    let depot = TestDepot::new().await;
    for category in ["LAST_RESULT", "TOOL_CLIENT", "BUILD_SCRIPT"] {
        let size = depot
            .server
            .file_size(&DownloadDescriptor::new(category, "ghost.bin"))
            .await
            .unwrap();
        assert_eq!(size, 0, "{category}");
    }
}

#[tokio::test]
async fn test_unknown_category_on_download() {
    let depot = TestDepot::new().await;
    let err = depot
        .server
        .file_size(&DownloadDescriptor::new("MYSTERY", "a.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownCategory(_)));
}

#[tokio::test]
async fn test_failed_source_leaves_no_file() {
    let depot = TestDepot::new().await;
    let err = depot
        .server
        .upload(
            &UploadDescriptor::whole("SUCCESS_RESULT", "broken.bin"),
            failing_stream(Bytes::from_static(b"partial")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UploadFailed { ref file_name, .. } if file_name == "broken.bin"));

    let dir = depot.assigned_dir("broken.bin").await;
    let leftovers: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[tokio::test]
async fn test_chunk_upload_lands_in_chunk_directory() {
    let depot = TestDepot::new().await;
    let receipt = depot
        .server
        .upload(
            &UploadDescriptor::chunk("SUCCESS_RESULT", "parts.bin", 2, 1),
            common::split_stream(seeded_bytes(9, 10), 3),
        )
        .await
        .unwrap();
    assert!(receipt.chunked);
    assert_eq!(receipt.bytes_written, 10);

    let dir = depot.assigned_dir("parts.bin").await;
    let chunk_dir = depot.server.chunks().chunk_dir(&dir, "parts.bin");
    assert_eq!(receipt.path, chunk_dir.join("parts.bin_chunk_1"));
    assert_eq!(depot.server.chunks().count(&chunk_dir).await.unwrap(), 1);
    assert!(!dir.join("parts.bin").exists());
}

#[tokio::test]
async fn test_temp_prefixed_name_is_rejected() {
    let depot = TestDepot::new().await;
    let err = depot
        .server
        .upload(
            &UploadDescriptor::chunk("SUCCESS_RESULT", ".tmp.report", 2, 0),
            futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"chunk"))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidFileName(_)));

    let err = depot
        .server
        .merge("SUCCESS_RESULT", ".tmp.report", 2)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidFileName(_)));
}
