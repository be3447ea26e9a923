//! End-to-end tests for the avatar fetch pipeline against a mock HTTP server.

use std::io::Cursor;
use std::sync::Arc;

use avatar_cache::application::LoadAvatarsUseCase;
use avatar_cache::domain::entities::{CacheKey, ImageSource, PostAuthor, TimelineEntry};
use avatar_cache::infrastructure::{DiskImageCache, ImageFetcher, ImageFetcherConfig, placeholder};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn jpeg_avatar(size: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(size, size, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

async fn fetcher_in(dir: &TempDir) -> ImageFetcher {
    let disk_cache = DiskImageCache::new(dir.path().to_path_buf()).await.unwrap();
    ImageFetcher::new(ImageFetcherConfig::default(), disk_cache).unwrap()
}

async fn mount_jpeg(server: &MockServer, route: &str, size: u32) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(jpeg_avatar(size)),
        )
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

fn cache_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn jpeg_avatar_is_cached_under_md5_of_url() {
    let server = MockServer::start().await;
    mount_jpeg(&server, "/profile_images/1/avatar_normal.jpg", 64).await;
    let dir = TempDir::new().unwrap();
    let fetcher = fetcher_in(&dir).await;
    let url = format!("{}/profile_images/1/avatar_normal.jpg", server.uri());

    let first = fetcher.fetch(&url).await;
    assert_eq!(first.dimensions(), (64, 64));
    assert_eq!(request_count(&server).await, 1);
    assert_eq!(cache_files(&dir), vec![CacheKey::from_url(&url).to_hex()]);

    let second = fetcher.fetch(&url).await;
    assert_eq!(first.as_raw(), second.as_raw());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn warm_cache_survives_a_new_fetcher() {
    let server = MockServer::start().await;
    mount_jpeg(&server, "/a.jpg", 24).await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/a.jpg", server.uri());

    let original = fetcher_in(&dir).await.load(&url).await;
    assert_eq!(original.source, ImageSource::Network);

    // A fresh fetcher over the same directory stands in for a process restart.
    let restarted = fetcher_in(&dir).await.load(&url).await;
    assert_eq!(restarted.source, ImageSource::DiskCache);
    assert_eq!(*restarted.image, *original.image);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn pre_existing_entry_is_served_without_network() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/never-requested.png", server.uri());

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 7, Rgb([1, 2, 3])))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    std::fs::write(
        dir.path().join(CacheKey::from_url(&url).to_hex()),
        png.into_inner(),
    )
    .unwrap();

    let loaded = fetcher_in(&dir).await.load(&url).await;

    assert_eq!(loaded.source, ImageSource::DiskCache);
    assert_eq!(loaded.dimensions(), (5, 7));
    assert_eq!(loaded.image.get_pixel(0, 0).0, [1, 2, 3, 255]);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn corrupt_entry_yields_placeholder_without_refetch() {
    let server = MockServer::start().await;
    mount_jpeg(&server, "/corrupt.jpg", 16).await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/corrupt.jpg", server.uri());
    std::fs::write(
        dir.path().join(CacheKey::from_url(&url).to_hex()),
        b"garbage bytes",
    )
    .unwrap();

    let loaded = fetcher_in(&dir).await.load(&url).await;

    assert_eq!(loaded.source, ImageSource::Placeholder);
    assert!(Arc::ptr_eq(&loaded.image, &placeholder()));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn unreachable_host_yields_placeholder() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let url = format!("http://{addr}/avatar.png");

    let loaded = fetcher_in(&dir).await.load(&url).await;

    assert!(loaded.source.is_placeholder());
    assert_eq!(loaded.dimensions(), (48, 48));
    assert!(cache_files(&dir).is_empty());
}

#[tokio::test]
async fn non_image_body_leaves_no_usable_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rate limit exceeded"))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let fetcher = fetcher_in(&dir).await;
    let url = format!("{}/a.png", server.uri());

    assert!(fetcher.load(&url).await.source.is_placeholder());
    assert!(fetcher.load(&url).await.source.is_placeholder());
    assert!(cache_files(&dir).is_empty());
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn timeline_rows_follow_entry_order() {
    let server = MockServer::start().await;
    mount_jpeg(&server, "/big.jpg", 96).await;
    mount_jpeg(&server, "/small.jpg", 16).await;
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(fetcher_in(&dir).await);
    let use_case = LoadAvatarsUseCase::new(fetcher, 4);

    let big = format!("{}/big.jpg", server.uri());
    let small = format!("{}/small.jpg", server.uri());
    let missing = format!("{}/missing.jpg", server.uri());
    let entries = vec![
        TimelineEntry::new("1", "first", PostAuthor::new("big", big.clone())),
        TimelineEntry::new("2", "second", PostAuthor::new("small", small.clone())),
        TimelineEntry::new("3", "third", PostAuthor::new("missing", missing)),
        TimelineEntry::new("4", "fourth", PostAuthor::new("big", big)),
    ];

    let rows = use_case.execute(entries).await;

    let sizes: Vec<(u32, u32)> = rows.iter().map(|r| r.avatar.dimensions()).collect();
    assert_eq!(sizes, vec![(96, 96), (16, 16), (48, 48), (96, 96)]);
    assert_eq!(rows[2].avatar.source, ImageSource::Placeholder);
    assert_eq!(cache_files(&dir).len(), 2);
}
