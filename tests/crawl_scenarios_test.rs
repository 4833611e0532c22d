//! End-to-end crawl scenarios against a mock HTTP server.

mod common;

use sitecrawl::Controller;

fn quote_page(next: Option<&str>) -> String {
    let quotes: String = (0..10)
        .map(|i| {
            format!(
                r#"<div class="quote">
                     <span class="text">Quote number {i}</span>
                     <small class="author">Author {i}</small>
                     <div class="tags"><a class="tag">life</a></div>
                   </div>"#
            )
        })
        .collect();
    let next_link = next
        .map(|href| format!(r#"<li class="next"><a href="{href}">Next</a></li>"#))
        .unwrap_or_default();
    format!("<html><body>{quotes}{next_link}</body></html>")
}

#[tokio::test]
async fn s1_json_seed_yields_single_document_resource() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ua":"X"}"#)
        .create_async()
        .await;

    let storage = common::storage_dir();
    let seed = server.url();
    let controller = Controller::new(storage.path()).await.unwrap();
    let config = common::crawl_config(&seed, &storage, 1);

    let results = controller.start_crawl(&config).await.unwrap();

    assert_eq!(results.documents.len(), 1);
    assert_eq!(results.source_url, seed);
    assert!(results.documents[0].content.starts_with('{'));
}

#[tokio::test]
async fn s2_html_seed_classifies_media_by_type() {
    let mut server = mockito::Server::new_async().await;
    let html = r#"
        <html><body>
            <div class="content">
                <img src="/a.jpg" width="300" height="300">
                <img src="/b.jpg" width="300" height="300">
                <video src="/clip.mp4"></video>
                <a href="/stream.m3u8">Stream</a>
            </div>
        </body></html>
    "#;
    let _mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(html)
        .create_async()
        .await;

    let storage = common::storage_dir();
    let seed = server.url();
    let controller = Controller::new(storage.path()).await.unwrap();
    let config = common::crawl_config(&seed, &storage, 1);

    let results = controller.start_crawl(&config).await.unwrap();

    assert_eq!(results.images.len(), 2);
    assert_eq!(results.videos.len(), 1);
    assert_eq!(results.hls_playlists.len(), 1);
    assert_eq!(results.documents.len(), 0);
}

#[tokio::test]
async fn s3_quote_blocks_are_rich_text_and_depth_gate_holds() {
    let mut server = mockito::Server::new_async().await;
    let _seed_mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(quote_page(Some("/page/2/")))
        .create_async()
        .await;

    let storage = common::storage_dir();
    let seed = server.url();
    let controller = Controller::new(storage.path()).await.unwrap();
    let config = common::crawl_config(&seed, &storage, 1);

    let results = controller.start_crawl(&config).await.unwrap();
    assert_eq!(results.documents.len(), 10);
}

#[tokio::test]
async fn depth_two_follows_pagination_once() {
    let mut server = mockito::Server::new_async().await;
    let _seed_mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(quote_page(Some("/page/2/")))
        .create_async()
        .await;
    let _page2_mock = server
        .mock("GET", "/page/2/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(quote_page(None))
        .expect(1)
        .create_async()
        .await;

    let storage = common::storage_dir();
    let seed = server.url();
    let controller = Controller::new(storage.path()).await.unwrap();
    let config = common::crawl_config(&seed, &storage, 2);

    let results = controller.start_crawl(&config).await.unwrap();
    assert_eq!(results.documents.len(), 20);
}
