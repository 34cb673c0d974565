//! End-to-end rewrite behaviour through the running proxy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::header::SET_COOKIE;

mod common;

#[tokio::test]
async fn test_rewrites_entry_path_by_country() {
    let upstream = common::start_echo_upstream().await;

    let fetches = Arc::new(AtomicUsize::new(0));
    let last_query = Arc::new(Mutex::new(String::new()));
    let (f, q) = (fetches.clone(), last_query.clone());
    let cms = common::start_programmable_backend(move |request: String| {
        f.fetch_add(1, Ordering::SeqCst);
        *q.lock().unwrap() = request;
        async move { (200, common::cms_envelope("DK=%2Fdk-home&SE=%2F")) }
    })
    .await;

    let (proxy, shutdown) = common::start_proxy(common::test_config(upstream, cms)).await;
    let client = common::client();

    // Mapped country goes to its landing page
    let res = client
        .get(format!("http://{}/", proxy))
        .header("x-geo-country", "DK")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("middleware-rewrite=true;"), "{cookie}");
    assert!(cookie.contains("Max-Age=300"));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(
        res.text().await.unwrap(),
        "GET /countryhome/dk-home?originalPath=%2F HTTP/1.1"
    );

    // Root sentinel keeps the entry path, still tagging the original path
    let res = client
        .get(format!("http://{}/home2", proxy))
        .header("x-geo-country", "SE")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get(SET_COOKIE).is_some());
    assert_eq!(res.text().await.unwrap(), "GET /home2?originalPath=%2Fhome2 HTTP/1.1");

    // Unmapped country
    let res = client
        .get(format!("http://{}/", proxy))
        .header("x-geo-country", "FR")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get(SET_COOKIE).is_none());
    assert_eq!(res.text().await.unwrap(), "GET / HTTP/1.1");

    // Mapping was fetched once, with the token and the configured field
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    let query = last_query.lock().unwrap().clone();
    assert!(query.starts_with("POST /api/graphql/v1 HTTP/1.1"));
    assert!(query.to_ascii_lowercase().contains("x-gql-token: test-token"));
    assert!(query.contains("CountryMapping"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_entry_paths_bypass_mapping() {
    let upstream = common::start_echo_upstream().await;
    let fetches = Arc::new(AtomicUsize::new(0));
    let f = fetches.clone();
    let cms = common::start_programmable_backend(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
        async move { (200, common::cms_envelope("DK=%2Fdk-home")) }
    })
    .await;

    let (proxy, shutdown) = common::start_proxy(common::test_config(upstream, cms)).await;
    let client = common::client();

    for path in ["/about", "/countryhome/dk-home", "/api/data?x=1"] {
        let res = client
            .get(format!("http://{}{}", proxy, path))
            .header("x-geo-country", "DK")
            .send()
            .await
            .unwrap();
        assert!(res.headers().get(SET_COOKIE).is_none());
        assert_eq!(res.text().await.unwrap(), format!("GET {} HTTP/1.1", path));
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_loop_guard_marker_is_consumed() {
    let upstream = common::start_echo_upstream().await;
    let cms = common::start_programmable_backend(|_| async move {
        (200, common::cms_envelope("DK=%2Fdk-home"))
    })
    .await;

    let (proxy, shutdown) = common::start_proxy(common::test_config(upstream, cms)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/", proxy))
        .header("x-geo-country", "DK")
        .header("cookie", "theme=dark; middleware-rewrite=true")
        .send()
        .await
        .unwrap();

    let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("middleware-rewrite=;"), "{cookie}");
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(res.text().await.unwrap(), "GET / HTTP/1.1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_fallback_country_without_geo_header() {
    let upstream = common::start_echo_upstream().await;
    let cms = common::start_programmable_backend(|_| async move {
        (200, common::cms_envelope("US=%2Fus-home&DK=%2Fdk-home"))
    })
    .await;

    let mut config = common::test_config(upstream, cms);
    config.rewrite.fallback_country = "US".to_string();
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/?utm_source=mail", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.text().await.unwrap(),
        "GET /countryhome/us-home?utm_source=mail&originalPath=%2F HTTP/1.1"
    );

    shutdown.trigger();
}
