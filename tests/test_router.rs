use std::sync::Arc;

use gridserve::http::exchange::Exchange;
use gridserve::http::request::{Request, RequestBuilder};
use gridserve::http::router::{Handler, HandlerFuture, Router};

macro_rules! tagged_handler {
    ($name:ident) => {
        struct $name;

        impl Handler for $name {
            fn handle<'a>(&'a self, exchange: &'a mut Exchange<'_>) -> HandlerFuture<'a> {
                Box::pin(async move {
                    let mut response = exchange.begin_response(200, "OK").await?;
                    response.send(stringify!($name).as_bytes()).await?;
                    Ok(())
                })
            }
        }
    };
}

tagged_handler!(Exact);
tagged_handler!(ShortPrefix);
tagged_handler!(LongPrefix);
tagged_handler!(XmlRpc);

fn request(target: &str) -> Request {
    RequestBuilder::new().method("GET").target(target).build().unwrap()
}

fn post_root(content_type: &str) -> Request {
    RequestBuilder::new()
        .method("POST")
        .target("/")
        .header("Content-Type", content_type)
        .build()
        .unwrap()
}

fn resolved(router: &Router, req: &Request) -> Option<&'static str> {
    router.resolve(req).map(|h| h.name().rsplit("::").next().unwrap_or_default())
}

#[test]
fn test_exact_match() {
    let router = Router::new();
    router.add_handler("/grid/status", Exact);

    assert_eq!(resolved(&router, &request("/grid/status")), Some("Exact"));
    assert_eq!(resolved(&router, &request("/grid/status?verbose=1")), Some("Exact"));
    assert_eq!(resolved(&router, &request("/grid/status/")), None);
}

#[test]
fn test_longest_prefix_wins() {
    let router = Router::new();
    router.add_prefix_handler("/assets/", ShortPrefix);
    router.add_prefix_handler("/assets/textures/", LongPrefix);

    assert_eq!(resolved(&router, &request("/assets/a")), Some("ShortPrefix"));
    assert_eq!(resolved(&router, &request("/assets/textures/b")), Some("LongPrefix"));
    assert_eq!(resolved(&router, &request("/other")), None);
}

#[test]
fn test_exact_beats_prefix() {
    let router = Router::new();
    router.add_prefix_handler("/", ShortPrefix);
    router.add_handler("/login", Exact);

    assert_eq!(resolved(&router, &request("/login")), Some("Exact"));
    assert_eq!(resolved(&router, &request("/logout")), Some("ShortPrefix"));
}

#[test]
fn test_root_content_type_match() {
    let router = Router::new();
    router.add_content_type_handler("text/xml", XmlRpc);
    router.add_prefix_handler("/", ShortPrefix);

    assert_eq!(resolved(&router, &post_root("text/xml")), Some("XmlRpc"));
    assert_eq!(resolved(&router, &post_root("TEXT/XML; charset=utf-8")), Some("XmlRpc"));
    assert_eq!(resolved(&router, &post_root("application/json")), Some("ShortPrefix"));
    assert_eq!(resolved(&router, &request("/")), Some("ShortPrefix"));
}

#[test]
fn test_content_type_only_applies_to_root() {
    let router = Router::new();
    router.add_content_type_handler("text/xml", XmlRpc);

    let req = RequestBuilder::new()
        .method("POST")
        .target("/xmlrpc")
        .header("Content-Type", "text/xml")
        .build()
        .unwrap();
    assert_eq!(resolved(&router, &req), None);
}

#[test]
fn test_remove_and_clear() {
    let router = Router::new();
    router.add_handler("/a", Exact);
    router.add_prefix_handler("/p/", ShortPrefix);
    router.add_content_type_handler("text/xml", XmlRpc);

    assert!(router.remove_handler("/a"));
    assert!(!router.remove_handler("/a"));
    assert_eq!(resolved(&router, &request("/a")), None);

    assert!(router.remove_content_type_handler("TEXT/XML"));
    assert_eq!(resolved(&router, &post_root("text/xml")), None);

    router.clear();
    assert_eq!(resolved(&router, &request("/p/x")), None);
    assert!(!router.remove_prefix_handler("/p/"));
}

#[test]
fn test_concurrent_lookup_during_registration() {
    let router = Arc::new(Router::new());
    router.add_handler("/stable", Exact);

    std::thread::scope(|s| {
        for _ in 0..4 {
            let router = router.clone();
            s.spawn(move || {
                for _ in 0..1000 {
                    assert!(router.resolve(&request("/stable")).is_some());
                }
            });
        }

        s.spawn(|| {
            for i in 0..200 {
                router.add_prefix_handler(format!("/dyn/{i}/"), ShortPrefix);
            }
        });
    });

    assert_eq!(resolved(&router, &request("/dyn/199/x")), Some("ShortPrefix"));
}
