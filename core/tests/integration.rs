//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `HttpClient` with the
//! ureq transport over real HTTP. Covers request resolution, codecs, status
//! handlers, cookies, Basic auth and the async verbs.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use httpchain_core::{
    ClientSettings, HttpClient, HttpError, HttpMethod, Payload, UreqTransport,
};
use mock_server::{Echo, User};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> HttpClient {
    HttpClient::builder()
        .base_uri(&format!("http://{addr}/"))
        .transport(UreqTransport::new())
        .build()
        .unwrap()
}

fn path(c: &mut httpchain_core::NodeConfig, p: &str) -> Result<(), HttpError> {
    c.request.uri_mut().set_path(p);
    Ok(())
}

#[test]
fn echo_reflects_the_resolved_chain() {
    let addr = start_server();
    let client = HttpClient::builder()
        .base_uri(&format!("http://{addr}/echo?client=1"))
        .configure(|c| {
            c.request.set_header("X-Client", "yes");
            Ok(())
        })
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let echo: Echo = client
        .execute_json(HttpMethod::Put, |c| {
            c.request.uri_mut().set_query("request", "2");
            c.request.set_header("X-Request", "yes");
            c.request.set_json(&serde_json::json!({"name": "ada"}))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("client=1&request=2"));
    assert_eq!(echo.headers["x-client"], "yes");
    assert_eq!(echo.headers["x-request"], "yes");
    assert_eq!(echo.headers["content-type"], "application/json; charset=UTF-8");
    assert_eq!(echo.body, r#"{"name":"ada"}"#);
}

#[test]
fn form_bodies_are_url_encoded() {
    let addr = start_server();
    let echo: Echo = client(addr)
        .execute_json(HttpMethod::Post, |c| {
            path(c, "/echo")?;
            c.request
                .set_content_type("application/x-www-form-urlencoded")
                .set_body(vec![("q".to_string(), "a b".to_string())]);
            Ok(())
        })
        .unwrap();
    assert_eq!(echo.body, "q=a+b");
    assert_eq!(
        echo.headers["content-type"],
        "application/x-www-form-urlencoded; charset=UTF-8"
    );
}

#[test]
fn text_response_is_parsed_as_string() {
    let addr = start_server();
    let text: String = client(addr)
        .execute_as(HttpMethod::Get, |c| path(c, "/text"))
        .unwrap();
    assert_eq!(text, "hello from mock");
}

#[test]
fn status_handlers_resolve_across_levels() {
    let addr = start_server();
    let client = HttpClient::builder()
        .base_uri(&format!("http://{addr}/"))
        .transport(UreqTransport::new())
        .configure(|c| {
            c.response
                .when(404, |fs, _| Ok(Some(Payload::new(format!("client saw {}", fs.status())))));
            Ok(())
        })
        .build()
        .unwrap();

    let not_found: String = client
        .execute_as(HttpMethod::Get, |c| {
            path(c, "/status/404")?;
            c.response.failure(|_, _| Ok(Some(Payload::new("request failure".to_string()))));
            Ok(())
        })
        .unwrap();
    assert_eq!(not_found, "client saw 404");

    let server_error: String = client
        .execute_as(HttpMethod::Get, |c| {
            path(c, "/status/503")?;
            c.response.failure(|_, body| {
                let text = body
                    .and_then(|b| b.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                Ok(Some(Payload::new(text)))
            });
            Ok(())
        })
        .unwrap();
    assert_eq!(server_error, "status 503");

    let err = client.get(|c| path(c, "/status/500")).unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[test]
fn cookie_store_round_trip() {
    let addr = start_server();
    let client = client(addr);
    client
        .get(|c| {
            path(c, "/cookies/set")?;
            c.request.uri_mut().set_query("flavor", "oat").set_query("size", "large");
            Ok(())
        })
        .unwrap();
    assert_eq!(client.cookie_store().unwrap().len(), 2);

    let sent: BTreeMap<String, String> = client
        .execute_json(HttpMethod::Get, |c| {
            path(c, "/cookies")?;
            c.request.cookie("size", "small");
            Ok(())
        })
        .unwrap();
    assert_eq!(sent["flavor"], "oat");
    assert_eq!(sent["size"], "small");
}

#[test]
fn basic_auth_answers_challenge() {
    let addr = start_server();
    let client = client(addr);
    let body: serde_json::Value = client
        .execute_as(HttpMethod::Get, |c| {
            path(c, "/basic-auth/ada/secret")?;
            c.request.basic("ada", "secret", false);
            Ok(())
        })
        .unwrap();
    assert_eq!(body["authenticated"], true);

    let err = client
        .get(|c| {
            path(c, "/basic-auth/ada/secret")?;
            c.request.basic("ada", "wrong", true);
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn transport_errors_reach_exception_handler() {
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = unused.local_addr().unwrap();
    drop(unused);

    let client = HttpClient::builder()
        .base_uri(&format!("http://{addr}/"))
        .transport(UreqTransport::new())
        .configure(|c| {
            c.response.exception(|err| {
                assert!(matches!(err, HttpError::Transport(_)));
                Ok(Some(Payload::new("offline".to_string())))
            });
            Ok(())
        })
        .build()
        .unwrap();
    let result: String = client.execute_as(HttpMethod::Get, |_| Ok(())).unwrap();
    assert_eq!(result, "offline");
}

#[test]
fn settings_configure_a_client() {
    let addr = start_server();
    let settings = ClientSettings::from_json(&format!(
        r#"{{"base_uri": "http://{addr}/echo", "headers": {{"X-From": "settings"}}, "max_concurrency": 2}}"#
    ))
    .unwrap();
    let client = HttpClient::builder()
        .settings(&settings)
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let echo: Echo = client.execute_json(HttpMethod::Get, |_| Ok(())).unwrap();
    assert_eq!(echo.headers["x-from"], "settings");
}

#[test]
fn user_lifecycle_over_async_verbs() {
    let addr = start_server();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let client = HttpClient::builder()
        .base_uri(&format!("http://{addr}/users"))
        .transport(UreqTransport::new())
        .executor(runtime.handle().clone())
        .max_concurrency(2)
        .build()
        .unwrap();

    runtime.block_on(async {
        let created: User = client
            .execute_json_async(HttpMethod::Post, |c| {
                c.request.set_json(&serde_json::json!({"name": "Ada", "email": "ada@example.com"}))?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Ada");

        let id = created.id;
        let fetched: serde_json::Value = client
            .execute_as_async(HttpMethod::Get, move |c| path(c, &format!("/users/{id}")))
            .await
            .unwrap();
        assert_eq!(fetched["email"], "ada@example.com");

        let deleted = client
            .delete_async(move |c| path(c, &format!("/users/{id}")))
            .await
            .unwrap();
        assert!(deleted.is_none());

        let err = client
            .get_async(move |c| path(c, &format!("/users/{id}")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    });
}
