#![cfg(feature = "chrome")]

use std::time::Duration;

use scrape_engine::{ChromeRenderSettings, ChromeRenderer, Renderer};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a local Chrome binary"]
async fn renders_script_generated_content() {
    let server = MockServer::start().await;
    let page = r#"<html><body><div id="out"></div>
        <script>document.getElementById("out").textContent = "filled by script";</script>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/dynamic"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
        .mount(&server)
        .await;

    let renderer = ChromeRenderer::new(ChromeRenderSettings {
        settle_delay: Duration::from_millis(200),
        ..ChromeRenderSettings::default()
    });
    let mut session = renderer.open_session().await.unwrap();
    let html = session
        .render(&format!("{}/dynamic", server.uri()), Duration::from_secs(20))
        .await;
    session.close().await;

    let html = html.unwrap().unwrap();
    assert!(html.contains(r#"<div id="out">filled by script</div>"#), "{html}");
}
