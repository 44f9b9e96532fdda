//! Navigator - signal loop launching one workflow at a time

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::commands::recover;
use crate::app::state::AppContext;
use crate::messages::Signal;

/// Dispatcher reading the signal queue
pub struct Navigator {
    ctx: Arc<AppContext>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
}

impl Navigator {
    pub fn new(ctx: AppContext) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Navigator {
            ctx: Arc::new(ctx),
            signal_tx,
            signal_rx,
        }
    }

    /// Run the signal loop until `Exit`
    pub async fn run(mut self, initial: Signal) {
        let _ = self.signal_tx.send(initial);
        let mut live: Option<JoinHandle<()>> = None;

        while let Some(signal) = self.signal_rx.recv().await {
            // The sender of this signal is finishing; wait so two never overlap
            if let Some(handle) = live.take() {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Workflow task failed");
                }
            }

            tracing::debug!(%signal, "Dispatching signal");
            if signal == Signal::Exit {
                break;
            }
            live = Some(self.launch(signal));
        }

        tracing::info!("Navigator stopped");
    }

    /// Spawns the workflow; it always sends exactly one signal back
    fn launch(&self, signal: Signal) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let signal_tx = self.signal_tx.clone();

        tokio::spawn(async move {
            let origin = signal.clone();
            let outcome = AssertUnwindSafe(ctx.dispatch(signal)).catch_unwind().await;

            let next = match outcome {
                Ok(Ok(next)) => next,
                Ok(Err(err)) => {
                    if err.is_interrupt() {
                        tracing::info!(signal = %origin, "Workflow interrupted");
                    } else {
                        tracing::warn!(signal = %origin, error = %err, "Workflow failed");
                    }
                    recover(&origin, &err)
                }
                Err(_) => {
                    tracing::error!(signal = %origin, "Workflow panicked");
                    match origin {
                        Signal::Failed(_) => Signal::Home,
                        _ => Signal::Failed("Internal error".to_string()),
                    }
                }
            };

            let _ = signal_tx.send(next);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::app::commands::request_label;
    use crate::constants::*;
    use crate::models::{AuthConfig, HttpMethod, Request};
    use crate::network::{EngineConfig, HttpEngine};
    use crate::prompt::scripted::ScriptedPrompter;
    use crate::prompt::Prompter;
    use crate::storage::Storage;
    use crate::ui::{RecordingRenderer, Renderer};

    struct Harness {
        dir: tempfile::TempDir,
        store: Arc<Storage>,
        prompter: Arc<ScriptedPrompter>,
        renderer: Arc<RecordingRenderer>,
    }

    impl Harness {
        fn new(prompter: ScriptedPrompter) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(Storage::open(dir.path().join("db")).unwrap());
            Harness {
                dir,
                store,
                prompter: Arc::new(prompter),
                renderer: Arc::new(RecordingRenderer::default()),
            }
        }

        async fn run(&self, initial: Signal) {
            let engine = HttpEngine::new(EngineConfig {
                timeout: Duration::from_secs(5),
                ..EngineConfig::default()
            })
            .unwrap();
            let prompter: Arc<dyn Prompter> = self.prompter.clone();
            let renderer: Arc<dyn Renderer> = self.renderer.clone();
            let ctx = AppContext::new(engine, Arc::clone(&self.store), prompter, renderer)
                .with_download_dir(self.dir.path().join("downloads"));

            tokio::time::timeout(Duration::from_secs(10), Navigator::new(ctx).run(initial))
                .await
                .expect("navigator should reach Exit");
            assert_eq!(self.prompter.remaining(), 0, "unused scripted answers");
        }

        fn errors(&self) -> Vec<String> {
            self.renderer
                .events()
                .into_iter()
                .filter(|e| e.starts_with("notice:Error:"))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_exit_from_home() {
        let h = Harness::new(ScriptedPrompter::new().choice(LABEL_EXIT));
        h.run(Signal::Home).await;
        assert_eq!(h.prompter.asked(), vec!["Select :"]);
        assert_eq!(h.renderer.count("title:Home Menu"), 1);
    }

    #[tokio::test]
    async fn test_interrupt_on_home_exits() {
        let h = Harness::new(ScriptedPrompter::new().interrupt());
        h.run(Signal::Home).await;
        assert!(h.errors().is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_in_workflow_opens_error_menu() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .interrupt()
                .choice(LABEL_BACK_HOME)
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Browse).await;
        assert_eq!(h.errors(), vec!["notice:Error:Interrupted"]);
    }

    #[tokio::test]
    async fn test_interrupt_in_error_menu_goes_home() {
        let h = Harness::new(ScriptedPrompter::new().interrupt().choice(LABEL_EXIT));
        h.run(Signal::Failed("boom".into())).await;
        assert_eq!(h.errors(), vec!["notice:Error:boom"]);
        assert_eq!(h.renderer.count("title:Home Menu"), 1);
    }

    #[tokio::test]
    async fn test_browse_run_and_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("q", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"args": {"q": "1"}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = Request::new("ex", HttpMethod::GET, format!("{}/get", server.uri()));
        req.params.insert("q".into(), json!("1"));
        let label = request_label(&req);

        let h = Harness::new(
            ScriptedPrompter::new()
                .choice(LABEL_BROWSE)
                .choice(&label)
                .choice(LABEL_RUN)
                .no()
                .choice(LABEL_EXIT),
        );
        h.store.put(req).unwrap();
        h.run(Signal::Home).await;

        assert_eq!(h.renderer.count("response:200"), 1);
        assert_eq!(h.renderer.count("clear_spinner"), 1);
        assert_eq!(h.renderer.count("request:ex"), 2);
        assert!(h.errors().is_empty(), "{:?}", h.errors());
    }

    #[tokio::test]
    async fn test_transport_error_returns_to_request() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .choice("Back to ex request")
                .choice(LABEL_EXIT),
        );
        // Nothing listens on port 9 of localhost
        h.store
            .put(Request::new("ex", HttpMethod::GET, "http://127.0.0.1:9/get"))
            .unwrap();
        h.run(Signal::Run("ex".into())).await;

        assert_eq!(h.errors().len(), 1);
        assert_eq!(h.renderer.count("request:ex"), 1);
    }

    #[tokio::test]
    async fn test_binary_response_saved_once() {
        let png = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
            .mount(&server)
            .await;

        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("nested/cat.png");
        let h = Harness::new(
            ScriptedPrompter::new()
                .yes()
                .text(target.to_str().unwrap())
                .choice(LABEL_EXIT),
        );
        h.store
            .put(Request::new("img", HttpMethod::GET, format!("{}/img/cat.png", server.uri())))
            .unwrap();
        h.run(Signal::Run("img".into())).await;

        assert_eq!(std::fs::read(&target).unwrap(), png);
        assert_eq!(h.prompter.asked()[1], "Save to :");
        assert!(h.renderer.count("notice:Success:File saved to") == 1);
    }

    #[tokio::test]
    async fn test_declined_save_removes_temp_file() {
        let server = MockServer::start().await;
        Mock::given(path("/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8; 32], "application/pdf"))
            .mount(&server)
            .await;

        let h = Harness::new(ScriptedPrompter::new().no().choice(LABEL_EXIT));
        h.store
            .put(Request::new("pdf", HttpMethod::GET, format!("{}/report.pdf", server.uri())))
            .unwrap();
        h.run(Signal::Run("pdf".into())).await;

        let temp_files = h.renderer.temp_files();
        assert_eq!(temp_files.len(), 1);
        assert!(temp_files[0]
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(BINARY_TEMP_PREFIX)));
        assert!(!temp_files[0].exists());
        assert_eq!(h.prompter.asked(), vec!["Save file locally ?", "Select :"]);
    }

    #[tokio::test]
    async fn test_create_request_with_retyped_params() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .text("ex")
                .choice("GET")
                .text("http://x/get")
                .text(r#"{"q": 1}"#)
                .text(r#"{"q": "1"}"#)
                .choice("Bearer Token")
                .text("abc")
                .text("{}")
                .no()
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Create).await;

        assert_eq!(
            h.prompter.rejected(),
            vec!["Wrong value type for param q : number. Type must be a string"]
        );
        let stored = h.store.get("ex").unwrap();
        assert_eq!(stored.params["q"], "1");
        assert_eq!(stored.auth, Some(AuthConfig::Bearer { token: "abc".into() }));
        assert!(!stored.insecure);
    }

    #[tokio::test]
    async fn test_create_declined_overwrite_restarts() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .text("get-example")
                .no()
                .interrupt()
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Create).await;
        assert_eq!(h.renderer.count("title:Create request"), 2);
        assert_eq!(h.store.get("get-example").unwrap().method, HttpMethod::GET);
    }

    #[tokio::test]
    async fn test_edit_reopens_on_invalid_json_and_renames() {
        let mut edited = Request::new("renamed", HttpMethod::DELETE, "http://x/items/1");
        edited.params.insert("force".into(), json!("true"));
        let edited_json = serde_json::to_string(&edited).unwrap();

        let h = Harness::new(
            ScriptedPrompter::new()
                .text("{ not json")
                .text(&edited_json)
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Edit("get-example".into())).await;

        assert_eq!(h.errors().len(), 1);
        assert!(h.errors()[0].contains("Invalid JSON"));
        assert!(h.store.get("get-example").is_err());
        assert_eq!(h.store.get("renamed").unwrap(), edited);
    }

    #[tokio::test]
    async fn test_edit_reopens_when_payload_does_not_fit_method() {
        let mut misplaced = Request::new("get-example", HttpMethod::GET, "http://x/get");
        misplaced.payload.insert("a".into(), json!(1));
        let mut fixed = Request::new("get-example", HttpMethod::GET, "http://x/get");
        fixed.params.insert("a".into(), json!("1"));

        let h = Harness::new(
            ScriptedPrompter::new()
                .text(&serde_json::to_string(&misplaced).unwrap())
                .text(&serde_json::to_string(&fixed).unwrap())
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Edit("get-example".into())).await;

        assert_eq!(h.errors(), vec!["notice:Error:GET requests do not carry payload"]);
        let stored = h.store.get("get-example").unwrap();
        assert!(stored.payload.is_empty());
        assert_eq!(stored, fixed);
    }

    #[tokio::test]
    async fn test_delete_unknown_shows_not_found() {
        let h = Harness::new(ScriptedPrompter::new().yes().choice(LABEL_EXIT));
        let before = std::fs::read(h.store.path()).unwrap();
        h.run(Signal::Delete("nope".into())).await;

        assert_eq!(h.errors().len(), 1);
        assert!(h.errors()[0].contains("not found"));
        assert_eq!(std::fs::read(h.store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_then_browse() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .yes()
                .choice(LABEL_BACK_REQUESTS)
                .choice(LABEL_BACK_HOME)
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Delete("post-example".into())).await;
        assert!(!h.store.contains("post-example").unwrap());
        assert_eq!(h.renderer.count("title:Requests"), 1);
    }

    #[tokio::test]
    async fn test_show_curl_and_about() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .choice(LABEL_BACK_HOME)
                .choice(LABEL_ABOUT)
                .choice(LABEL_BACK_HOME)
                .choice(LABEL_EXIT),
        );
        h.run(Signal::Curl("get-example".into())).await;

        let curl = h
            .renderer
            .events()
            .into_iter()
            .find(|e| e.starts_with("curl:"))
            .unwrap();
        assert!(curl.contains("'http://localhost:8080/get?count=42&foo=bar'"), "{curl}");
        assert_eq!(h.renderer.count("about"), 1);
    }

    #[tokio::test]
    async fn test_import_curl() {
        let h = Harness::new(
            ScriptedPrompter::new()
                .text("curl -X PATCH https://api.example.com/items/7 -H 'Authorization: Bearer t0k' -d '{\"done\":true}'")
                .text("patch-item")
                .choice(LABEL_EXIT),
        );
        h.run(Signal::ImportCurl).await;

        let stored = h.store.get("patch-item").unwrap();
        assert_eq!(stored.method, HttpMethod::PATCH);
        assert_eq!(stored.payload["done"], true);
        assert_eq!(stored.auth, Some(AuthConfig::Bearer { token: "t0k".into() }));
    }
}
