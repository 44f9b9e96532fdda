//! Workflows - one interactive unit of work per signal
//!
//! Every workflow returns the next [`Signal`]. Errors bubble up to the
//! navigator, which turns them into the error menu.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::app::spinner::spin_while;
use crate::app::state::AppContext;
use crate::constants::*;
use crate::curl::{parse_curl, to_curl};
use crate::error::{Result, StateError, TankerError};
use crate::messages::Signal;
use crate::models::{parse_object, parse_params, AuthConfig, HttpMethod, Request, RequestDraft};
use crate::network::Response;
use crate::prompt::Question;
use crate::storage::RequestTable;
use crate::ui::Notice;

const SELECT: &str = "Select :";
const AUTH_OPTIONS: [&str; 4] = ["None", "Bearer Token", "Basic Auth", "API Key"];

/// Signal for the menu entries shared by every screen
fn navigation(label: &str) -> Option<Signal> {
    match label {
        LABEL_BACK_HOME => Some(Signal::Home),
        LABEL_BROWSE | LABEL_BACK_REQUESTS => Some(Signal::Browse),
        LABEL_CREATE => Some(Signal::Create),
        LABEL_IMPORT_CURL => Some(Signal::ImportCurl),
        LABEL_ABOUT => Some(Signal::About),
        LABEL_EXIT => Some(Signal::Exit),
        _ => None,
    }
}

/// Menu label of a stored request
pub fn request_label(request: &Request) -> String {
    format!("[{}] {} - {}", request.method, request.name, request.url)
}

fn back_to(name: &str) -> String {
    format!("Back to {} request", name)
}

fn options(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

fn required(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err("Value is required".to_string())
    } else {
        Ok(())
    }
}

impl AppContext {
    /// Runs the workflow for `signal`
    pub async fn dispatch(&self, signal: Signal) -> Result<Signal> {
        match signal {
            Signal::Home => self.home().await,
            Signal::Browse => self.requests().await,
            Signal::Create => self.create().await,
            Signal::ImportCurl => self.import_curl().await,
            Signal::About => self.about().await,
            Signal::Select { name, display } => self.request_menu(&name, display).await,
            Signal::Run(name) => self.run_request(&name).await,
            Signal::Curl(name) => self.show_curl(&name).await,
            Signal::Edit(name) => self.edit(&name).await,
            Signal::Delete(name) => self.delete(&name).await,
            Signal::Failed(message) => self.error_menu(&message).await,
            Signal::Exit => Ok(Signal::Exit),
        }
    }

    async fn home(&self) -> Result<Signal> {
        self.renderer.banner();
        self.renderer.title("Home Menu");
        let menu = options(&[
            LABEL_BROWSE,
            LABEL_CREATE,
            LABEL_IMPORT_CURL,
            LABEL_ABOUT,
            LABEL_EXIT,
        ]);
        let choice = self.choose(SELECT, menu).await?;
        Ok(navigation(&choice).unwrap_or(Signal::Home))
    }

    async fn requests(&self) -> Result<Signal> {
        self.renderer.banner();
        let table: RequestTable = self.store.load()?;

        let mut menu = Vec::with_capacity(table.len() + 1);
        menu.push(LABEL_BACK_HOME.to_string());
        menu.extend(table.values().map(request_label));

        self.renderer.title("Requests");
        let choice = self.choose(SELECT, menu).await?;
        if let Some(signal) = navigation(&choice) {
            return Ok(signal);
        }

        table
            .values()
            .find(|r| request_label(r) == choice)
            .map(|r| Signal::select(r.name.clone()))
            .ok_or_else(|| StateError::NotFound(choice).into())
    }

    async fn request_menu(&self, name: &str, display: bool) -> Result<Signal> {
        self.renderer.banner();
        let request = self.store.get(name)?;
        if display {
            self.renderer.request_details(&request);
        }

        let menu = options(&[
            LABEL_RUN,
            LABEL_CURL,
            LABEL_EDIT,
            LABEL_DELETE,
            LABEL_BACK_REQUESTS,
            LABEL_EXIT,
        ]);
        let choice = self.choose(SELECT, menu).await?;
        let name = name.to_string();
        Ok(match choice.as_str() {
            LABEL_RUN => Signal::Run(name),
            LABEL_CURL => Signal::Curl(name),
            LABEL_EDIT => Signal::Edit(name),
            LABEL_DELETE => Signal::Delete(name),
            other => navigation(other).unwrap_or(Signal::select(name)),
        })
    }

    async fn run_request(&self, name: &str) -> Result<Signal> {
        self.renderer.banner();
        let request = self.store.get(name)?;

        let result = spin_while(
            Arc::clone(&self.renderer),
            &format!("Sending {} {}", request.method, request.url),
            self.engine.execute(&request),
        )
        .await;

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                self.renderer.notice(Notice::Error, &e.to_string());
                self.choose("", vec![back_to(name)]).await?;
                return Ok(Signal::select(name));
            }
        };

        let outcome = self.present_response(&request, &mut response).await;
        // Runs whether or not the body was saved or presenting failed
        response.cleanup();
        outcome?;

        Ok(Signal::select(name))
    }

    async fn present_response(&self, request: &Request, response: &mut Response) -> Result<()> {
        self.renderer.response_details(response);

        if response.is_binary() {
            if !self.confirm("Save file locally ?", true).await? {
                return Ok(());
            }
            let suggested = response.suggested_filename(&request.url, &self.download_dir);
            let path = self
                .text(
                    Question::input("Save to :")
                        .with_default(suggested.display().to_string())
                        .with_validator(required),
                )
                .await?;
            let path = PathBuf::from(path.trim());
            match response.save_to_file(&path) {
                Ok(()) => self
                    .renderer
                    .notice(Notice::Success, &format!("File saved to {}", path.display())),
                Err(e) => self.renderer.notice(Notice::Error, &e.to_string()),
            }
        } else if self.confirm("Inspect response in editor ?", false).await? {
            let document = serde_json::to_string_pretty(&response.to_json())?;
            self.text(Question::editor("Response", document)).await?;
        }
        Ok(())
    }

    async fn show_curl(&self, name: &str) -> Result<Signal> {
        self.renderer.banner();
        let request = self.store.get(name)?;
        self.renderer.curl(&to_curl(&request));

        let menu = vec![
            back_to(name),
            LABEL_BACK_REQUESTS.to_string(),
            LABEL_BACK_HOME.to_string(),
        ];
        let choice = self.choose(SELECT, menu).await?;
        Ok(navigation(&choice).unwrap_or(Signal::select(name)))
    }

    async fn create(&self) -> Result<Signal> {
        self.renderer.banner();
        self.renderer.title("Create request");

        let name = self
            .text(Question::input("Name :").with_validator(required))
            .await?;
        let name = name.trim().to_string();
        if self.store.contains(&name)? {
            let message = format!("A request named {} already exists. Overwrite ?", name);
            if !self.confirm(&message, false).await? {
                return Ok(Signal::Create);
            }
        }

        let methods = HttpMethod::ALL.iter().map(|m| m.to_string()).collect();
        let method: HttpMethod = self.choose("Method :", methods).await?.parse()?;
        let url = self
            .text(Question::input("URL :").with_validator(required))
            .await?;

        let mut draft = RequestDraft {
            name: name.clone(),
            method: method.to_string(),
            url,
            ..RequestDraft::default()
        };

        if method.has_body() {
            let initial = serde_json::to_string_pretty(&json!({"foo": "bar"}))?;
            let question = Question::editor(
                r#"Payload (Enter the payload in json format {"key": "value"}) :"#,
                initial,
            )
            .with_validator(|s| parse_object("payload", s).map(|_| ()).map_err(|e| e.to_string()));
            draft.payload = Some(self.text(question).await?);
        } else {
            let question = Question::input(
                r#"Params (Enter the string parameters in {"key": "value"} format) :"#,
            )
            .with_default("{}")
            .with_validator(|s| parse_params(s).map(|_| ()).map_err(|e| e.to_string()));
            draft.params = Some(self.text(question).await?);
        }

        draft.auth = self.ask_auth().await?;

        let question = Question::input(r#"Headers (Enter the headers in json format {"key": "value"}) :"#)
            .with_default("{}")
            .with_validator(|s| parse_object("headers", s).map(|_| ()).map_err(|e| e.to_string()));
        draft.headers = Some(self.text(question).await?);

        draft.insecure = self
            .confirm("Skip TLS certificate verification ?", false)
            .await?;

        let request = draft.validate()?;
        self.store.put(request)?;
        self.renderer.notice(
            Notice::Success,
            &format!("The request {} has been created successfully", name),
        );
        Ok(Signal::select(name))
    }

    async fn ask_auth(&self) -> Result<Option<AuthConfig>> {
        let kind = self
            .text(Question::select("Authentication :", options(&AUTH_OPTIONS)).with_default("None"))
            .await?;

        let auth = match kind.as_str() {
            "Bearer Token" => AuthConfig::Bearer {
                token: self.text(Question::secret("Token :")).await?,
            },
            "Basic Auth" => AuthConfig::Basic {
                username: self.text(Question::input("Username :")).await?,
                password: self.text(Question::secret("Password :")).await?,
            },
            "API Key" => {
                let header = self
                    .text(Question::input("Header name :").with_default(DEFAULT_API_KEY_HEADER))
                    .await?;
                AuthConfig::ApiKey {
                    key: self.text(Question::secret("API Key :")).await?,
                    header,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(auth))
    }

    async fn import_curl(&self) -> Result<Signal> {
        self.renderer.banner();
        self.renderer.title("Import cURL");

        let question = Question::Editor {
            message: "Paste a cURL command".to_string(),
            initial: "curl ".to_string(),
            extension: ".sh".to_string(),
            validator: None,
        }
        .with_validator(|s| parse_curl(s).map(|_| ()).map_err(|e| e.to_string()));
        let command = self.text(question).await?;
        let mut request = parse_curl(&command)?;

        let name = self
            .text(Question::input("Name :").with_validator(required))
            .await?;
        request.name = name.trim().to_string();
        request.check()?;

        if self.store.contains(&request.name)? {
            let message = format!("A request named {} already exists. Overwrite ?", request.name);
            if !self.confirm(&message, false).await? {
                return Ok(Signal::Home);
            }
        }

        let name = request.name.clone();
        self.store.put(request)?;
        self.renderer.notice(
            Notice::Success,
            &format!("The request {} has been imported successfully", name),
        );
        Ok(Signal::select(name))
    }

    async fn edit(&self, name: &str) -> Result<Signal> {
        self.renderer.banner();
        let request = self.store.get(name)?;
        self.renderer.request_details(&request);

        let mut content = serde_json::to_string_pretty(&request)?;
        loop {
            content = self
                .text(Question::editor(format!("Edit {}", name), content))
                .await?;

            let updated: Request = match serde_json::from_str(&content) {
                Ok(updated) => updated,
                Err(e) => {
                    self.renderer
                        .notice(Notice::Error, &format!("Invalid JSON: {}", e));
                    continue;
                }
            };
            if let Err(e) = updated.check() {
                self.renderer.notice(Notice::Error, &e.to_string());
                continue;
            }

            let new_name = updated.name.clone();
            self.store.replace(Some(name), updated)?;
            self.renderer.notice(
                Notice::Success,
                &format!("The request {} has been edited successfully", name),
            );
            return Ok(Signal::select(new_name));
        }
    }

    async fn delete(&self, name: &str) -> Result<Signal> {
        let message = format!("This will delete the request : {}. Continue ?", name);
        if self.confirm(&message, false).await? {
            self.store.delete(name)?;
            self.renderer.notice(
                Notice::Success,
                &format!("The request {} was successfully deleted", name),
            );
        }

        let menu = options(&[LABEL_BACK_HOME, LABEL_BACK_REQUESTS, LABEL_EXIT]);
        let choice = self.choose(SELECT, menu).await?;
        Ok(navigation(&choice).unwrap_or(Signal::Home))
    }

    async fn about(&self) -> Result<Signal> {
        self.renderer.about(self.store.path());
        self.choose("", options(&[LABEL_BACK_HOME])).await?;
        Ok(Signal::Home)
    }

    /// Shows the failure and offers the universal way out
    async fn error_menu(&self, message: &str) -> Result<Signal> {
        self.renderer.notice(Notice::Error, message);
        let menu = options(&[LABEL_BACK_HOME, LABEL_BACK_REQUESTS, LABEL_EXIT]);
        let choice = self.choose(SELECT, menu).await?;
        Ok(navigation(&choice).unwrap_or(Signal::Home))
    }
}

/// Next signal after a workflow failed
pub(crate) fn recover(origin: &Signal, err: &TankerError) -> Signal {
    match origin {
        // Interrupting the home menu quits
        Signal::Home if err.is_interrupt() => Signal::Exit,
        // The error menu itself failed
        Signal::Failed(_) => Signal::Home,
        _ => Signal::Failed(err.to_string()),
    }
}
