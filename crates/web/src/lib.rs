use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use proto::{AgentReply, BackendRequest, Chat, GatewayError, StoreError};
use serde::Serialize;
use session::{Applied, Bubble, ChatSession, KeyValueStore, render_all};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Headers, Request, RequestInit, Response, console};

// ─── Logging helper ────────────────────────────────────────

fn log(s: &str) {
    console::log_1(&JsValue::from_str(s));
}

fn warn(s: &str) {
    console::warn_1(&JsValue::from_str(s));
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ─── Public API ────────────────────────────────────────────

/// Returns the crate version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// WASM entry point, called automatically by the JS glue.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    log(&format!(
        "research-chat-web v{} WASM module loaded",
        env!("CARGO_PKG_VERSION")
    ));
}

// ─── localStorage ──────────────────────────────────────────

/// [`KeyValueStore`] over the page's `localStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage(&self) -> Result<web_sys::Storage, StoreError> {
        let window = web_sys::window().ok_or_else(|| unavailable("no window"))?;
        window
            .local_storage()
            .map_err(|_| unavailable("localStorage access denied"))?
            .ok_or_else(|| unavailable("localStorage missing"))
    }
}

fn unavailable(reason: &str) -> StoreError {
    StoreError::Unavailable(reason.to_string())
}

impl KeyValueStore for LocalStorageStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage()?
            .get_item(key)
            .map_err(|_| unavailable("localStorage read failed"))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // Quota errors surface here.
        self.storage()?
            .set_item(key, value)
            .map_err(|_| unavailable("localStorage write failed"))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage()?
            .remove_item(key)
            .map_err(|_| unavailable("localStorage remove failed"))
    }
}

// ─── Views handed to JS ────────────────────────────────────

/// Sidebar entry.
#[derive(Debug, Serialize)]
struct ChatSummary<'a> {
    index: usize,
    id: u64,
    title: &'a str,
    active: bool,
    messages: usize,
}

fn summarize(chats: &[Chat], active: usize) -> Vec<ChatSummary<'_>> {
    chats
        .iter()
        .enumerate()
        .map(|(index, chat)| ChatSummary {
            index,
            id: chat.id.get(),
            title: &chat.title,
            active: index == active,
            messages: chat.messages.len(),
        })
        .collect()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(js_error)?;
    js_sys::JSON::parse(&json)
}

/// What a finished `send` did, as the string its promise resolves to.
fn describe(applied: Applied) -> String {
    match applied {
        Applied::Active(phase) => phase.to_string(),
        Applied::Background(_) => "background".to_string(),
        Applied::Dropped => "dropped".to_string(),
    }
}

// ─── Backend fetch ─────────────────────────────────────────

async fn post_json(url: &str, body: &str) -> Result<String, JsValue> {
    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_headers(&headers);
    opts.set_body(&JsValue::from_str(body));

    let request = Request::new_with_str_and_init(url, &opts)?;
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;
    let text = JsFuture::from(response.text()?).await?;
    text.as_string()
        .ok_or_else(|| JsValue::from_str("response body is not text"))
}

/// Sends `request` to `base_url`; the HTTP status is not interpreted.
async fn fetch_reply(base_url: &str, request: &BackendRequest) -> Result<AgentReply, GatewayError> {
    let url = format!("{base_url}{}", request.path());
    let body = request.to_json().to_string();
    let text = post_json(&url, &body)
        .await
        .map_err(|e| GatewayError::Unreachable {
            url: base_url.to_string(),
            reason: e.as_string().unwrap_or_else(|| format!("{e:?}")),
        })?;
    AgentReply::from_body(&text).map_err(|e| GatewayError::InvalidResponse {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

// ─── WebChat ───────────────────────────────────────────────

/// WASM-exported chat client for the research agent.
///
/// Every method reads or mutates the shared session synchronously; only
/// `send` returns a promise, which settles once the reply is applied.
#[wasm_bindgen]
pub struct WebChat {
    session: Rc<RefCell<ChatSession<LocalStorageStore>>>,
    backend_url: String,
}

#[wasm_bindgen]
impl WebChat {
    /// Creates a logged-out client for the backend at `backend_url`.
    #[wasm_bindgen(constructor)]
    pub fn new(backend_url: &str) -> Self {
        Self {
            session: Rc::new(RefCell::new(ChatSession::new(LocalStorageStore))),
            backend_url: backend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Logs back in as the remembered user; returns the name, if any.
    pub fn restore(&self) -> Result<Option<String>, JsValue> {
        let mut session = self.session.borrow_mut();
        let user = session.restore().map_err(js_error)?;
        Ok(user.map(str::to_string))
    }

    /// Logs in as `name`.
    pub fn login(&self, name: &str) -> Result<(), JsValue> {
        self.session.borrow_mut().login(name).map_err(js_error)
    }

    pub fn logout(&self) -> Result<(), JsValue> {
        self.session.borrow_mut().logout().map_err(js_error)
    }

    /// Creates and activates an empty chat; returns its index.
    #[wasm_bindgen(js_name = newChat)]
    pub fn new_chat(&self) -> Result<usize, JsValue> {
        self.session.borrow_mut().new_chat().map_err(js_error)
    }

    /// Activates chat `index`.
    #[wasm_bindgen(js_name = switchChat)]
    pub fn switch_chat(&self, index: usize) -> Result<(), JsValue> {
        self.session
            .borrow_mut()
            .switch(index)
            .map(|_| ())
            .map_err(js_error)
    }

    /// Sends `input` from the active chat.
    ///
    /// The user message is appended before this returns. The promise
    /// resolves to the new phase of the active chat, `"background"` when
    /// the reply landed in another chat, or `"dropped"` after a logout; it
    /// rejects when the input was not accepted.
    pub fn send(&self, input: &str) -> Promise {
        let pending = match self.session.borrow_mut().begin_send(input) {
            Ok(pending) => pending,
            Err(e) => return Promise::reject(&js_error(e)),
        };
        let session = Rc::clone(&self.session);
        let base_url = self.backend_url.clone();
        future_to_promise(async move {
            let result = fetch_reply(&base_url, &pending.request).await;
            if let Err(e) = &result {
                warn(&e.to_string());
            }
            let applied = session.borrow_mut().complete(&pending.ticket, result);
            Ok(JsValue::from_str(&describe(applied)))
        })
    }

    /// Sidebar entries: `[{index, id, title, active, messages}]`.
    pub fn chats(&self) -> Result<JsValue, JsValue> {
        let session = self.session.borrow();
        to_js(&summarize(session.chats(), session.active_index()))
    }

    /// Rendered bubbles of the active chat: `[{role, spans: [{kind, text}]}]`.
    pub fn transcript(&self) -> Result<JsValue, JsValue> {
        let bubbles: Vec<Bubble> = render_all(self.session.borrow().messages());
        to_js(&bubbles)
    }

    /// `"idle"`, `"waiting"` or `"complete"`.
    pub fn phase(&self) -> String {
        self.session.borrow().phase().to_string()
    }

    /// Hint for the input area, if the phase calls for one.
    #[wasm_bindgen(js_name = statusHint)]
    pub fn status_hint(&self) -> Option<String> {
        self.session.borrow().status_hint().map(str::to_string)
    }

    /// Whether a reply is pending for the active chat.
    #[wasm_bindgen(js_name = isTyping)]
    pub fn is_typing(&self) -> bool {
        self.session.borrow().is_typing()
    }

    /// Display name of the logged-in user.
    pub fn user(&self) -> Option<String> {
        self.session.borrow().user().map(str::to_string)
    }
}

// ─── Tests ─────────────────────────────────────────────────
