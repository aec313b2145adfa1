//! Browser location and history access.

use serde_json::Value;

/// Session history the router pushes to and listens on.
pub trait History: Send + Sync {
    /// Adds an entry without reloading the page.
    fn push_state(&self, state: &Value, title: &str, path: &str);

    /// Calls `on_pop` with the new path whenever the user navigates back or forward.
    fn listen(&self, on_pop: Box<dyn Fn(String) + Send + Sync>);
}

/// Current document location.
pub trait Navigator: Send + Sync {
    /// Path part of the current URL.
    fn pathname(&self) -> String;

    /// Full-page navigation to `url`, replacing the current history entry.
    fn replace(&self, url: &str);
}

/// [`History`] and [`Navigator`] backed by `window.history` / `window.location`.
///
/// Off the browser every operation is a no-op and the pathname is empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserLocation;

impl History for BrowserLocation {
    fn push_state(&self, state: &Value, title: &str, path: &str) {
        #[cfg(target_arch = "wasm32")]
        if let Some(window) = web_sys::window()
            && let Ok(history) = window.history()
        {
            let state = match state {
                Value::Null => wasm_bindgen::JsValue::NULL,
                other => wasm_bindgen::JsValue::from_str(&other.to_string()),
            };
            let _ = history.push_state_with_url(&state, title, Some(path));
        }

        #[cfg(not(target_arch = "wasm32"))]
        let _ = (state, title, path);
    }

    fn listen(&self, on_pop: Box<dyn Fn(String) + Send + Sync>) {
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use wasm_bindgen::prelude::Closure;

            let closure = Closure::wrap(Box::new(move || {
                on_pop(BrowserLocation.pathname());
            }) as Box<dyn Fn()>);

            if let Some(window) = web_sys::window() {
                let _ = window
                    .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
            }

            // Listener lives as long as the page
            closure.forget();
        }

        #[cfg(not(target_arch = "wasm32"))]
        drop(on_pop);
    }
}

impl Navigator for BrowserLocation {
    fn pathname(&self) -> String {
        #[cfg(target_arch = "wasm32")]
        return web_sys::window()
            .and_then(|w| w.location().pathname().ok())
            .unwrap_or_default();

        #[cfg(not(target_arch = "wasm32"))]
        return String::new();
    }

    fn replace(&self, url: &str) {
        #[cfg(target_arch = "wasm32")]
        if let Some(window) = web_sys::window() {
            let _ = window.location().replace(url);
        }

        #[cfg(not(target_arch = "wasm32"))]
        let _ = url;
    }
}
