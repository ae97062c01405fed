//! Global Application State
//!
//! Reactive state management using Leptos signals.

use std::rc::Rc;

use leptos::*;

use bazaar::api::ApiError;
use bazaar::auth::{Session, SessionStore};
use bazaar::cart::{Cart, FeePolicy};
use bazaar::storage::TypedStore;

use super::storage::{typed_store, BrowserStore};
use super::websocket::ChatSocket;
use crate::api;

/// Global application state provided to all components
#[derive(Clone)]
pub struct GlobalState {
    /// Typed local storage; `None` when the browser refuses storage
    pub store: Option<Rc<TypedStore<BrowserStore>>>,
    /// Signed-in user, restored from storage on load
    pub session: RwSignal<Option<Session>>,
    /// Server cart of the signed-in user
    pub cart: RwSignal<Cart>,
    pub fee_policy: FeePolicy,
    /// Live chat connection
    pub socket: ChatSocket,
    /// WebSocket connection status
    pub ws_connected: RwSignal<bool>,
    /// Error message to display
    pub error: RwSignal<Option<String>>,
    /// Success message (for toasts)
    pub success: RwSignal<Option<String>>,
}

/// Provide global state to the component tree
pub fn provide_global_state() -> GlobalState {
    let store = typed_store().map(Rc::new);

    let session = store.as_deref().and_then(|s| match SessionStore::new(s).current() {
        Ok(session) => session,
        Err(e) => {
            web_sys::console::warn_1(&format!("Stored session unreadable: {}", e).into());
            None
        }
    });

    let state = GlobalState {
        store,
        session: create_rw_signal(session),
        cart: create_rw_signal(Cart::new()),
        fee_policy: FeePolicy::default(),
        socket: ChatSocket::new(&api::get_ws_url()),
        ws_connected: create_rw_signal(false),
        error: create_rw_signal(None),
        success: create_rw_signal(None),
    };

    provide_context(state.clone());
    state
}

pub fn use_global_state() -> GlobalState {
    use_context::<GlobalState>().expect("GlobalState not found")
}

impl GlobalState {
    /// Id of the signed-in user (untracked)
    pub fn user_id(&self) -> Option<String> {
        self.session
            .with_untracked(|s| s.as_ref().map(|s| s.user.id.clone()))
    }

    /// Bearer token of the signed-in user (untracked)
    pub fn token(&self) -> Option<String> {
        self.session
            .with_untracked(|s| s.as_ref().map(|s| s.token.clone()))
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.with(Option::is_some)
    }

    /// Persist and publish a new session
    pub fn sign_in(&self, session: Session) {
        if let Some(store) = self.store.as_deref() {
            if let Err(e) = SessionStore::new(store).login(&session) {
                web_sys::console::warn_1(&format!("Session not persisted: {}", e).into());
            }
        }
        self.session.set(Some(session));
        self.refresh_cart();
    }

    pub fn sign_out(&self) {
        if let Some(store) = self.store.as_deref() {
            let _ = SessionStore::new(store).logout();
        }
        self.session.set(None);
        self.cart.set(Cart::new());
    }

    /// Reload the cart from the backend
    pub fn refresh_cart(&self) {
        let Some(user_id) = self.user_id() else {
            self.cart.set(Cart::new());
            return;
        };

        let state = self.clone();
        spawn_local(async move {
            match api::cart(&user_id).await {
                Ok(items) => state.cart.set(Cart::from_items(items)),
                Err(e) => state.show_api_error(&e),
            }
        });
    }

    /// Show a success message (auto-clears after timeout)
    pub fn show_success(&self, message: &str) {
        self.success.set(Some(message.to_string()));

        let success_signal = self.success;
        gloo_timers::callback::Timeout::new(3000, move || {
            success_signal.set(None);
        })
        .forget();
    }

    /// Show an error message (auto-clears after timeout)
    pub fn show_error(&self, message: &str) {
        self.error.set(Some(message.to_string()));

        let error_signal = self.error;
        gloo_timers::callback::Timeout::new(5000, move || {
            error_signal.set(None);
        })
        .forget();
    }

    /// Report a backend failure; an expired session signs the user out
    pub fn show_api_error(&self, error: &ApiError) {
        if matches!(error, ApiError::Unauthorized(_)) {
            self.sign_out();
            self.show_error("Your session has expired. Please sign in again.");
        } else if error.is_transient() {
            self.show_error(&format!("{}. Please try again.", error));
        } else {
            self.show_error(&error.to_string());
        }
    }
}
