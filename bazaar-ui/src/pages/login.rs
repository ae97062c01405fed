//! Sign-in Page
//!
//! Email and password, or a Google credential handed over by the Google
//! Identity script through a global callback.

use leptos::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;

use bazaar::auth::{FederatedIdentity, LoginForm, Session};
use bazaar::validation::summarize;

use crate::api;
use crate::state::{use_global_state, GlobalState};

/// Set at build time to show the Google button
const GOOGLE_CLIENT_ID: Option<&str> = option_env!("BAZAAR_GOOGLE_CLIENT_ID");

/// Name of the `window` function the Google script calls
const GOOGLE_CALLBACK: &str = "bazaarGoogleCredential";

#[component]
pub fn Login() -> impl IntoView {
    let state = use_global_state();
    let navigate = use_navigate();
    let form = create_rw_signal(LoginForm::default());
    let (submitting, set_submitting) = create_signal(false);

    register_google_callback(state.clone());

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }
        let request = match form.with_untracked(LoginForm::to_request) {
            Ok(r) => r,
            Err(errors) => {
                state.show_error(&summarize(&errors));
                return;
            }
        };

        set_submitting.set(true);
        let state = state.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            match api::login(&request).await {
                Ok(auth) => {
                    let session = Session::from(auth);
                    state.show_success(&format!("Welcome back, {}", session.user.name));
                    state.sign_in(session);
                    navigate("/", Default::default());
                }
                Err(e) => state.show_error(&e.to_string()),
            }
            set_submitting.set(false);
        });
    };

    view! {
        <div class="max-w-md mx-auto bg-white rounded-xl shadow p-8 space-y-6">
            <h1 class="text-2xl font-bold">"Sign in"</h1>

            <form on:submit=submit class="space-y-4">
                <input
                    type="email"
                    placeholder="Email"
                    prop:value=move || form.with(|f| f.email.clone())
                    on:input=move |ev| form.update(|f| f.email = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                <input
                    type="password"
                    placeholder="Password"
                    prop:value=move || form.with(|f| f.password.clone())
                    on:input=move |ev| form.update(|f| f.password = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                <button
                    type="submit"
                    disabled=move || submitting.get()
                    class="w-full px-6 py-3 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-300 text-white rounded-lg font-medium"
                >
                    {move || if submitting.get() { "Signing in..." } else { "Sign in" }}
                </button>
            </form>

            {GOOGLE_CLIENT_ID.map(|client_id| view! {
                <div class="border-t pt-6 flex justify-center">
                    <div
                        id="g_id_onload"
                        data-client_id=client_id
                        data-callback=GOOGLE_CALLBACK
                        data-auto_prompt="false"
                    />
                    <div class="g_id_signin" data-type="standard" />
                </div>
            })}

            <p class="text-sm text-gray-500">
                "New here? " <A href="/signup" class="underline">"Create an account"</A>
            </p>
        </div>
    }
}

/// Expose the credential callback on `window` while the page is mounted
fn register_google_callback(state: GlobalState) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let navigate = use_navigate();

    let callback = Closure::<dyn Fn(JsValue)>::new(move |response: JsValue| {
        let credential = js_sys::Reflect::get(&response, &"credential".into())
            .ok()
            .and_then(|c| c.as_string())
            .unwrap_or_default();

        let request = match FederatedIdentity::decode(&credential)
            .and_then(|identity| identity.login_request(&credential))
        {
            Ok(r) => r,
            Err(e) => {
                state.show_error(&e.to_string());
                return;
            }
        };

        let state = state.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            match api::federated_login(&request).await {
                Ok(auth) => {
                    state.sign_in(Session::from(auth));
                    navigate("/", Default::default());
                }
                Err(e) => state.show_error(&e.to_string()),
            }
        });
    });

    let _ = js_sys::Reflect::set(&window, &GOOGLE_CALLBACK.into(), &callback.into_js_value());

    on_cleanup(move || {
        let _ = js_sys::Reflect::delete_property(&window, &GOOGLE_CALLBACK.into());
    });
}
