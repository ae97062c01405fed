//! Toasts
//!
//! Success and error notices raised through `GlobalState`. They dismiss
//! themselves after a few seconds or on click.

use leptos::*;

use crate::state::use_global_state;

#[component]
pub fn Toast() -> impl IntoView {
    let state = use_global_state();
    let success = state.success;
    let error = state.error;

    view! {
        <div class="fixed bottom-20 right-4 z-50 flex flex-col gap-2" aria-live="polite">
            {move || error.get().map(|text| view! {
                <Notice text=text alert=true on_dismiss=move || error.set(None) />
            })}
            {move || success.get().map(|text| view! {
                <Notice text=text alert=false on_dismiss=move || success.set(None) />
            })}
        </div>
    }
}

#[component]
fn Notice<F>(text: String, alert: bool, on_dismiss: F) -> impl IntoView
where
    F: Fn() + 'static,
{
    let class = if alert {
        "bg-red-600 text-white"
    } else {
        "bg-green-600 text-white"
    };

    view! {
        <button
            role=if alert { "alert" } else { "status" }
            on:click=move |_| on_dismiss()
            class=format!("text-left px-4 py-3 rounded-lg shadow-lg text-sm animate-slide-in {}", class)
        >
            {text}
        </button>
    }
}
