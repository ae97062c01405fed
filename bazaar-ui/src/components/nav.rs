//! Navigation Component
//!
//! Header bar with links, cart badge and account menu.

use leptos::*;
use leptos_router::*;

use crate::state::use_global_state;

/// Navigation header component
#[component]
pub fn Nav() -> impl IntoView {
    let state = use_global_state();
    let cart = state.cart;
    let session = state.session;

    let sign_out = move |_| {
        state.sign_out();
        state.show_success("Signed out");
    };

    view! {
        <nav class="bg-white border-b border-gray-200">
            <div class="container mx-auto px-4">
                <div class="flex items-center justify-between h-16">
                    <A href="/" class="flex items-center space-x-3">
                        <span class="text-2xl">"🛒"</span>
                        <span class="text-xl font-bold">"Bazaar"</span>
                    </A>

                    <div class="flex items-center space-x-1">
                        <NavLink href="/" label="Shop" />
                        <NavLink href="/vendors" label="Services" />
                        <Show when=move || session.with(Option::is_some)>
                            <NavLink href="/inbox" label="Messages" />
                        </Show>
                        <A
                            href="/cart"
                            class="relative px-4 py-2 rounded-lg hover:bg-gray-100"
                            active_class="bg-gray-100"
                        >
                            "Cart"
                            {move || {
                                let count = cart.with(|c| c.item_count());
                                (count > 0).then(|| view! {
                                    <span class="absolute -top-1 -right-1 bg-primary-600 text-white text-xs rounded-full px-1.5">
                                        {count}
                                    </span>
                                })
                            }}
                        </A>
                    </div>

                    <div class="flex items-center space-x-3">
                        {move || match session.get() {
                            Some(s) => view! {
                                <span class="text-sm text-gray-600">{s.user.name}</span>
                                <button
                                    on:click=sign_out.clone()
                                    class="px-3 py-2 text-sm rounded-lg hover:bg-gray-100"
                                >
                                    "Sign out"
                                </button>
                            }.into_view(),
                            None => view! {
                                <NavLink href="/login" label="Sign in" />
                            }.into_view(),
                        }}
                    </div>
                </div>
            </div>
        </nav>
    }
}

/// Individual navigation link
#[component]
fn NavLink(
    href: &'static str,
    label: &'static str,
) -> impl IntoView {
    view! {
        <A
            href=href
            class="px-4 py-2 rounded-lg text-gray-600 hover:text-gray-900 hover:bg-gray-100 transition-colors"
            active_class="bg-gray-100 text-gray-900"
        >
            {label}
        </A>
    }
}
