//! App Root Component
//!
//! Routes for every storefront flow plus the shared shell: navigation,
//! status footer and toasts.

use leptos::*;
use leptos_router::*;

use crate::components::{Nav, Toast};
use crate::pages::{
    BookingPage, CartPage, ChatPage, CheckoutPage, Inbox, Login, ProductPage, Shop, Signup, Vendors,
};
use crate::state::{init_websocket, provide_global_state, use_global_state};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    let state = provide_global_state();
    init_websocket(state.clone());
    state.refresh_cart();

    view! {
        <Router>
            <div class="min-h-screen bg-gray-50 text-gray-900 flex flex-col">
                <Nav />

                <main class="flex-1 container mx-auto px-4 py-8 pb-24">
                    <Routes>
                        <Route path="/" view=Shop />
                        <Route path="/products/:id" view=ProductPage />
                        <Route path="/cart" view=CartPage />
                        <Route path="/checkout" view=CheckoutPage />
                        <Route path="/vendors" view=Vendors />
                        <Route path="/booking" view=BookingPage />
                        <Route path="/inbox" view=Inbox />
                        <Route path="/chat/:counterpart" view=ChatPage />
                        <Route path="/login" view=Login />
                        <Route path="/signup" view=Signup />
                        <Route path="/*any" view=NotFound />
                    </Routes>
                </main>

                <Footer />

                <Toast />
            </div>
        </Router>
    }
}

/// Status bar: who is signed in, cart total and chat connection
#[component]
fn Footer() -> impl IntoView {
    let state = use_global_state();
    let ws_connected = state.ws_connected;
    let session = state.session;
    let cart = state.cart;
    let policy = state.fee_policy;

    let cart_line = move || {
        let totals = cart.with(|c| c.totals(&policy));
        if totals.item_count == 0 {
            return "Cart is empty".to_string();
        }
        match policy.remaining_for_free_delivery(totals.subtotal) {
            Some(more) => format!("Cart {:.2} ({:.2} more for free delivery)", totals.total, more),
            None => format!("Cart {:.2}", totals.total),
        }
    };

    view! {
        <footer class="fixed bottom-0 left-0 right-0 bg-white border-t border-gray-200 py-3 px-4">
            <div class="container mx-auto flex items-center justify-between text-sm text-gray-600">
                <span>
                    {move || session.with(|s| match s {
                        Some(s) => format!("Signed in as {}", s.user.name),
                        None => "Browsing as guest".to_string(),
                    })}
                </span>

                <A href="/cart" class="hover:underline">{cart_line}</A>

                <span class=move || if ws_connected.get() { "flex items-center gap-1 text-green-600" } else { "flex items-center gap-1 text-gray-400" }>
                    <span class=move || if ws_connected.get() { "w-2 h-2 rounded-full bg-green-500 pulse" } else { "w-2 h-2 rounded-full bg-gray-300" } />
                    {move || if ws_connected.get() { "Chat online" } else { "Chat offline" }}
                </span>
            </div>
        </footer>
    }
}

/// 404 Not Found page
#[component]
fn NotFound() -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center min-h-[60vh] text-center">
            <div class="text-6xl mb-4">"🔍"</div>
            <h1 class="text-3xl font-bold mb-2">"Page Not Found"</h1>
            <p class="text-gray-500 mb-6">"The page you're looking for doesn't exist."</p>
            <A
                href="/"
                class="px-6 py-3 bg-primary-600 hover:bg-primary-700 text-white rounded-lg font-medium transition-colors"
            >
                "Back to the shop"
            </A>
        </div>
    }
}
