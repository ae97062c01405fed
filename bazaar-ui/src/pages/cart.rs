//! Cart Page

use leptos::*;
use leptos_router::*;

use bazaar::models::CartItem;

use crate::api;
use crate::components::EmptyState;
use crate::state::use_global_state;

#[component]
pub fn CartPage() -> impl IntoView {
    let state = use_global_state();
    let cart = state.cart;
    let policy = state.fee_policy;
    let session = state.session;

    view! {
        <div class="space-y-6">
            <h1 class="text-3xl font-bold">"Your cart"</h1>

            {move || {
                if session.with(Option::is_none) {
                    return view! {
                        <EmptyState title="Sign in to see your cart" />
                        <div class="text-center">
                            <A href="/login" class="text-primary-600 underline">"Sign in"</A>
                        </div>
                    }.into_view();
                }
                if cart.with(|c| c.is_empty()) {
                    return view! {
                        <EmptyState title="Your cart is empty" hint="Browse the shop to add products." />
                    }.into_view();
                }

                let totals = cart.with(|c| c.totals(&policy));
                let remaining = policy.remaining_for_free_delivery(totals.subtotal);
                view! {
                    <div class="grid md:grid-cols-3 gap-6">
                        <ul class="md:col-span-2 space-y-3">
                            {cart.with(|c| c.items().to_vec()).into_iter()
                                .map(|item| view! { <CartRow item=item /> })
                                .collect_view()}
                        </ul>

                        <aside class="bg-white rounded-xl shadow p-6 space-y-2 h-fit">
                            <Row label="Subtotal" amount=totals.subtotal />
                            <Row label="Delivery" amount=totals.delivery_fee />
                            <div class="border-t pt-2">
                                <Row label="Total" amount=totals.total />
                            </div>
                            {remaining.map(|r| view! {
                                <p class="text-sm text-green-700">
                                    {format!("Add {:.2} more for free delivery", r)}
                                </p>
                            })}
                            <A
                                href="/checkout"
                                class="block text-center mt-4 px-6 py-3 bg-primary-600 hover:bg-primary-700 text-white rounded-lg font-medium"
                            >
                                "Checkout"
                            </A>
                        </aside>
                    </div>
                }.into_view()
            }}
        </div>
    }
}

#[component]
fn Row(label: &'static str, amount: f64) -> impl IntoView {
    view! {
        <div class="flex justify-between">
            <span class="text-gray-600">{label}</span>
            <span class="font-medium">{format!("{:.2}", amount)}</span>
        </div>
    }
}

#[component]
fn CartRow(item: CartItem) -> impl IntoView {
    let state = use_global_state();
    let (busy, set_busy) = create_signal(false);
    let item_id = item.id.clone();
    let quantity = item.quantity;

    // Server first, then local; the cart is reloaded either way
    let change_quantity = {
        let state = state.clone();
        let item_id = item_id.clone();
        move |next: u32| {
            if busy.get_untracked() {
                return;
            }
            set_busy.set(true);
            let state = state.clone();
            let item_id = item_id.clone();
            spawn_local(async move {
                let result = if next == 0 {
                    api::remove_cart_item(&item_id).await
                } else {
                    api::update_cart_item(&item_id, next).await
                };
                match result {
                    Ok(()) => state.cart.update(|c| {
                        if next == 0 {
                            c.remove(&item_id);
                        } else {
                            c.set_quantity(&item_id, next);
                        }
                    }),
                    Err(e) => state.show_api_error(&e),
                }
                state.refresh_cart();
                set_busy.set(false);
            });
        }
    };
    let decrement = change_quantity.clone();
    let increment = change_quantity.clone();
    let remove = change_quantity;

    view! {
        <li class="flex items-center gap-4 bg-white rounded-lg shadow-sm p-3">
            {item.image.clone().map(|src| view! {
                <img src=src class="w-16 h-16 object-cover rounded" />
            })}
            <div class="flex-1">
                <div class="font-medium">{item.name.clone()}</div>
                <div class="text-sm text-gray-500">{format!("{:.2} each", item.price)}</div>
            </div>
            <div class="flex items-center space-x-2">
                <button
                    on:click=move |_| decrement(quantity.saturating_sub(1))
                    disabled=move || busy.get()
                    class="w-8 h-8 rounded bg-gray-100"
                >
                    "−"
                </button>
                <span class="w-8 text-center">{quantity}</span>
                <button
                    on:click=move |_| increment(quantity + 1)
                    disabled=move || busy.get()
                    class="w-8 h-8 rounded bg-gray-100"
                >
                    "+"
                </button>
            </div>
            <div class="w-24 text-right font-semibold">{format!("{:.2}", item.line_total())}</div>
            <button
                on:click=move |_| remove(0)
                disabled=move || busy.get()
                class="text-sm text-red-600"
            >
                "Remove"
            </button>
        </li>
    }
}
