//! Checkout Page
//!
//! Delivery address (typed, picked from saved addresses or filled from the
//! device location), payment method and the single order submission.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use bazaar::checkout::{build_order, validate_address, CheckoutForm, SubmitLatch};
use bazaar::geo::Coordinates;
use bazaar::models::{Address, PaymentMethod};

use crate::api;
use crate::components::EmptyState;
use crate::state::use_global_state;

#[component]
pub fn CheckoutPage() -> impl IntoView {
    let state = use_global_state();
    let session = state.session;
    let cart = state.cart;
    let policy = state.fee_policy;

    let form = create_rw_signal(CheckoutForm::default());
    let latch = create_rw_signal(SubmitLatch::new());
    let (locating, set_locating) = create_signal(false);
    let (show_errors, set_show_errors) = create_signal(false);

    let saved = create_local_resource(
        move || session.with(|s| s.as_ref().map(|s| s.user.id.clone())),
        |user_id| async move {
            match user_id {
                Some(id) => api::saved_addresses(&id).await.unwrap_or_default(),
                None => Vec::new(),
            }
        },
    );

    let state_for_locate = state.clone();
    let use_location = move |_| {
        if locating.get_untracked() {
            return;
        }
        set_locating.set(true);

        let state = state_for_locate.clone();
        let on_error = {
            let state = state.clone();
            move |message: String| {
                state.show_error(&message);
                set_locating.set(false);
            }
        };
        current_position(
            move |at| {
                spawn_local(async move {
                    match api::reverse_geocode(at).await {
                        Ok(patch) => {
                            let mut filled = 0;
                            form.update(|f| filled = patch.apply_to(&mut f.address));
                            if filled > 0 {
                                state.show_success("Address filled from your location");
                            } else {
                                state.show_success("Your address already covers this location");
                            }
                        }
                        Err(e) => state.show_error(&format!("Could not look up your location: {}", e)),
                    }
                    set_locating.set(false);
                });
            },
            on_error,
        );
    };

    let state_for_submit = state.clone();
    let place_order = move |_| {
        let state = state_for_submit.clone();
        let Some(user_id) = state.user_id() else {
            return;
        };
        set_show_errors.set(true);

        let request = match cart.with_untracked(|c| {
            form.with_untracked(|f| build_order(&user_id, c, f, &policy))
        }) {
            Ok(request) => request,
            Err(e) => {
                state.show_error(&e.to_string());
                return;
            }
        };

        let mut begun = Ok(());
        latch.update(|l| begun = l.try_begin());
        if let Err(e) = begun {
            state.show_error(&e.to_string());
            return;
        }

        spawn_local(async move {
            match api::create_order(&request).await {
                Ok(order) => {
                    latch.update(|l| l.succeeded(order.id.clone()));
                    state.refresh_cart();
                    state.show_success("Order placed");
                }
                Err(e) => {
                    latch.update(|l| l.failed());
                    state.show_api_error(&e);
                }
            }
        });
    };

    let field_error = move |field: &'static str| {
        move || {
            if !show_errors.get() {
                return None;
            }
            form.with(|f| validate_address(&f.address))
                .into_iter()
                .find(|e| e.field == field)
                .map(|e| view! { <p class="text-xs text-red-600">{e.message}</p> })
        }
    };

    view! {
        <div class="space-y-6 max-w-3xl">
            <h1 class="text-3xl font-bold">"Checkout"</h1>

            {move || {
                if session.with(Option::is_none) {
                    return view! {
                        <EmptyState title="Sign in to check out" />
                        <div class="text-center"><A href="/login" class="underline">"Sign in"</A></div>
                    }.into_view();
                }
                if let Some(order_id) = latch.with(|l| l.placed_order().map(str::to_string)) {
                    return view! {
                        <EmptyState title="Thank you!" hint=format!("Your order {} has been placed.", order_id) />
                    }.into_view();
                }
                if cart.with(|c| c.is_empty()) {
                    return view! { <EmptyState title="Your cart is empty" /> }.into_view();
                }
                view! {}.into_view()
            }}

            <Show when=move || session.with(Option::is_some)
                && latch.with(|l| l.placed_order().is_none())
                && cart.with(|c| !c.is_empty())>
                <section class="bg-white rounded-xl shadow p-6 space-y-4">
                    <div class="flex justify-between items-center">
                        <h2 class="text-xl font-semibold">"Delivery address"</h2>
                        <button
                            on:click=use_location.clone()
                            disabled=move || locating.get()
                            class="text-sm px-3 py-2 rounded-lg bg-gray-100 disabled:text-gray-400"
                        >
                            {move || if locating.get() { "Locating..." } else { "Use my location" }}
                        </button>
                    </div>

                    <Transition fallback=|| ()>
                        {move || saved.get().filter(|list| !list.is_empty()).map(|list| view! {
                            <div class="flex flex-wrap gap-2">
                                {list.into_iter().map(|a| {
                                    let label = if a.label.is_empty() { a.address.line1.clone() } else { a.label.clone() };
                                    view! {
                                        <button
                                            on:click=move |_| form.update(|f| f.use_saved_address(&a))
                                            class="text-sm px-3 py-1 rounded-full border border-gray-300 hover:bg-gray-50"
                                        >
                                            {label}
                                        </button>
                                    }
                                }).collect_view()}
                            </div>
                        })}
                    </Transition>

                    <div class="grid md:grid-cols-2 gap-3">
                        <AddressInput form=form label="Full name" get=|a| a.full_name.clone() set=|a, v| a.full_name = v />
                        {field_error("full_name")}
                        <AddressInput form=form label="Phone" get=|a| a.phone.clone() set=|a, v| a.phone = v />
                        {field_error("phone")}
                        <AddressInput form=form label="Address line 1" get=|a| a.line1.clone() set=|a, v| a.line1 = v />
                        {field_error("line1")}
                        <AddressInput
                            form=form
                            label="Address line 2"
                            get=|a| a.line2.clone().unwrap_or_default()
                            set=|a, v| a.line2 = (!v.is_empty()).then_some(v)
                        />
                        <AddressInput form=form label="City" get=|a| a.city.clone() set=|a, v| a.city = v />
                        {field_error("city")}
                        <AddressInput
                            form=form
                            label="State"
                            get=|a| a.state.clone().unwrap_or_default()
                            set=|a, v| a.state = (!v.is_empty()).then_some(v)
                        />
                        <AddressInput form=form label="Postal code" get=|a| a.postal_code.clone() set=|a, v| a.postal_code = v />
                        {field_error("postal_code")}
                        <AddressInput form=form label="Country" get=|a| a.country.clone() set=|a, v| a.country = v />
                        {field_error("country")}
                    </div>
                </section>

                <section class="bg-white rounded-xl shadow p-6 space-y-3">
                    <h2 class="text-xl font-semibold">"Payment"</h2>
                    {PaymentMethod::ALL.into_iter().map(|method| view! {
                        <label class="flex items-center space-x-2">
                            <input
                                type="radio"
                                name="payment"
                                prop:checked=move || form.with(|f| f.payment_method == Some(method))
                                on:change=move |_| form.update(|f| f.payment_method = Some(method))
                            />
                            <span>{method.label()}</span>
                        </label>
                    }).collect_view()}
                </section>

                <section class="bg-white rounded-xl shadow p-6 space-y-2">
                    {move || {
                        let totals = cart.with(|c| c.totals(&policy));
                        view! {
                            <div class="flex justify-between"><span>"Subtotal"</span><span>{format!("{:.2}", totals.subtotal)}</span></div>
                            <div class="flex justify-between"><span>"Delivery"</span><span>{format!("{:.2}", totals.delivery_fee)}</span></div>
                            <div class="flex justify-between font-bold text-lg"><span>"Total"</span><span>{format!("{:.2}", totals.total)}</span></div>
                        }
                    }}
                    <button
                        on:click=place_order.clone()
                        disabled=move || latch.with(|l| l.in_flight()) || !form.with(|f| f.is_complete())
                        class="w-full mt-4 px-6 py-3 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-300 text-white rounded-lg font-medium"
                    >
                        {move || if latch.with(|l| l.in_flight()) { "Placing order..." } else { "Place order" }}
                    </button>
                </section>
            </Show>
        </div>
    }
}

#[component]
fn AddressInput(
    form: RwSignal<CheckoutForm>,
    label: &'static str,
    get: fn(&Address) -> String,
    set: fn(&mut Address, String),
) -> impl IntoView {
    view! {
        <label class="block">
            <span class="block text-sm text-gray-600 mb-1">{label}</span>
            <input
                type="text"
                prop:value=move || form.with(|f| get(&f.address))
                on:input=move |ev| form.update(|f| set(&mut f.address, event_target_value(&ev)))
                class="w-full rounded-lg px-3 py-2 border border-gray-300"
            />
        </label>
    }
}

/// Ask the browser for the device position
fn current_position(
    on_position: impl FnOnce(Coordinates) + 'static,
    on_error: impl FnOnce(String) + 'static,
) {
    let Some(geolocation) = web_sys::window().and_then(|w| w.navigator().geolocation().ok()) else {
        on_error("Location is not available in this browser".to_string());
        return;
    };

    // Only one of the two callbacks ever fires
    let on_error = Rc::new(RefCell::new(Some(on_error)));
    let on_denied = Rc::clone(&on_error);

    let success = Closure::once_into_js(move |position: JsValue| match read_coordinates(&position) {
        Some(at) => on_position(at),
        None => {
            if let Some(on_error) = on_error.borrow_mut().take() {
                on_error("The browser returned no coordinates".to_string());
            }
        }
    });
    let failure = Closure::once_into_js(move |_: JsValue| {
        if let Some(on_error) = on_denied.borrow_mut().take() {
            on_error("Location permission was denied".to_string());
        }
    });

    if geolocation
        .get_current_position_with_error_callback(success.unchecked_ref(), Some(failure.unchecked_ref()))
        .is_err()
    {
        web_sys::console::error_1(&"Geolocation request failed".into());
    }
}

fn read_coordinates(position: &JsValue) -> Option<Coordinates> {
    let coords = js_sys::Reflect::get(position, &"coords".into()).ok()?;
    let latitude = js_sys::Reflect::get(&coords, &"latitude".into()).ok()?.as_f64()?;
    let longitude = js_sys::Reflect::get(&coords, &"longitude".into()).ok()?.as_f64()?;
    Some(Coordinates { latitude, longitude })
}
