//! Vendors Page
//!
//! Service directory. Picking a vendor carries it into the booking page
//! through storage.

use leptos::*;
use leptos_router::*;

use bazaar::api::dto::VendorQuery;
use bazaar::booking::{remember_vendor, SelectedVendor};
use bazaar::catalog::{Listing, VendorFilter};
use bazaar::models::Vendor;

use crate::api;
use crate::components::{EmptyState, Loading};
use crate::state::use_global_state;

#[component]
pub fn Vendors() -> impl IntoView {
    let (query, set_query) = create_signal(String::new());
    let (category, set_category) = create_signal(None::<String>);
    let (city, set_city) = create_signal(None::<String>);

    let vendors = create_local_resource(
        move || (category.get(), city.get()),
        |(category, city)| async move { api::vendors(&VendorQuery { category, city }).await },
    );

    let non_empty = |v: String| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    };

    view! {
        <div class="space-y-6">
            <h1 class="text-3xl font-bold">"Services"</h1>

            <div class="flex flex-wrap gap-3">
                <input
                    type="search"
                    placeholder="Search vendors"
                    on:input=move |ev| set_query.set(event_target_value(&ev))
                    class="flex-1 min-w-[12rem] rounded-lg px-4 py-3 border border-gray-300"
                />
                <input
                    type="text"
                    placeholder="Category"
                    on:change=move |ev| set_category.set(non_empty(event_target_value(&ev)))
                    class="w-40 rounded-lg px-3 py-3 border border-gray-300"
                />
                <input
                    type="text"
                    placeholder="City"
                    on:change=move |ev| set_city.set(non_empty(event_target_value(&ev)))
                    class="w-40 rounded-lg px-3 py-3 border border-gray-300"
                />
            </div>

            <Transition fallback=move || view! { <Loading /> }>
                {move || vendors.get().map(|result| match result {
                    Err(e) => view! { <EmptyState title="Could not load vendors" hint=e.to_string() /> }.into_view(),
                    Ok(list) => {
                        let filter = VendorFilter {
                            query: query.get(),
                            category: category.get(),
                            city: city.get(),
                        };
                        match filter.apply(&list) {
                            Listing::Empty => view! {
                                <EmptyState title="No vendors found" hint="Try a different category or city." />
                            }.into_view(),
                            Listing::Grid(items) => view! {
                                <div class="grid md:grid-cols-2 lg:grid-cols-3 gap-4">
                                    {items.into_iter().map(|v| view! { <VendorCard vendor=v.clone() /> }).collect_view()}
                                </div>
                            }.into_view(),
                        }
                    }
                })}
            </Transition>
        </div>
    }
}

#[component]
fn VendorCard(vendor: Vendor) -> impl IntoView {
    let state = use_global_state();
    let navigate = use_navigate();
    let chat_href = format!("/chat/{}", vendor.id);
    let selected = SelectedVendor::from(&vendor);

    let book = move |_| {
        if let Some(store) = state.store.as_deref() {
            if let Err(e) = remember_vendor(store, &selected) {
                state.show_error(&format!("Could not remember vendor: {}", e));
                return;
            }
        }
        navigate("/booking", Default::default());
    };

    view! {
        <div class="bg-white rounded-xl shadow p-4 space-y-2">
            <div class="flex items-center space-x-3">
                {vendor.avatar.clone().map(|src| view! { <img src=src class="w-12 h-12 rounded-full object-cover" /> })}
                <div>
                    <h3 class="font-semibold">{vendor.name.clone()}</h3>
                    <div class="text-sm text-gray-500">{format!("{} · {}", vendor.category, vendor.city)}</div>
                </div>
            </div>
            <div class="flex items-center justify-between text-sm">
                <span>{vendor.base_price.map(|p| format!("From {:.2}", p)).unwrap_or_default()}</span>
                <span class="text-yellow-600">{vendor.rating.map(|r| format!("★ {:.1}", r)).unwrap_or_default()}</span>
            </div>
            <div class="flex gap-2 pt-2">
                <button
                    on:click=book
                    class="flex-1 px-4 py-2 bg-primary-600 hover:bg-primary-700 text-white rounded-lg"
                >
                    "Book"
                </button>
                <A href=chat_href class="px-4 py-2 rounded-lg border border-gray-300">"Message"</A>
            </div>
        </div>
    }
}
