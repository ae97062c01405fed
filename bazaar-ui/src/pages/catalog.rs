//! Shop Page
//!
//! Product search with filters, sorting and the recently-viewed strip.

use leptos::*;
use leptos_router::*;

use bazaar::catalog::{categories, product_listing, Listing, ProductFilter, SortOrder};
use bazaar::storage::RecentlyViewed;

use crate::api;
use crate::components::{EmptyState, Loading, ProductCard};
use crate::state::use_global_state;

#[component]
pub fn Shop() -> impl IntoView {
    let (query, set_query) = create_signal(String::new());
    let (category, set_category) = create_signal(None::<String>);
    let (sort, set_sort) = create_signal(SortOrder::Relevance);
    let (in_stock_only, set_in_stock_only) = create_signal(false);
    let (max_price, set_max_price) = create_signal(None::<f64>);

    // Text and category narrow the fetch; the rest is applied locally
    let products = create_local_resource(
        move || (query.get(), category.get()),
        |(query, category)| async move {
            let filter = ProductFilter {
                query,
                category,
                ..Default::default()
            };
            api::products(&filter.to_query()).await
        },
    );

    let filter = move || ProductFilter {
        query: query.get(),
        category: category.get(),
        max_price: max_price.get(),
        in_stock_only: in_stock_only.get(),
        sort: sort.get(),
        ..Default::default()
    };

    view! {
        <div class="space-y-6">
            <div class="flex flex-wrap gap-3 items-end">
                <input
                    type="search"
                    placeholder="Search products"
                    prop:value=move || query.get()
                    on:change=move |ev| set_query.set(event_target_value(&ev))
                    class="flex-1 min-w-[12rem] rounded-lg px-4 py-3 border border-gray-300"
                />
                <select
                    on:change=move |ev| {
                        let v = event_target_value(&ev);
                        set_category.set((!v.is_empty()).then_some(v));
                    }
                    class="rounded-lg px-3 py-3 border border-gray-300"
                >
                    <option value="">"All categories"</option>
                    {move || {
                        products.get()
                            .and_then(Result::ok)
                            .map(|list| categories(&list))
                            .unwrap_or_default()
                            .into_iter()
                            .map(|c| view! { <option value=c.clone()>{c.clone()}</option> })
                            .collect_view()
                    }}
                </select>
                <select
                    on:change=move |ev| {
                        if let Some(order) = SortOrder::parse(&event_target_value(&ev)) {
                            set_sort.set(order);
                        }
                    }
                    class="rounded-lg px-3 py-3 border border-gray-300"
                >
                    <option value="relevance">"Relevance"</option>
                    <option value="price_asc">"Price: low to high"</option>
                    <option value="price_desc">"Price: high to low"</option>
                    <option value="rating">"Top rated"</option>
                </select>
                <input
                    type="number"
                    min="0"
                    placeholder="Max price"
                    on:change=move |ev| set_max_price.set(event_target_value(&ev).parse().ok())
                    class="w-32 rounded-lg px-3 py-3 border border-gray-300"
                />
                <label class="flex items-center space-x-2 py-3">
                    <input
                        type="checkbox"
                        on:change=move |ev| set_in_stock_only.set(event_target_checked(&ev))
                    />
                    <span>"In stock"</span>
                </label>
            </div>

            <Transition fallback=move || view! { <Loading /> }>
                {move || products.get().map(|result| match result {
                    Err(e) => view! {
                        <EmptyState title="Could not load products" hint=e.to_string() />
                    }.into_view(),
                    Ok(list) => match product_listing(&list, &filter()) {
                        Listing::Empty => view! {
                            <EmptyState title="No products found" hint="Try another search or clear the filters." />
                        }.into_view(),
                        Listing::Grid(items) => view! {
                            <div class="grid grid-cols-2 md:grid-cols-3 lg:grid-cols-4 gap-4">
                                {items.into_iter()
                                    .map(|p| view! { <ProductCard product=p.clone() /> })
                                    .collect_view()}
                            </div>
                        }.into_view(),
                    },
                })}
            </Transition>

            <RecentStrip />
        </div>
    }
}

/// Products viewed on earlier visits
#[component]
fn RecentStrip() -> impl IntoView {
    let state = use_global_state();
    let recent = state
        .store
        .as_deref()
        .and_then(|store| RecentlyViewed::new(store).list().ok())
        .unwrap_or_default();

    if recent.is_empty() {
        return view! {}.into_view();
    }

    view! {
        <section>
            <h2 class="text-lg font-semibold mb-3">"Recently viewed"</h2>
            <div class="flex gap-3 overflow-x-auto">
                {recent.into_iter().map(|entry| view! {
                    <A
                        href=format!("/products/{}", entry.product_id)
                        class="shrink-0 w-36 bg-white rounded-lg shadow p-2"
                    >
                        {entry.image.clone().map(|src| view! {
                            <img src=src class="w-full h-20 object-cover rounded" />
                        })}
                        <div class="text-sm truncate mt-1">{entry.name.clone()}</div>
                        <div class="text-sm font-semibold">{format!("{:.2}", entry.price)}</div>
                    </A>
                }).collect_view()}
            </div>
        </section>
    }
    .into_view()
}
