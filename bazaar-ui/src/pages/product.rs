//! Product Page
//!
//! Product details, add-to-cart and reviews. Opening a product counts one
//! view per product per day and adds it to the recently-viewed list.

use leptos::*;
use leptos_router::*;

use bazaar::api::dto::AddToCartRequest;
use bazaar::catalog::{rating_summary, ReviewDraft};
use bazaar::models::{Product, Review, ReviewTarget};
use bazaar::storage::{RecentlyViewed, ViewedFlags};

use crate::api;
use crate::components::{EmptyState, ListSkeleton, Loading};
use crate::state::{use_global_state, GlobalState};

#[component]
pub fn ProductPage() -> impl IntoView {
    let state = use_global_state();
    let params = use_params_map();
    let id = move || params.with(|p| p.get("id").cloned().unwrap_or_default());

    let product = create_local_resource(id, |id| async move { api::product(&id).await });
    let reviews = create_local_resource(id, |id| async move {
        api::reviews(&ReviewTarget::Product(id)).await
    });

    // Count the view and remember the product once it has loaded
    let state_for_view = state.clone();
    create_effect(move |_| {
        if let Some(Ok(p)) = product.get() {
            note_view(&state_for_view, &p);
        }
    });

    view! {
        <Transition fallback=move || view! { <Loading /> }>
            {move || product.get().map(|result| match result {
                Err(e) => view! {
                    <EmptyState title="Product unavailable" hint=e.to_string() />
                }.into_view(),
                Ok(p) => view! {
                    <div class="grid md:grid-cols-2 gap-8">
                        <ProductDetails product=p.clone() />
                        <ReviewSection
                            target=ReviewTarget::Product(p.id.clone())
                            reviews=reviews
                        />
                    </div>
                }.into_view(),
            })}
        </Transition>
    }
}

fn note_view(state: &GlobalState, product: &Product) {
    let Some(store) = state.store.as_deref() else {
        return;
    };

    match ViewedFlags::new(store).first_view(&product.id) {
        Ok(true) => {
            let id = product.id.clone();
            spawn_local(async move {
                if let Err(e) = api::record_product_view(&id).await {
                    web_sys::console::warn_1(&format!("View not recorded: {}", e).into());
                }
            });
        }
        Ok(false) => {}
        Err(e) => web_sys::console::warn_1(&format!("View flag unavailable: {}", e).into()),
    }

    if let Err(e) = RecentlyViewed::new(store).record(product) {
        web_sys::console::warn_1(&format!("Recently viewed not saved: {}", e).into());
    }
}

#[component]
fn ProductDetails(product: Product) -> impl IntoView {
    let state = use_global_state();
    let navigate = use_navigate();
    let (quantity, set_quantity) = create_signal(1u32);
    let (adding, set_adding) = create_signal(false);

    let in_stock = product.in_stock();
    let stock = product.stock;
    let product_id = product.id.clone();
    let vendor_id = product.vendor_id.clone();

    let add_to_cart = move |_| {
        let Some(user_id) = state.user_id() else {
            navigate("/login", Default::default());
            return;
        };
        if adding.get_untracked() {
            return;
        }
        set_adding.set(true);

        let request = AddToCartRequest {
            user_id,
            product_id: product_id.clone(),
            vendor_id: vendor_id.clone(),
            quantity: quantity.get_untracked(),
        };
        let state = state.clone();
        spawn_local(async move {
            match api::add_to_cart(&request).await {
                Ok(item) => {
                    state.refresh_cart();
                    state.show_success(&format!("Added {} to your cart", item.name));
                }
                Err(e) => state.show_api_error(&e),
            }
            set_adding.set(false);
        });
    };

    view! {
        <div class="space-y-4">
            {product.cover_image().map(|src| view! {
                <img src=src.to_string() alt=product.name.clone() class="w-full rounded-xl" />
            })}
            <h1 class="text-3xl font-bold">{product.name.clone()}</h1>
            <div class="text-2xl font-semibold">{format!("{:.2}", product.price)}</div>
            <p class="text-gray-600 whitespace-pre-line">{product.description.clone()}</p>

            {if in_stock {
                view! {
                    <div class="flex items-center space-x-3">
                        <input
                            type="number"
                            min="1"
                            max=stock.to_string()
                            prop:value=move || quantity.get().to_string()
                            on:input=move |ev| {
                                let q = event_target_value(&ev).parse::<u32>().unwrap_or(1);
                                set_quantity.set(q.clamp(1, stock));
                            }
                            class="w-20 rounded-lg px-3 py-2 border border-gray-300"
                        />
                        <button
                            on:click=add_to_cart
                            disabled=move || adding.get()
                            class="px-6 py-2 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-300 text-white rounded-lg font-medium"
                        >
                            {move || if adding.get() { "Adding..." } else { "Add to cart" }}
                        </button>
                    </div>
                }.into_view()
            } else {
                view! { <div class="text-red-600 font-medium">"Out of stock"</div> }.into_view()
            }}
        </div>
    }
}

/// Reviews list and the form for adding one
#[component]
pub fn ReviewSection(
    target: ReviewTarget,
    reviews: Resource<String, Result<Vec<Review>, bazaar::ApiError>>,
) -> impl IntoView {
    view! {
        <section class="space-y-4">
            <h2 class="text-xl font-semibold">"Reviews"</h2>
            <Transition fallback=move || view! { <ListSkeleton /> }>
                {move || reviews.get().map(|result| match result {
                    Err(e) => view! { <p class="text-gray-500">{e.to_string()}</p> }.into_view(),
                    Ok(list) => {
                        let summary = rating_summary(&list);
                        view! {
                            <div class="text-gray-600">
                                {match summary.average {
                                    Some(avg) => format!("★ {:.1} from {} reviews", avg, summary.count),
                                    None => "No reviews yet".to_string(),
                                }}
                            </div>
                            <ul class="space-y-3">
                                {list.into_iter().map(|r| view! {
                                    <li class="bg-white rounded-lg p-3 shadow-sm">
                                        <div class="flex justify-between text-sm">
                                            <span class="font-medium">{r.author_name}</span>
                                            <span class="text-yellow-600">{"★".repeat(r.rating as usize)}</span>
                                        </div>
                                        <p class="mt-1">{r.comment}</p>
                                    </li>
                                }).collect_view()}
                            </ul>
                        }.into_view()
                    }
                })}
            </Transition>
            <ReviewForm target=target on_submitted=move |_| reviews.refetch() />
        </section>
    }
}

#[component]
fn ReviewForm(target: ReviewTarget, #[prop(into)] on_submitted: Callback<()>) -> impl IntoView {
    let state = use_global_state();
    let draft = create_rw_signal(ReviewDraft::new(target));
    let (submitting, set_submitting) = create_signal(false);
    let signed_in = state.session;

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }

        let author = state.user_id().unwrap_or_default();
        let request = match draft.with_untracked(|d| d.to_request(&author)) {
            Ok(r) => r,
            Err(e) => {
                state.show_error(&e.to_string());
                return;
            }
        };

        set_submitting.set(true);
        let state = state.clone();
        spawn_local(async move {
            match api::submit_review(&request).await {
                Ok(_) => {
                    draft.update(|d| {
                        d.rating = 0;
                        d.comment.clear();
                    });
                    state.show_success("Thanks for your review");
                    on_submitted.call(());
                }
                Err(e) => state.show_api_error(&e),
            }
            set_submitting.set(false);
        });
    };

    view! {
        <Show
            when=move || signed_in.with(Option::is_some)
            fallback=|| view! { <p class="text-sm text-gray-500">"Sign in to write a review."</p> }
        >
            <form on:submit=submit.clone() class="space-y-2">
                <select
                    on:change=move |ev| {
                        let rating = event_target_value(&ev).parse().unwrap_or(0);
                        draft.update(|d| d.rating = rating);
                    }
                    class="rounded-lg px-3 py-2 border border-gray-300"
                >
                    <option value="0">"Rating"</option>
                    {(1..=5).map(|n| view! { <option value=n.to_string()>{"★".repeat(n)}</option> }).collect_view()}
                </select>
                <textarea
                    placeholder="Share your experience"
                    prop:value=move || draft.with(|d| d.comment.clone())
                    on:input=move |ev| draft.update(|d| d.comment = event_target_value(&ev))
                    class="w-full rounded-lg px-3 py-2 border border-gray-300"
                />
                <button
                    type="submit"
                    disabled=move || submitting.get()
                    class="px-4 py-2 bg-primary-600 disabled:bg-gray-300 text-white rounded-lg"
                >
                    "Post review"
                </button>
            </form>
        </Show>
    }
}
