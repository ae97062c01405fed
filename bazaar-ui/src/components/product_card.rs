//! Product Card
//!
//! Grid tile for a product.

use leptos::*;
use leptos_router::*;

use bazaar::models::Product;

#[component]
pub fn ProductCard(product: Product) -> impl IntoView {
    let href = format!("/products/{}", product.id);
    let image = product.cover_image().map(str::to_string);
    let in_stock = product.in_stock();

    view! {
        <A href=href class="block bg-white rounded-xl shadow hover:shadow-md transition-shadow overflow-hidden">
            {match image {
                Some(src) => view! { <img src=src alt=product.name.clone() class="w-full h-40 object-cover" /> }.into_view(),
                None => view! { <div class="w-full h-40 bg-gray-100" /> }.into_view(),
            }}
            <div class="p-4">
                <h3 class="font-semibold truncate">{product.name.clone()}</h3>
                <div class="flex items-center justify-between mt-2">
                    <span class="text-lg font-bold">{format!("{:.2}", product.price)}</span>
                    {product.rating.map(|r| view! {
                        <span class="text-sm text-yellow-600">{format!("★ {:.1}", r)}</span>
                    })}
                </div>
                {(!in_stock).then(|| view! {
                    <span class="text-xs text-red-600">"Out of stock"</span>
                })}
            </div>
        </A>
    }
}
