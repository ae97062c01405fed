//! Loading Component
//!
//! Spinners, skeletons and the empty state shown instead of an empty grid.

use leptos::*;

/// Full-page loading spinner
#[component]
pub fn Loading() -> impl IntoView {
    view! {
        <div class="flex items-center justify-center py-12">
            <div class="loading-spinner w-8 h-8" />
        </div>
    }
}

/// Skeleton loader for list items
#[component]
pub fn ListSkeleton(
    #[prop(default = 3)]
    count: usize,
) -> impl IntoView {
    view! {
        <div class="space-y-3 animate-pulse">
            {(0..count).map(|_| view! {
                <div class="bg-gray-200 rounded h-12" />
            }).collect_view()}
        </div>
    }
}

/// Placeholder for a list with no items
#[component]
pub fn EmptyState(
    #[prop(into)]
    title: String,
    #[prop(into, optional)]
    hint: Option<String>,
) -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center py-16 text-center">
            <div class="text-5xl mb-4">"🛍"</div>
            <h2 class="text-xl font-semibold mb-1">{title}</h2>
            {hint.map(|h| view! { <p class="text-gray-500">{h}</p> })}
        </div>
    }
}
