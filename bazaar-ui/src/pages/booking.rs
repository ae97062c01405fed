//! Booking Page
//!
//! Time slots of the vendor picked on the vendors page. Booked and past
//! slots are shown but cannot be selected; a "slot already booked" answer
//! disables the slot in place.

use chrono::{Local, NaiveDate};
use leptos::*;
use leptos_router::*;

use bazaar::booking::{default_slot_times, selected_vendor, BookingDraft, SlotGrid, SlotState};
use bazaar::models::ReviewTarget;

use crate::api;
use crate::components::{EmptyState, Loading};
use crate::pages::product::ReviewSection;
use crate::state::use_global_state;

#[component]
pub fn BookingPage() -> impl IntoView {
    let state = use_global_state();
    let vendor = state
        .store
        .as_deref()
        .and_then(|store| selected_vendor(store).ok().flatten());

    let Some(vendor) = vendor else {
        return view! {
            <EmptyState title="Pick a vendor first" />
            <div class="text-center"><A href="/vendors" class="underline">"Browse services"</A></div>
        }
        .into_view();
    };

    let vendor_id = vendor.id.clone();
    let reviews = create_local_resource(
        move || vendor_id.clone(),
        |id| async move { api::reviews(&ReviewTarget::Vendor(id)).await },
    );

    view! {
        <div class="grid md:grid-cols-2 gap-8">
            <div class="space-y-4">
                <h1 class="text-3xl font-bold">{format!("Book {}", vendor.name)}</h1>
                <p class="text-gray-500">{vendor.category.clone()}</p>
                <SlotPicker vendor_id=vendor.id.clone() />
            </div>
            <ReviewSection target=ReviewTarget::Vendor(vendor.id.clone()) reviews=reviews />
        </div>
    }
    .into_view()
}

#[component]
fn SlotPicker(vendor_id: String) -> impl IntoView {
    let state = use_global_state();
    let session = state.session;
    let (date, set_date) = create_signal(Local::now().date_naive());
    let grid = create_rw_signal(None::<SlotGrid>);
    let (notes, set_notes) = create_signal(String::new());
    let (submitting, set_submitting) = create_signal(false);
    let (confirmed, set_confirmed) = create_signal(None::<String>);

    let id_for_fetch = vendor_id.clone();
    let booked = create_local_resource(
        move || (id_for_fetch.clone(), date.get()),
        |(id, date)| async move { api::booked_slots(&id, date).await.map(|b| (date, b)) },
    );

    // Rebuild the grid whenever a date's bookings arrive
    let state_for_grid = state.clone();
    create_effect(move |_| match booked.get() {
        Some(Ok((date, taken))) => match SlotGrid::with_local_clock(date, &default_slot_times(), &taken) {
            Ok(g) => grid.set(Some(g)),
            Err(e) => state_for_grid.show_error(&e.to_string()),
        },
        Some(Err(e)) => {
            grid.set(None);
            state_for_grid.show_api_error(&e);
        }
        None => {}
    });

    let state_for_submit = state.clone();
    let submit = move |_| {
        if submitting.get_untracked() {
            return;
        }
        let state = state_for_submit.clone();
        let user_id = state.user_id().unwrap_or_default();

        let draft = BookingDraft {
            notes: Some(notes.get_untracked()),
            ..BookingDraft::for_vendor(vendor_id.clone())
        };
        let request = match grid.with_untracked(|g| match g {
            Some(g) => draft.to_request(&user_id, g).map_err(|e| e.to_string()),
            None => Err("Slots are still loading".to_string()),
        }) {
            Ok(r) => r,
            Err(message) => {
                state.show_error(&message);
                return;
            }
        };

        set_submitting.set(true);
        spawn_local(async move {
            match api::create_booking(&request).await {
                Ok(booking) => {
                    grid.update(|g| {
                        if let Some(g) = g {
                            g.mark_booked(&booking.time);
                        }
                    });
                    set_confirmed.set(Some(format!("{} at {}", booking.date, booking.time)));
                    state.show_success("Booking requested");
                }
                Err(e) => {
                    grid.update(|g| {
                        if let Some(g) = g {
                            g.apply_failure(&e);
                        }
                    });
                    state.show_api_error(&e);
                }
            }
            set_submitting.set(false);
        });
    };

    view! {
        <div class="space-y-4">
            <input
                type="date"
                min=Local::now().date_naive().to_string()
                prop:value=move || date.get().to_string()
                on:change=move |ev| {
                    if let Ok(d) = NaiveDate::parse_from_str(&event_target_value(&ev), "%Y-%m-%d") {
                        set_date.set(d);
                    }
                }
                class="rounded-lg px-3 py-2 border border-gray-300"
            />

            <Transition fallback=move || view! { <Loading /> }>
                {move || {
                    booked.with(|_| ())?;
                    grid.with(|g| g.as_ref().map(|g| {
                        let selected = g.selected().map(str::to_string);
                        g.slots().into_iter().map(|(time, slot)| {
                            let is_selected = selected.as_deref() == Some(time.as_str());
                            let class = match (slot, is_selected) {
                                (_, true) => "bg-primary-600 text-white",
                                (SlotState::Available, false) => "bg-white hover:bg-gray-50 border border-gray-300",
                                (SlotState::Booked, false) => "bg-gray-100 text-gray-400 line-through",
                                (SlotState::Past, false) => "bg-gray-100 text-gray-300",
                            };
                            let label = time.clone();
                            view! {
                                <button
                                    disabled=!slot.is_selectable()
                                    on:click=move |_| grid.update(|g| {
                                        if let Some(g) = g {
                                            let _ = g.select(&time);
                                        }
                                    })
                                    class=format!("px-3 py-2 rounded-lg text-sm {}", class)
                                >
                                    {label}
                                </button>
                            }
                        }).collect_view()
                    }))
                    .map(|slots| view! { <div class="grid grid-cols-3 gap-2">{slots}</div> })
                }}
            </Transition>

            <textarea
                placeholder="Notes for the vendor (optional)"
                on:input=move |ev| set_notes.set(event_target_value(&ev))
                class="w-full rounded-lg px-3 py-2 border border-gray-300"
            />

            <Show
                when=move || session.with(Option::is_some)
                fallback=|| view! { <A href="/login" class="underline">"Sign in to book"</A> }
            >
                <button
                    on:click=submit.clone()
                    disabled=move || submitting.get() || grid.with(|g| g.as_ref().and_then(|g| g.selected()).is_none())
                    class="w-full px-6 py-3 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-300 text-white rounded-lg font-medium"
                >
                    {move || if submitting.get() { "Booking..." } else { "Book this slot" }}
                </button>
            </Show>

            {move || confirmed.get().map(|when| view! {
                <p class="text-green-700">{format!("Requested for {}", when)}</p>
            })}
        </div>
    }
}
