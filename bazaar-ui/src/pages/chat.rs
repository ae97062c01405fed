//! Messages
//!
//! Inbox of conversations and the chat view for one of them. The chat view
//! joins the conversation's live room for as long as it is mounted.

use chrono::Utc;
use leptos::*;
use leptos_router::*;

use bazaar::chat::{arrange_inbox, ChatPanel, ClientEvent, DeliveryStatus, MountId};
use bazaar::models::{Conversation, Message};

use crate::api;
use crate::components::{EmptyState, ListSkeleton};
use crate::state::{use_global_state, GlobalState};

#[component]
pub fn Inbox() -> impl IntoView {
    let state = use_global_state();
    let session = state.session;

    let conversations = create_local_resource(
        move || session.with(|s| s.as_ref().map(|s| s.user.id.clone())),
        |me| async move {
            let Some(me) = me else {
                return Ok(Vec::new());
            };
            api::conversations(&me).await.map(|list| arrange_inbox(list, &me))
        },
    );

    view! {
        <div class="space-y-4 max-w-2xl">
            <h1 class="text-3xl font-bold">"Messages"</h1>
            <Transition fallback=move || view! { <ListSkeleton count=5 /> }>
                {move || conversations.get().map(|result| match result {
                    Err(e) => view! { <EmptyState title="Could not load messages" hint=e.to_string() /> }.into_view(),
                    Ok(list) if list.is_empty() => view! {
                        <EmptyState title="No conversations yet" hint="Message a vendor from the services page." />
                    }.into_view(),
                    Ok(list) => {
                        let me = state.user_id().unwrap_or_default();
                        view! {
                            <ul class="divide-y bg-white rounded-xl shadow">
                                {list.into_iter().map(|c| view! { <InboxRow conversation=c me=me.clone() /> }).collect_view()}
                            </ul>
                        }.into_view()
                    }
                })}
            </Transition>
        </div>
    }
}

#[component]
fn InboxRow(conversation: Conversation, me: String) -> impl IntoView {
    let counterpart = conversation.counterpart_of(&me).to_string();
    view! {
        <li>
            <A href=format!("/chat/{}", counterpart) class="flex justify-between p-4 hover:bg-gray-50">
                <div>
                    <div class="font-medium">{counterpart.clone()}</div>
                    <div class="text-sm text-gray-500 truncate">{conversation.last_message.clone().unwrap_or_default()}</div>
                </div>
                <div class="text-xs text-gray-400">{conversation.updated_at.format("%b %d %H:%M").to_string()}</div>
            </A>
        </li>
    }
}

#[component]
pub fn ChatPage() -> impl IntoView {
    let state = use_global_state();
    let params = use_params_map();
    let counterpart = params.with_untracked(|p| p.get("counterpart").cloned().unwrap_or_default());

    let Some(me) = state.session.get_untracked().map(|s| s.user) else {
        return view! {
            <EmptyState title="Sign in to send messages" />
            <div class="text-center"><A href="/login" class="underline">"Sign in"</A></div>
        }
        .into_view();
    };
    if counterpart.trim().is_empty() {
        return view! { <EmptyState title="Pick someone to message" /> }.into_view();
    }

    let panel = create_rw_signal(ChatPanel::new(me.id.clone()));
    let (draft, set_draft) = create_signal(String::new());

    // Work resuming after this page is gone must not touch the socket or panel
    let mount = state.socket.mount();
    let socket = state.socket.clone();
    on_cleanup(move || socket.release(mount));

    // Join the room before loading history so nothing posted meanwhile is lost
    let (customer_id, vendor_id) = if me.is_vendor() {
        (counterpart.clone(), me.id.clone())
    } else {
        (me.id.clone(), counterpart.clone())
    };
    let state_for_open = state.clone();
    spawn_local(async move {
        let state = state_for_open;
        let opened = api::open_conversation(&customer_id, &vendor_id).await;
        if !state.socket.is_current(mount) {
            return;
        }
        let conversation = match opened {
            Ok(c) => c,
            Err(e) => {
                state.show_api_error(&e);
                return;
            }
        };

        panel.update(|p| p.open(conversation.id.clone()));
        let joined = state.socket.join(mount, &conversation.id, move |message| {
            panel.update(|p| {
                p.apply_inbound(message);
            });
        });
        if !joined {
            return;
        }

        let history = api::messages(&conversation.id).await;
        if !state.socket.is_current(mount) {
            return;
        }
        match history {
            Ok(history) => panel.update(|p| {
                p.load_history(history);
            }),
            Err(e) => state.show_api_error(&e),
        }
    });

    let state_for_send = state.clone();
    let send = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let text = draft.get_untracked();
        let mut started = None;
        panel.update(|p| started = Some(p.begin_send(&text, Utc::now())));
        match started {
            Some(Ok(message)) => {
                set_draft.set(String::new());
                deliver(state_for_send.clone(), panel, mount, message);
            }
            Some(Err(e)) => state_for_send.show_error(&e.to_string()),
            None => {}
        }
    };

    let state_for_retry = state.clone();
    let retry = move |key: String| {
        let mut again = None;
        panel.update(|p| again = Some(p.retry(&key)));
        match again {
            Some(Ok(message)) => deliver(state_for_retry.clone(), panel, mount, message),
            Some(Err(e)) => state_for_retry.show_error(&e.to_string()),
            None => {}
        }
    };

    let me_id = me.id.clone();
    view! {
        <div class="max-w-2xl mx-auto flex flex-col h-[70vh] bg-white rounded-xl shadow">
            <header class="p-4 border-b font-semibold">{counterpart.clone()}</header>

            <ul class="flex-1 overflow-y-auto p-4 space-y-2">
                {move || panel.with(|p| p.entries().to_vec()).into_iter().map(|entry| {
                    let mine = entry.message.sender_id == me_id;
                    let key = entry.message.client_key.clone();
                    let retry = retry.clone();
                    let status = match entry.status {
                        DeliveryStatus::Pending => "Sending...",
                        DeliveryStatus::Failed => "Not sent",
                        DeliveryStatus::Sent | DeliveryStatus::Received => "",
                    };
                    view! {
                        <li class=if mine { "flex justify-end" } else { "flex justify-start" }>
                            <div class=if mine {
                                "max-w-[75%] bg-primary-600 text-white rounded-2xl px-4 py-2"
                            } else {
                                "max-w-[75%] bg-gray-100 rounded-2xl px-4 py-2"
                            }>
                                <p>{entry.message.text.clone()}</p>
                                <div class="text-xs opacity-70 flex gap-2">
                                    <span>{entry.message.sent_at.format("%H:%M").to_string()}</span>
                                    <span>{status}</span>
                                    {(entry.status == DeliveryStatus::Failed).then(|| key).flatten().map(|key| view! {
                                        <button class="underline" on:click=move |_| retry(key.clone())>"Retry"</button>
                                    })}
                                </div>
                            </div>
                        </li>
                    }
                }).collect_view()}
            </ul>

            <form on:submit=send class="p-4 border-t flex gap-2">
                <input
                    type="text"
                    placeholder="Write a message"
                    prop:value=move || draft.get()
                    on:input=move |ev| set_draft.set(event_target_value(&ev))
                    class="flex-1 rounded-lg px-4 py-2 border border-gray-300"
                />
                <button
                    type="submit"
                    disabled=move || draft.with(|d| d.trim().is_empty())
                    class="px-4 py-2 bg-primary-600 disabled:bg-gray-300 text-white rounded-lg"
                >
                    "Send"
                </button>
            </form>
        </div>
    }
    .into_view()
}

/// Relay live, then persist; the panel tracks the outcome by client key
fn deliver(state: GlobalState, panel: RwSignal<ChatPanel>, mount: MountId, message: Message) {
    let key = message.client_key.clone().unwrap_or_default();

    if let Err(e) = state.socket.emit(&ClientEvent::SendMessage {
        message: message.clone(),
    }) {
        web_sys::console::warn_1(&format!("Live relay skipped: {}", e).into());
    }

    spawn_local(async move {
        let persisted = api::persist_message(&message).await;
        if !state.socket.is_current(mount) {
            return;
        }
        match persisted {
            Ok(stored) => panel.update(|p| {
                p.mark_persisted(&key, &stored);
            }),
            Err(e) => {
                panel.update(|p| {
                    p.mark_failed(&key);
                });
                state.show_api_error(&e);
            }
        }
    });
}
