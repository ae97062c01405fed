//! Chat WebSocket
//!
//! Live connection to the chat relay. One room (conversation) is joined at a
//! time, owned by the mounted chat page through a [`RoomSlot`]; inbound
//! messages for it go to that page's listener.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use bazaar::chat::{ClientEvent, MountId, RoomSlot, ServerEvent};
use bazaar::models::Message;

use super::global::GlobalState;

const MAX_RECONNECT_ATTEMPTS: u32 = 5;

type Listener = Rc<RefCell<Option<Box<dyn Fn(Message)>>>>;

/// WebSocket client for the chat relay
#[derive(Clone)]
pub struct ChatSocket {
    ws: Rc<RefCell<Option<WebSocket>>>,
    url: String,
    reconnect_attempts: Rc<RefCell<u32>>,
    rooms: Rc<RefCell<RoomSlot>>,
    listener: Listener,
}

impl ChatSocket {
    pub fn new(url: &str) -> Self {
        Self {
            ws: Rc::new(RefCell::new(None)),
            url: url.to_string(),
            reconnect_attempts: Rc::new(RefCell::new(0)),
            rooms: Rc::new(RefCell::new(RoomSlot::new())),
            listener: Rc::new(RefCell::new(None)),
        }
    }

    /// Connect to the relay
    pub fn connect(&self, state: GlobalState) {
        match WebSocket::new(&self.url) {
            Ok(ws) => {
                self.setup_handlers(&ws, state);
                *self.ws.borrow_mut() = Some(ws);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("WebSocket connection failed: {:?}", e).into());
                self.schedule_reconnect(state);
            }
        }
    }

    fn setup_handlers(&self, ws: &WebSocket, state: GlobalState) {
        // On open: rejoin the room we were in before a reconnect
        let socket = self.clone();
        let state_clone = state.clone();
        let on_open = Closure::wrap(Box::new(move |_: JsValue| {
            web_sys::console::log_1(&"WebSocket connected".into());
            state_clone.ws_connected.set(true);
            *socket.reconnect_attempts.borrow_mut() = 0;

            let room = socket.rooms.borrow().room().map(str::to_string);
            if let Some(room) = room {
                let _ = socket.emit(&ClientEvent::JoinRoom { room });
            }
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        on_open.forget();

        // On message
        let socket = self.clone();
        let state_clone = state.clone();
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            if let Ok(text) = event.data().dyn_into::<js_sys::JsString>() {
                let text: String = text.into();
                socket.handle_event(&text, &state_clone);
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        on_message.forget();

        // On close
        let socket = self.clone();
        let state_clone = state.clone();
        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            web_sys::console::log_1(
                &format!("WebSocket closed: code={}, reason={}", event.code(), event.reason()).into(),
            );
            state_clone.ws_connected.set(false);
            socket.schedule_reconnect(state_clone.clone());
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();

        // On error
        let on_error = Closure::wrap(Box::new(move |e: JsValue| {
            web_sys::console::error_1(&format!("WebSocket error: {:?}", e).into());
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_error.forget();
    }

    /// Exponential backoff, capped at 30s
    fn schedule_reconnect(&self, state: GlobalState) {
        let attempts = *self.reconnect_attempts.borrow();
        if attempts >= MAX_RECONNECT_ATTEMPTS {
            web_sys::console::error_1(&"Max reconnect attempts reached".into());
            return;
        }

        let delay = (2_u32.pow(attempts) * 1000).min(30000);
        *self.reconnect_attempts.borrow_mut() = attempts + 1;

        let socket = self.clone();
        gloo_timers::callback::Timeout::new(delay, move || {
            web_sys::console::log_1(&format!("Attempting reconnect (attempt {})", attempts + 1).into());
            socket.connect(state);
        })
        .forget();
    }

    fn handle_event(&self, text: &str, state: &GlobalState) {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(event @ ServerEvent::ReceiveMessage { .. }) => {
                if event.room() != self.rooms.borrow().room() {
                    return;
                }
                if let (ServerEvent::ReceiveMessage { message }, Some(listener)) =
                    (event, self.listener.borrow().as_ref())
                {
                    listener(message);
                }
            }
            Ok(ServerEvent::Joined { room }) => {
                web_sys::console::log_1(&format!("Joined room {}", room).into());
            }
            Ok(ServerEvent::Left { room }) => {
                web_sys::console::log_1(&format!("Left room {}", room).into());
            }
            Ok(ServerEvent::Pong) => {
                // Connection alive
            }
            Ok(ServerEvent::Error { message }) => {
                web_sys::console::error_1(&format!("Server error: {}", message).into());
                state.show_error(&message);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("Failed to parse WebSocket message: {}", e).into());
            }
        }
    }

    /// Send a frame to the relay
    pub fn emit(&self, event: &ClientEvent) -> Result<(), String> {
        let ws_guard = self.ws.borrow();
        let ws = ws_guard.as_ref().ok_or("WebSocket not connected")?;
        if ws.ready_state() != WebSocket::OPEN {
            return Err("WebSocket not connected".to_string());
        }

        let json = serde_json::to_string(event).map_err(|e| e.to_string())?;
        ws.send_with_str(&json).map_err(|e| format!("{:?}", e))
    }

    /// Register a mounted chat page; any earlier page becomes stale
    pub fn mount(&self) -> MountId {
        self.rooms.borrow_mut().mount()
    }

    /// Whether `mount` is still the page on screen
    pub fn is_current(&self, mount: MountId) -> bool {
        self.rooms.borrow().is_current(mount)
    }

    /// Join a conversation room for `mount`, replacing any previous one
    ///
    /// Returns `false` without touching the socket when the page is gone.
    /// When the socket is not open yet the join is sent on connect.
    pub fn join(&self, mount: MountId, room: &str, listener: impl Fn(Message) + 'static) -> bool {
        let Some(claim) = self.rooms.borrow_mut().claim(mount, room) else {
            return false;
        };
        *self.listener.borrow_mut() = Some(Box::new(listener));

        if let Some(previous) = claim.leave {
            let _ = self.emit(&ClientEvent::LeaveRoom { room: previous });
        }
        if self.is_connected() {
            let _ = self.emit(&ClientEvent::JoinRoom { room: claim.join });
        }
        true
    }

    /// Unmount a page: leave its room and drop its listener if it owns them
    pub fn release(&self, mount: MountId) {
        let room = self.rooms.borrow_mut().release(mount);
        if let Some(room) = room {
            self.listener.borrow_mut().take();
            let _ = self.emit(&ClientEvent::LeaveRoom { room });
        }
    }

    pub fn ping(&self) -> Result<(), String> {
        self.emit(&ClientEvent::Ping)
    }

    pub fn is_connected(&self) -> bool {
        self.ws
            .borrow()
            .as_ref()
            .map(|ws| ws.ready_state() == WebSocket::OPEN)
            .unwrap_or(false)
    }
}

/// Connect the chat socket and keep it alive (call from app root)
pub fn init_websocket(state: GlobalState) {
    state.socket.connect(state.clone());

    // Idle proxies drop quiet sockets
    let socket = state.socket.clone();
    gloo_timers::callback::Interval::new(25_000, move || {
        if socket.is_connected() {
            let _ = socket.ping();
        }
    })
    .forget();
}
