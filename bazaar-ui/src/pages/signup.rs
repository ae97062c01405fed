//! Sign-up Page
//!
//! The account form unlocks only after the email is verified with a
//! one-time code. Changing the email starts verification over.

use leptos::*;
use leptos_router::*;

use bazaar::auth::{OtpFlow, OtpStep, Session, SignupForm};
use bazaar::validation::FieldError;

use crate::api;
use crate::state::use_global_state;

#[component]
pub fn Signup() -> impl IntoView {
    let state = use_global_state();
    let navigate = use_navigate();

    let flow = create_rw_signal(OtpFlow::new());
    let form = create_rw_signal(SignupForm::default());
    let errors = create_rw_signal(Vec::<FieldError>::new());
    let (submitting, set_submitting) = create_signal(false);

    let state_for_send = state.clone();
    let send_code = move |_| {
        let mut begun = None;
        flow.update(|f| begun = Some(f.begin_request()));
        let ticket = match begun {
            Some(Ok(t)) => t,
            Some(Err(e)) => {
                state_for_send.show_error(&e.to_string());
                return;
            }
            None => return,
        };

        let state = state_for_send.clone();
        spawn_local(async move {
            let result = api::request_otp(&ticket.email).await;
            let mut current = false;
            flow.update(|f| current = f.finish_request(&ticket, result.is_ok()));
            // A newer email made this answer irrelevant
            if !current {
                return;
            }
            match result {
                Ok(()) => state.show_success(&format!("Code sent to {}", ticket.email)),
                Err(e) => state.show_error(&e.to_string()),
            }
        });
    };

    let state_for_verify = state.clone();
    let verify_code = move |_| {
        let mut begun = None;
        flow.update(|f| begun = Some(f.begin_verify()));
        let ticket = match begun {
            Some(Ok(t)) => t,
            Some(Err(e)) => {
                state_for_verify.show_error(&e.to_string());
                return;
            }
            None => return,
        };

        let state = state_for_verify.clone();
        spawn_local(async move {
            let code = ticket.code.clone().unwrap_or_default();
            let result = api::verify_otp(&ticket.email, &code).await;
            let mut current = false;
            flow.update(|f| current = f.finish_verify(&ticket, result.is_ok()));
            if !current {
                return;
            }
            match result {
                Ok(()) => state.show_success("Email verified"),
                Err(e) => state.show_error(&e.to_string()),
            }
        });
    };

    let state_for_submit = state.clone();
    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() || !flow.with_untracked(OtpFlow::can_submit) {
            return;
        }

        let request = match form.with_untracked(SignupForm::to_request) {
            Ok(r) => {
                errors.set(Vec::new());
                r
            }
            Err(found) => {
                errors.set(found);
                return;
            }
        };

        set_submitting.set(true);
        let state = state_for_submit.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            match api::signup(&request).await {
                Ok(auth) => {
                    let session = Session::from(auth);
                    state.show_success(&format!("Welcome, {}", session.user.name));
                    state.sign_in(session);
                    navigate("/", Default::default());
                }
                Err(e) => state.show_error(&e.to_string()),
            }
            set_submitting.set(false);
        });
    };

    let error_for = move |field: &'static str| {
        move || {
            errors.with(|list| {
                list.iter()
                    .find(|e| e.field == field)
                    .map(|e| view! { <p class="text-xs text-red-600">{e.message.clone()}</p> })
            })
        }
    };

    view! {
        <div class="max-w-md mx-auto bg-white rounded-xl shadow p-8 space-y-6">
            <h1 class="text-2xl font-bold">"Create an account"</h1>

            // Step 1: verify the email
            <section class="space-y-3">
                <div class="flex gap-2">
                    <input
                        type="email"
                        placeholder="Email"
                        prop:value=move || flow.with(|f| f.email().to_string())
                        on:input=move |ev| {
                            let email = event_target_value(&ev);
                            flow.update(|f| f.set_email(email.clone()));
                            form.update(|f| f.email = email);
                        }
                        class="flex-1 rounded-lg px-4 py-3 border border-gray-300"
                    />
                    <button
                        on:click=send_code
                        disabled=move || !flow.with(OtpFlow::can_request)
                        class="px-4 py-3 rounded-lg bg-gray-100 disabled:text-gray-400"
                    >
                        {move || if flow.with(OtpFlow::otp_sent) { "Resend" } else { "Send code" }}
                    </button>
                </div>

                <Show when=move || flow.with(|f| f.step() == OtpStep::CodeSent)>
                    <div class="flex gap-2">
                        <input
                            type="text"
                            inputmode="numeric"
                            placeholder="Code"
                            prop:value=move || flow.with(|f| f.code().to_string())
                            on:input=move |ev| flow.update(|f| f.set_code(event_target_value(&ev)))
                            class="flex-1 rounded-lg px-4 py-3 border border-gray-300"
                        />
                        <button
                            on:click=verify_code.clone()
                            disabled=move || !flow.with(OtpFlow::can_verify)
                            class="px-4 py-3 rounded-lg bg-gray-100 disabled:text-gray-400"
                        >
                            "Verify"
                        </button>
                    </div>
                </Show>

                {move || (flow.with(|f| f.step()) == OtpStep::Verified)
                    .then(|| view! { <p class="text-sm text-green-700">"✓ Email verified"</p> })}
            </section>

            // Step 2: account details
            <form on:submit=submit class="space-y-3">
                <input
                    type="text"
                    placeholder="Full name"
                    on:input=move |ev| form.update(|f| f.name = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                {error_for("name")}
                <input
                    type="tel"
                    placeholder="Phone (optional)"
                    on:input=move |ev| form.update(|f| f.phone = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                {error_for("phone")}
                <input
                    type="password"
                    placeholder="Password"
                    on:input=move |ev| form.update(|f| f.password = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                {error_for("password")}
                <input
                    type="password"
                    placeholder="Confirm password"
                    on:input=move |ev| form.update(|f| f.confirm_password = event_target_value(&ev))
                    class="w-full rounded-lg px-4 py-3 border border-gray-300"
                />
                {error_for("confirm_password")}
                {error_for("email")}
                <button
                    type="submit"
                    disabled=move || submitting.get() || !flow.with(OtpFlow::can_submit)
                    class="w-full px-6 py-3 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-300 text-white rounded-lg font-medium"
                >
                    {move || if submitting.get() { "Creating account..." } else { "Create account" }}
                </button>
            </form>

            <p class="text-sm text-gray-500">
                "Already have an account? " <A href="/login" class="underline">"Sign in"</A>
            </p>
        </div>
    }
}
