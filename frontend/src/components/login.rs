use crate::api::login;
use crate::Route;
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_router::prelude::*;

#[derive(Properties, PartialEq)]
pub struct LoginProps {
    /// Fired after the server accepted the credentials.
    pub on_login: Callback<()>,
}

#[function_component(Login)]
pub fn login_component(props: &LoginProps) -> Html {
    let username = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| Option::<String>::None);
    let navigator = use_navigator();

    let onsubmit = {
        let username = username.clone();
        let password = password.clone();
        let error = error.clone();
        let on_login = props.on_login.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let username = username.clone();
            let password = password.clone();
            let error = error.clone();
            let navigator = navigator.clone();
            let on_login = on_login.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match login((*username).clone(), (*password).clone()).await {
                    Ok(resp) if resp.success => {
                        error.set(None);
                        on_login.emit(());
                        if let Some(navigator) = navigator {
                            navigator.push(&Route::Courses);
                        }
                    }
                    Ok(resp) => {
                        let message = resp
                            .error
                            .unwrap_or_else(|| "Invalid username or password".to_string());
                        error.set(Some(message));
                    }
                    Err(err) => {
                        tracing::warn!(%err, "login request failed");
                        error.set(Some("Could not reach the server".to_string()));
                    }
                }
            });
        })
    };

    let oninput_username = {
        let username = username.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) {
                username.set(input.value());
            }
        })
    };

    let oninput_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) {
                password.set(input.value());
            }
        })
    };

    html! {
        <div class="login-container">
            <h1>{"Sign in"}</h1>
            <form {onsubmit}>
                <div class="field">
                    <label>{"Username"}</label>
                    <input type="text" value={(*username).clone()} oninput={oninput_username} />
                </div>
                <div class="field">
                    <label>{"Password"}</label>
                    <input type="password" value={(*password).clone()} oninput={oninput_password} />
                </div>
                if let Some(err) = (*error).clone() {
                    <div class="error">{err}</div>
                }
                <button type="submit">{"Sign in"}</button>
            </form>
        </div>
    }
}
