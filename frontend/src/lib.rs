pub mod api;
pub mod components;
pub mod hooks;

use common::Hierarchy;
use components::content_page::ContentPage;
use components::login::Login;
use components::toast::Toasts;
use hooks::{use_session_info, use_toasts, SessionState};
use wasm_bindgen::prelude::*;
use yew::prelude::*;
use yew_router::prelude::*;

#[derive(Clone, Routable, PartialEq, Debug)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/courses")]
    Courses,
    #[at("/documents")]
    Documents,
    #[at("/login")]
    Login,
    #[not_found]
    #[at("/404")]
    NotFound,
}

#[function_component(App)]
pub fn app() -> Html {
    let session = use_session_info();
    let toasts = use_toasts();

    let on_logout = {
        let refresh = session.refresh.clone();
        Callback::from(move |_: MouseEvent| {
            let refresh = refresh.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = api::logout().await {
                    tracing::warn!(%err, "logout failed");
                }
                refresh.emit(());
            });
        })
    };

    let render = {
        let state = session.state.clone();
        let refresh = session.refresh.clone();
        let on_notice = toasts.push.clone();
        move |route: Route| switch(route, &state, &refresh, &on_notice)
    };

    html! {
        <BrowserRouter>
            <div class="container">
                <nav class="topbar">
                    <span class="brand">{"Cohort"}</span>
                    <Link<Route> to={Route::Courses}>{"Courses"}</Link<Route>>
                    <Link<Route> to={Route::Documents}>{"Documents"}</Link<Route>>
                    <div style="flex: 1"></div>
                    if let SessionState::SignedIn(info) = &session.state {
                        <span class="whoami">{ format!("{} ({})", info.username, info.role) }</span>
                        <button class="logout-btn" onclick={on_logout}>{"Sign out"}</button>
                    }
                </nav>
                <main class="content">
                    <Switch<Route> render={render} />
                </main>
                <Toasts items={toasts.list.items.clone()} on_dismiss={toasts.dismiss.clone()} />
            </div>
        </BrowserRouter>
    }
}

fn switch(
    route: Route,
    session: &SessionState,
    refresh: &Callback<()>,
    on_notice: &Callback<common::commit::Notice>,
) -> Html {
    let info = match (session, &route) {
        (_, Route::Login) => return html! { <Login on_login={refresh.clone()} /> },
        (_, Route::NotFound) => return html! { <h1>{ "404 Not Found" }</h1> },
        (SessionState::Loading, _) => return html! { <p class="loading">{"Loading…"}</p> },
        (SessionState::SignedOut, _) => return html! { <Redirect<Route> to={Route::Login} /> },
        (SessionState::SignedIn(info), _) => info.clone(),
    };

    let hierarchy = match route {
        Route::Documents => Hierarchy::Documents,
        _ => Hierarchy::Courses,
    };
    // Keyed so switching hierarchies starts the page from scratch.
    html! {
        <ContentPage key={hierarchy.as_str()} {hierarchy} session={info} on_notice={on_notice.clone()} />
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    tracing_wasm::set_as_global_default();
    yew::Renderer::<App>::new().render();
}
