fn main() {
    let open = signal(true);
    view! { <nav class="flex p-4" class:hidden=move || open.get()>"Menu"</nav> }
}
