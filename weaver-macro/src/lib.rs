use proc_macro::TokenStream;

mod component;

/// Derive macro implementing `weaver::Component` from field declarations
///
/// - a `Base` field (or one marked `#[component(base)]`) receives the logger
///   and the run token
/// - `WithConfig<T>` fields are bound from the key given by `#[weaver = ".."]`,
///   `#[config = ".."]` or `#[conf = ".."]`, first non-empty in that order
/// - fields marked `#[component(setter = method)]` are bound through the
///   `ConfigSetter` returned by `self.method()`
/// - `Ref<dyn Trait>` fields are wired to other components
/// - `#[component(init, start, shutdown)]` on the struct advertises the
///   lifecycle hooks it implements; `#[component(main)]` makes it a root
///
/// # Example
/// ```ignore
/// use weaver::prelude::*;
///
/// #[derive(Component, Default)]
/// #[component(start, main)]
/// pub struct App {
///     base: Base,
///     #[config = "app"]
///     config: WithConfig<AppConfig>,
///     user: Ref<dyn User>,
/// }
/// ```
#[proc_macro_derive(Component, attributes(component, weaver, config, conf))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::derive_component(input)
}
