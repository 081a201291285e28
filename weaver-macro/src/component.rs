use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, Ident, Lit,
    LitStr, Meta, Type,
};

/// Field annotations naming a configuration key, in lookup order
const TAGS: [&str; 3] = ["weaver", "config", "conf"];

pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_component_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct StructOptions {
    init: bool,
    start: bool,
    shutdown: bool,
    main: bool,
}

#[derive(Default)]
struct FieldOptions {
    base: bool,
    reference: bool,
    setter: Option<Ident>,
}

fn generate_component_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let options = struct_options(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Ok(unit_impl(input, &options)),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Component)] only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Component)] can only be applied to structs",
            ));
        }
    };

    let mut base: Option<&Ident> = None;
    let mut config_fields = Vec::new();
    let mut references = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_options = field_options(field)?;
        let tags = field_tags(field)?;
        let field_name = ident.to_string();
        let tag_pairs = tags.iter().map(|(tag, key)| quote!((#tag, #key)));

        if field_options.base || last_segment_is(&field.ty, "Base") {
            if base.is_some() {
                return Err(syn::Error::new_spanned(field, "only one base field is allowed"));
            }
            base = Some(ident);
        } else if let Some(method) = &field_options.setter {
            config_fields.push(quote! {
                ::weaver::ConfigField::setter(#field_name, &[#(#tag_pairs),*], self.#method())
            });
        } else if last_segment_is(&field.ty, "WithConfig") {
            config_fields.push(quote! {
                ::weaver::ConfigField::embedded(#field_name, &[#(#tag_pairs),*], &self.#ident)
            });
        } else if !tags.is_empty() {
            return Err(syn::Error::new_spanned(
                field,
                "configuration keys need a WithConfig field or #[component(setter = method)]",
            ));
        } else if field_options.reference || last_segment_is(&field.ty, "Ref") {
            references.push(quote!(&self.#ident as &dyn ::weaver::Reference));
        }
    }

    let setters = match base {
        Some(base) => quote! {
            fn set_logger(&mut self, logger: ::weaver::Logger) {
                self.#base.set_logger(logger);
            }

            fn set_cancel(&mut self, token: ::weaver::CancellationToken) {
                self.#base.set_cancel(token);
            }
        },
        None => quote! {
            fn set_logger(&mut self, _logger: ::weaver::Logger) {}
        },
    };

    let config_fields = (!config_fields.is_empty()).then(|| {
        quote! {
            fn config_fields(&self) -> ::std::vec::Vec<::weaver::ConfigField> {
                ::std::vec![#(#config_fields),*]
            }
        }
    });

    let references = (!references.is_empty()).then(|| {
        quote! {
            fn references(&self) -> ::std::vec::Vec<&dyn ::weaver::Reference> {
                ::std::vec![#(#references),*]
            }
        }
    });

    let hooks = hooks_fn(&options);
    let main_impl = main_impl(input, &options);

    Ok(quote! {
        impl #impl_generics ::weaver::Component for #struct_name #ty_generics #where_clause {
            #setters
            #config_fields
            #references
            #hooks
        }

        #main_impl
    })
}

fn unit_impl(input: &DeriveInput, options: &StructOptions) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let hooks = hooks_fn(options);
    let main_impl = main_impl(input, options);

    quote! {
        impl #impl_generics ::weaver::Component for #struct_name #ty_generics #where_clause {
            fn set_logger(&mut self, _logger: ::weaver::Logger) {}
            #hooks
        }

        #main_impl
    }
}

fn hooks_fn(options: &StructOptions) -> Option<TokenStream2> {
    let methods: Vec<Ident> = [
        (options.init, "with_init"),
        (options.start, "with_start"),
        (options.shutdown, "with_shutdown"),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .map(|(_, method)| Ident::new(method, proc_macro2::Span::call_site()))
    .collect();

    if methods.is_empty() {
        return None;
    }

    Some(quote! {
        fn hooks(self: ::std::sync::Arc<Self>) -> ::weaver::Hooks {
            ::weaver::Hooks::new()
                #(.#methods(::std::sync::Arc::clone(&self)))*
        }
    })
}

fn main_impl(input: &DeriveInput, options: &StructOptions) -> Option<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    options.main.then(|| {
        quote! {
            impl #impl_generics ::weaver::Main for #struct_name #ty_generics #where_clause {}
        }
    })
}

/// Parse `#[component(init, start, shutdown, main)]` on the struct
fn struct_options(attrs: &[Attribute]) -> syn::Result<StructOptions> {
    let mut options = StructOptions::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("init") {
                options.init = true;
            } else if meta.path.is_ident("start") {
                options.start = true;
            } else if meta.path.is_ident("shutdown") {
                options.shutdown = true;
            } else if meta.path.is_ident("main") {
                options.main = true;
            } else {
                return Err(meta.error("expected `init`, `start`, `shutdown` or `main`"));
            }
            Ok(())
        })?;
    }

    Ok(options)
}

/// Parse `#[component(base)]`, `#[component(reference)]` and
/// `#[component(setter = method)]` on a field
fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base") {
                options.base = true;
            } else if meta.path.is_ident("reference") {
                options.reference = true;
            } else if meta.path.is_ident("setter") {
                options.setter = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("expected `base`, `reference` or `setter = method`"));
            }
            Ok(())
        })?;
    }

    Ok(options)
}

/// Collect `#[weaver = "key"]`, `#[config = "key"]` and `#[conf = "key"]`
fn field_tags(field: &Field) -> syn::Result<Vec<(String, LitStr)>> {
    let mut tags = Vec::new();

    for attr in &field.attrs {
        let Some(tag) = TAGS.iter().find(|tag| attr.path().is_ident(tag)) else {
            continue;
        };
        let key = match &attr.meta {
            Meta::NameValue(pair) => match &pair.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(key), ..
                }) => key.clone(),
                other => {
                    return Err(syn::Error::new_spanned(other, "expected a string literal key"));
                }
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    format!("expected `#[{tag} = \"key\"]`"),
                ));
            }
        };
        tags.push((tag.to_string(), key));
    }

    Ok(tags)
}

/// Whether the last path segment of `ty` is `name`, e.g. `Ref` in `weaver::Ref<dyn Chat>`
fn last_segment_is(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: TokenStream2) -> String {
        let input: DeriveInput = syn::parse2(input).unwrap();
        generate_component_impl(&input)
            .unwrap_or_else(syn::Error::into_compile_error)
            .to_string()
    }

    #[test]
    fn test_forwards_setters_to_base() {
        let expanded = expand(quote! {
            struct Chat {
                base: weaver::Base,
            }
        });

        assert!(expanded.contains("self . base . set_logger (logger)"));
        assert!(expanded.contains("self . base . set_cancel (token)"));
        assert!(!expanded.contains("fn hooks"));
    }

    #[test]
    fn test_collects_config_and_references() {
        let expanded = expand(quote! {
            #[component(init, main)]
            struct User {
                base: Base,
                #[conf = "legacy"]
                #[weaver = "user"]
                config: WithConfig<UserConfig>,
                chat: Ref<dyn Chat>,
                counter: u32,
            }
        });

        assert!(expanded.contains("ConfigField :: embedded (\"config\""));
        assert!(expanded.contains("(\"conf\" , \"legacy\")"));
        assert!(expanded.contains("(\"weaver\" , \"user\")"));
        assert!(expanded.contains("& self . chat as & dyn :: weaver :: Reference"));
        assert!(!expanded.contains("counter"));
        assert!(expanded.contains("with_init"));
        assert!(expanded.contains(":: weaver :: Main for User"));
    }

    #[test]
    fn test_setter_fields() {
        let expanded = expand(quote! {
            struct Pool {
                #[config = "pool"]
                #[component(setter = limits_setter)]
                limits: Arc<RwLock<Limits>>,
            }
        });

        assert!(expanded.contains("ConfigField :: setter (\"limits\""));
        assert!(expanded.contains("self . limits_setter ()"));
    }

    #[test]
    fn test_rejects_keys_on_plain_fields() {
        let expanded = expand(quote! {
            struct Broken {
                #[weaver = "x"]
                value: u32,
            }
        });

        assert!(expanded.contains("compile_error"));
    }

    #[test]
    fn test_rejects_tuple_structs() {
        let expanded = expand(quote! {
            struct Pair(u8, u8);
        });

        assert!(expanded.contains("compile_error"));
    }
}
