use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, Data, DeriveInput, Fields,
    Lit, Token,
};

/// Sentinel override key that keeps a field out of the environment overlay.
const ENV_SENTINEL: &str = "-";

#[derive(Default)]
struct FieldArgs {
    env: Option<String>,
    skip: bool,
}

impl Parse for FieldArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = FieldArgs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;

            match ident.to_string().as_str() {
                "env" => {
                    input.parse::<Token![=]>()?;
                    let lit: Lit = input.parse()?;
                    if let Lit::Str(s) = lit {
                        if s.value().is_empty() {
                            return Err(syn::Error::new(s.span(), "env key must not be empty"));
                        }
                        args.env = Some(s.value());
                    } else {
                        return Err(syn::Error::new(lit.span(), "env must be a string literal"));
                    }
                }
                "skip" => args.skip = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute `{}`, expected `env` or `skip`", other),
                    ));
                }
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

#[derive(Default)]
struct ContainerArgs {
    defaults: bool,
}

impl Parse for ContainerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ContainerArgs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;

            match ident.to_string().as_str() {
                "defaults" => args.defaults = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute `{}`, expected `defaults`", other),
                    ));
                }
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

/// Merges every `#[config(...)]` attribute on an item into one argument set.
fn parse_config_attrs<T, F>(attrs: &[Attribute], mut merge: F) -> syn::Result<T>
where
    T: Default + Parse,
    F: FnMut(&mut T, T),
{
    let mut merged = T::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("config")) {
        let parsed = attr.parse_args::<T>()?;
        merge(&mut merged, parsed);
    }
    Ok(merged)
}

/// Derives the configuration descriptor table for a struct with named fields.
///
/// Every field is listed in declaration order with its environment key: the
/// upper-cased field name unless `#[config(env = "KEY")]` overrides it, and
/// never read from the environment when the key is `"-"`. Fields marked
/// `#[config(skip)]` are left out entirely. `#[config(defaults)]` on the
/// struct exposes its `Defaults` implementation to the loader.
#[proc_macro_derive(Configurable, attributes(config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let container = parse_config_attrs::<ContainerArgs, _>(&input.attrs, |acc, next| {
        acc.defaults |= next.defaults;
    })?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Configurable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Configurable can only be derived for structs",
            ));
        }
    };

    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let args = parse_config_attrs::<FieldArgs, _>(&field.attrs, |acc, next| {
            acc.skip |= next.skip;
            if next.env.is_some() {
                acc.env = next.env;
            }
        })?;
        if args.skip {
            continue;
        }

        // PANIC SAFETY: named fields always carry an identifier.
        let ident = field.ident.as_ref().unwrap();
        let field_name = ident.to_string().trim_start_matches("r#").to_string();

        let env_key = match args.env.as_deref() {
            Some(ENV_SENTINEL) => quote! { ::strata::config::EnvKey::Skip },
            Some(key) => quote! { ::strata::config::EnvKey::named(#key) },
            None => {
                let key = field_name.to_uppercase();
                quote! { ::strata::config::EnvKey::named(#key) }
            }
        };

        entries.push(quote! {
            ::strata::config::Field::new(#field_name, #env_key, &mut self.#ident)
        });
    }

    let defaults_fn = if container.defaults {
        quote! {
            fn defaults(&mut self) -> ::std::option::Option<&mut dyn ::strata::config::Defaults> {
                ::std::option::Option::Some(self)
            }
        }
    } else {
        quote! {}
    };

    let expanded = quote! {
        impl #impl_generics ::strata::config::Record for #name #ty_generics #where_clause {
            fn fields(&mut self) -> ::std::vec::Vec<::strata::config::Field<'_>> {
                ::std::vec![#(#entries),*]
            }

            #defaults_fn
        }

        impl #impl_generics ::strata::config::Node for #name #ty_generics #where_clause {
            fn node_mut(&mut self) -> ::strata::config::NodeMut<'_> {
                ::strata::config::NodeMut::Record(self)
            }
        }
    };

    Ok(expanded)
}
