//! The `#[processor]` attribute.
//!
//! Placed on the inherent `impl` block of a configuration struct, it checks
//! the transform's signature and generates the `Processor` implementation
//! that layers call-time overrides over the struct's fields before calling
//! the transform.

use crate::signature::{self, TransformKind};
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    Ident, ItemImpl, LitStr, Path, Token,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for the `#[processor]` macro.
pub(crate) struct ProcessorArgs {
    /// Rendered name; defaults to the type name.
    pub name: Option<LitStr>,
    /// Path of the crate exporting `Processor`.
    pub krate: Option<Path>,
    /// Submit the processor to the link-time registry.
    pub register: bool,
}

impl Parse for ProcessorArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut krate = None;
        let mut register = false;

        while !input.is_empty() {
            let ident = Ident::parse_any(input)?;

            match ident.to_string().as_str() {
                "register" => {
                    register = true;
                }
                "name" => {
                    input.parse::<Token![=]>()?;
                    name = Some(input.parse()?);
                }
                "crate" => {
                    input.parse::<Token![=]>()?;
                    krate = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ProcessorArgs {
            name,
            krate,
            register,
        })
    }
}

/// Implementation of the `#[processor]` macro.
pub fn processor_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ProcessorArgs);
    let input = parse_macro_input!(item as ItemImpl);

    match expand(&args, &input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => {
            // Keep the user's impl so unrelated code still type-checks.
            let compile_error = err.to_compile_error();
            TokenStream::from(quote! {
                #input
                #compile_error
            })
        }
    }
}

fn expand(args: &ProcessorArgs, input: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    let self_ident = signature::self_ident(input)?;
    let transform = signature::find_transform(input, self_ident)?;

    let krate = args
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::itemproc));
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| LitStr::new(&self_ident.to_string(), self_ident.span()));
    let self_ty = &input.self_ty;
    let value_ty = &transform.value_ty;

    let method = Ident::new(transform.kind.method(), Span::call_site());
    let call = if transform.fallible {
        quote! {
            Self::#method(__value, __context).map_err(#krate::TransformError::from)
        }
    } else {
        quote! {
            ::core::result::Result::Ok::<_, #krate::TransformError>(Self::#method(__value, __context))
        }
    };
    let (invoke, kind) = match transform.kind {
        TransformKind::PerValue => (quote! { each }, quote! { PerValue }),
        TransformKind::Bulk => (quote! { bulk }, quote! { Bulk }),
    };

    let registration = args.register.then(|| {
        quote! {
            const _: () = {
                fn __default_context() -> ::core::result::Result<#krate::Context, #krate::DefinitionError> {
                    #krate::Processor::default_context(
                        &<#self_ty as ::core::default::Default>::default(),
                    )
                }

                #krate::__private::inventory::submit! {
                    #krate::registry::ProcessorDefinition {
                        name: #name,
                        transform: #krate::registry::TransformKind::#kind,
                        default_context: __default_context,
                    }
                }
            };
        }
    });

    Ok(quote! {
        #input

        impl #krate::Processor for #self_ty {
            fn name(&self) -> &str {
                #name
            }

            fn default_context(&self) -> ::core::result::Result<#krate::Context, #krate::DefinitionError> {
                #krate::Context::from_config(#name, self)
            }

            fn process(
                &self,
                values: #krate::__private::serde_json::Value,
                overrides: &#krate::Context,
            ) -> ::core::result::Result<#krate::__private::serde_json::Value, #krate::ProcessError> {
                #krate::invoke::#invoke(self, values, overrides, |__value: #value_ty, __context: &Self| {
                    #call
                })
            }
        }

        #registration
    })
}
