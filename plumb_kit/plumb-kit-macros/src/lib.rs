extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, FnArg, Ident, ItemFn, LitStr,
    ReturnType, Type,
};

/// Pre-generates the adapter for an `async fn` handler.
///
/// The function is left untouched. Next to it the macro emits:
/// 1.  An adapter factory specialized to the function's signature, binding each
///     parameter and writing the results exactly as the runtime adapter would.
/// 2.  An `inventory` submission registering that factory under the function's
///     type, picked up by the adapter cache at startup.
#[proc_macro_attribute]
pub fn handler(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(Span::call_site(), "#[handler] takes no arguments")
            .to_compile_error()
            .into();
    }
    let item = parse_macro_input!(input as ItemFn);
    match expand_handler(&item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_handler(item: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &item.sig;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[handler] functions must be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "#[handler] functions cannot be generic",
        ));
    }

    let mut arg_types = Vec::new();
    for arg in &sig.inputs {
        match arg {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "#[handler] functions cannot take self",
                ))
            }
            FnArg::Typed(pat_type) => {
                if let Type::ImplTrait(_) = &*pat_type.ty {
                    return Err(syn::Error::new_spanned(
                        &pat_type.ty,
                        "#[handler] parameters must be concrete types",
                    ));
                }
                arg_types.push(&*pat_type.ty);
            }
        }
    }

    let fn_name = &sig.ident;
    let name = LitStr::new(&fn_name.to_string(), fn_name.span());
    let output = match &sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };
    let arg_names: Vec<Ident> = (0..arg_types.len())
        .map(|index| format_ident!("__plumb_arg{}", index))
        .collect();
    let indices = 0..arg_types.len();

    Ok(quote! {
        #item

        #[doc(hidden)]
        const _: () = {
            fn __plumb_kit_key() -> ::std::any::TypeId {
                ::plumb_kit::cache::type_key(&#fn_name)
            }

            fn __plumb_kit_adaptor(
                value: &dyn ::std::any::Any,
            ) -> ::plumb_kit::Result<::plumb_kit::Adapter> {
                if ::plumb_kit::cache::downcast_like(value, &#fn_name).is_none() {
                    return ::std::result::Result::Err(::plumb_kit::Error::AdaptorMismatch(#name));
                }
                let signature = ::plumb_kit::Signature::new(
                    ::std::vec![#(<#arg_types as ::plumb_kit::Input>::descriptor()),*],
                    <#output as ::plumb_kit::Outputs>::descriptors(),
                );
                let info = ::std::sync::Arc::new(signature.classify()?);
                ::std::result::Result::Ok(::plumb_kit::adapter::from_fn(
                    info,
                    |info, ctx| -> ::plumb_kit::adapter::BoxFuture<'static, ::plumb_kit::axum::response::Response> {
                        ::std::boxed::Box::pin(async move {
                            let _ = &info;
                            #(
                                let #arg_names = match ::plumb_kit::adapter::bind::<#arg_types>(&info, #indices, &ctx) {
                                    ::std::result::Result::Ok(value) => value,
                                    ::std::result::Result::Err(err) => {
                                        return ::plumb_kit::respond::error_response(ctx.parts(), &err)
                                    }
                                };
                            )*
                            let result = #fn_name(#(#arg_names),*).await;
                            ::plumb_kit::adapter::finish(&ctx, result)
                        })
                    },
                ))
            }

            ::plumb_kit::inventory::submit! {
                ::plumb_kit::cache::GeneratedAdaptor {
                    key: __plumb_kit_key,
                    name: ::std::concat!(::std::module_path!(), "::", #name),
                    factory: __plumb_kit_adaptor,
                }
            }
        };
    })
}

struct ApiDtoArgs {
    rename_all: String,
    extractor: bool,
    responder: bool,
}

/// Turns a struct or enum into a JSON body type.
///
/// Derives `Debug`, `Clone`, `Serialize` and `Deserialize` (camelCase fields
/// unless `rename_all = "..."` says otherwise), a deep-zero `Example`, and the
/// `Dto`, `Input` and `Output` implementations that let the type (or a `Box`
/// of it) be a handler's request or response body. Doc comments become the
/// type's description.
///
/// Pass `extractor` when the type implements `FromRequest` itself and
/// `responder` when it implements `ToResponse`; the corresponding body impls
/// are then left out.
#[proc_macro_attribute]
pub fn api_dto(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut parsed = ApiDtoArgs {
        rename_all: "camelCase".to_string(),
        extractor: false,
        responder: false,
    };
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("rename_all") {
            let value: LitStr = meta.value()?.parse()?;
            parsed.rename_all = value.value();
            Ok(())
        } else if meta.path.is_ident("extractor") {
            parsed.extractor = true;
            Ok(())
        } else if meta.path.is_ident("responder") {
            parsed.responder = true;
            Ok(())
        } else {
            Err(meta.error("unsupported api_dto argument"))
        }
    });
    parse_macro_input!(args with parser);

    let item = parse_macro_input!(input as DeriveInput);
    match expand_api_dto(&item, &parsed) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_api_dto(item: &DeriveInput, args: &ApiDtoArgs) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[api_dto] types cannot be generic",
        ));
    }

    let ident = &item.ident;
    let rename_all = &args.rename_all;
    let example = example_body(item)?;
    let description = parse_doc_comments(&item.attrs);
    let documentation = if description.is_empty() {
        quote! { ::std::option::Option::None }
    } else {
        quote! { ::std::option::Option::Some(#description) }
    };

    let input_impls = if args.extractor {
        quote! {}
    } else {
        quote! {
            impl ::plumb_kit::Input for #ident {
                fn descriptor() -> ::plumb_kit::signature::TypeDescriptor {
                    ::plumb_kit::input::body_descriptor::<Self>(false)
                }

                fn bind(ctx: &::plumb_kit::RequestContext) -> ::plumb_kit::Result<Self> {
                    ::plumb_kit::input::decode_body(ctx)
                }
            }

            impl ::plumb_kit::Input for ::std::boxed::Box<#ident> {
                fn descriptor() -> ::plumb_kit::signature::TypeDescriptor {
                    ::plumb_kit::input::body_descriptor::<#ident>(true)
                }

                fn bind(ctx: &::plumb_kit::RequestContext) -> ::plumb_kit::Result<Self> {
                    ::plumb_kit::input::decode_body::<#ident>(ctx).map(::std::boxed::Box::new)
                }
            }
        }
    };

    let output_impls = if args.responder {
        quote! {}
    } else {
        quote! {
            impl ::plumb_kit::Output for #ident {
                fn descriptor() -> ::plumb_kit::signature::TypeDescriptor {
                    ::plumb_kit::input::body_descriptor::<Self>(false)
                }

                fn emit(
                    self,
                    _res: &mut ::plumb_kit::ResponseWriter,
                    body: &mut ::std::option::Option<::plumb_kit::output::PendingBody>,
                ) -> ::plumb_kit::Result<()> {
                    ::plumb_kit::output::stash_body(self, body);
                    ::std::result::Result::Ok(())
                }
            }

            impl ::plumb_kit::Output for ::std::boxed::Box<#ident> {
                fn descriptor() -> ::plumb_kit::signature::TypeDescriptor {
                    ::plumb_kit::input::body_descriptor::<#ident>(true)
                }

                fn emit(
                    self,
                    _res: &mut ::plumb_kit::ResponseWriter,
                    body: &mut ::std::option::Option<::plumb_kit::output::PendingBody>,
                ) -> ::plumb_kit::Result<()> {
                    ::plumb_kit::output::stash_body(self, body);
                    ::std::result::Result::Ok(())
                }
            }
        }
    };

    Ok(quote! {
        #[derive(Debug, Clone, ::plumb_kit::serde::Serialize, ::plumb_kit::serde::Deserialize)]
        #[serde(crate = "::plumb_kit::serde", rename_all = #rename_all)]
        #item

        impl ::plumb_kit::Example for #ident {
            #[allow(unused_variables)]
            fn example_at(depth: usize) -> Self {
                #example
            }
        }

        impl ::plumb_kit::Dto for #ident {
            fn documentation() -> ::std::option::Option<&'static str> {
                #documentation
            }
        }

        #input_impls
        #output_impls
    })
}

/// Builds the deep-zero constructor: structs field by field, enums through
/// their first variant.
fn example_body(item: &DeriveInput) -> syn::Result<TokenStream2> {
    match &item.data {
        Data::Struct(data) => Ok(construct(quote! { Self }, &data.fields)),
        Data::Enum(data) => match data.variants.first() {
            Some(variant) => {
                let name = &variant.ident;
                Ok(construct(quote! { Self::#name }, &variant.fields))
            }
            None => Err(syn::Error::new_spanned(
                &item.ident,
                "#[api_dto] enums need at least one variant",
            )),
        },
        Data::Union(_) => Err(syn::Error::new_spanned(
            &item.ident,
            "#[api_dto] does not support unions",
        )),
    }
}

fn construct(path: TokenStream2, fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|field| &field.ident);
            quote! {
                #path { #(#names: ::plumb_kit::Example::example_at(depth)),* }
            }
        }
        Fields::Unnamed(unnamed) => {
            let values = unnamed
                .unnamed
                .iter()
                .map(|_| quote! { ::plumb_kit::Example::example_at(depth) });
            quote! { #path(#(#values),*) }
        }
        Fields::Unit => quote! { #path },
    }
}

/// Joins the `///` lines of `attrs`, trimmed, with newlines.
fn parse_doc_comments(attrs: &[Attribute]) -> String {
    let doc_comments: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc") {
                if let syn::Meta::NameValue(nv) = &attr.meta {
                    if let syn::Expr::Lit(expr_lit) = &nv.value {
                        if let syn::Lit::Str(lit) = &expr_lit.lit {
                            return Some(lit.value().trim().to_string());
                        }
                    }
                }
            }
            None
        })
        .collect();

    doc_comments.join("\n").trim().to_string()
}
