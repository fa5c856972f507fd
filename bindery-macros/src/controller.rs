//! `#[controller]` attribute.

use bindery_core::{DeclarationError, validate};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// `#[on("event", "selector")]`
struct OnArgs {
    event: LitStr,
    selector: LitStr,
}

impl Parse for OnArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let event: LitStr = input.parse()?;
        input.parse::<Token![,]>()?;
        let selector: LitStr = input.parse()?;
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }
        if !input.is_empty() {
            return Err(input.error("expected `#[on(\"event\", \"selector\")]`"));
        }
        Ok(OnArgs { event, selector })
    }
}

/// `#[arg("a", "b")]` or `#[arg(ModelType)]`
enum ArgSource {
    Path(Vec<LitStr>),
    Model(Type),
}

impl Parse for ArgSource {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            let path = Punctuated::<LitStr, Token![,]>::parse_terminated(input)?;
            return Ok(ArgSource::Path(path.into_iter().collect()));
        }
        let ty: Type = input.parse()?;
        if !input.is_empty() {
            return Err(input.error("expected a single model type"));
        }
        Ok(ArgSource::Model(ty))
    }
}

impl ArgSource {
    fn descriptor(&self) -> TokenStream2 {
        match self {
            ArgSource::Path(path) => quote! { ::bindery::ArgDescriptor::path([#(#path),*]) },
            ArgSource::Model(ty) => quote! { ::bindery::ArgDescriptor::model::<#ty>() },
        }
    }
}

fn is_attr(attr: &Attribute, name: &str) -> bool {
    attr.path().is_ident(name)
}

/// Check the trigger the same way the registry will at run time.
fn check_trigger(on: &OnArgs) -> syn::Result<()> {
    match validate(&on.event.value(), &on.selector.value()) {
        Ok(_) => Ok(()),
        Err(err @ (DeclarationError::InvalidModelEvent(_) | DeclarationError::MissingEvent(_))) => {
            Err(syn::Error::new(on.event.span(), err.to_string()))
        }
        Err(err) => Err(syn::Error::new(on.selector.span(), err.to_string())),
    }
}

/// Strip the binding attributes off `method` and emit its declarations.
fn declare_method(method: &mut ImplItemFn) -> syn::Result<Vec<TokenStream2>> {
    let mut triggers = Vec::new();
    let mut rest = Vec::new();
    for attr in method.attrs.drain(..) {
        if is_attr(&attr, "on") {
            triggers.push(attr.parse_args::<OnArgs>()?);
        } else {
            rest.push(attr);
        }
    }
    method.attrs = rest;

    let mut sources = Vec::new();
    let mut types = Vec::new();
    for input in method.sig.inputs.iter_mut() {
        let FnArg::Typed(param) = input else {
            continue;
        };
        let position = param.attrs.iter().position(|a| is_attr(a, "arg"));
        let Some(position) = position else {
            if triggers.is_empty() {
                continue;
            }
            return Err(syn::Error::new_spanned(
                &param.pat,
                "handler parameters need `#[arg(\"path\", ..)]` or `#[arg(ModelType)]`",
            ));
        };
        let attr = param.attrs.remove(position);
        if triggers.is_empty() {
            return Err(syn::Error::new_spanned(
                attr,
                "`#[arg]` is only allowed on `#[on(..)]` handlers",
            ));
        }
        let source = attr.parse_args::<ArgSource>()?;
        if matches!(&source, ArgSource::Path(path) if path.is_empty()) {
            return Err(syn::Error::new_spanned(attr, "`#[arg]` needs at least one property name"));
        }
        sources.push(source);
        types.push((*param.ty).clone());
    }

    if triggers.is_empty() {
        return Ok(Vec::new());
    }

    match method.sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        Some(receiver) => {
            return Err(syn::Error::new_spanned(receiver, "handlers take `&self`"));
        }
        None => {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                "handlers are methods taking `&self`",
            ));
        }
    }

    let method_name = &method.sig.ident;
    let name = LitStr::new(&method_name.to_string(), method_name.span());
    let args: Vec<_> = (0..types.len()).map(|i| format_ident!("__arg{}", i)).collect();
    let descriptors: Vec<_> = sources.iter().map(ArgSource::descriptor).collect();

    let mut declarations = Vec::new();
    for on in &triggers {
        check_trigger(on)?;
        let OnArgs { event, selector } = on;
        declarations.push(quote! {
            declarations
                .on(#event, #selector)
                .named(#name)
                #(.arg(#descriptors))*
                .call(|this: &Self, (#(#args,)*): (#(#types,)*)| Self::#method_name(this, #(#args),*));
        });
    }
    Ok(declarations)
}

fn expand(input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] goes on an inherent impl block",
        ));
    }

    let mut declarations = Vec::new();
    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            declarations.extend(declare_method(method)?);
        }
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::bindery::Bindings for #self_ty #where_clause {
            fn declare(declarations: &mut ::bindery::Declarations<Self>) {
                let _ = &declarations;
                #(#declarations)*
            }
        }
    })
}

/// Implementation of the `#[controller]` macro.
pub(crate) fn controller_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[controller] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as ItemImpl);
    match expand(&mut input) {
        Ok(bindings) => quote! {
            #input
            #bindings
        }
        .into(),
        Err(err) => {
            let errors = err.to_compile_error();
            quote! {
                #input
                #errors
            }
            .into()
        }
    }
}
