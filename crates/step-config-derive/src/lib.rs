//! # Builder Derive
//!
//! `#[derive(With)]` generates chainable builders for configuration structs.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, GenericArgument, PathArguments, Type, parse_macro_input,
    spanned::Spanned,
};

/// Derive to generate, for each **named** field `x: T`:
///
/// - `fn with_x(self, value: T) -> Self`
/// - `fn set_x(&mut self, value: T) -> &mut Self`
///
/// Field options:
/// - `#[with(skip)]`: no builders for this field.
/// - `#[with(into)]`: take `impl Into<T>` instead of `T`.
/// - `#[with(strip_option)]`: for `x: Option<U>`, take `U` and store `Some`.
///
/// # Example
///
/// ```
/// use step_config_derive::With;
///
/// #[derive(Default, With)]
/// struct Options {
///     #[with(into)]
///     name: String,
///     #[with(strip_option)]
///     width: Option<u8>,
///     #[with(skip)]
///     _cache: (),
/// }
///
/// let mut o = Options::default().with_name("mem").with_width(46);
/// o.set_width(39);
/// assert_eq!(o.name, "mem");
/// assert_eq!(o.width, Some(39));
/// ```
#[proc_macro_derive(With, attributes(with))]
pub fn derive_with(input: TokenStream) -> TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input as DeriveInput);

    let fields = match data {
        Data::Struct(s) => match s.fields {
            Fields::Named(n) => n.named,
            other => {
                return syn::Error::new(other.span(), "With only supports named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(ident.span(), "With can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut methods = Vec::new();
    for field in fields {
        let Some(fname) = &field.ident else { continue };
        let options = match FieldOptions::parse(&field.attrs) {
            Ok(options) => options,
            Err(e) => return e.to_compile_error().into(),
        };
        if options.skip {
            continue;
        }

        let ty = &field.ty;
        let (arg_ty, store) = if options.strip_option {
            let Some(inner) = option_inner(ty) else {
                return syn::Error::new(ty.span(), "strip_option requires an Option<T> field")
                    .to_compile_error()
                    .into();
            };
            if options.into {
                (quote! { impl Into<#inner> }, quote! { Some(value.into()) })
            } else {
                (quote! { #inner }, quote! { Some(value) })
            }
        } else if options.into {
            (quote! { impl Into<#ty> }, quote! { value.into() })
        } else {
            (quote! { #ty }, quote! { value })
        };

        let set_name = format_ident!("set_{}", fname);
        let with_name = format_ident!("with_{}", fname);
        let doc = format!("Replace `{fname}`.");

        methods.push(quote! {
            #[doc = #doc]
            #[inline]
            pub fn #set_name(&mut self, value: #arg_ty) -> &mut Self {
                self.#fname = #store;
                self
            }

            #[doc = #doc]
            #[inline]
            #[must_use]
            pub fn #with_name(mut self, value: #arg_ty) -> Self {
                self.#fname = #store;
                self
            }
        });
    }

    let expanded = quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#methods)*
        }
    };

    TokenStream::from(expanded)
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    into: bool,
    strip_option: bool,
}

impl FieldOptions {
    fn parse(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("with")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                } else if meta.path.is_ident("into") {
                    options.into = true;
                } else if meta.path.is_ident("strip_option") {
                    options.strip_option = true;
                } else {
                    return Err(meta.error("expected `skip`, `into` or `strip_option`"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// `U` for a field typed `Option<U>` (also `std::option::Option<U>`).
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
