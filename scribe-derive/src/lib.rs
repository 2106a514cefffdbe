//! # Scribe Derive Macros
//!
//! Provides `#[derive(ScribeObject)]`, which implements `scribe::ScribeValue`:
//!
//! - structs with named fields become user-defined types registered in the
//!   header under the struct's name (or `#[scribe(name = "...")]`), one field
//!   per struct field (renamed with `#[scribe(rename = "...")]`). Generic
//!   structs append their arguments, e.g. `Labeled<f8>`;
//! - tuple structs become anonymous tuples `(t1,t2,...)`;
//! - unit structs become `null`;
//! - enums become unions. A unit variant is `null`, a one-field variant is its
//!   field's type, and any other variant is the tuple of its fields. An enum
//!   that contains itself is written with the `^` self-reference.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Fields, GenericParam, Generics, LitStr, Type,
    parse_macro_input, parse_quote,
};

/// Unions store their discriminant in one byte.
const MAX_VARIANTS: usize = 256;

/// Derives `ScribeValue`.
#[proc_macro_derive(ScribeObject, attributes(scribe))]
pub fn derive_scribe_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let container_name = parse_container_attributes(&input.attrs)?;
    let generics = add_trait_bounds(input.generics.clone());
    let ident = &input.ident;

    let body = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(_) => {
                let fields = collect_fields(&ds.fields)?;
                let name = container_name.unwrap_or_else(|| ident.to_string());
                generate_user_type(&name, &generic_arguments(&input.generics), &fields)
            }
            Fields::Unnamed(_) => {
                reject_container_name(container_name.as_ref(), ident)?;
                let fields = collect_fields(&ds.fields)?;
                generate_tuple(&fields)
            }
            Fields::Unit => {
                reject_container_name(container_name.as_ref(), ident)?;
                generate_unit()
            }
        },
        Data::Enum(de) => {
            reject_container_name(container_name.as_ref(), ident)?;
            generate_union(de)?
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                ident.span(),
                "ScribeObject does not support untagged unions",
            ));
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics scribe::ScribeValue for #ident #ty_generics #where_clause {
            #body
        }
    })
}

// --- Internal Data Structures ---

struct FieldInfo {
    /// `self.x` or `self.0`.
    access: proc_macro2::TokenStream,
    /// Name stored in the type definition.
    name: String,
    ty: Type,
}

/// Parses container attributes. Returns the explicit type name, if any.
fn parse_container_attributes(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs {
        if attr.path().is_ident("scribe") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    name = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown scribe attribute key. Supported on types: name"))
            })?;
        }
    }
    Ok(name)
}

/// Parses field attributes. Returns the rename, if any.
fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs {
        if attr.path().is_ident("scribe") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let s: LitStr = meta.value()?.parse()?;
                    rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown scribe attribute key. Supported on fields: rename"))
            })?;
        }
    }
    Ok(rename)
}

fn reject_container_name(name: Option<&String>, ident: &syn::Ident) -> syn::Result<()> {
    match name {
        Some(_) => Err(syn::Error::new(
            ident.span(),
            "#[scribe(name)] only applies to structs with named fields",
        )),
        None => Ok(()),
    }
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldInfo>> {
    let mut out = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let rename = parse_field_attributes(&field.attrs)?;
        let (access, default_name) = match &field.ident {
            Some(ident) => (quote! { self.#ident }, ident.to_string()),
            None => {
                if rename.is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "#[scribe(rename)] only applies to named fields",
                    ));
                }
                let index = syn::Index::from(i);
                (quote! { self.#index }, i.to_string())
            }
        };
        out.push(FieldInfo {
            access,
            name: rename.unwrap_or(default_name),
            ty: field.ty.clone(),
        });
    }
    Ok(out)
}

/// Every type parameter must itself be a `ScribeValue`.
fn add_trait_bounds(mut generics: Generics) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param.bounds.push(parse_quote!(scribe::ScribeValue));
        }
    }
    generics
}

/// Expressions naming each type and const parameter, in declaration order.
fn generic_arguments(generics: &Generics) -> Vec<proc_macro2::TokenStream> {
    generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(t) => {
                let ident = &t.ident;
                Some(quote! { <#ident as scribe::ScribeValue>::type_name() })
            }
            GenericParam::Const(c) => {
                let ident = &c.ident;
                Some(quote! { #ident.to_string() })
            }
            GenericParam::Lifetime(_) => None,
        })
        .collect()
}

// --- Generator: user-defined types ---

fn generate_user_type(
    name: &str,
    args: &[proc_macro2::TokenStream],
    fields: &[FieldInfo],
) -> proc_macro2::TokenStream {
    let writes = fields.iter().map(|f| {
        let access = &f.access;
        quote! { scribe::ScribeValue::write_value(&#access, out)?; }
    });
    let defs = fields.iter().map(|f| {
        let ty = &f.ty;
        let fname = &f.name;
        quote! { (<#ty as scribe::ScribeValue>::type_name(), #fname) }
    });
    let nested = fields.iter().map(|f| {
        let ty = &f.ty;
        quote! { <#ty as scribe::ScribeValue>::register_types(types)?; }
    });

    quote! {
        fn type_name() -> String {
            scribe::rt::generic_name(#name, &[#(#args),*])
        }

        fn write_value(&self, out: &mut Vec<u8>) -> scribe::Result<()> {
            #(#writes)*
            Ok(())
        }

        fn register_types(types: &mut scribe::TypeDict) -> scribe::Result<()> {
            let name = <Self as scribe::ScribeValue>::type_name();
            let fields = vec![#(#defs),*];
            if scribe::rt::register_user_type(types, &name, fields)? {
                #(#nested)*
            }
            Ok(())
        }
    }
}

// --- Generator: tuples ---

fn generate_tuple(fields: &[FieldInfo]) -> proc_macro2::TokenStream {
    let names = fields.iter().map(|f| {
        let ty = &f.ty;
        quote! { <#ty as scribe::ScribeValue>::type_name() }
    });
    let writes = fields.iter().map(|f| {
        let access = &f.access;
        quote! { scribe::ScribeValue::write_value(&#access, out)?; }
    });
    let nested = fields.iter().map(|f| {
        let ty = &f.ty;
        quote! { <#ty as scribe::ScribeValue>::register_types(types)?; }
    });

    quote! {
        fn type_name() -> String {
            scribe::rt::tuple_name(&[#(#names),*])
        }

        fn write_value(&self, out: &mut Vec<u8>) -> scribe::Result<()> {
            #(#writes)*
            Ok(())
        }

        fn register_types(types: &mut scribe::TypeDict) -> scribe::Result<()> {
            #(#nested)*
            Ok(())
        }
    }
}

fn generate_unit() -> proc_macro2::TokenStream {
    quote! {
        fn type_name() -> String {
            scribe::constants::NULL_TYPE.to_owned()
        }

        fn write_value(&self, _out: &mut Vec<u8>) -> scribe::Result<()> {
            Ok(())
        }
    }
}

// --- Generator: unions ---

fn generate_union(data: &DataEnum) -> syn::Result<proc_macro2::TokenStream> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &data.variants,
            "ScribeObject needs at least one enum variant",
        ));
    }
    if data.variants.len() > MAX_VARIANTS {
        return Err(syn::Error::new_spanned(
            &data.variants,
            format!("a union has at most {MAX_VARIANTS} alternatives"),
        ));
    }

    let mut alternatives = Vec::new();
    let mut arms = Vec::new();
    let mut nested = Vec::new();

    for (index, variant) in data.variants.iter().enumerate() {
        let vident = &variant.ident;
        for field in &variant.fields {
            if parse_field_attributes(&field.attrs)?.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "#[scribe(rename)] has no effect on enum variant fields",
                ));
            }
        }
        let types: Vec<&Type> = variant.fields.iter().map(|f| &f.ty).collect();
        let bindings: Vec<syn::Ident> = (0..types.len())
            .map(|i| quote::format_ident!("__field{}", i))
            .collect();

        alternatives.push(match types.as_slice() {
            [] => quote! { scribe::constants::NULL_TYPE.to_owned() },
            [ty] => quote! { <#ty as scribe::ScribeValue>::type_name() },
            many => quote! {
                scribe::rt::tuple_name(&[#(<#many as scribe::ScribeValue>::type_name()),*])
            },
        });

        let pattern = match &variant.fields {
            Fields::Unit => quote! { Self::#vident },
            Fields::Unnamed(_) => quote! { Self::#vident(#(#bindings),*) },
            Fields::Named(named) => {
                let idents = named.named.iter().filter_map(|f| f.ident.as_ref());
                quote! { Self::#vident { #(#idents: #bindings),* } }
            }
        };
        arms.push(quote! {
            #pattern => {
                scribe::codec::write_union_index(out, #index)?;
                #(scribe::ScribeValue::write_value(#bindings, out)?;)*
            }
        });

        nested.extend(types.iter().map(|ty| {
            quote! { <#ty as scribe::ScribeValue>::register_types(types)?; }
        }));
    }

    Ok(quote! {
        fn type_name() -> String {
            scribe::rt::union_name(Some(::std::any::type_name::<Self>()), || {
                vec![#(#alternatives),*]
            })
        }

        fn write_value(&self, out: &mut Vec<u8>) -> scribe::Result<()> {
            match self {
                #(#arms)*
            }
            Ok(())
        }

        fn register_types(types: &mut scribe::TypeDict) -> scribe::Result<()> {
            scribe::rt::register_once(::std::any::type_name::<Self>(), || {
                #(#nested)*
                Ok(())
            })
        }
    })
}
