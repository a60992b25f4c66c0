use crate::attributes::{FieldAttributes, InjectableAttributes};
use itertools::Itertools;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, GenericArgument, Index, LitStr,
    Member, PathArguments, Result, Type,
};

const INJECT: &str = "inject";

const SCALARS: &[&str] = &[
    "bool", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "String", "Complex", "Complex32", "Complex64",
];

const CONTAINERS: &[&str] = &[
    "Vec",
    "VecDeque",
    "LinkedList",
    "BinaryHeap",
    "HashMap",
    "HashSet",
    "BTreeMap",
    "BTreeSet",
    "FxHashMap",
    "FxHashSet",
];

const POINTERS: &[&str] = &["Arc", "InstancePtr"];

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
enum FieldShape {
    Scalar,
    Capability,
    OwnedRef,
    Composite,
    Container,
}

fn strip_groups(ty: &Type) -> &Type {
    match ty {
        Type::Group(group) => strip_groups(&group.elem),
        Type::Paren(paren) => strip_groups(&paren.elem),
        _ => ty,
    }
}

/// Returns the last path segment name and its single generic type argument, if any.
fn split_path(ty: &Type) -> Option<(String, Option<&Type>)> {
    let Type::Path(path) = strip_groups(ty) else {
        return None;
    };

    let segment = path.path.segments.last()?;
    let argument = match &segment.arguments {
        PathArguments::AngleBracketed(arguments) => {
            arguments.args.iter().find_map(|argument| match argument {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
        }
        _ => None,
    };

    Some((segment.ident.to_string(), argument))
}

/// Returns `T` for `Option<Arc<T>>` and `Option<InstancePtr<T>>`.
fn reference_target(ty: &Type) -> Option<&Type> {
    match split_path(ty)? {
        (name, Some(argument)) if name == "Option" => match split_path(argument)? {
            (pointer, target) if POINTERS.contains(&pointer.as_str()) => target,
            _ => None,
        },
        _ => None,
    }
}

fn detect_shape(ty: &Type) -> FieldShape {
    match strip_groups(ty) {
        Type::Array(_) | Type::Tuple(_) => return FieldShape::Container,
        _ => {}
    }

    let Some((name, _)) = split_path(ty) else {
        return FieldShape::Composite;
    };

    if name == "Option" {
        return match reference_target(ty) {
            Some(target) if matches!(strip_groups(target), Type::TraitObject(_)) => {
                FieldShape::Capability
            }
            Some(_) => FieldShape::OwnedRef,
            None => FieldShape::Container,
        };
    }

    if CONTAINERS.contains(&name.as_str()) {
        FieldShape::Container
    } else if SCALARS.contains(&name.as_str()) {
        FieldShape::Scalar
    } else {
        FieldShape::Composite
    }
}

fn find_attribute<'a>(attributes: &'a [Attribute]) -> Option<&'a Attribute> {
    attributes
        .iter()
        .find(|attribute| attribute.path().is_ident(INJECT))
}

/// References to non-injectable types and values which turn out to be scalars (e.g. behind a type
/// alias) can only be told apart by trait bounds, so the choice is deferred to method resolution.
fn generate_kind(owner: &syn::Ident, ty: &Type, accessor: &syn::Ident) -> TokenStream {
    match (detect_shape(ty), reference_target(ty)) {
        (FieldShape::Scalar, _) => quote!(wicket_di::schema::FieldKind::scalar(#accessor)),
        (FieldShape::Capability, _) => {
            quote!(wicket_di::schema::FieldKind::capability(#accessor))
        }
        (FieldShape::OwnedRef, Some(target)) => quote! {
            {
                use wicket_di::schema::{SelectOwned as _, SelectShared as _};
                (&wicket_di::schema::ReferenceSelector::<#owner, #target>::new(#accessor)).select()
            }
        },
        (FieldShape::Container, _) => quote!(wicket_di::schema::FieldKind::container(#accessor)),
        (FieldShape::Composite | FieldShape::OwnedRef, _) => quote! {
            {
                use wicket_di::schema::{SelectComposite as _, SelectScalar as _};
                (&wicket_di::schema::ValueSelector::<#owner, #ty>::new(#accessor)).select()
            }
        },
    }
}

fn generate_field(
    owner: &syn::Ident,
    index: usize,
    field: &Field,
    annotation: &LitStr,
) -> (TokenStream, TokenStream) {
    let (member, name) = match &field.ident {
        Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
        None => (
            Member::Unnamed(Index {
                index: index as u32,
                span: field.span(),
            }),
            index.to_string(),
        ),
    };

    let ty = &field.ty;
    let accessor = format_ident!("__inject_field_{}", index);
    let kind = generate_kind(owner, ty, &accessor);
    let name = LitStr::new(&name, Span::call_site());

    (
        quote! {
            fn #accessor(target: &mut #owner) -> &mut #ty {
                &mut target.#member
            }
        },
        quote! {
            .field(#name, #annotation, #kind)
        },
    )
}

pub fn expand_injectable(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(
            input.span(),
            "Can only derive Injectable on structs!",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Cannot derive Injectable for generic types!",
        ));
    }

    let ident = &input.ident;
    let init = find_attribute(&input.attrs)
        .map(InjectableAttributes::try_from)
        .transpose()?
        .map(|attributes| attributes.init)
        .unwrap_or_default();

    let fields: Vec<&Field> = match fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unnamed(fields) => fields.unnamed.iter().collect(),
        Fields::Unit => vec![],
    };

    let (accessors, fields): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .enumerate()
        .filter_map(|(index, field)| {
            find_attribute(&field.attrs).map(|attribute| {
                FieldAttributes::try_from(attribute)
                    .map(|attributes| generate_field(ident, index, field, &attributes.annotation))
            })
        })
        .try_collect::<_, Vec<_>, _>()?
        .into_iter()
        .unzip();

    let init = init.then(|| quote!(.with_init()));

    Ok(quote! {
        #[automatically_derived]
        impl wicket_di::component::Injectable for #ident {
            fn schema() -> Result<
                Option<&'static wicket_di::schema::Schema<Self>>,
                wicket_di::error::InjectError,
            > {
                #(#accessors)*

                static SCHEMA: std::sync::OnceLock<
                    Result<wicket_di::schema::Schema<#ident>, wicket_di::error::InjectError>,
                > = std::sync::OnceLock::new();

                SCHEMA
                    .get_or_init(|| {
                        wicket_di::schema::SchemaBuilder::<#ident>::new()
                            #(#fields)*
                            #init
                            .build()
                    })
                    .as_ref()
                    .map(Some)
                    .map_err(Clone::clone)
            }
        }
    })
}
