//! Derive support for `polytag` contracts.
//!
//! See [`Contract`].

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitInt, LitStr, Path, parse_macro_input};

static CONTRACT_ATTRIBUTE_NAME: &str = "contract";

// -----------------------------------------------------------------------------
// Macros

/// # Contract Derivation
///
/// `#[derive(Contract)]` implements the `polytag` traits for a named-field
/// or unit struct:
///
/// - `Contracted` (type identity + per-call member access)
/// - `Contract` (static type identity)
/// - `GetContract` (the declared contract: member table, parent link,
///   factory, shape)
///
/// Under the `auto_register` feature it also submits an `inventory`
/// registration entry collected by `ContractRegistry::auto_register` and
/// the global host.
///
/// Generic types are not supported; a contract identifies one concrete
/// type.
///
/// ## Container attributes
///
/// ```rust, ignore
/// #[derive(Contract, Default)]
/// #[contract(extends = Shape, default)]
/// struct Circle { radius: f64 }
/// ```
///
/// - `extends = Path`: declares the parent type. The parent must also
///   derive `Contract`; it is registered alongside this type. Members the
///   parent declares and this type re-declares are shadowed by this type's
///   declaration.
/// - `default`: attaches an object factory from the type's `Default`
///   implementation. Without it, the type cannot be a deserialization
///   target.
/// - `abstract_type`: excludes the type from subtype sets; a discriminator
///   naming it is rejected.
/// - `collection`: marks the contract collection-shaped, serialized through
///   the type's own `serde` implementations (which must exist).
/// - `ignore_list`: with `collection`, forces the type down the
///   member-object path instead.
///
/// ## Field attributes
///
/// ```rust, ignore
/// #[derive(Contract, Default)]
/// #[contract(default)]
/// struct Account {
///     #[contract(rename = "accountId", tag = 1)]
///     id: u64,
///     #[contract(readonly)]
///     balance: i64,
///     #[contract(with = "timestamp_secs", tag = 2)]
///     created: std::time::SystemTime,
///     #[contract(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// - `skip`: the field is no contract member at all.
/// - `readonly` / `writeonly`: drop the setter / getter.
/// - `required`: reject incoming objects that omit the member.
/// - `rename = "..."`: explicit wire name, bypassing the naming policy.
/// - `tag = N`: the binary engine's numeric ordinal (defaults to the
///   1-based declaration index).
/// - `with = "module"`: custom codec; `module::serialize` and
///   `module::deserialize` follow the usual serde `with` signatures.
#[proc_macro_derive(Contract, attributes(contract))]
pub fn derive_contract(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

// -----------------------------------------------------------------------------
// Parsed model

#[derive(Default)]
struct ContainerAttrs {
    extends: Option<Path>,
    default_factory: bool,
    abstract_type: bool,
    collection: bool,
    ignore_list: bool,
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    readonly: bool,
    writeonly: bool,
    required: bool,
    rename: Option<String>,
    tag: Option<u32>,
    with: Option<Path>,
}

struct Member {
    ident: syn::Ident,
    ty: syn::Type,
    ordinal: u32,
    attrs: FieldAttrs,
}

fn parse_container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident(CONTRACT_ATTRIBUTE_NAME) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extends") {
                out.extends = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default") {
                out.default_factory = true;
            } else if meta.path.is_ident("abstract_type") {
                out.abstract_type = true;
            } else if meta.path.is_ident("collection") {
                out.collection = true;
            } else if meta.path.is_ident("ignore_list") {
                out.ignore_list = true;
            } else {
                return Err(meta.error("unknown contract container attribute"));
            }
            Ok(())
        })?;
    }
    if out.ignore_list && !out.collection {
        return Err(syn::Error::new_spanned(
            input,
            "`ignore_list` requires `collection`",
        ));
    }
    Ok(out)
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident(CONTRACT_ATTRIBUTE_NAME) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("readonly") {
                out.readonly = true;
            } else if meta.path.is_ident("writeonly") {
                out.writeonly = true;
            } else if meta.path.is_ident("required") {
                out.required = true;
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit.value());
            } else if meta.path.is_ident("tag") {
                let lit: LitInt = meta.value()?.parse()?;
                out.tag = Some(lit.base10_parse()?);
            } else if meta.path.is_ident("with") {
                let lit: LitStr = meta.value()?.parse()?;
                out.with = Some(lit.parse()?);
            } else {
                return Err(meta.error("unknown contract field attribute"));
            }
            Ok(())
        })?;
    }
    if out.readonly && out.writeonly {
        return Err(syn::Error::new_spanned(
            field,
            "a member cannot be both `readonly` and `writeonly`",
        ));
    }
    Ok(out)
}

fn collect_members(input: &DeriveInput) -> syn::Result<Vec<Member>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "tuple structs have no named members to declare a contract for",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "`#[derive(Contract)]` only supports structs; enums serialize through their own serde implementations",
            ));
        }
    };

    let mut members = Vec::new();
    let mut next_ordinal = 1u32;
    for field in fields {
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let ordinal = attrs.tag.unwrap_or(next_ordinal);
        next_ordinal = ordinal + 1;
        members.push(Member {
            ident: field.ident.clone().expect("named field"),
            ty: field.ty.clone(),
            ordinal,
            attrs,
        });
    }
    Ok(members)
}

// -----------------------------------------------------------------------------
// Expansion

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`#[derive(Contract)]` does not support generic types; a contract identifies one concrete type",
        ));
    }

    let container = parse_container_attrs(input)?;
    let members = collect_members(input)?;

    let ident = &input.ident;
    let ident_str = ident.to_string();

    let accessor_defs = members.iter().map(|member| accessor_fns(ident, member));

    let member_ref_arms: Vec<TokenStream2> = members
        .iter()
        .filter(|m| !m.attrs.writeonly)
        .map(|member| {
            let name = member.ident.to_string();
            let get_fn = format_ident!("__contract_get_{}", member.ident);
            quote! { #name => #get_fn(self), }
        })
        .collect();
    let member_ref_body = if member_ref_arms.is_empty() {
        quote! {
            let _ = name;
            ::core::option::Option::None
        }
    } else {
        quote! {
            match name {
                #(#member_ref_arms)*
                _ => ::core::option::Option::None,
            }
        }
    };

    let member_write_arms: Vec<TokenStream2> = members
        .iter()
        .filter(|m| !m.attrs.readonly)
        .map(|member| {
            let name = member.ident.to_string();
            let set_fn = format_ident!("__contract_set_{}", member.ident);
            quote! {
                #name => {
                    #set_fn(self, deserializer)?;
                    ::core::result::Result::Ok(true)
                }
            }
        })
        .collect();
    let member_write_body = if member_write_arms.is_empty() {
        quote! {
            let _ = (name, deserializer);
            ::core::result::Result::Ok(false)
        }
    } else {
        quote! {
            match name {
                #(#member_write_arms)*
                _ => ::core::result::Result::Ok(false),
            }
        }
    };

    let raw_members = members.iter().map(raw_member);

    let extends = container.extends.as_ref().map(|parent| {
        quote! { let contract = contract.extends::<#parent>(); }
    });
    let register_parent = container.extends.as_ref().map(|parent| {
        quote! { registry.register::<#parent>(); }
    });
    let abstract_type = container.abstract_type.then(|| {
        quote! { let contract = contract.abstract_type(); }
    });
    let factory = container.default_factory.then(|| {
        quote! {
            let contract = contract.with_factory(|| {
                ::std::boxed::Box::new(<#ident as ::core::default::Default>::default())
            });
        }
    });
    let collection = container.collection.then(|| {
        let handling = if container.ignore_list {
            quote! { ::polytag::__macro_exports::ListHandling::AsObject }
        } else {
            quote! { ::polytag::__macro_exports::ListHandling::AsList }
        };
        let passthrough = (!container.ignore_list).then(|| {
            quote! {
                let contract = contract.with_passthrough(
                    ::polytag::__macro_exports::PassthroughCodec::of::<#ident>(),
                );
            }
        });
        quote! {
            let contract = contract.collection(#handling);
            #passthrough
        }
    });

    let auto_register = auto_register(ident);

    Ok(quote! {
        const _: () = {
            #(#accessor_defs)*

            impl ::polytag::Contracted for #ident {
                fn ty(&self) -> ::polytag::ContractType {
                    <Self as ::polytag::Contract>::contract_type()
                }

                fn member_ref(
                    &self,
                    name: &str,
                ) -> ::core::option::Option<::polytag::MemberValue<'_>> {
                    #member_ref_body
                }

                fn member_write(
                    &mut self,
                    name: &str,
                    deserializer: &mut dyn ::polytag::__macro_exports::erased_serde::Deserializer,
                ) -> ::core::result::Result<bool, ::polytag::__macro_exports::erased_serde::Error>
                {
                    #member_write_body
                }

                fn as_any(&self) -> &dyn ::core::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                    self
                }

                fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
                    self
                }
            }

            impl ::polytag::Contract for #ident {
                fn contract_type() -> ::polytag::ContractType {
                    ::polytag::ContractType::of::<Self>(
                        ::core::concat!(::core::module_path!(), "::", #ident_str),
                        #ident_str,
                    )
                }
            }

            impl ::polytag::GetContract for #ident {
                fn contract() -> ::polytag::TypeContract {
                    let members = ::std::vec![#(#raw_members),*];
                    let contract = ::polytag::TypeContract::object(
                        <Self as ::polytag::Contract>::contract_type(),
                        members,
                    );
                    #extends
                    #abstract_type
                    #factory
                    #collection
                    contract
                }

                fn register_dependencies(registry: &mut ::polytag::ContractRegistry) {
                    #register_parent
                    let _ = registry;
                }
            }

            #auto_register
        };
    })
}

/// Generates the compiled getter/setter pair for one member.
fn accessor_fns(ident: &syn::Ident, member: &Member) -> TokenStream2 {
    let field = &member.ident;
    let field_ty = &member.ty;
    let ident_str = ident.to_string();
    let get_fn = format_ident!("__contract_get_{}", field);
    let set_fn = format_ident!("__contract_set_{}", field);

    let getter = (!member.attrs.writeonly).then(|| {
        let view = match &member.attrs.with {
            Some(with) => quote! {
                {
                    struct __With<'a>(&'a #field_ty);
                    impl ::polytag::__macro_exports::serde_core::Serialize for __With<'_> {
                        fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
                        where
                            S: ::polytag::__macro_exports::serde_core::Serializer,
                        {
                            #with::serialize(self.0, serializer)
                        }
                    }
                    ::polytag::MemberValue::Boxed(::std::boxed::Box::new(__With(&container.#field)))
                }
            },
            None => quote! {
                ::polytag::MemberValue::Borrowed(&container.#field)
            },
        };
        quote! {
            fn #get_fn(
                value: &dyn ::polytag::Contracted,
            ) -> ::core::option::Option<::polytag::MemberValue<'_>> {
                let container = match value.downcast_ref::<#ident>() {
                    ::core::option::Option::Some(container) => container,
                    ::core::option::Option::None => ::core::panic!(
                        "member accessor type mismatched: expected `{}`, found `{}`",
                        #ident_str,
                        value.ty().path(),
                    ),
                };
                ::core::option::Option::Some(#view)
            }
        }
    });

    let setter = (!member.attrs.readonly).then(|| {
        let assign = match &member.attrs.with {
            Some(with) => quote! { #with::deserialize(deserializer)? },
            None => quote! {
                <#field_ty as ::polytag::__macro_exports::serde_core::Deserialize>::deserialize(
                    deserializer,
                )?
            },
        };
        quote! {
            fn #set_fn(
                value: &mut dyn ::polytag::Contracted,
                deserializer: &mut dyn ::polytag::__macro_exports::erased_serde::Deserializer,
            ) -> ::core::result::Result<(), ::polytag::__macro_exports::erased_serde::Error> {
                let container = match value.downcast_mut::<#ident>() {
                    ::core::option::Option::Some(container) => container,
                    ::core::option::Option::None => ::core::panic!(
                        "member accessor type mismatched: expected `{}`",
                        #ident_str,
                    ),
                };
                container.#field = #assign;
                ::core::result::Result::Ok(())
            }
        }
    });

    quote! {
        #getter
        #setter
    }
}

/// Generates the `RawMember` construction for one member.
fn raw_member(member: &Member) -> TokenStream2 {
    let field = &member.ident;
    let field_ty = &member.ty;
    let name = field.to_string();
    let ordinal = member.ordinal;

    let mut tokens = quote! {
        ::polytag::RawMember::new::<#field_ty>(#name, #ordinal)
    };
    if !member.attrs.writeonly {
        let get_fn = format_ident!("__contract_get_{}", field);
        tokens = quote! { #tokens.with_getter(#get_fn) };
    }
    if !member.attrs.readonly {
        let set_fn = format_ident!("__contract_set_{}", field);
        tokens = quote! { #tokens.with_setter(#set_fn) };
    }
    if let Some(rename) = &member.attrs.rename {
        tokens = quote! { #tokens.with_explicit_name(#rename) };
    }
    if member.attrs.with.is_some() {
        tokens = quote! { #tokens.with_custom_codec() };
    }
    if member.attrs.required {
        tokens = quote! { #tokens.with_required() };
    }
    tokens
}

/// Generates the static registration entry under the `auto_register`
/// feature.
fn auto_register(ident: &syn::Ident) -> TokenStream2 {
    if cfg!(feature = "auto_register") {
        quote! {
            ::polytag::__macro_exports::inventory::submit! {
                ::polytag::__macro_exports::AutoRegistration::of::<#ident>()
            }
        }
    } else {
        TokenStream2::new()
    }
}
