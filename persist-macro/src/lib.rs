use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, Generics, LitInt, LitStr, Type, Visibility,
    parse_macro_input, parse_quote,
};

/// Derive the `Persist` trait, generating a static field table and member
/// dispatch, plus a `Field` impl so the struct can nest inside other
/// persistable objects.
///
/// Public fields are persisted under their identifier. Private fields are
/// persisted only when tagged or marked `include`.
///
/// # Field attributes
///
/// - `#[persist(version = N, name = "...", formerly = "...")]` - one version
///   tag. Repeat the attribute for each version the field changed in.
/// - `#[persist(version = N, removed)]` - the field stops being persisted.
/// - `#[persist(include)]` - persist a private field.
/// - `#[persist(skip)]` - never persist an untagged field.
/// - `#[persist(serde)]` - encode through the field's serde impls.
///
/// # Struct attributes
///
/// - `#[persist(custom)]` - only generate the `Field` impl and leave
///   `Persist` to a hand-written impl.
///
/// Type parameters are bounded by `'static`, and every persisted field's type
/// by `Field` (or serde's traits for `#[persist(serde)]` fields). Lifetime
/// parameters are rejected.
///
/// ```ignore
/// #[derive(Default, Persist)]
/// struct Player {
///     pub name: String,
///     #[persist(version = 1, name = "score")]
///     #[persist(version = 2, name = "points", formerly = "score")]
///     points: u32,
///     #[persist(serde)]
///     pub color: [u8; 4],
/// }
/// ```
#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// One parsed `#[persist(version = ..)]` attribute.
struct Tag {
    version: u32,
    name: Option<String>,
    formerly: Option<String>,
    removed: bool,
}

/// Everything the derive needs to know about one struct field.
struct FieldSpec {
    ident: String,
    access: proc_macro2::TokenStream,
    ty: Type,
    public: bool,
    include: bool,
    skip: bool,
    serde: bool,
    tags: Vec<Tag>,
}

impl FieldSpec {
    /// Mirrors the runtime eligibility rule so dispatch arms are only
    /// generated for fields the selector can ever pick.
    fn has_arm(&self) -> bool {
        let removed = self
            .tags
            .iter()
            .max_by_key(|tag| tag.version)
            .is_some_and(|tag| tag.removed);
        !removed && (!self.tags.is_empty() || ((self.public || self.include) && !self.skip))
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();

    let custom = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => collect_fields(&data.fields)?,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Persist can only be derived for structs",
            ));
        }
    };

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Persist cannot be derived for structs with lifetime parameters",
        ));
    }

    let generics = bounded_generics(&input.generics, &fields, custom);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_impl = quote! {
        impl #impl_generics ::redlilium_persist::Field for #name #ty_generics #where_clause {
            fn encode(
                &self,
                ctx: &mut ::redlilium_persist::SerializeContext<'_>,
            ) -> ::core::result::Result<
                ::core::option::Option<::redlilium_persist::serialize::Value>,
                ::redlilium_persist::SerializeError,
            > {
                ctx.encode_object(self).map(::core::option::Option::Some)
            }

            fn decode<'__doc>(
                &mut self,
                node: &'__doc ::redlilium_persist::serialize::Value,
                ctx: &mut ::redlilium_persist::DeserializeContext<'__doc>,
            ) -> ::core::result::Result<(), ::redlilium_persist::FieldError> {
                ctx.decode_object(node, self)
            }
        }
    };

    if custom {
        return Ok(field_impl);
    }

    let infos = fields.iter().map(|f| {
        let ident = &f.ident;
        let public = f.public;
        let include = f.include;
        let skip = f.skip;
        let tags = f.tags.iter().map(|tag| {
            let version = tag.version;
            let mut tokens = quote! { ::redlilium_persist::FieldTag::new(#version) };
            if let Some(n) = &tag.name {
                tokens = quote! { #tokens.named(#n) };
            }
            if let Some(n) = &tag.formerly {
                tokens = quote! { #tokens.formerly(#n) };
            }
            if tag.removed {
                tokens = quote! { #tokens.removed() };
            }
            tokens
        });
        quote! {
            ::redlilium_persist::FieldInfo {
                ident: #ident,
                public: #public,
                include: #include,
                skip: #skip,
                tags: &[#(#tags),*],
            }
        }
    });

    let with_arms: Vec<_> = fields.iter().filter(|f| f.has_arm()).collect();

    let write_arms = with_arms.iter().map(|f| {
        let ident = &f.ident;
        let access = &f.access;
        if f.serde {
            quote! { #ident => ctx.write_serde(name, &self.#access) }
        } else {
            quote! { #ident => ctx.write(name, &self.#access) }
        }
    });

    let read_arms = with_arms.iter().map(|f| {
        let ident = &f.ident;
        let access = &f.access;
        if f.serde {
            quote! {
                #ident => match ctx.read_serde(name) {
                    ::core::option::Option::Some(value) => {
                        self.#access = value;
                        true
                    }
                    ::core::option::Option::None => false,
                }
            }
        } else {
            quote! { #ident => ctx.read(name, &mut self.#access) }
        }
    });

    Ok(quote! {
        impl #impl_generics ::redlilium_persist::Persist for #name #ty_generics #where_clause {
            const NAME: &'static str = #name_str;

            fn field_table() -> &'static [::redlilium_persist::FieldInfo] {
                const TABLE: &[::redlilium_persist::FieldInfo] = &[#(#infos),*];
                TABLE
            }

            #[allow(unused_variables)]
            fn write_member(
                &self,
                member: &str,
                name: &str,
                ctx: &mut ::redlilium_persist::SerializeContext<'_>,
            ) -> ::core::result::Result<(), ::redlilium_persist::SerializeError> {
                match member {
                    #(#write_arms,)*
                    _ => ::core::result::Result::Ok(()),
                }
            }

            #[allow(unused_variables)]
            fn read_member(
                &mut self,
                member: &str,
                name: &str,
                ctx: &mut ::redlilium_persist::DeserializeContext<'_>,
            ) -> bool {
                match member {
                    #(#read_arms,)*
                    _ => false,
                }
            }
        }

        #field_impl
    })
}

/// Adds the bounds the generated impls rely on.
///
/// A custom struct supplies its own `Persist` impl, so its `Field` impl is
/// bounded on that instead of on the field types.
fn bounded_generics(generics: &Generics, fields: &[FieldSpec], custom: bool) -> Generics {
    let mut generics = generics.clone();
    if generics.type_params().next().is_none() {
        return generics;
    }
    let params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in &params {
        where_clause.predicates.push(parse_quote! { #param: 'static });
    }
    if custom {
        where_clause
            .predicates
            .push(parse_quote! { Self: ::redlilium_persist::Persist });
        return generics;
    }
    for field in fields.iter().filter(|f| f.has_arm()) {
        let ty = &field.ty;
        if field.serde {
            where_clause.predicates.push(parse_quote! {
                #ty: ::redlilium_persist::__private::Serialize
                    + ::redlilium_persist::__private::DeserializeOwned
            });
        } else {
            where_clause
                .predicates
                .push(parse_quote! { #ty: ::redlilium_persist::Field });
        }
    }
    generics
}

/// Returns `true` if the struct is marked `#[persist(custom)]`.
fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut custom = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("persist")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("custom") {
                custom = true;
                Ok(())
            } else {
                Err(meta.error("expected `custom`"))
            }
        })?;
    }
    Ok(custom)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldSpec>> {
    let mut specs = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let (ident, access) = match &field.ident {
            Some(ident) => (ident.to_string(), quote! { #ident }),
            None => {
                let idx = syn::Index::from(i);
                (i.to_string(), quote! { #idx })
            }
        };
        let mut spec = FieldSpec {
            ident,
            access,
            ty: field.ty.clone(),
            public: matches!(field.vis, Visibility::Public(_)),
            include: false,
            skip: false,
            serde: false,
            tags: Vec::new(),
        };
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("persist")) {
            parse_field_attr(attr, &mut spec)?;
        }
        specs.push(spec);
    }
    Ok(specs)
}

/// Parse one `#[persist(...)]` on a field. Flags update `spec`; a `version`
/// key turns the attribute into a tag.
fn parse_field_attr(attr: &Attribute, spec: &mut FieldSpec) -> syn::Result<()> {
    let mut version = None;
    let mut name = None;
    let mut formerly = None;
    let mut removed = false;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("version") {
            let lit: LitInt = meta.value()?.parse()?;
            version = Some(lit.base10_parse::<u32>()?);
        } else if meta.path.is_ident("name") {
            let lit: LitStr = meta.value()?.parse()?;
            name = Some(lit.value());
        } else if meta.path.is_ident("formerly") {
            let lit: LitStr = meta.value()?.parse()?;
            formerly = Some(lit.value());
        } else if meta.path.is_ident("removed") {
            removed = true;
        } else if meta.path.is_ident("include") {
            spec.include = true;
        } else if meta.path.is_ident("skip") {
            spec.skip = true;
        } else if meta.path.is_ident("serde") {
            spec.serde = true;
        } else {
            return Err(meta.error(
                "expected one of: version, name, formerly, removed, include, skip, serde",
            ));
        }
        Ok(())
    })?;

    match version {
        Some(version) => spec.tags.push(Tag {
            version,
            name,
            formerly,
            removed,
        }),
        None if name.is_some() || formerly.is_some() || removed => {
            return Err(syn::Error::new_spanned(
                attr,
                "`name`, `formerly` and `removed` need a `version = N`",
            ));
        }
        None => {}
    }
    Ok(())
}
