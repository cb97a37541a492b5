// vim: tw=80
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse2, parse_quote,
    spanned::Spanned,
    Error, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, Lifetime,
    Member, Pat, PatIdent, Path, PathArguments, ReturnType, Token, Type,
    TypeParamBound
};

/// mockable attributes
pub(crate) struct Attrs {
    /// The field holding the type's `Seam`
    seam: Member,
}

impl Default for Attrs {
    fn default() -> Self {
        Attrs {
            seam: Member::Named(format_ident!("seam"))
        }
    }
}

impl Parse for Attrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(Attrs::default());
        }
        let key: syn::Ident = input.parse()?;
        if key != "seam" {
            return Err(Error::new(key.span(),
                "Unknown #[mockable] argument.  Expected `seam = field`"));
        }
        input.parse::<Token![=]>()?;
        let seam: Member = input.parse()?;
        Ok(Attrs { seam })
    }
}

pub(crate) fn do_mockable(attrs: TokenStream, input: TokenStream)
    -> TokenStream
{
    let attrs: Attrs = match parse2(attrs) {
        Ok(attrs) => attrs,
        Err(e) => return e.to_compile_error()
    };
    let item: ItemImpl = match parse2(input) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error()
    };
    mockable_impl(&attrs, item).unwrap_or_else(|e| e.to_compile_error())
}

fn mockable_impl(attrs: &Attrs, mut item: ItemImpl)
    -> syn::Result<TokenStream>
{
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new(path.span(),
            "#[mockable] only applies to inherent impl blocks"));
    }
    let mut consts = Vec::new();
    let mut names = Vec::new();
    for impl_item in item.items.iter_mut() {
        if let ImplItem::Fn(method) = impl_item {
            if take_skip(method)? || method.sig.receiver().is_none() {
                continue;
            }
            let name = method.sig.ident.unraw().to_string();
            consts.push(reroute(method, &name)?);
            names.push(name);
        }
    }
    let mut items = consts;
    items.append(&mut item.items);
    item.items = items;

    let seam = &attrs.seam;
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    Ok(quote!(
        #item
        impl #impl_generics ::standin::Mockable for #self_ty #where_clause {
            const OPERATIONS: &'static [&'static str] = &[#(#names),*];
            fn seam(&self) -> &::standin::Seam {
                &self.#seam
            }
        }
    ))
}

/// Strip any `#[standin(skip)]` attribute, reporting whether there was one.
fn take_skip(method: &mut ImplItemFn) -> syn::Result<bool> {
    let mut skip = false;
    let mut err = None;
    method.attrs.retain(|attr| {
        if !attr.path().is_ident("standin") {
            return true;
        }
        let r = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("Unknown standin attribute.  Expected `skip`"))
            }
        });
        if let Err(e) = r {
            err = Some(e);
        }
        false
    });
    match err {
        Some(e) => Err(e),
        None => Ok(skip)
    }
}

/// Reroute a method through a new `Operation` constant, and return that
/// constant.
fn reroute(method: &mut ImplItemFn, name: &str) -> syn::Result<ImplItem> {
    let sig = &method.sig;
    if let Some(t) = &sig.asyncness {
        return Err(Error::new(t.span(),
            "#[mockable] does not support async methods"));
    }
    if let Some(t) = &sig.constness {
        return Err(Error::new(t.span(),
            "#[mockable] does not support const methods"));
    }
    if let Some(t) = &sig.unsafety {
        return Err(Error::new(t.span(),
            "#[mockable] does not support unsafe methods"));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new(sig.generics.span(),
            "#[mockable] does not support generic methods"));
    }

    let mut pats = Vec::new();
    let mut idents = Vec::new();
    let mut types = Vec::new();
    for fn_arg in method.sig.inputs.iter_mut() {
        if let FnArg::Typed(pt) = fn_arg {
            check_type(&pt.ty)?;
            let ident = format_ident!("__standin_arg{}", idents.len());
            let placeholder = Pat::Ident(PatIdent {
                attrs: Vec::new(),
                by_ref: None,
                mutability: None,
                ident: ident.clone(),
                subpat: None
            });
            pats.push(std::mem::replace(pt.pat.as_mut(), placeholder));
            types.push(pt.ty.as_ref().clone());
            idents.push(ident);
        }
    }
    let output: Type = match &method.sig.output {
        ReturnType::Default => parse_quote!(()),
        ReturnType::Type(_, ty) => {
            check_type(ty)?;
            ty.as_ref().clone()
        }
    };

    let const_ident = format_ident!("{}", name.to_uppercase(),
                                    span = method.sig.ident.span());
    let vis = &method.vis;
    let constant: ImplItem = parse_quote!(
        #vis const #const_ident:
            ::standin::Operation<Self, (#(#types,)*), #output> =
            ::standin::Operation::new(#name);
    );

    let block = &method.block;
    method.block = parse_quote!({
        Self::#const_ident.call_via(
            <Self as ::standin::Mockable>::seam(&self).route(),
            (#(#idents,)*),
            |(#(#pats,)*)| #block
        )
    });
    Ok(constant)
}

fn unsupported(span: Span, what: &str) -> Error {
    Error::new(span, format!("#[mockable] does not support {}", what))
}

fn check_lifetime(lt: &Lifetime) -> syn::Result<()> {
    if lt.ident == "static" {
        Ok(())
    } else {
        Err(unsupported(lt.span(), "non-'static lifetimes"))
    }
}

fn check_path(path: &Path) -> syn::Result<()> {
    for seg in path.segments.iter() {
        if let PathArguments::AngleBracketed(abga) = &seg.arguments {
            for arg in abga.args.iter() {
                match arg {
                    GenericArgument::Lifetime(lt) => check_lifetime(lt)?,
                    GenericArgument::Type(ty) => check_type(ty)?,
                    GenericArgument::AssocType(at) => check_type(&at.ty)?,
                    _ => ()
                }
            }
        }
    }
    Ok(())
}

/// Operation argument and return types must be `'static`.
fn check_type(ty: &Type) -> syn::Result<()> {
    match ty {
        Type::ImplTrait(_) => Err(unsupported(ty.span(), "impl Trait types")),
        Type::Reference(r) => {
            match &r.lifetime {
                Some(lt) => check_lifetime(lt)?,
                None => return Err(unsupported(r.span(),
                    "references without a 'static lifetime"))
            }
            check_type(&r.elem)
        },
        Type::Array(a) => check_type(&a.elem),
        Type::Group(g) => check_type(&g.elem),
        Type::Paren(p) => check_type(&p.elem),
        Type::Ptr(p) => check_type(&p.elem),
        Type::Slice(s) => check_type(&s.elem),
        Type::Tuple(t) => t.elems.iter().try_for_each(check_type),
        Type::Path(tp) => {
            if let Some(qself) = &tp.qself {
                check_type(&qself.ty)?;
            }
            check_path(&tp.path)
        },
        Type::TraitObject(to) => {
            to.bounds.iter().try_for_each(|bound| match bound {
                TypeParamBound::Lifetime(lt) => check_lifetime(lt),
                TypeParamBound::Trait(tb) => check_path(&tb.path),
                _ => Ok(())
            })
        },
        _ => Ok(())
    }
}
