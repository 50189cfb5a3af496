//! Signature checks for processor transforms.
//!
//! A transform is an associated function of the processor type:
//!
//! - `fn process_value(value: T, context: &Self) -> R`
//! - `fn call(values: Vec<T>, context: &Self) -> R`
//!
//! Every rule is checked here so a malformed transform is reported at the
//! offending tokens instead of as a trait-bound error in generated code.

use syn::{
    FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl, Pat, PathArguments, ReturnType,
    Signature, Type,
};

/// Names the generated code defines on the processor type.
pub(crate) const RESERVED: &[&str] = &["new", "with_context", "default_context", "process", "name"];

/// Which transform an impl block provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransformKind {
    PerValue,
    Bulk,
}

impl TransformKind {
    pub(crate) fn method(self) -> &'static str {
        match self {
            TransformKind::PerValue => "process_value",
            TransformKind::Bulk => "call",
        }
    }
}

/// A validated transform.
pub(crate) struct Transform {
    pub kind: TransformKind,
    /// Declared type of the value argument.
    pub value_ty: Type,
    /// Whether the return type is a `Result`.
    pub fallible: bool,
}

/// The identifier of a non-generic path type such as `Join` or `text::Join`.
pub(crate) fn self_ident(item: &ItemImpl) -> syn::Result<&Ident> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[processor] goes on an inherent impl block, not a trait impl",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic processors are not supported",
        ));
    }
    match &*item.self_ty {
        Type::Path(path) if path.qself.is_none() => match path.path.segments.last() {
            Some(segment) if segment.arguments.is_empty() => Ok(&segment.ident),
            Some(segment) => Err(syn::Error::new_spanned(
                &segment.arguments,
                "generic processors are not supported",
            )),
            None => Err(syn::Error::new_spanned(&item.self_ty, "expected a type name")),
        },
        other => Err(syn::Error::new_spanned(other, "expected a type name")),
    }
}

/// Locate and validate the single transform of an impl block.
pub(crate) fn find_transform(item: &ItemImpl, self_ident: &Ident) -> syn::Result<Transform> {
    let mut found: Option<(TransformKind, &ImplItemFn)> = None;

    for impl_item in &item.items {
        let ImplItem::Fn(function) = impl_item else {
            continue;
        };
        let name = function.sig.ident.to_string();
        if RESERVED.contains(&name.as_str()) {
            return Err(syn::Error::new_spanned(
                &function.sig.ident,
                format!("`{name}` is generated by #[processor] and cannot be defined here"),
            ));
        }
        let kind = match name.as_str() {
            "process_value" => TransformKind::PerValue,
            "call" => TransformKind::Bulk,
            _ => continue,
        };
        if let Some((previous, _)) = found {
            return Err(syn::Error::new_spanned(
                &function.sig.ident,
                format!(
                    "define either `process_value` or `call`, not both (`{}` is already defined)",
                    previous.method()
                ),
            ));
        }
        found = Some((kind, function));
    }

    let Some((kind, function)) = found else {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "#[processor] needs a `process_value` or `call` transform",
        ));
    };
    validate(&function.sig, kind, self_ident)
}

/// Check one transform signature.
pub(crate) fn validate(sig: &Signature, kind: TransformKind, self_ident: &Ident) -> syn::Result<Transform> {
    let method = kind.method();

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, format!("`{method}` must not be async")));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            format!("`{method}` must not be generic"),
        ));
    }
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new_spanned(variadic, "variadic transforms are not supported"));
    }

    let mut inputs = sig.inputs.iter();
    let (value, context) = match (inputs.next(), inputs.next(), inputs.next()) {
        (Some(value), Some(context), None) => (value, context),
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                format!(
                    "`{method}` takes exactly two arguments: `({}, context: &Self)`",
                    value_name(kind)
                ),
            ));
        }
    };

    let value_ty = typed_argument(value, method)?;
    if matches!(value_ty, Type::Reference(_)) {
        return Err(syn::Error::new_spanned(
            value_ty,
            format!("`{method}` must take its {} by value", value_name(kind)),
        ));
    }
    if matches!(value_ty, Type::ImplTrait(_)) {
        return Err(syn::Error::new_spanned(
            value_ty,
            format!("`{method}` must not use `impl Trait` arguments"),
        ));
    }
    if kind == TransformKind::Bulk && vec_element(value_ty).is_none() {
        return Err(syn::Error::new_spanned(
            value_ty,
            "`call` takes its values as `Vec<T>`",
        ));
    }

    let context_ty = typed_argument(context, method)?;
    if !is_self_reference(context_ty, self_ident) {
        return Err(syn::Error::new_spanned(
            context_ty,
            format!("the context argument of `{method}` must be `&Self` or `&{self_ident}`"),
        ));
    }

    let fallible = match &sig.output {
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                sig,
                format!("`{method}` must declare a return type"),
            ));
        }
        ReturnType::Type(_, ty) => is_result(ty),
    };

    Ok(Transform {
        kind,
        value_ty: value_ty.clone(),
        fallible,
    })
}

fn value_name(kind: TransformKind) -> &'static str {
    match kind {
        TransformKind::PerValue => "value",
        TransformKind::Bulk => "values",
    }
}

fn typed_argument<'a>(arg: &'a FnArg, method: &str) -> syn::Result<&'a Type> {
    match arg {
        FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
            receiver,
            format!("`{method}` must not take `self`; the configuration arrives as `context: &Self`"),
        )),
        FnArg::Typed(typed) => match &*typed.pat {
            Pat::Ident(ident) if ident.by_ref.is_none() && ident.subpat.is_none() => Ok(&typed.ty),
            other => Err(syn::Error::new_spanned(
                other,
                format!("arguments of `{method}` must be plain identifiers"),
            )),
        },
    }
}

fn is_self_reference(ty: &Type, self_ident: &Ident) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    if reference.mutability.is_some() {
        return false;
    }
    match &*reference.elem {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.arguments.is_empty() && (segment.ident == "Self" || segment.ident == *self_ident)),
        _ => false,
    }
}

fn is_result(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Result"),
        _ => false,
    }
}

fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(element) if args.args.len() == 1 => Some(element),
        _ => None,
    }
}
