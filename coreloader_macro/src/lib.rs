// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use quote::*;

use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use syn::{parse::Parser, punctuated::Punctuated, spanned::Spanned, Expr, Token};

mod attr_data;
use attr_data::*;

/// Turns an `extern` block into a table of `Symbol`s resolved in one go.
///
/// See `coreloader::api` for the generated items.
#[proc_macro_attribute]
pub fn api(args: TokenStream1, input: TokenStream1) -> TokenStream1 {
	let args = TokenStream2::from(args);
	let foreign_mod = match syn::parse2::<syn::ItemForeignMod>(TokenStream2::from(input)) {
		Ok(foreign_mod) => foreign_mod,
		Err(e) => return e.into_compile_error().into(),
	};

	let punct = match Parser::parse2(Punctuated::<Expr, Token!(,)>::parse_terminated, args) {
		Ok(punct) => punct,
		Err(e) => return e.into_compile_error().into(),
	};
	let attr = match AttrData::try_from(punct) {
		Ok(attr) => attr,
		Err(e) => return e.into_compile_error().into(),
	};
	match expand(attr, foreign_mod) {
		Ok(tokens) => tokens.into(),
		Err(e) => e.into_compile_error().into(),
	}
}

struct TableEntry {
	field: TokenStream2,
	ident: syn::Ident,
	link_name: String,
}

fn expand(attr: AttrData, foreign_mod: syn::ItemForeignMod) -> syn::Result<TokenStream2> {
	// `extern {}` means `extern "C" {}`
	let abi = match foreign_mod.abi.name {
		Some(_) => foreign_mod.abi.to_token_stream(),
		None => quote!(extern "C"),
	};

	let mut entries = Vec::new();
	let mut errors: Option<syn::Error> = None;
	for item in foreign_mod.items {
		let entry = match item {
			syn::ForeignItem::Fn(fn_item) => parse_fn(&abi, fn_item),
			other => Err(syn::Error::new(
				other.span(),
				"only functions can be declared in an api table",
			)),
		};
		match entry {
			Ok(entry) => entries.push(entry),
			Err(e) => match errors.as_mut() {
				Some(main_err) => main_err.combine(e),
				None => errors = Some(e),
			},
		}
	}
	if let Some(e) = errors {
		return Err(e);
	}

	let AttrData { name, vis } = attr;
	// `#[link]` and friends describe the extern block, not the generated struct
	let mod_attrs = foreign_mod.attrs.iter().filter(|attr| {
		let path = attr.path();
		["doc", "cfg", "cfg_attr", "allow", "deny", "warn", "forbid"]
			.iter()
			.any(|name| path.is_ident(name))
	});
	let fields = entries.iter().map(|entry| &entry.field);
	let idents: Vec<_> = entries.iter().map(|entry| &entry.ident).collect();
	let link_names: Vec<_> = entries.iter().map(|entry| &entry.link_name).collect();

	Ok(quote! {
		#(#mod_attrs)*
		#[derive(Debug)]
		#[allow(non_snake_case)]
		#vis struct #name {
			#(#fields,)*
		}

		#[allow(non_snake_case)]
		impl #name {
			/// Export names, in declaration order.
			#vis const SYMBOLS: &'static [&'static str] = &[#(#link_names),*];

			/// Resolves every entry point from the library loaded in `session`.
			#vis fn resolve(
				session: &::coreloader::LoaderSession,
			) -> ::std::result::Result<Self, ::coreloader::SessionError> {
				::std::result::Result::Ok(Self {
					#(#idents: session.get_method(#link_names)?,)*
				})
			}

			/// Resolves every entry point from `library`.
			#vis fn resolve_from(
				library: &::coreloader::Library,
			) -> ::std::result::Result<Self, ::coreloader::ResolveError> {
				::std::result::Result::Ok(Self {
					#(#idents: library.symbol(#link_names)?,)*
				})
			}
		}
	})
}

fn parse_fn(abi: &TokenStream2, fn_item: syn::ForeignItemFn) -> syn::Result<TableEntry> {
	let sig = &fn_item.sig;
	if let Some(variadic) = &sig.variadic {
		return Err(syn::Error::new(variadic.span(), "variadic functions are unsupported"));
	}
	if !sig.generics.params.is_empty() {
		return Err(syn::Error::new(sig.generics.span(), "generic functions are unsupported"));
	}

	let ident = sig.ident.clone();
	let mut link_name = ident.to_string();
	let mut field_attrs = Vec::new();
	for attr in fn_item.attrs.iter() {
		if attr.path().is_ident("link_name") {
			// Branch for syntax: #[link_name = <string>]
			match &attr.meta.require_name_value()?.value {
				Expr::Lit(syn::ExprLit {
					lit: syn::Lit::Str(val),
					..
				}) => link_name = val.value(),
				other => return Err(syn::Error::new(other.span(), "Expected string.")),
			}
		} else {
			field_attrs.push(attr.to_token_stream());
		}
	}

	let mut param_ty_list = Vec::new();
	for arg in sig.inputs.iter() {
		match arg {
			syn::FnArg::Typed(pat_type) => param_ty_list.push(pat_type.ty.to_token_stream()),
			syn::FnArg::Receiver(rec) => {
				return Err(syn::Error::new(rec.span(), "`self` arguments are unsupported"))
			}
		}
	}
	let output = sig.output.to_token_stream();
	let vis = fn_item.vis.to_token_stream();

	// According to "The Rustonomicon" foreign functions are assumed unsafe,
	// so the pointer type is always `unsafe`.
	let field = quote! {
		#(#field_attrs)*
		#vis #ident: ::coreloader::Symbol<unsafe #abi fn (#(#param_ty_list),*) #output>
	};
	Ok(TableEntry {
		field,
		ident,
		link_name,
	})
}
