// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use syn::punctuated::Punctuated;
use syn::{spanned::Spanned, *};

pub struct AttrData {
	pub name: Ident,
	pub vis: Visibility,
}

impl TryFrom<Punctuated<Expr, Token!(,)>> for AttrData {
	type Error = syn::Error;
	fn try_from(value: Punctuated<Expr, Token!(,)>) -> Result<Self> {
		let mut maybe_name: Option<Ident> = None;
		let mut maybe_vis: Option<Visibility> = None;
		let mut errors = vec![];
		const EXPECTED_KW: &str = "Expected `name`, or `vis`.";

		for expr in value.iter() {
			match expr {
				Expr::Assign(assign) => {
					let (assign_left, assign_right) = (assign.left.as_ref(), assign.right.as_ref());

					let Expr::Path(ExprPath { path, .. }) = assign_left else {
						errors.push(Error::new(assign_left.span(), EXPECTED_KW));
						continue;
					};
					if path.is_ident("name") {
						// Branch for syntax: #[api(name = <ident>)]
						match assign_right {
							Expr::Path(ExprPath { path, .. }) if path.get_ident().is_some() => {
								if maybe_name.is_none() {
									maybe_name = path.get_ident().cloned();
								} else {
									errors.push(Error::new(assign.span(), "name is already defined"));
								}
							}
							right => errors.push(Error::new(right.span(), "Expected identifier.")),
						}
					} else if path.is_ident("vis") {
						// Branch for syntax: #[api(vis = "pub(crate)")]
						match assign_right {
							Expr::Lit(ExprLit {
								lit: Lit::Str(val), ..
							}) => {
								if maybe_vis.is_some() {
									errors.push(Error::new(assign.span(), "vis is already defined"));
								} else {
									match val.parse::<Visibility>() {
										Ok(vis) => maybe_vis = Some(vis),
										Err(e) => errors.push(e),
									}
								}
							}
							right => errors.push(Error::new(right.span(), "Expected string.")),
						}
					} else {
						errors.push(Error::new(assign_left.span(), EXPECTED_KW));
					}
				}

				// Branch for everything else.
				expr => errors.push(Error::new(expr.span(), EXPECTED_KW)),
			}
		}
		if maybe_name.is_none() {
			errors.push(Error::new(
				value.span(),
				"No table name detected. Suggest using: `name = <ident>`.",
			));
		}

		// if there are any errors this will immediately combine and return early.
		let mut errors = errors.into_iter();
		if let Some(mut main_err) = errors.next() {
			for err in errors {
				main_err.combine(err);
			}
			return Err(main_err);
		}
		match maybe_name {
			Some(name) => Ok(Self {
				name,
				vis: maybe_vis.unwrap_or_else(|| parse_quote!(pub)),
			}),
			None => Err(Error::new(value.span(), EXPECTED_KW)),
		}
	}
}
