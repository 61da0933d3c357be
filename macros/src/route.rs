use darling::{ast, FromMeta};
use proc_macro::TokenStream;
use quote::{format_ident, quote};

#[derive(FromMeta)]
struct RouteArgs {
	#[darling(multiple)]
	tag: Vec<syn::Expr>,
	#[darling(multiple)]
	response: Vec<ResponseArgs>,
}

#[derive(FromMeta)]
struct ResponseArgs {
	status: syn::LitInt,
	shape: Option<syn::Type>,
	description: Option<String>,
}

pub fn from_input(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = match ast::NestedMeta::parse_meta_list(args.into()) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let args = match RouteArgs::from_list(&args) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let function = syn::parse_macro_input!(input as syn::ItemFn);

	let Some(docs) = Docs::from_attrs(&function.attrs) else {
		return syn::Error::new(
			function.sig.ident.span(),
			"routes need a doc comment: a one-line summary, optionally followed by a description",
		)
		.into_compile_error()
		.into();
	};

	let fn_name = format_ident!("{}_docs", function.sig.ident);
	let fn_vis = &function.vis;
	let summary = &docs.summary;
	let description = docs.description.as_ref().map(|description| {
		quote! { .description(#description) }
	});

	let tags = args.tag.iter();
	let responses = args.response.into_iter().map(|response| {
		let status = response.status;
		let shape = response
			.shape
			.map_or_else(|| quote!(()), |shape| quote!(#shape));

		match response.description {
			Some(description) => quote! {
				.response_with::<#status, #shape, _>(|res| res.description(#description))
			},
			None => quote! {
				.response::<#status, #shape>()
			},
		}
	});

	quote! {
		#function

		#fn_vis fn #fn_name(op: aide::transform::TransformOperation) -> aide::transform::TransformOperation {
			op.summary(#summary)
				#description
				#(
					.tag(#tags)
				)*
				#(
					#responses
				)*
		}
	}
	.into()
}

/// The summary and description pulled out of a handler's doc comment.
///
/// The first line is the summary, and everything after it is the description.
#[derive(Debug, PartialEq)]
struct Docs {
	summary: String,
	description: Option<String>,
}

impl Docs {
	fn from_attrs(attrs: &[syn::Attribute]) -> Option<Self> {
		let lines = attrs.iter().filter_map(|attr| {
			let syn::Meta::NameValue(doc) = &attr.meta else {
				return None;
			};

			if !doc.path.is_ident("doc") {
				return None;
			}

			let syn::Expr::Lit(syn::ExprLit {
				lit: syn::Lit::Str(literal),
				..
			}) = &doc.value
			else {
				return None;
			};

			Some(literal.value())
		});

		Self::from_lines(lines)
	}

	fn from_lines(lines: impl IntoIterator<Item = String>) -> Option<Self> {
		let mut text = String::new();

		for line in lines {
			// rustdoc trims the leading space of each line
			text += line.trim();
			text += "\n";
		}

		let text = text.trim().replace("\\\n", "");
		let mut parts = text.splitn(2, '\n');

		let summary = parts.next().filter(|s| !s.is_empty())?.to_owned();
		let description = parts
			.next()
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(ToOwned::to_owned);

		Some(Self {
			summary,
			description,
		})
	}
}
