mod route;

use proc_macro::TokenStream;

/// Creates a documentation function for the route, named after the original
/// function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the operation summary and the
/// rest becomes its description. Extra responses can be listed with
/// `response(status = 404, shape = "Json<Message>", description = "...")`.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}
