use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Ident, Result, Token, Type, braced, parenthesized,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// A single method slot in the COM vtable
struct Method {
    /// Vtable field name (e.g. `GetBufferSize`)
    name: Ident,
    /// Trait method the slot dispatches to (e.g. `buffer_size`)
    binding: Ident,
    args: Vec<(Ident, Type)>,
    ret: Type,
}

/// The full com_interface input
struct ComInterface {
    attrs: Vec<Attribute>,
    public_type: Ident,
    vtable_type: Ident,
    trait_name: Ident,
    methods: Vec<Method>,
}

impl Parse for ComInterface {
    fn parse(input: ParseStream) -> Result<Self> {
        // Parse attributes (doc comments)
        let attrs = input.call(Attribute::parse_outer)?;

        // interface PublicType(VtableType) => TraitName
        let kw: Ident = input.parse()?;
        if kw != "interface" {
            return Err(syn::Error::new(kw.span(), "expected `interface`"));
        }
        let public_type: Ident = input.parse()?;
        let vtable_content;
        parenthesized!(vtable_content in input);
        let vtable_type: Ident = vtable_content.parse()?;
        input.parse::<Token![=>]>()?;
        let trait_name: Ident = input.parse()?;

        // { ... }
        let content;
        braced!(content in input);

        let mut methods = Vec::new();
        while !content.is_empty() {
            // fn Name(args) -> RetType => binding;
            content.parse::<Token![fn]>()?;
            let name: Ident = content.parse()?;

            let args_content;
            parenthesized!(args_content in content);
            let args_parsed: Punctuated<(Ident, Type), Token![,]> = args_content.parse_terminated(
                |input| {
                    let name: Ident = input.parse()?;
                    input.parse::<Token![:]>()?;
                    let ty: Type = input.parse()?;
                    Ok((name, ty))
                },
                Token![,],
            )?;
            let args: Vec<_> = args_parsed.into_iter().collect();

            content.parse::<Token![->]>()?;
            let ret: Type = content.parse()?;

            content.parse::<Token![=>]>()?;
            let binding: Ident = content.parse()?;
            if binding == "this" {
                return Err(syn::Error::new(
                    binding.span(),
                    "`this` is reserved for the object pointer",
                ));
            }

            content.parse::<Token![;]>()?;

            methods.push(Method {
                name,
                binding,
                args,
                ret,
            });
        }

        if methods.is_empty() {
            return Err(syn::Error::new(
                public_type.span(),
                "an interface needs at least one method",
            ));
        }

        Ok(ComInterface {
            attrs,
            public_type,
            vtable_type,
            trait_name,
            methods,
        })
    }
}

fn generate_vtable_field(public_type: &Ident, method: &Method) -> TokenStream2 {
    let method_name = &method.name;
    let ret = &method.ret;
    let arg_types: Vec<_> = method.args.iter().map(|(_, ty)| ty).collect();

    quote! {
        pub #method_name: unsafe extern "C" fn(*mut #public_type, #(#arg_types),*) -> #ret
    }
}

fn generate_trait_method(method: &Method) -> TokenStream2 {
    let binding = &method.binding;
    let ret = &method.ret;
    let slot = method.name.to_string();
    let doc = format!("Backs the `{slot}` vtable slot.");
    let arg_names: Vec<_> = method.args.iter().map(|(name, _)| name).collect();
    let arg_types: Vec<_> = method.args.iter().map(|(_, ty)| ty).collect();

    quote! {
        #[doc = #doc]
        unsafe fn #binding(this: ::std::ptr::NonNull<Self> #(, #arg_names: #arg_types)*) -> #ret;
    }
}

/// Generic thunk: receives the C call and forwards to the implementing type
fn generate_thunk(public_type: &Ident, trait_name: &Ident, method: &Method) -> TokenStream2 {
    let binding = &method.binding;
    let ret = &method.ret;
    let arg_names: Vec<_> = method.args.iter().map(|(name, _)| name).collect();
    let arg_types: Vec<_> = method.args.iter().map(|(_, ty)| ty).collect();

    quote! {
        unsafe extern "C" fn #binding<T: #trait_name>(
            this: *mut #public_type
            #(, #arg_names: #arg_types)*
        ) -> #ret {
            unsafe {
                T::#binding(::std::ptr::NonNull::new_unchecked(this.cast::<T>()) #(, #arg_names)*)
            }
        }
    }
}

/// Declares a COM interface: the public `#[repr(C)]` object header, its C ABI
/// vtable, and a trait whose implementors can be exposed through it.
///
/// ```ignore
/// com_interface! {
///     interface ID3DBlob(ID3DBlobVtbl) => BlobInterface {
///         fn AddRef() -> u32 => add_ref;
///         fn Release() -> u32 => release;
///     }
/// }
///
/// static VTABLE: ID3DBlobVtbl = ID3DBlobVtbl::new::<MyBlob>();
/// ```
#[proc_macro]
pub fn com_interface(input: TokenStream) -> TokenStream {
    let interface = parse_macro_input!(input as ComInterface);

    let attrs = &interface.attrs;
    let public_type = &interface.public_type;
    let vtable_type = &interface.vtable_type;
    let trait_name = &interface.trait_name;

    let vtable_struct_fields: Vec<_> = interface
        .methods
        .iter()
        .map(|m| generate_vtable_field(public_type, m))
        .collect();

    let trait_methods: Vec<_> = interface.methods.iter().map(generate_trait_method).collect();

    let thunks: Vec<_> = interface
        .methods
        .iter()
        .map(|m| generate_thunk(public_type, trait_name, m))
        .collect();

    let vtable_init_fields: Vec<_> = interface
        .methods
        .iter()
        .map(|m| {
            let method_name = &m.name;
            let binding = &m.binding;
            quote! { #method_name: #binding::<T> }
        })
        .collect();

    let trait_doc = format!(
        "Objects that can be handed out as `{public_type}`.\n\n\
         # Safety\n\n\
         Implementors must be `#[repr(C)]` and start with a `*const {vtable_type}` \
         pointing at a vtable built by `{vtable_type}::new::<Self>()`."
    );

    let expanded = quote! {
        #(#attrs)*
        #[repr(C)]
        pub struct #public_type {
            pub vtable: *const #vtable_type,
        }

        #[repr(C)]
        pub struct #vtable_type {
            #(#vtable_struct_fields),*
        }

        #[doc = #trait_doc]
        pub unsafe trait #trait_name: Sized {
            #(#trait_methods)*
        }

        impl #vtable_type {
            /// Builds the vtable that dispatches every slot to `T`.
            pub const fn new<T: #trait_name>() -> Self {
                #(#thunks)*

                #vtable_type {
                    #(#vtable_init_fields),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
