/*
 * Copyright 2024 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! Implementation of the [`crate::syscall`] macro.

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn};

/// The register slots available to a system call, in argument order.
///
/// Argument-of-register marshalling is one of the collaborators this specification treats as
/// external (§1): it only needs to be wide enough for `mmap`'s six arguments.
const REGS: [&str; 6] = ["reg0", "reg1", "reg2", "reg3", "reg4", "reg5"];

/// Implementation of the `syscall` macro.
pub fn syscall(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as ItemFn);

	if input.sig.constness.is_some() {
		panic!("a system call handler cannot be `const`");
	}
	if !input.sig.generics.params.is_empty() {
		panic!("a system call cannot have generic arguments");
	}
	if input.sig.variadic.is_some() {
		panic!("a system call handler cannot have variadic arguments");
	}
	if input.sig.inputs.len() > REGS.len() {
		panic!(
			"too many arguments for the current target (max: {})",
			REGS.len()
		);
	}

	let args = input
		.sig
		.inputs
		.iter()
		.enumerate()
		.map(|(i, arg)| match arg {
			FnArg::Typed(typed) => {
				let pat = &typed.pat;
				let ty = &typed.ty;
				let reg_name = Ident::new(REGS[i], Span::call_site());
				(pat, ty, reg_name)
			}
			FnArg::Receiver(_) => panic!("a system call handler cannot have a `self` argument"),
		})
		.collect::<Vec<_>>();

	let args_tokens: proc_macro2::TokenStream = args
		.iter()
		.map(|(pat, ty, reg_name)| {
			quote! {
				let #pat = regs.#reg_name as #ty;
			}
		})
		.collect();

	let ident = input.sig.ident;
	let code = input.block;

	let toks = if cfg!(feature = "strace") {
		let pats = args.iter().map(|(pat, ..)| pat).collect::<Vec<_>>();
		let fmt_args = core::iter::repeat("{:?}")
			.take(pats.len())
			.collect::<Vec<_>>()
			.join(", ");
		let fmt_str = format!("[strace] {}({fmt_args})", ident);
		quote! {
			pub fn #ident(regs: &crate::syscall::Regs) -> Result<i32, utils::errno::Errno> {
				#args_tokens
				crate::println!(#fmt_str, #(#pats),*);
				let ret: Result<i32, utils::errno::Errno> = (|| { #code })();
				match &ret {
					Ok(val) => crate::println!("[strace] {} -> Ok({val})", stringify!(#ident)),
					Err(e) => crate::println!("[strace] {} -> Err({e})", stringify!(#ident)),
				}
				ret
			}
		}
	} else {
		quote! {
			pub fn #ident(regs: &crate::syscall::Regs) -> Result<i32, utils::errno::Errno> {
				#args_tokens
				#code
			}
		}
	};
	TokenStream::from(toks)
}
