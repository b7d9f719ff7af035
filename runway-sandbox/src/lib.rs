//! Restricted in-process interpreter for integration scripts
//!
//! Scripts run inside a fresh Boa context per invocation. The context only
//! carries the ECMAScript builtins: there is no module loader, filesystem,
//! network or timer API. The single entry point a script receives is the
//! frozen `ctx` object built from the tenant context.
//!
//! A script is a CommonJS-style module that assigns a function to
//! `exports.default`:
//!
//! ```js
//! exports.default = async function (ctx, input) {
//!     ctx.log("fetching page", input.page);
//!     return { connection: ctx.connectionId };
//! };
//! ```
//!
//! Actions are called with `(ctx, input)`, syncs with `(ctx)`. A returned
//! promise is settled before the outcome is reported.

pub mod error;
mod harness;
pub mod sandbox;

pub use error::SandboxError;
pub use sandbox::{Sandbox, SandboxLimits};
