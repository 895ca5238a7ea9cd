// Library root
// -----------
// This crate exposes the pieces of the Splitwise CLI as a library. The
// binary (`main.rs`) parses arguments and hands them to `ui::run`.
//
// Module responsibilities:
// - `config`: clap argument definitions and the resolved `Config`.
// - `store`: the cached access token on disk.
// - `oauth`: request signing and the three-legged login flow.
// - `session`: cached token or fresh login, whichever applies.
// - `api`: signed calls to the REST endpoints.
// - `ui`: the subcommands, prompts and terminal output.
// - `error`: typed errors shared by the modules above.
pub mod api;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod store;
pub mod ui;
