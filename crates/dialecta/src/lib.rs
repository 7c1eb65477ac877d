//! Dialecta command-line front end.
//!
//! | Module     | Contents                                          |
//! |------------|---------------------------------------------------|
//! | `args`     | clap arguments and their mapping to overrides     |
//! | `input`    | material from a file, stdin, text or a prompt     |
//! | `terminal` | event rendering and the final summary             |
//! | `app`      | config resolution and orchestrator wiring         |

pub mod app;
pub mod args;
pub mod input;
pub mod terminal;
